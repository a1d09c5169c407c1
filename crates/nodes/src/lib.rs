//! Nodeflow pipeline nodes, node registry, and dispatcher.
//!
//! This crate provides the built-in nodes (invoice cleanup, data explanation,
//! and chat), the fixed [`NodeRegistry`] that maps names to them, and the
//! [`Dispatcher`] that runs one node for an authenticated caller.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Nodes sequence calls between the template cache
//! and text generator defined in the [`pipeline`] crate. They hold no
//! infrastructure of their own; everything is injected at construction.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`node`] | [`Node`] trait and the logging [`execute`] wrapper |
//! | [`clean`] | [`CleanInvoiceNode`] (`clean_yaml`) |
//! | [`explain`] | [`ExplainNode`] (`explain`) |
//! | [`chat`] | [`ChatNode`] (`chat`) |
//! | [`registry`] | [`NodeRegistry`] and node name constants |
//! | [`dispatch`] | [`Dispatcher`] |

pub mod chat;
pub mod clean;
pub mod dispatch;
pub mod explain;
pub mod node;
pub mod registry;

pub use chat::ChatNode;
pub use clean::CleanInvoiceNode;
pub use dispatch::Dispatcher;
pub use explain::ExplainNode;
pub use node::{execute, Node};
pub use registry::{NodeRegistry, BUILT_IN_NODES, CHAT_NODE, CLEAN_NODE, EXPLAIN_NODE};
