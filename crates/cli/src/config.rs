//! Command-line and environment settings.
//!
//! Every option can be given as a flag or as a `NODEFLOW_*` environment
//! variable; flags win.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "nodeflow",
    version,
    about = "Run AI pipeline nodes over a payload"
)]
pub struct Cli {
    #[command(flatten)]
    pub telemetry: TelemetrySettings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate a credential and run one node over a payload
    Invoke(InvokeArgs),
    /// Answer newline-delimited requests from stdin until it closes
    Serve(ServeArgs),
    /// Sign a development credential for an identity
    IssueToken(IssueTokenArgs),
    /// List the registered node names
    Nodes,
    /// Print a liveness document
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct TelemetrySettings {
    /// Log filter directive, e.g. `info` or `nodes=debug,info`
    #[arg(long, global = true, env = "NODEFLOW_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "NODEFLOW_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; span export is disabled when absent
    #[arg(long, global = true, env = "NODEFLOW_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Args)]
pub struct SigningSettings {
    /// Shared HMAC secret used to verify and sign credentials
    #[arg(long, env = "NODEFLOW_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: String,
}

#[derive(Debug, Args)]
pub struct GenerationSettings {
    /// Base URL of the generation service
    #[arg(long, env = "NODEFLOW_GENERATION_URL")]
    pub generation_url: String,

    /// Model identifier sent with every request
    #[arg(long, env = "NODEFLOW_GENERATION_MODEL")]
    pub generation_model: String,

    /// Outer deadline on one invocation, in seconds
    #[arg(long, env = "NODEFLOW_CALL_TIMEOUT_SECS", default_value_t = 660)]
    pub call_timeout_secs: u64,
}

impl GenerationSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Everything needed to build the template cache, generation client and
/// credential verifier. Shared by `invoke` and `serve`.
#[derive(Debug, Args)]
pub struct PipelineSettings {
    /// YAML file of template records
    #[arg(long, env = "NODEFLOW_TEMPLATE_FILE")]
    pub template_file: PathBuf,

    /// Template cache time-to-live, in seconds
    #[arg(long, env = "NODEFLOW_CACHE_TTL_SECS", default_value_t = 900)]
    pub cache_ttl_secs: u64,

    #[command(flatten)]
    pub generation: GenerationSettings,

    #[command(flatten)]
    pub signing: SigningSettings,
}

impl PipelineSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Args)]
pub struct InvokeArgs {
    /// Name of the node to run
    pub node: String,

    /// YAML or JSON payload file; `-` or absent reads standard input
    #[arg(long, short)]
    pub payload: Option<PathBuf>,

    /// Credential, with or without the `Bearer` prefix
    #[arg(long, env = "NODEFLOW_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Correlation id to log under; generated when absent
    #[arg(long)]
    pub correlation_id: Option<String>,

    #[command(flatten)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Requests processed concurrently; further lines wait for a free slot
    #[arg(
        long,
        env = "NODEFLOW_MAX_IN_FLIGHT",
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_in_flight: u32,

    #[command(flatten)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Args)]
pub struct IssueTokenArgs {
    #[arg(long)]
    pub user_id: String,

    #[arg(long)]
    pub tenant_id: String,

    #[arg(long)]
    pub email: String,

    /// Permission to grant; may be repeated
    #[arg(long = "permission")]
    pub permissions: Vec<String>,

    /// Token lifetime, in seconds
    #[arg(long, default_value_t = 3600)]
    pub ttl_secs: u64,

    #[command(flatten)]
    pub signing: SigningSettings,
}
