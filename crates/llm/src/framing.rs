//! Response framing for the generate endpoint.
//!
//! A response body is one or more newline-delimited JSON objects, each shaped
//! `{"response": "...", "done": bool, ...}`. This happens even when streaming
//! was not requested. Every line must parse; the last fragment is
//! authoritative and must carry `done: true`.

use serde::Deserialize;
use thiserror::Error;

/// One newline-delimited JSON object from the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Fragment {
    /// Generated text carried by this fragment.
    #[serde(default)]
    pub response: String,
    /// Set on the fragment that completes the logical response.
    #[serde(default)]
    pub done: bool,
}

/// Why a body could not be read as a complete logical response.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The body contained no fragments at all.
    #[error("empty response body")]
    Empty,

    /// A line was not a fragment object.
    #[error("line {line} is not a valid fragment: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The authoritative fragment is not marked done.
    #[error("final fragment is not marked done")]
    Incomplete,
}

/// Parses every fragment in `body` and returns the last one.
pub fn last_fragment(body: &str) -> Result<Fragment, FramingError> {
    let mut last = None;
    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fragment = serde_json::from_str::<Fragment>(line).map_err(|source| {
            FramingError::InvalidLine {
                line: index + 1,
                source,
            }
        })?;
        last = Some(fragment);
    }
    last.ok_or(FramingError::Empty)
}

/// Returns the text of a complete logical response.
pub fn final_text(body: &str) -> Result<String, FramingError> {
    let fragment = last_fragment(body)?;
    if fragment.done {
        Ok(fragment.response)
    } else {
        Err(FramingError::Incomplete)
    }
}
