//! Response documents printed by the binary.

use pipeline::ServiceError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of one invocation as printed to stdout.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success {
        data: Map<String, Value>,
    },
    Error {
        code: &'static str,
        #[serde(rename = "userMessage")]
        user_message: String,
        #[serde(rename = "devMessage")]
        dev_message: String,
    },
}

impl Envelope {
    pub fn success(data: Map<String, Value>) -> Self {
        Self::Success { data }
    }

    pub fn error(err: &ServiceError) -> Self {
        Self::Error {
            code: err.code(),
            user_message: err.user_message(),
            dev_message: err.to_string(),
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Liveness document for `nodeflow health`.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
}

impl Health {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            service: "nodeflow",
        }
    }
}
