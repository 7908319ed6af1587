//! Wire types of the real-time weather API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapping every API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    /// Zero on success
    pub code: i64,
    #[serde(rename = "errorMsg", default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    pub fn error_message(&self) -> String {
        self.error_msg
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("request failed with status code {}", self.code))
    }
}
