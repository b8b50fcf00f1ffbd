use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Internal,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Error body returned by the admin API. Servers are not consistent about the
/// shape, so every field is optional on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    #[serde(default)]
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Parses a response body as JSON when possible, otherwise keeps the raw
    /// text as the message.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<ApiError>(body) {
            Ok(parsed) if !parsed.message.is_empty() => parsed,
            _ => Self::new(ErrorCode::Unknown, body.trim()),
        }
    }
}
