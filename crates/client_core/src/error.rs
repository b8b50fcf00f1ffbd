use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid api url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected request ({status}): {}", body.message)]
    Api { status: u16, body: ApiError },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Message suitable for an inline alert. Falls back to a generic text when
    /// the server gave nothing usable.
    pub fn alert_message(&self) -> String {
        match self {
            Self::Api { body, .. } if !body.message.is_empty() => body.message.clone(),
            _ => crate::pagination::FETCH_FAILED_MESSAGE.to_string(),
        }
    }
}
