use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(String),

    #[error("Export request did not return a request_id")]
    MissingRequestId,

    #[error("Response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("{call} request failed (HTTP {status}): {message}")]
    Upstream {
        call: &'static str,
        url: String,
        status: u16,
        message: String,
        api_error: Option<Value>,
        hint: Option<&'static str>,
    },
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// 按状态码给出排查提示
pub fn hint_for_status(status: u16) -> Option<&'static str> {
    match status {
        404 => Some(
            "The endpoint was not found. Please ensure the API is deployed and the base URL is correct.",
        ),
        401 => Some("Authentication failed. Please check your Demeterics API key."),
        402 => Some("Insufficient credits. Please add credits to your account."),
        400 => Some("Invalid request. Check the request parameters."),
        _ => None,
    }
}

impl AdapterError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AdapterError::Upstream { status, .. } => Some(*status),
            AdapterError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Record emitted in place of an item's output when the runner continues past failures.
    pub fn to_item_json(&self) -> Value {
        match self {
            AdapterError::Upstream {
                url,
                status,
                api_error,
                hint,
                ..
            } => json!({
                "error": self.to_string(),
                "request_url": url,
                "status_code": status,
                "hint": hint,
                "api_error": api_error,
            }),
            AdapterError::Http(e) => json!({
                "error": self.to_string(),
                "request_url": e.url().map(|u| u.to_string()),
                "status_code": self.status_code(),
                "hint": self.status_code().and_then(hint_for_status),
                "api_error": Value::Null,
            }),
            _ => json!({
                "error": self.to_string(),
                "request_url": Value::Null,
                "status_code": Value::Null,
                "hint": Value::Null,
                "api_error": Value::Null,
            }),
        }
    }
}
