use thiserror::Error;

/// Errors that abort a conversation turn
///
/// None of these are retried or papered over: the only fallback in the
/// routing path is the label-level `unknown -> generic` rule.
#[derive(Error, Debug)]
pub enum RouterError {
    /// A route was selected (or required) whose deployment id is not configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The inference endpoint could not be reached or rejected the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered but without decodable generated text
    #[error("Unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RouterError {
    fn from(err: reqwest::Error) -> Self {
        RouterError::Transport(err.to_string())
    }
}

impl RouterError {
    /// Transport failure carrying the HTTP status and body of the rejected request
    pub fn http(status: reqwest::StatusCode, body: impl AsRef<str>) -> Self {
        RouterError::Transport(format!("HTTP {}: {}", status.as_u16(), body.as_ref()))
    }

    /// Whether this error came from configuration rather than the remote service
    pub fn is_configuration(&self) -> bool {
        matches!(self, RouterError::Configuration(_))
    }
}
