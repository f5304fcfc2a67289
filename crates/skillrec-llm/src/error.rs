#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request to {provider} timed out")]
    Timeout { provider: &'static str },

    #[error("rate limited by {provider}")]
    RateLimited { provider: &'static str },

    #[error("{provider} API request failed (status {status}): {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("missing API key for {provider}")]
    MissingCredential { provider: &'static str },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// HTTP status reported by the provider, if the failure came from one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Map a transport error, keeping timeouts distinguishable.
    pub(crate) fn from_send(provider: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Http(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
