use skillrec_llm::LlmError;
use skillrec_skills::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("LLM provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("could not interpret model response: {0}")]
    UnparsableModelResponse(String),

    #[error("skill store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("request cancelled")]
    Cancelled,
}

impl EngineError {
    /// HTTP status for this failure: 400 for caller mistakes, 500 otherwise.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidQuery(_) => 400,
            _ => 500,
        }
    }

    /// The LLM path failed, either at the provider or when reading its output.
    #[must_use]
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::UnparsableModelResponse(_))
    }
}
