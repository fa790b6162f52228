//! Fact pipeline error types.

use thiserror::Error;

/// Failure of a single call to the generative model.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Prompt blocked: {0}")]
    Blocked(String),

    #[error("Model returned no text")]
    EmptyResponse,
}

/// Model output rejected by one of the validation stages.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Response is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("Response does not match the fact schema: {0}")]
    Schema(String),

    #[error("Response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ValidationError {
    /// Short name of the stage that failed, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "syntax",
            Self::Schema(_) => "schema",
            Self::Decode(_) => "decode",
        }
    }
}

/// Outcome of a fetch that produced no new facts.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("No valid response after {attempts} attempts (last: {last})")]
    Exhausted {
        attempts: u32,
        #[source]
        last: ValidationError,
    },

    #[error("Fetch superseded by a newer request")]
    Superseded,
}
