//! Error types for the council system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("Invalid participant count: expected {min}-{max}, got {actual}")]
    InvalidParticipantCount {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("Participant '{0}' appears more than once in the roster")]
    DuplicateParticipant(String),

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("Generation error: {0}")]
    GenerationError(String),

    #[error("This debate has already been run")]
    AlreadyRun,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
