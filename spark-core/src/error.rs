use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum SparkError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Active idea limit reached ({limit}); archive an idea first")]
    LimitReached { limit: i64 },

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl SparkError {
    /// HTTP status code the error should surface as.
    pub fn status_code(&self) -> u16 {
        match self {
            SparkError::NotFound(_) => 404,
            SparkError::LimitReached { .. } => 409,
            SparkError::Invalid(_) => 400,
            SparkError::Llm(_) => 502,
            SparkError::Unavailable(_) => 503,
            SparkError::Database(_)
            | SparkError::Config(_)
            | SparkError::Io(_)
            | SparkError::Other(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, SparkError>;
