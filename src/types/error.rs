//! Error types for the progression core

/// Main error type for progression operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown user, quest, or progress record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation rejected by the state machine (incomplete or already-claimed
    /// quest, non-positive progress amount)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A concurrent writer won the conditional update
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the error is a semantic rejection (caller mistake or lost
    /// race) rather than an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidState(_) | Self::Conflict(_)
        )
    }
}

impl From<mongodb::error::Error> for EngineError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::oid::Error> for EngineError {
    fn from(err: bson::oid::Error) -> Self {
        Self::InvalidState(format!("Invalid object id: {}", err))
    }
}

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
