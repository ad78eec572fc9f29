use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Trade {0} not found")]
    TradeNotFound(i64),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Deleting trade {0} requires confirmation")]
    ConfirmationRequired(i64),

    #[error("Database lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for JournalError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        JournalError::LockPoisoned(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
