use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoegyeError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No rule with ID {0}")]
    RuleNotFound(i64),

    #[error("No transaction with ID {0}")]
    TransactionNotFound(i64),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HoegyeError>;
