use rusqlite::ErrorCode;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("invalid request: {0}")]
    DecodeError(String),
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("channel error: {0}")]
    ChannelError(String),
}

impl RosterError {
    /// Map a write failure to `Conflict` when SQLite rejected it on a
    /// UNIQUE / PRIMARY KEY constraint. Other errors pass through.
    pub fn from_write(err: rusqlite::Error, what: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == ErrorCode::ConstraintViolation =>
            {
                let detail = msg.clone().unwrap_or_else(|| e.to_string());
                RosterError::Conflict(format!("{what} ({detail})"))
            }
            _ => RosterError::RusqliteError(err),
        }
    }

    /// Errors that terminate the current call on the client side rather than
    /// being reported inside a response.
    pub fn is_channel(&self) -> bool {
        matches!(self, RosterError::ChannelError(_))
    }
}
