use thiserror::Error;

/// Errors surfaced by configuration validation and the persistence layers.
///
/// Calls into a session made in the wrong state are not errors; they are
/// ignored by the session itself.
#[derive(Debug, Error)]
pub enum FlickError {
    #[error("invalid game config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("unknown game mode `{0}`")]
    UnknownMode(String),

    #[error("unknown movement `{0}`")]
    UnknownMovement(String),

    #[error("history database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, FlickError>;

impl FlickError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        FlickError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
