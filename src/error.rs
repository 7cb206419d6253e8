use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by flag evaluation, storage and configuration.
#[derive(Debug, Error)]
pub enum FlagError {
    /// Caller broke the contract: empty flag name, empty user identifier,
    /// or a create/update payload that failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("flag not found: {0}")]
    NotFound(String),

    #[error("flag already exists: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FlagError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FlagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            FlagError::NotFound(_) => StatusCode::NOT_FOUND,
            FlagError::Conflict(_) => StatusCode::CONFLICT,
            FlagError::Database(_) | FlagError::Migration(_) | FlagError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Handlers reply with (status, message); internal details stay in the logs.
impl From<FlagError> for (StatusCode, String) {
    fn from(err: FlagError) -> Self {
        let status = err.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
            (status, "Internal error".to_string())
        } else {
            (status, err.to_string())
        }
    }
}
