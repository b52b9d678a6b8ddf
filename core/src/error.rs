//! Error handling for the PIMS analytics core
//!
//! A failed bulk read aborts the whole computation and surfaces the
//! store's message; malformed individual rows are coerced or skipped at
//! the store boundary and never raise.

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// The backing store reported an error on a bulk read
    #[error("store read failed: {0}")]
    StoreRead(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("internal error")]
    InternalError(#[from] anyhow::Error),
}

/// Result type alias for the core services
pub type AppResult<T> = Result<T, AppError>;
