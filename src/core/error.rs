use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Backend is not ready: {0}")]
    NotReady(String),

    #[error("Failed to stream response: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
