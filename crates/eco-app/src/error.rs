use thiserror::Error;
use eco_core::BackendError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error from backend: {0}")]
    BackendError(#[from] BackendError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Live feed: {0}")]
    Feed(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
