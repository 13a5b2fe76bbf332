use std::path::PathBuf;

use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Run configuration not found: {path:?}")]
    MissingRunconfig { path: PathBuf },

    #[error("Core count must be greater than 0, got: {n_cores}")]
    ZeroCores { n_cores: usize },

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] rflpack::Error),
}
