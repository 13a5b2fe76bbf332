//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, JSON, header and raster errors, and provides semantic
//! variants for the pipeline stages: preconditions, engine, assembly and catalog.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ENVI header error: {0}")]
    Header(#[from] crate::io::HeaderError),

    #[error("Raster reader error: {0}")]
    Raster(#[from] crate::io::RasterError),

    #[error("Malformed granule name {name:?}: {reason}")]
    MalformedGranule { name: String, reason: String },

    #[error("Missing input file: {path:?}")]
    MissingInput { path: PathBuf },

    #[error("Failed to launch correction engine {program:?}: {source}")]
    EngineSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Correction engine failed with {status}; see log {log:?}")]
    EngineFailed { status: String, log: PathBuf },

    #[error("Missing engine output: {path:?}")]
    MissingEngineOutput { path: PathBuf },

    #[error("Invalid header field '{field}' in {path:?}: {reason}")]
    InvalidHeader {
        path: PathBuf,
        field: &'static str,
        reason: String,
    },

    #[error("Catalog consistency error: {0}")]
    CatalogConsistency(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Image encoding error: {0}")]
    Image(String),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },
}

impl Error {
    pub(crate) fn malformed(name: &str, reason: impl Into<String>) -> Self {
        Error::MalformedGranule {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
