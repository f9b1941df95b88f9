use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    /// The source object lacks one of the correlation fields set by the upstream system.
    #[error("Object {bucket}/{key} is missing required metadata: {field}")]
    MissingMetadata {
        bucket: String,
        key: String,
        field: &'static str,
    },

    #[error("Conversion failed with status code: {status}")]
    ConverterFailed { status: i32 },

    #[error("Conversion terminated without an exit status: {reason}")]
    ConverterAborted { reason: String },

    #[error("Retry failed with status code: {status}")]
    RetryFailed { status: i32 },

    #[error("Conversion timed out after {secs}s")]
    ConverterTimeout { secs: u64 },

    #[error("Failed to launch converter {program:?}: {source}")]
    ConverterLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Stage task '{action}' did not complete: {reason}")]
    TaskFailed { action: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
