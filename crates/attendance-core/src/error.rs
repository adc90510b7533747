use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while retrieving or exporting attendance data.
///
/// Row-level anomalies are never errors; only the retrieval boundary and the
/// export path surface one of these.
#[derive(Error, Debug)]
pub enum AttendanceError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workbook container could not be decoded.
    #[error("Failed to open workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// The workbook has no worksheets.
    #[error("Workbook has no worksheets: {0}")]
    EmptyWorkbook(PathBuf),

    /// The file extension is not a known workbook format.
    #[error("Unsupported workbook format: {0}")]
    UnsupportedFormat(PathBuf),

    /// The configured data path does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// The hierarchy could not be serialised or parsed as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the attendance crates.
pub type Result<T> = std::result::Result<T, AttendanceError>;
