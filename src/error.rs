//! Error types for the geotag finder

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error kinds that can occur while finding and storing geotagged photos
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Scan root is missing or is not a directory
    NotADirectory,
    /// Permission denied when accessing a file or directory
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// I/O error during file operations
    IoError,
    /// File was read but holds no parseable EXIF block
    ExifUnreadable,
    /// Photo store operation failed
    DatabaseError,
    /// Date filter could not be parsed
    InvalidDate,
    /// Unknown error
    Unknown,
}

/// Represents an error that occurred during scanning
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ScanError {
    /// The kind of error
    pub kind: ScanErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ScanErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create an error for a scan root that does not exist
    pub fn root_missing(path: &Path) -> Self {
        Self::new(
            ScanErrorKind::NotADirectory,
            Some(path.to_path_buf()),
            format!("{} does not exist", path.display()),
        )
    }

    /// Create an error for a scan root that is not a directory
    pub fn not_a_directory(path: &Path) -> Self {
        Self::new(
            ScanErrorKind::NotADirectory,
            Some(path.to_path_buf()),
            format!("{} is not a directory", path.display()),
        )
    }

    /// Create an I/O error attached to a path, keeping the permission and
    /// not-found distinctions of the underlying error
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        let mut error = Self::from(err);
        error.path = Some(path.to_path_buf());
        error
    }

    /// Create an EXIF parse error
    pub fn exif_unreadable(path: &Path, message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::ExifUnreadable, Some(path.to_path_buf()), message)
    }

    /// Create a database error
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::DatabaseError, None, message)
    }

    /// Create a date parse error
    pub fn invalid_date(input: &str, message: impl Into<String>) -> Self {
        Self::new(
            ScanErrorKind::InvalidDate,
            None,
            format!("invalid date {:?}: {}", input, message.into()),
        )
    }

    /// Whether this error rejected the scan root as a whole
    pub fn is_invalid_root(&self) -> bool {
        self.kind == ScanErrorKind::NotADirectory
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ScanErrorKind::NotFound,
            _ => ScanErrorKind::IoError,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<walkdir::Error> for ScanError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf());
        let kind = match err.io_error().map(|e| e.kind()) {
            Some(std::io::ErrorKind::PermissionDenied) => ScanErrorKind::PermissionDenied,
            Some(std::io::ErrorKind::NotFound) => ScanErrorKind::NotFound,
            _ => ScanErrorKind::IoError,
        };
        Self::new(kind, path, err.to_string())
    }
}

impl From<rusqlite::Error> for ScanError {
    fn from(err: rusqlite::Error) -> Self {
        Self::database_error(err.to_string())
    }
}
