use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort an upload run
#[derive(Error, Debug)]
pub enum UploadError {
    /// File or directory not found on local filesystem
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Permission denied accessing local file
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// Any other local IO failure
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed part way through
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Existence check failed for a reason other than not-found
    #[error("Failed to check '{key}': {message}")]
    Head { key: String, message: String },

    /// Object write failed
    #[error("Failed to upload '{key}': {message}")]
    Put { key: String, message: String },

    /// Single-file upload with no remote key left after normalization
    #[error("Remote path is empty; a single file needs an object key")]
    EmptyKey,

    /// The whole run exceeded its deadline
    #[error("Upload timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl UploadError {
    /// Create an error from an IO error with context
    pub fn from_io_error(error: std::io::Error, path: &Path) -> Self {
        let path = path.display().to_string();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io {
                path,
                source: error,
            },
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { path } => {
                format!(
                    "File not found: {}\n\nPossible solutions:\n  \
                     1. Check if the local path is correct\n  \
                     2. Verify the file exists: ls -la {}",
                    path, path
                )
            }
            Self::PermissionDenied { path } => {
                format!(
                    "Permission denied: {}\n\nPossible solutions:\n  \
                     1. Check file permissions: ls -l {}\n  \
                     2. Ensure you have read access to the file",
                    path, path
                )
            }
            Self::Put { key, message } if is_access_denied(message) => {
                format!(
                    "Access denied uploading '{}': {}\n\nPossible solutions:\n  \
                     1. Check CFR2_ACCESSKEY and CFR2_SECRETKEY\n  \
                     2. Verify the token has write access to CFR2_BUCKET\n  \
                     3. Check CFR2_ACCOUNT_ID (or CFR2_ENDPOINT) points at the right account",
                    key, message
                )
            }
            Self::Head { key, message } => {
                format!(
                    "Existence check failed for '{}': {}\n\nPossible solutions:\n  \
                     1. Re-run with --force to upload without checking\n  \
                     2. Re-run with --on-head-error=skip to treat failures as existing objects",
                    key, message
                )
            }
            Self::Timeout(_) => {
                format!(
                    "{}\n\nPossible solutions:\n  \
                     1. Re-run with --force=false to skip files that already made it\n  \
                     2. Raise the limit with --timeout-secs",
                    self
                )
            }
            _ => self.to_string(),
        }
    }
}

fn is_access_denied(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("access denied") || lower.contains("accessdenied") || lower.contains("forbidden")
}

/// Result type for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;
