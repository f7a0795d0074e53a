use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single relay operation. None of them are fatal to the relay itself,
/// they are reported to the offending connection only.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("access denied")]
    AccessDenied,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("room '{0}' is read-only")]
    ReadOnlyRoom(String),

    #[error("attempted path traversal: '{segment}' under '{}'", .root.display())]
    PathTraversal { root: PathBuf, segment: String },

    #[error("upload failed: {0}")]
    Upload(String),
}

pub type RelayResult<T> = Result<T, RelayError>;
