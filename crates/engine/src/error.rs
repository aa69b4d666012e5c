use offload_backend::BackendError;
use offload_chunker::ChunkerError;
use offload_protocol::ErrorCode;
use offload_security::PathSecurityError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Security(#[from] PathSecurityError),

    #[error(transparent)]
    Chunking(#[from] ChunkerError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("file too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("not a text file: {0}")]
    NotText(PathBuf),

    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Taxonomy code for the result envelope. Unreadable files share the
    /// not-found code: the taxonomy has no finer bucket and callers treat
    /// both the same way.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Security(err) => err.code(),
            Self::Chunking(_) => ErrorCode::ChunkingImpossible,
            Self::Backend(err) => err.code(),
            Self::FileNotFound(_) | Self::Unreadable { .. } => ErrorCode::FileNotFound,
            Self::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            Self::NotText(_) => ErrorCode::UnsupportedFileType,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }
}
