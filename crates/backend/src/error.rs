use offload_protocol::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Error, Debug)]
pub enum BackendError {
    /// No model is loaded, or the requested model is not among the loaded
    /// ones.
    #[error("no usable model: {reason}")]
    Unavailable { reason: String },

    /// The server could not be reached at all.
    #[error("cannot reach model backend at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// The server answered with a non-success status.
    #[error("model backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response stream broke or produced unparseable data.
    #[error("model response stream failed: {reason}")]
    Stream { reason: String },

    /// A model call exceeded its deadline.
    #[error("model call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

impl BackendError {
    /// Taxonomy code for the result envelope.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable { .. } => ErrorCode::ModelUnavailable,
            Self::Timeout { .. } => ErrorCode::ModelTimeout,
            Self::Connection { .. } | Self::Http { .. } | Self::Stream { .. } => {
                ErrorCode::ModelCallError
            }
        }
    }
}
