use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkerError {
    /// Fixed prompt overhead leaves no room for data within the window.
    #[error(
        "chunking impossible: system + instructions + reserves ({overhead_tokens} tokens) \
         exceed the context window ({context_window} tokens)"
    )]
    ChunkingImpossible {
        overhead_tokens: usize,
        context_window: usize,
    },

    /// A chunk budget of zero tokens can hold nothing.
    #[error("chunk budget must be > 0 tokens")]
    ZeroBudget,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
