//! # Offload Backend
//!
//! The model backend as the core sees it: an opaque capability that can
//! list loaded models, report a context length, and stream a chat
//! completion. Everything else about inference is someone else's problem.
//!
//! [`HttpBackend`] talks to any OpenAI-compatible local server (LM Studio,
//! Ollama, llama.cpp) over `/v1/models` and `/v1/chat/completions` with
//! SSE streaming. Fragments flow through a bounded channel
//! ([`TokenStream`]), so a slow consumer backpressures the HTTP read
//! instead of buffering the whole response.

mod client;
mod error;
mod sse;
mod stream;
mod types;

pub use client::{HttpBackend, HttpBackendConfig};
pub use error::{BackendError, Result};
pub use stream::{token_channel, TokenSender, TokenStream, TOKEN_CHANNEL_CAPACITY};
pub use types::{ModelHandle, RespondOptions, DEFAULT_CONTEXT_LENGTH};

use async_trait::async_trait;
use offload_chunker::Message;

/// The capability surface the orchestration core consumes.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Models currently loaded and able to serve requests.
    async fn list_loaded_models(&self) -> Result<Vec<ModelHandle>>;

    /// Context window of a model, in tokens. Implementations fall back to
    /// [`DEFAULT_CONTEXT_LENGTH`] when the server does not report one.
    async fn context_length(&self, model: &str) -> Result<usize>;

    /// Stream a chat completion. The returned stream yields text fragments
    /// until the model finishes or errors.
    async fn respond(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: RespondOptions,
    ) -> Result<TokenStream>;
}
