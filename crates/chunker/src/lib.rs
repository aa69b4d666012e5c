//! # Offload Chunker
//!
//! Token-budget-aware splitting of three-part prompts.
//!
//! ## Pipeline
//!
//! ```text
//! PromptStages {system, payload, instructions}
//!     │
//!     ├──> needs_chunking?  (estimate + response reserve vs window)
//!     │       │
//!     │       ├─ no ──> single-turn ConversationPlan
//!     │       │
//!     │       └─ yes ─> optimal_chunk_size
//!     │                     │
//!     │                     ├──> chunk_payload (lossless, line boundaries)
//!     │                     │        └─> ChunkPlan
//!     │                     └──> chunked_conversation
//!     │                              └─> ConversationPlan (system,
//!     │                                  one message per chunk, analysis)
//! ```
//!
//! Token counts everywhere in this crate are the [`estimate_tokens`]
//! approximation, never a tokenizer-accurate figure.

mod chunker;
mod config;
mod conversation;
mod error;
mod estimator;
mod plan;

pub use chunker::ContextWindowChunker;
pub use config::ChunkerConfig;
pub use conversation::{ConversationPlan, Message, Role};
pub use error::{ChunkerError, Result};
pub use estimator::{estimate_tokens, CHARS_PER_TOKEN};
pub use plan::ChunkPlan;
