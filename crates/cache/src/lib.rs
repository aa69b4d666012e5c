//! # Offload Cache
//!
//! Process-wide TTL cache for analysis results.
//!
//! Keys are a deterministic hash of (task name, canonicalized parameters,
//! sorted file list): equivalent requests hit the same entry regardless of
//! input ordering or volatile fields. Entries expire lazily on read.
//!
//! This is an advisory performance cache, not a source of truth: concurrent
//! writers race with last-write-wins semantics, and nothing persists across
//! restarts. Construct an [`AnalysisCache`] per process (or per test) and
//! share it behind an `Arc` — there is deliberately no global instance.

mod key;
mod store;

pub use key::CacheKey;
pub use store::{AnalysisCache, CacheMetadata, CacheStats, CachedAnalysis, DEFAULT_TTL};
