//! # Offload Engine
//!
//! The orchestration core that ties the substrate together: path
//! confinement in front, model backend behind, and the uniform result
//! envelope on every exit.
//!
//! ## Pipeline
//!
//! ```text
//! path ──> AllowedRoots::validate ──> ValidatedPath
//!              │                          │
//!              │          (project)       ├──> discover (bounded walk)
//!              │                          │        └─> files, in walk order
//!              │                          │
//!              │                          ├──> BatchAnalyzer (bounded
//!              │                          │    concurrency, input-order
//!              │                          │    outcomes, per-unit cache)
//!              │                          │
//!              │                          └──> TaskRunner::analyze_unit
//!              │                                   ├─ read + size/type gate
//!              │                                   ├─ TaskPlugin::stages
//!              │                                   ├─ plan_conversation
//!              │                                   ├─ backend call (timeout)
//!              │                                   └─ assemble
//!              │
//!              └─ rejection ────────────────────> ResultEnvelope {error}
//! ```
//!
//! Cancellation is cooperative: a [`CancelHandle`] stops further dispatch,
//! already-running units finish and are cached.

mod batch;
mod cancel;
mod discovery;
mod error;
mod runner;

pub use batch::{
    BatchAnalyzer, BatchOutcome, BatchReport, UnitAnalysis, UnitError, DEFAULT_CONCURRENCY,
};
pub use cancel::{cancel_pair, CancelFlag, CancelHandle};
pub use discovery::{
    discover, DiscoveredFiles, DiscoveryOptions, DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE,
};
pub use error::{EngineError, Result};
pub use runner::{RunnerConfig, TaskPlugin, TaskRunner};
