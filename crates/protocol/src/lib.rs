//! # Offload Protocol
//!
//! Shared boundary types for the offload orchestration substrate.
//!
//! Every public operation of the core returns a [`ResultEnvelope`]; callers
//! never see a raw error across this boundary. The envelope shape is the one
//! externally observable contract:
//!
//! ```text
//! {success, timestamp, modelUsed, executionTimeMs, data? , error?{code, message, details?}}
//! ```
//!
//! This crate also carries the prompt-stage model handed over by task
//! plugins, the tagged parameter representation used for cache keying and
//! validation, and the response assembler that normalizes raw model output
//! into an envelope.

mod assemble;
mod envelope;
mod params;
mod stages;

pub use assemble::{assemble, error_envelope, strip_code_fence};
pub use envelope::{unix_ms_now, ErrorCode, ErrorEnvelope, ResultEnvelope};
pub use params::{
    canonical_params, ParamKind, ParamTypeError, ParamValue, TaskParams, VOLATILE_PARAM_KEYS,
};
pub use stages::PromptStages;
