use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Budgeting knobs for the context-window chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Tokens held back for the model's response.
    pub response_reserve_tokens: usize,

    /// Extra slack on top of the reserve, absorbing estimator error.
    pub safety_margin_tokens: usize,

    /// Window assumed when the backend cannot report one.
    pub fallback_context_window: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            response_reserve_tokens: 2048,
            safety_margin_tokens: 512,
            fallback_context_window: 23_000,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fallback_context_window == 0 {
            return Err(ChunkerError::InvalidConfig(
                "fallback_context_window must be > 0".to_string(),
            ));
        }
        if self.response_reserve_tokens == 0 {
            return Err(ChunkerError::InvalidConfig(
                "response_reserve_tokens must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
