use crate::error::{ChunkerError, Result};
use crate::estimator::CHARS_PER_TOKEN;
use serde::{Deserialize, Serialize};

/// Ordered data-payload fragments.
///
/// Invariant: concatenating the fragments in order reproduces the original
/// payload byte-for-byte. Nothing is ever dropped — an oversized indivisible
/// line is hard-split rather than truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPlan {
    chunks: Vec<String>,
    budget_tokens: usize,
}

impl ChunkPlan {
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn total(&self) -> usize {
        self.chunks.len()
    }

    pub fn budget_tokens(&self) -> usize {
        self.budget_tokens
    }

    /// Reassemble the original payload (the round-trip law).
    pub fn join(&self) -> String {
        self.chunks.concat()
    }
}

/// Split a payload so no fragment exceeds `budget_tokens`.
///
/// Splits on line boundaries (newlines stay attached to the line they end);
/// a single line larger than the whole budget is hard-split at a char
/// boundary. The split is lossless by construction.
pub fn chunk_payload(payload: &str, budget_tokens: usize) -> Result<ChunkPlan> {
    if budget_tokens == 0 {
        return Err(ChunkerError::ZeroBudget);
    }
    let budget_chars = budget_tokens.saturating_mul(CHARS_PER_TOKEN);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for line in payload.split_inclusive('\n') {
        let line_chars = line.chars().count();

        if current_chars + line_chars <= budget_chars {
            current.push_str(line);
            current_chars += line_chars;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if line_chars <= budget_chars {
            current.push_str(line);
            current_chars = line_chars;
        } else {
            log::debug!("hard-splitting a {line_chars}-char line across chunks");
            hard_split_into(line, budget_chars, &mut chunks);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    if chunks.is_empty() {
        // Empty payload still yields one (empty) fragment so downstream
        // conversation building has a data message to anchor on.
        chunks.push(String::new());
    }

    Ok(ChunkPlan {
        chunks,
        budget_tokens,
    })
}

fn hard_split_into(line: &str, budget_chars: usize, out: &mut Vec<String>) {
    let mut window = String::new();
    let mut window_chars = 0usize;
    for ch in line.chars() {
        window.push(ch);
        window_chars += 1;
        if window_chars == budget_chars {
            out.push(std::mem::take(&mut window));
            window_chars = 0;
        }
    }
    if !window.is_empty() {
        out.push(window);
    }
}
