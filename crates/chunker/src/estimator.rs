/// Average characters per token assumed by the estimator.
pub const CHARS_PER_TOKEN: usize = 4;

/// Approximate the token count of a text.
///
/// This is a budgeting heuristic, not an accounting mechanism: one token is
/// assumed to cover [`CHARS_PER_TOKEN`] characters, rounded up. Real
/// tokenizers diverge in both directions (dense code tokenizes heavier,
/// prose lighter), which is why every consumer pairs this estimate with a
/// safety margin instead of trusting it exactly. It never calls the model
/// backend.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
