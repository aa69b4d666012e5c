use serde::{Deserialize, Serialize};

/// Window assumed when the server does not report one. Local servers often
/// omit it from `/v1/models`; this is a conservative figure for the model
/// sizes typically loaded there.
pub const DEFAULT_CONTEXT_LENGTH: usize = 23_000;

/// A model the backend currently has loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub id: String,
    /// Context window in tokens, when the server reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_length: Option<usize>,
}

/// Sampling and sizing options for one chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RespondOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}
