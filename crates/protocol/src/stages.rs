use serde::{Deserialize, Serialize};

/// The three-part prompt supplied by a task plugin.
///
/// The core never interprets prompt semantics; it only needs the three
/// segments separately so the chunker can split the data payload while
/// keeping the fixed segments intact. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptStages {
    system_and_context: String,
    data_payload: String,
    output_instructions: String,
}

impl PromptStages {
    pub fn new(
        system_and_context: impl Into<String>,
        data_payload: impl Into<String>,
        output_instructions: impl Into<String>,
    ) -> Self {
        Self {
            system_and_context: system_and_context.into(),
            data_payload: data_payload.into(),
            output_instructions: output_instructions.into(),
        }
    }

    pub fn system_and_context(&self) -> &str {
        &self.system_and_context
    }

    pub fn data_payload(&self) -> &str {
        &self.data_payload
    }

    pub fn output_instructions(&self) -> &str {
        &self.output_instructions
    }
}
