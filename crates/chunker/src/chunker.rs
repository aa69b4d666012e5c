use crate::config::ChunkerConfig;
use crate::conversation::{ConversationPlan, Message};
use crate::error::{ChunkerError, Result};
use crate::estimator::estimate_tokens;
use crate::plan::{chunk_payload, ChunkPlan};
use offload_protocol::PromptStages;

/// Decides whether a three-part prompt fits a model's context window and,
/// when it does not, produces a lossless chunk plan and the multi-turn
/// conversation that delivers it.
#[derive(Debug, Clone)]
pub struct ContextWindowChunker {
    config: ChunkerConfig,
}

impl Default for ContextWindowChunker {
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}

impl ContextWindowChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// True iff the whole prompt plus the response reserve overflows the
    /// window.
    pub fn needs_chunking(&self, stages: &PromptStages, context_window: usize) -> bool {
        let total = estimate_tokens(stages.system_and_context())
            + estimate_tokens(stages.data_payload())
            + estimate_tokens(stages.output_instructions())
            + self.config.response_reserve_tokens;
        total > context_window
    }

    /// Tokens available for one data chunk after the fixed segments, the
    /// response reserve, and the safety margin are paid for.
    pub fn optimal_chunk_size(&self, stages: &PromptStages, context_window: usize) -> Result<usize> {
        let overhead = estimate_tokens(stages.system_and_context())
            + estimate_tokens(stages.output_instructions())
            + self.config.response_reserve_tokens
            + self.config.safety_margin_tokens;

        if overhead >= context_window {
            return Err(ChunkerError::ChunkingImpossible {
                overhead_tokens: overhead,
                context_window,
            });
        }
        Ok(context_window - overhead)
    }

    /// Split the data payload against a token budget. Lossless; see
    /// [`chunk_payload`](crate::plan) for the splitting rules.
    pub fn chunk_payload(&self, payload: &str, budget_tokens: usize) -> Result<ChunkPlan> {
        chunk_payload(payload, budget_tokens)
    }

    /// Build the multi-turn conversation for a chunked payload.
    ///
    /// The system message restates the plugin's context and announces the
    /// chunk count; each chunk travels in its own labeled message; the final
    /// message carries the original output instructions and asks the model
    /// to synthesize across everything it has seen.
    pub fn chunked_conversation(
        &self,
        stages: &PromptStages,
        plan: &ChunkPlan,
    ) -> ConversationPlan {
        let total = plan.total();
        let system = Message::system(format!(
            "{}\n\nThe data payload is too large for a single message and has been \
             split into {total} chunks. Each chunk arrives in its own message, \
             labeled with its position. Read all chunks before answering.",
            stages.system_and_context()
        ));

        let data = plan
            .chunks()
            .iter()
            .enumerate()
            .map(|(i, chunk)| Message::user(format!("[Chunk {} of {total}]\n{chunk}", i + 1)))
            .collect();

        let analysis = Message::user(format!(
            "All {total} chunks have been delivered. Considering the complete \
             payload across every chunk:\n\n{}",
            stages.output_instructions()
        ));

        ConversationPlan::new(system, data, analysis)
    }

    /// Single-turn fast path for prompts that fit the window whole.
    pub fn single_conversation(&self, stages: &PromptStages) -> ConversationPlan {
        ConversationPlan::new(
            Message::system(stages.system_and_context().to_string()),
            vec![Message::user(stages.data_payload().to_string())],
            Message::user(stages.output_instructions().to_string()),
        )
    }

    /// Full decision: fit the prompt into `context_window`, chunking only
    /// when needed.
    pub fn plan_conversation(
        &self,
        stages: &PromptStages,
        context_window: usize,
    ) -> Result<ConversationPlan> {
        if !self.needs_chunking(stages, context_window) {
            return Ok(self.single_conversation(stages));
        }

        let budget = self.optimal_chunk_size(stages, context_window)?;
        let plan = self.chunk_payload(stages.data_payload(), budget)?;
        log::debug!(
            "payload of ~{} tokens split into {} chunks of <= {budget} tokens",
            estimate_tokens(stages.data_payload()),
            plan.total()
        );
        Ok(self.chunked_conversation(stages, &plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use pretty_assertions::assert_eq;

    fn chunker() -> ContextWindowChunker {
        ContextWindowChunker::new(ChunkerConfig {
            response_reserve_tokens: 10,
            safety_margin_tokens: 5,
            fallback_context_window: 23_000,
        })
        .unwrap()
    }

    fn stages(payload: &str) -> PromptStages {
        PromptStages::new(
            "You analyze source code.",
            payload,
            "Summarize the findings as JSON.",
        )
    }

    #[test]
    fn small_prompts_do_not_need_chunking() {
        let c = chunker();
        assert!(!c.needs_chunking(&stages("tiny"), 1000));
    }

    #[test]
    fn large_payload_triggers_chunking() {
        let c = chunker();
        let big = "x".repeat(8000); // ~2000 tokens
        assert!(c.needs_chunking(&stages(&big), 100));
    }

    #[test]
    fn optimal_size_subtracts_fixed_overhead() {
        let c = chunker();
        let s = stages("ignored");
        // system ~6 tokens, instructions ~8 tokens, reserve 10, margin 5
        let overhead = estimate_tokens(s.system_and_context())
            + estimate_tokens(s.output_instructions())
            + 10
            + 5;
        assert_eq!(c.optimal_chunk_size(&s, 1000).unwrap(), 1000 - overhead);
    }

    #[test]
    fn impossible_window_is_an_error() {
        let c = chunker();
        let err = c.optimal_chunk_size(&stages("data"), 10).unwrap_err();
        assert!(matches!(err, ChunkerError::ChunkingImpossible { .. }));
    }

    #[test]
    fn chunked_conversation_labels_match_plan_order() {
        let c = chunker();
        let s = stages(&"line\n".repeat(200));
        let plan = c.chunk_payload(s.data_payload(), 20).unwrap();
        let conversation = c.chunked_conversation(&s, &plan);

        assert_eq!(conversation.data_messages().len(), plan.total());
        assert_eq!(conversation.system_message().role, Role::System);
        assert!(conversation
            .system_message()
            .content
            .contains(&format!("{} chunks", plan.total())));

        for (i, message) in conversation.data_messages().iter().enumerate() {
            assert_eq!(message.role, Role::User);
            assert!(message
                .content
                .starts_with(&format!("[Chunk {} of {}]", i + 1, plan.total())));
        }

        assert!(conversation
            .analysis_message()
            .content
            .contains("Summarize the findings as JSON."));
    }

    #[test]
    fn plan_conversation_uses_single_turn_when_it_fits() {
        let c = chunker();
        let s = stages("small payload");
        let conversation = c.plan_conversation(&s, 1000).unwrap();
        assert_eq!(conversation.data_messages().len(), 1);
        assert_eq!(conversation.data_messages()[0].content, "small payload");
        assert_eq!(conversation.system_message().content, s.system_and_context());
    }

    #[test]
    fn into_messages_preserves_order() {
        let c = chunker();
        let s = stages(&"data line\n".repeat(100));
        let conversation = c.plan_conversation(&s, 60).unwrap();
        let n = conversation.data_messages().len();
        assert!(n > 1);

        let messages = conversation.into_messages();
        assert_eq!(messages.len(), n + 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.starts_with("[Chunk 1 of"));
        assert!(messages[n].content.starts_with(&format!("[Chunk {n} of")));
    }
}
