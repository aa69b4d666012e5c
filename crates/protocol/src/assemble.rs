//! Response assembly: raw model text → [`ResultEnvelope`].
//!
//! Models frequently wrap JSON answers in markdown fences, and just as
//! frequently answer in plain prose. Both are legitimate: a structured parse
//! failure here is a fallback path, not an error.

use crate::envelope::{ErrorCode, ErrorEnvelope, ResultEnvelope};

/// Normalize raw model output into the uniform result envelope.
///
/// Trims, strips a single leading/trailing fenced code block if present,
/// then attempts a JSON parse. Parsed values land under `data` directly;
/// prose is wrapped as `{"content": …, "format": "text"}`.
pub fn assemble(
    task_name: &str,
    raw_text: &str,
    model_used: &str,
    execution_time_ms: u64,
) -> ResultEnvelope {
    let stripped = strip_code_fence(raw_text.trim());

    let data = match serde_json::from_str::<serde_json::Value>(stripped) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::debug!("{task_name}: model output is not JSON ({err}), wrapping as text");
            serde_json::json!({
                "content": stripped,
                "format": "text",
                "task": task_name,
            })
        }
    };

    ResultEnvelope::success(data, model_used, execution_time_ms)
}

/// Build the failure-shaped envelope with a taxonomy code.
pub fn error_envelope(
    code: ErrorCode,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
    model_used: &str,
    execution_time_ms: u64,
) -> ResultEnvelope {
    ResultEnvelope::failure(
        ErrorEnvelope {
            code,
            message: message.into(),
            details,
        },
        model_used,
        execution_time_ms,
    )
}

/// Strip one outer fenced code block (language-tagged or generic).
///
/// Inner fences are left alone; only a fence that opens the first line and
/// closes the last line is removed.
pub fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the language tag (everything up to the first newline).
    let Some(newline) = body.find('\n') else {
        return text;
    };
    let tag = &body[..newline];
    if tag.chars().any(char::is_whitespace) {
        return text;
    }
    body[newline + 1..].trim_end_matches('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_tagged_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_generic_fence() {
        assert_eq!(strip_code_fence("```\nhello\n```"), "hello");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence("plain answer"), "plain answer");
    }

    #[test]
    fn leaves_unbalanced_fence_alone() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "```json\n{\"a\":1}");
    }

    #[test]
    fn assembles_fenced_json_as_structured_data() {
        let envelope = assemble("analyze", "```json\n{\"a\":1}\n```", "model-x", 42);
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap()["a"], 1);
        assert_eq!(envelope.model_used, "model-x");
        assert_eq!(envelope.execution_time_ms, 42);
    }

    #[test]
    fn prose_is_wrapped_not_rejected() {
        let envelope = assemble("explain", "The function sorts the input.", "model-x", 7);
        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["format"], "text");
        assert_eq!(data["content"], "The function sorts the input.");
    }

    #[test]
    fn error_envelope_carries_code_and_details() {
        let envelope = error_envelope(
            ErrorCode::FileNotFound,
            "no such file: /tmp/x.rs",
            Some(serde_json::json!({"path": "/tmp/x.rs"})),
            "",
            3,
        );
        assert!(!envelope.success);
        let error = envelope.error.unwrap();
        assert_eq!(error.code, ErrorCode::FileNotFound);
        assert_eq!(error.details.unwrap()["path"], "/tmp/x.rs");
    }
}
