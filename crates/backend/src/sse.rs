//! SSE parsing for OpenAI-compatible streaming responses.
//!
//! Events are separated by blank lines; each carries one or more `data:`
//! lines. A `data: [DONE]` line terminates the stream.

use crate::error::{BackendError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseEvent {
    /// A text fragment to forward.
    Fragment(String),
    /// Keep-alive, comment, or a delta with no content.
    Empty,
    /// Terminal `[DONE]` marker or a finish reason.
    Done,
}

/// Accumulates raw bytes and yields complete SSE events.
#[derive(Debug, Default)]
pub(crate) struct SseBuffer {
    buffer: String,
}

impl SseBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
    }

    /// Pop the next complete event (everything before a blank line).
    pub(crate) fn next_event(&mut self) -> Option<String> {
        let end = self.buffer.find("\n\n")?;
        let event = self.buffer[..end].to_string();
        self.buffer.drain(..end + 2);
        Some(event)
    }

    /// Whatever is left when the connection closes mid-event.
    pub(crate) fn remainder(&mut self) -> Option<String> {
        let rest = self.buffer.trim().to_string();
        self.buffer.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Parse one SSE event into fragments-or-control.
pub(crate) fn parse_sse_event(event: &str) -> Result<SseEvent> {
    let mut data = String::new();
    for line in event.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.trim();
            if rest == "[DONE]" {
                return Ok(SseEvent::Done);
            }
            data.push_str(rest);
        }
        // Non-data lines (comments, event names) are ignored.
    }

    if data.is_empty() {
        return Ok(SseEvent::Empty);
    }

    let chunk: ChatChunk = serde_json::from_str(&data).map_err(|err| BackendError::Stream {
        reason: format!("unparseable SSE chunk: {err}"),
    })?;

    let Some(choice) = chunk.choices.first() else {
        return Ok(SseEvent::Empty);
    };

    if let Some(content) = choice.delta.content.as_ref().filter(|c| !c.is_empty()) {
        return Ok(SseEvent::Fragment(content.clone()));
    }

    if choice.finish_reason.is_some() {
        return Ok(SseEvent::Done);
    }

    Ok(SseEvent::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn buffer_splits_events_on_blank_lines() {
        let mut buffer = SseBuffer::default();
        buffer.push(b"data: one\n\ndata: tw");
        assert_eq!(buffer.next_event().unwrap(), "data: one");
        assert_eq!(buffer.next_event(), None);

        buffer.push(b"o\n\n");
        assert_eq!(buffer.next_event().unwrap(), "data: two");
    }

    #[test]
    fn fragment_events_carry_delta_content() {
        let event = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(
            parse_sse_event(event).unwrap(),
            SseEvent::Fragment("Hel".to_string())
        );
    }

    #[test]
    fn done_marker_terminates() {
        assert_eq!(parse_sse_event("data: [DONE]").unwrap(), SseEvent::Done);
    }

    #[test]
    fn finish_reason_terminates() {
        let event = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_event(event).unwrap(), SseEvent::Done);
    }

    #[test]
    fn keep_alives_are_empty() {
        assert_eq!(parse_sse_event(": ping").unwrap(), SseEvent::Empty);
        assert_eq!(
            parse_sse_event(r#"data: {"choices":[]}"#).unwrap(),
            SseEvent::Empty
        );
    }

    #[test]
    fn malformed_json_is_a_stream_error() {
        assert!(parse_sse_event("data: {not json").is_err());
    }

    #[test]
    fn remainder_returns_trailing_partial_event() {
        let mut buffer = SseBuffer::default();
        buffer.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}");
        assert_eq!(buffer.next_event(), None);
        let rest = buffer.remainder().unwrap();
        assert_eq!(
            parse_sse_event(&rest).unwrap(),
            SseEvent::Fragment("tail".to_string())
        );
    }
}
