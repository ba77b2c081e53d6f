use serde_json::Value;
use tracing::debug;

use crate::api::error::extract_error_summary;

pub const DATA_PREFIX: &str = "data: ";
pub const DEFAULT_TOOL_NAME: &str = "web_search";

const TOOL_CALL_START: &str = "tool_call_start";
const TOOL_CALL_RESPONSE: &str = "tool_call_response";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ContentDelta(String),
    ToolCallStart { tool_name: String, arguments: Value },
    ToolCallResponse { tool_name: String, response: Value },
    /// Frame that could not be classified. Never fatal.
    Malformed { raw: String, reason: String },
    /// Emitted by the session when the byte source is exhausted.
    StreamEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    /// The only tool whose call/response frames are surfaced as tool events.
    pub tool_name: String,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_TOOL_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventDecoder {
    options: DecoderOptions,
}

impl EventDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    /// Classify one line. Returns `None` for lines that carry no event:
    /// comments, keepalives, other SSE fields and the `[DONE]` sentinel.
    pub fn decode(&self, line: &str) -> Option<StreamEvent> {
        let payload = line.strip_prefix(DATA_PREFIX)?;
        let trimmed = payload.trim();
        if trimmed.is_empty() || trimmed == DONE_SENTINEL {
            return None;
        }

        let value = match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => value,
            Err(err) => {
                return Some(StreamEvent::Malformed {
                    raw: payload.to_string(),
                    reason: format!("invalid JSON: {err}"),
                })
            }
        };

        Some(self.classify(value, payload))
    }

    fn classify(&self, value: Value, raw: &str) -> StreamEvent {
        let kind = value.get("type").and_then(Value::as_str);
        let tool_name = value.get("tool_name").and_then(Value::as_str);

        match (kind, tool_name) {
            (Some(TOOL_CALL_START), Some(name)) if name == self.options.tool_name => {
                return StreamEvent::ToolCallStart {
                    tool_name: name.to_string(),
                    arguments: field_or_null(&value, "arguments"),
                };
            }
            (Some(TOOL_CALL_RESPONSE), Some(name)) if name == self.options.tool_name => {
                return StreamEvent::ToolCallResponse {
                    tool_name: name.to_string(),
                    response: field_or_null(&value, "response"),
                };
            }
            (Some(TOOL_CALL_START | TOOL_CALL_RESPONSE), name) => {
                debug!(tool = ?name, "ignoring tool frame for unrecognized tool");
            }
            _ => {}
        }

        if let Some(content) = value.get("content").and_then(content_text) {
            return StreamEvent::ContentDelta(content);
        }

        if let Some(content) = value
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
        {
            return StreamEvent::ContentDelta(content.to_string());
        }

        let reason = match extract_error_summary(&value) {
            Some(summary) if value.get("error").is_some() => format!("backend error: {summary}"),
            _ => "no recognized event fields".to_string(),
        };
        StreamEvent::Malformed {
            raw: raw.to_string(),
            reason,
        }
    }
}

fn field_or_null(value: &Value, field: &str) -> Value {
    value.get(field).cloned().unwrap_or(Value::Null)
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
