//! Human-readable rendering of error bodies returned by chat backends.

use serde_json::Value;

/// One-line summary of an error payload: `error.message`, a bare `error`
/// string, then `detail` or `message` at the top level. Whitespace runs are
/// collapsed.
pub(crate) fn extract_error_summary(value: &Value) -> Option<String> {
    let error = value.get("error");
    let text = error
        .and_then(|error| match error {
            Value::String(text) => Some(text.as_str()),
            Value::Object(fields) => fields.get("message").and_then(Value::as_str),
            _ => None,
        })
        .or_else(|| ["detail", "message"].iter().find_map(|key| value.get(*key)?.as_str()))?;

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Render a failed response body as a summary line plus a fenced block.
pub fn format_api_error(error_text: &str) -> String {
    let body = error_text.trim();
    if body.is_empty() {
        return fenced(None, "", "<empty>");
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return fenced(extract_error_summary(&value).as_deref(), "json", &pretty);
        }
    }

    let language = if body.starts_with('<') && body.ends_with('>') {
        "xml"
    } else {
        ""
    };
    fenced(None, language, body)
}

fn fenced(summary: Option<&str>, language: &str, body: &str) -> String {
    let heading = match summary {
        Some(summary) => format!("API Error: {summary}"),
        None => "API Error:".to_string(),
    };
    format!("{heading}\n```{language}\n{body}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_bodies_are_pretty_printed_under_their_summary() {
        let raw = r#"{"error":{"message":"model overloaded","type":"invalid_request_error"}}"#;

        let expected = r#"API Error: model overloaded
```json
{
  "error": {
    "message": "model overloaded",
    "type": "invalid_request_error"
  }
}
```"#;
        assert_eq!(format_api_error(raw), expected);
    }

    #[test]
    fn detail_field_serves_as_summary() {
        let formatted = format_api_error(r#"{"detail":"apiKey and modelId are required"}"#);
        assert!(formatted.starts_with("API Error: apiKey and modelId are required\n```json"));
    }

    #[test]
    fn json_without_summary_keeps_bare_heading() {
        let expected = "API Error:\n```json\n{\n  \"status\": \"failed\"\n}\n```";
        assert_eq!(format_api_error(r#"{"status":"failed"}"#), expected);
    }

    #[test]
    fn markup_plain_and_empty_bodies() {
        assert_eq!(
            format_api_error("<error>bad</error>"),
            "API Error:\n```xml\n<error>bad</error>\n```"
        );
        assert_eq!(
            format_api_error("api failure"),
            "API Error:\n```\napi failure\n```"
        );
        assert_eq!(format_api_error("  "), "API Error:\n```\n<empty>\n```");
    }

    #[test]
    fn summary_prefers_nested_message_and_collapses_whitespace() {
        let value = json!({"error": {"message": "rate\n  limited"}, "detail": "ignored"});
        assert_eq!(extract_error_summary(&value).as_deref(), Some("rate limited"));
        assert_eq!(
            extract_error_summary(&json!({"error": "plain"})).as_deref(),
            Some("plain")
        );
        assert_eq!(extract_error_summary(&json!({"error": {"code": 500}})), None);
    }
}
