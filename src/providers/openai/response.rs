use serde_json::Value;

use crate::providers::{ApiEndpoint, NormalizedResult, usage_of};

/// Which field of a responses-endpoint payload supplied the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    FirstOutputBlock,
    OutputMessage,
    TopLevelContent,
    Missing,
}

fn text_of(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.is_empty())
}

// `content` may be a plain string or an array of typed parts
fn message_text(content: Option<&Value>) -> Option<String> {
    match content? {
        Value::String(s) => Some(s.clone()).filter(|s| !s.is_empty()),
        Value::Array(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|p| text_of(p.get("text")))
                .collect();
            Some(text).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}

pub fn responses_text(raw: &Value) -> (TextSource, String) {
    if let Some(text) = text_of(raw.pointer("/output/0/content/0/text")) {
        return (TextSource::FirstOutputBlock, text.to_string());
    }

    // reasoning items may precede the message item
    let from_message = raw
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("message"))
        .find_map(|item| message_text(item.get("content")));
    if let Some(text) = from_message {
        return (TextSource::OutputMessage, text);
    }

    if let Some(text) = text_of(raw.get("content")) {
        return (TextSource::TopLevelContent, text.to_string());
    }
    (TextSource::Missing, String::new())
}

fn responses_tool_calls(raw: &Value) -> Option<Vec<Value>> {
    let calls: Vec<Value> = raw
        .get("output")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("function_call"))
        .cloned()
        .collect();
    (!calls.is_empty()).then_some(calls)
}

fn responses_reasoning(raw: &Value) -> Option<String> {
    let parts: Vec<&str> = raw
        .get("output")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("reasoning"))
        .filter_map(|item| item.get("summary").and_then(Value::as_array))
        .flatten()
        .filter_map(|s| text_of(s.get("text")))
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n"))
}

pub fn normalize(endpoint: ApiEndpoint, raw: Value) -> NormalizedResult {
    match endpoint {
        ApiEndpoint::Completions => {
            let Some(message) = raw.pointer("/choices/0/message") else {
                return NormalizedResult::empty(raw);
            };
            let content = message_text(message.get("content")).unwrap_or_default();
            let tool_calls = message
                .get("tool_calls")
                .and_then(Value::as_array)
                .filter(|calls| !calls.is_empty())
                .cloned();
            let reasoning = text_of(message.get("reasoning"))
                .or_else(|| text_of(message.get("reasoning_content")))
                .map(str::to_string);
            NormalizedResult {
                content,
                tool_calls,
                usage: usage_of(&raw),
                reasoning,
                raw,
            }
        }
        ApiEndpoint::Responses => {
            let (source, content) = responses_text(&raw);
            tracing::debug!("responses text source: {:?}", source);
            NormalizedResult {
                content,
                tool_calls: responses_tool_calls(&raw),
                usage: usage_of(&raw),
                reasoning: responses_reasoning(&raw),
                raw,
            }
        }
    }
}
