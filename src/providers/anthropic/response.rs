use serde_json::Value;

use crate::providers::{NormalizedResult, usage_of};

fn blocks(raw: &Value) -> &[Value] {
    raw.get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn block_type(block: &Value) -> Option<&str> {
    block.get("type").and_then(Value::as_str)
}

pub fn extract_reasoning_content(raw: &Value) -> Option<String> {
    let mut reasoning = String::new();
    let mut has_redacted = false;
    for block in blocks(raw) {
        match block_type(block) {
            Some("thinking") => {
                if let Some(thinking) = block.get("thinking").and_then(Value::as_str) {
                    if !reasoning.is_empty() {
                        reasoning.push('\n');
                    }
                    reasoning.push_str(thinking);
                }
            }
            Some("redacted_thinking") => has_redacted = true,
            _ => {}
        }
    }

    if !reasoning.is_empty() {
        return Some(reasoning);
    }
    if has_redacted {
        return Some("[redacted_thinking]".to_string());
    }
    None
}

pub fn normalize(raw: Value) -> NormalizedResult {
    let content: String = blocks(&raw)
        .iter()
        .filter(|b| block_type(b) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();

    let tool_calls: Vec<Value> = blocks(&raw)
        .iter()
        .filter(|b| block_type(b) == Some("tool_use"))
        .cloned()
        .collect();

    NormalizedResult {
        content,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        usage: usage_of(&raw),
        reasoning: extract_reasoning_content(&raw),
        raw,
    }
}
