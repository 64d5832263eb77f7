use serde_json::{Map, Value, json};

use crate::providers::{ChatRequest, JsonArrayField, Role, honored_messages, stop_sequences};

use super::utils::{convert_tool_choice, convert_tools};

// The messages API rejects requests without max_tokens
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub fn build_body(req: &ChatRequest) -> Value {
    let opts = &req.options;
    let (system, rest) = honored_messages(&req.messages);

    let messages: Vec<Value> = rest
        .into_iter()
        .map(|m| {
            let role = if m.role == Role::Assistant { "assistant" } else { "user" };
            json!({ "role": role, "content": m.content })
        })
        .collect();

    let mut body = Map::new();
    body.insert("model".into(), json!(req.model));
    body.insert("messages".into(), Value::Array(messages));
    body.insert("max_tokens".into(), json!(opts.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)));

    if let Some(system) = system.filter(|s| !s.content.is_empty()) {
        body.insert("system".into(), json!(system.content));
    }
    if let Some(t) = opts.temperature {
        body.insert("temperature".into(), json!(t));
    }
    if let Some(p) = opts.top_p {
        body.insert("top_p".into(), json!(p));
    }
    if let Some(stop) = stop_sequences(opts.stop.as_deref()) {
        body.insert("stop_sequences".into(), json!(stop));
    }

    if let Some(tools) = JsonArrayField::parse("tools", opts.tools.as_deref()).into_items() {
        let tools = convert_tools(tools);
        if !tools.is_empty() {
            body.insert("tools".into(), Value::Array(tools));
            if let Some(choice) = convert_tool_choice(opts.tool_choice.as_deref(), opts.parallel_tool_calls) {
                body.insert("tool_choice".into(), choice);
            }
        }
    }

    Value::Object(body)
}
