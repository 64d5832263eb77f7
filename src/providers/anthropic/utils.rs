use serde_json::{Map, Value, json};

/// OpenAI `{type: function, function: {...}}` tools -> Anthropic `{name, description, input_schema}`.
/// Tools already in Anthropic shape pass through; anything else is dropped.
pub fn convert_tools(tools: Vec<Value>) -> Vec<Value> {
    tools
        .into_iter()
        .filter_map(|tool| {
            if tool.get("input_schema").is_some() {
                return Some(tool);
            }
            let func = tool.get("function").and_then(Value::as_object);
            let Some(name) = func.and_then(|f| f.get("name")).and_then(Value::as_str) else {
                tracing::warn!("Dropping tool without a function name");
                return None;
            };
            let mut out = Map::new();
            out.insert("name".into(), json!(name));
            if let Some(desc) = func.and_then(|f| f.get("description")).filter(|d| !d.is_null()) {
                out.insert("description".into(), desc.clone());
            }
            let schema = func
                .and_then(|f| f.get("parameters"))
                .filter(|p| !p.is_null())
                .cloned()
                .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));
            out.insert("input_schema".into(), schema);
            Some(Value::Object(out))
        })
        .collect()
}

/// Maps the OpenAI-style `tool_choice` string (and parallel flag) onto Anthropic's object form.
pub fn convert_tool_choice(choice: Option<&str>, parallel_tool_calls: Option<bool>) -> Option<Value> {
    let disable_parallel = parallel_tool_calls == Some(false);
    let mut out = match choice.map(str::trim).filter(|c| !c.is_empty()) {
        None | Some("auto") => {
            if !disable_parallel {
                return None;
            }
            json!({ "type": "auto" })
        }
        Some("none") => return Some(json!({ "type": "none" })),
        Some("required") | Some("any") => json!({ "type": "any" }),
        Some(name) => json!({ "type": "tool", "name": name }),
    };
    if disable_parallel {
        out["disable_parallel_tool_use"] = json!(true);
    }
    Some(out)
}
