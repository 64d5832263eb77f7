use serde_json::{Map, Value, json};

use crate::providers::{ChatRequest, JsonArrayField, ResponseFormat, Role, stop_sequences};
use crate::util::{non_empty, split_csv};

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// How a requested response format ends up on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormatChoice {
    Omit,
    JsonObject,
    JsonSchema(Value),
    /// Schema text did not parse; degrade to plain JSON mode.
    SchemaFallback,
}

impl ResponseFormatChoice {
    fn into_value(self) -> Option<Value> {
        match self {
            ResponseFormatChoice::Omit => None,
            ResponseFormatChoice::JsonObject | ResponseFormatChoice::SchemaFallback => {
                Some(json!({ "type": "json_object" }))
            }
            ResponseFormatChoice::JsonSchema(schema) => Some(json!({
                "type": "json_schema",
                "json_schema": { "name": "response", "schema": schema },
            })),
        }
    }
}

pub fn resolve_response_format(
    format: Option<ResponseFormat>,
    schema_text: Option<&str>,
) -> ResponseFormatChoice {
    match format {
        None | Some(ResponseFormat::Text) => ResponseFormatChoice::Omit,
        Some(ResponseFormat::JsonObject) => ResponseFormatChoice::JsonObject,
        Some(ResponseFormat::JsonSchema) => {
            let Some(text) = schema_text.filter(|s| !s.trim().is_empty()) else {
                return ResponseFormatChoice::Omit;
            };
            match serde_json::from_str::<Value>(text) {
                Ok(schema) => ResponseFormatChoice::JsonSchema(schema),
                Err(e) => {
                    tracing::warn!("json_schema did not parse ({}), falling back to json_object", e);
                    ResponseFormatChoice::SchemaFallback
                }
            }
        }
    }
}

pub fn build_body(req: &ChatRequest) -> Value {
    let opts = &req.options;

    let mut seen_system = false;
    let messages: Vec<Value> = req
        .messages
        .iter()
        .filter(|m| {
            if m.role != Role::System {
                return true;
            }
            !std::mem::replace(&mut seen_system, true)
        })
        .map(|m| json!({ "role": m.role, "content": m.content }))
        .collect();

    let mut body = Map::new();
    body.insert("model".into(), json!(req.model));
    body.insert("messages".into(), Value::Array(messages));
    body.insert("temperature".into(), json!(opts.temperature.unwrap_or(DEFAULT_TEMPERATURE)));
    body.insert("max_tokens".into(), json!(opts.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)));
    body.insert("top_p".into(), json!(opts.top_p.unwrap_or(1.0)));
    body.insert("frequency_penalty".into(), json!(opts.frequency_penalty.unwrap_or(0.0)));
    body.insert("presence_penalty".into(), json!(opts.presence_penalty.unwrap_or(0.0)));

    if let Some(cohort) = non_empty(&opts.cohort_id) {
        body.insert("cohort_id".into(), json!(cohort));
    }
    if let Some(user) = non_empty(&opts.user_id) {
        body.insert("user".into(), json!(user));
    }

    if let Some(format) = resolve_response_format(opts.response_format, opts.json_schema.as_deref()).into_value() {
        body.insert("response_format".into(), format);
    }

    if let Some(seed) = opts.seed {
        body.insert("seed".into(), json!(seed));
    }
    if let Some(stop) = stop_sequences(opts.stop.as_deref()) {
        body.insert("stop".into(), json!(stop));
    }

    // Groq reasoning models
    if let Some(reasoning) = &opts.reasoning {
        if let Some(include) = reasoning.include_reasoning {
            body.insert("include_reasoning".into(), json!(include));
        }
        if let Some(effort) = non_empty(&reasoning.reasoning_effort).filter(|e| *e != "default") {
            body.insert("reasoning_effort".into(), json!(effort));
        }
        if let Some(format) = non_empty(&reasoning.reasoning_format) {
            body.insert("reasoning_format".into(), json!(format));
        }
    }

    // Groq compound models: web search
    if let Some(search) = &opts.web_search {
        if let Some(citations) = search.enable_citations {
            let value = if citations { "enabled" } else { "disabled" };
            body.insert("citation_options".into(), json!(value));
        }
        let include = non_empty(&search.include_domains);
        let exclude = non_empty(&search.exclude_domains);
        if include.is_some() || exclude.is_some() {
            let mut settings = Map::new();
            if let Some(domains) = include {
                settings.insert("include_domains".into(), json!(split_csv(domains, None)));
            }
            if let Some(domains) = exclude {
                settings.insert("exclude_domains".into(), json!(split_csv(domains, None)));
            }
            body.insert("search_settings".into(), Value::Object(settings));
        }
    }

    if let Some(tier) = non_empty(&opts.service_tier).filter(|t| *t != "on_demand") {
        body.insert("service_tier".into(), json!(tier));
    }

    if let Some(docs) = JsonArrayField::parse("documents", opts.documents.as_deref()).into_items() {
        body.insert("documents".into(), Value::Array(docs));
    }

    // tool_choice / parallel_tool_calls only make sense next to a tool list
    if let Some(tools) = JsonArrayField::parse("tools", opts.tools.as_deref()).into_items() {
        body.insert("tools".into(), Value::Array(tools));
        if let Some(choice) = non_empty(&opts.tool_choice).filter(|c| *c != "auto") {
            body.insert("tool_choice".into(), json!(choice));
        }
        if opts.parallel_tool_calls == Some(false) {
            body.insert("parallel_tool_calls".into(), json!(false));
        }
    }

    Value::Object(body)
}
