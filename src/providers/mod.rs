pub mod anthropic;
pub mod openai;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{VendorKeySlot, VendorRouted};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    Groq,
    OpenAI,
    Anthropic,
    #[serde(alias = "gemini")]
    Google,
    OpenRouter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    OpenAI,
    Anthropic,
}

/// Caller-chosen sub-path for OpenAI-shaped providers. Anthropic ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiEndpoint {
    #[default]
    Completions,
    Responses,
}

/// Per-provider routing, derived from the static table on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub segment: &'static str,
    pub wire_format: WireFormat,
    pub key_slot: VendorKeySlot,
}

impl ChatProvider {
    pub const ALL: [ChatProvider; 5] = [
        ChatProvider::Groq,
        ChatProvider::OpenAI,
        ChatProvider::Anthropic,
        ChatProvider::Google,
        ChatProvider::OpenRouter,
    ];

    pub fn endpoint(self) -> ProviderEndpoint {
        let (segment, wire_format, key_slot) = match self {
            ChatProvider::Groq => ("groq", WireFormat::OpenAI, VendorKeySlot::Groq),
            ChatProvider::OpenAI => ("openai", WireFormat::OpenAI, VendorKeySlot::OpenAI),
            ChatProvider::Anthropic => ("anthropic", WireFormat::Anthropic, VendorKeySlot::Anthropic),
            ChatProvider::Google => ("google", WireFormat::OpenAI, VendorKeySlot::Gemini),
            ChatProvider::OpenRouter => ("openrouter", WireFormat::OpenAI, VendorKeySlot::OpenRouter),
        };
        ProviderEndpoint {
            segment,
            wire_format,
            key_slot,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.endpoint().segment
    }
}

impl fmt::Display for ChatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VendorRouted for ChatProvider {
    fn key_slot(&self) -> VendorKeySlot {
        self.endpoint().key_slot
    }
}

impl ApiEndpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiEndpoint::Completions => "completions",
            ApiEndpoint::Responses => "responses",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonObject,
    JsonSchema,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasoningSettings {
    pub include_reasoning: Option<bool>,
    pub reasoning_effort: Option<String>,
    pub reasoning_format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSearchSettings {
    pub enable_citations: Option<bool>,
    pub include_domains: Option<String>,
    pub exclude_domains: Option<String>,
}

/// Sparse generation options. Free-text fields (`stop`, `tools`, `documents`,
/// `json_schema`) carry the raw text the user typed; translation decides what
/// survives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub seed: Option<i64>,
    pub stop: Option<String>,
    pub response_format: Option<ResponseFormat>,
    pub json_schema: Option<String>,
    pub reasoning: Option<ReasoningSettings>,
    pub web_search: Option<WebSearchSettings>,
    pub service_tier: Option<String>,
    pub documents: Option<String>,
    pub tools: Option<String>,
    pub tool_choice: Option<String>,
    pub parallel_tool_calls: Option<bool>,
    pub cohort_id: Option<String>,
    pub user_id: Option<String>,
    /// Seconds.
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub provider: ChatProvider,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: ChatOptions,
    pub endpoint: ApiEndpoint,
}

#[derive(Debug, Clone)]
pub struct TranslatedRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
    pub wire_format: WireFormat,
    pub endpoint: ApiEndpoint,
    pub timeout: Option<Duration>,
}

/// Result shape shared by both wire formats. `content` is never absent: when
/// no text-bearing field matches it is the empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub content: String,
    pub tool_calls: Option<Vec<Value>>,
    pub usage: Option<Value>,
    pub reasoning: Option<String>,
    pub raw: Value,
}

impl NormalizedResult {
    pub(crate) fn empty(raw: Value) -> Self {
        Self {
            content: String::new(),
            tool_calls: None,
            usage: usage_of(&raw),
            reasoning: None,
            raw,
        }
    }
}

pub(crate) fn usage_of(raw: &Value) -> Option<Value> {
    raw.get("usage").filter(|u| !u.is_null()).cloned()
}

/// Builds the provider-specific URL, headers and body for a unified request.
pub fn translate(base_url: &str, token: &str, req: &ChatRequest) -> TranslatedRequest {
    let route = req.provider.endpoint();
    let timeout = req.options.timeout.map(Duration::from_secs);
    match route.wire_format {
        WireFormat::Anthropic => TranslatedRequest {
            url: format!("{}/{}/v1/messages", base_url, route.segment),
            headers: vec![
                ("Authorization", format!("Bearer {}", token)),
                ("Content-Type", "application/json".to_string()),
                ("anthropic-version", anthropic::ANTHROPIC_VERSION.to_string()),
            ],
            body: anthropic::build_body(req),
            wire_format: WireFormat::Anthropic,
            endpoint: req.endpoint,
            timeout,
        },
        WireFormat::OpenAI => {
            let sub_path = match req.endpoint {
                ApiEndpoint::Completions => "chat/completions",
                ApiEndpoint::Responses => "responses",
            };
            TranslatedRequest {
                url: format!("{}/{}/v1/{}", base_url, route.segment, sub_path),
                headers: vec![
                    ("Authorization", format!("Bearer {}", token)),
                    ("Content-Type", "application/json".to_string()),
                ],
                body: openai::build_body(req),
                wire_format: WireFormat::OpenAI,
                endpoint: req.endpoint,
                timeout,
            }
        }
    }
}

pub fn normalize(wire_format: WireFormat, endpoint: ApiEndpoint, raw: Value) -> NormalizedResult {
    match wire_format {
        WireFormat::Anthropic => anthropic::normalize(raw),
        WireFormat::OpenAI => openai::normalize(endpoint, raw),
    }
}

pub fn models_url(base_url: &str, provider: ChatProvider) -> String {
    format!("{}/{}/v1/models", base_url, provider.endpoint().segment)
}

/// The first system message is the only one honored; later ones are dropped.
pub(crate) fn honored_messages(messages: &[ChatMessage]) -> (Option<&ChatMessage>, Vec<&ChatMessage>) {
    let mut system = None;
    let mut rest = Vec::with_capacity(messages.len());
    for msg in messages {
        if msg.role == Role::System {
            if system.is_none() {
                system = Some(msg);
            }
        } else {
            rest.push(msg);
        }
    }
    (system, rest)
}

pub(crate) fn stop_sequences(stop: Option<&str>) -> Option<Vec<String>> {
    let seqs = crate::util::split_csv(stop?, Some(MAX_STOP_SEQUENCES));
    (!seqs.is_empty()).then_some(seqs)
}

pub const MAX_STOP_SEQUENCES: usize = 4;

/// Terminal states for a best-effort JSON array field (`tools`, `documents`).
#[derive(Debug, Clone, PartialEq)]
pub enum JsonArrayField {
    Parsed(Vec<Value>),
    Empty,
    Malformed,
}

impl JsonArrayField {
    pub fn parse(field: &str, text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|s| !s.is_empty()) else {
            return JsonArrayField::Empty;
        };
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) if !items.is_empty() => JsonArrayField::Parsed(items),
            Ok(Value::Array(_)) => JsonArrayField::Empty,
            Ok(_) | Err(_) => {
                tracing::warn!("Ignoring {}: value is not a JSON array", field);
                JsonArrayField::Malformed
            }
        }
    }

    pub fn into_items(self) -> Option<Vec<Value>> {
        match self {
            JsonArrayField::Parsed(items) => Some(items),
            JsonArrayField::Empty | JsonArrayField::Malformed => None,
        }
    }
}
