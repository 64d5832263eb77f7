use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Node, NodeContext, OutputItem, non_empty, parse_params};
use crate::error::{AdapterError, Result};
use crate::http_client::{client_with_timeout, json_body, send};
use crate::providers::{
    self, ApiEndpoint, ChatMessage, ChatOptions, ChatProvider, ChatRequest, NormalizedResult, Role,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatParams {
    pub provider: ChatProvider,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub user_message: String,
    #[serde(default)]
    pub api_endpoint: ApiEndpoint,
    #[serde(default)]
    pub options: ChatOptions,
}

impl ChatParams {
    pub fn into_request(self, ctx: &NodeContext<'_>) -> Result<ChatRequest> {
        let model = match non_empty(&self.model) {
            Some(m) => m.to_string(),
            None => ctx.catalog.default_chat_model(self.provider).ok_or_else(|| {
                AdapterError::Config(format!("No model given and no default model for {}", self.provider))
            })?,
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = non_empty(&self.system_prompt) {
            messages.push(ChatMessage::new(Role::System, system));
        }
        messages.push(ChatMessage::new(Role::User, self.user_message));

        let mut options = self.options;
        options.timeout.get_or_insert(ctx.settings.http.generation_timeout_secs);

        Ok(ChatRequest {
            provider: self.provider,
            model,
            messages,
            options,
            endpoint: self.api_endpoint,
        })
    }
}

/// Translate, send and normalize one chat request.
pub async fn complete(ctx: &NodeContext<'_>, req: &ChatRequest) -> Result<NormalizedResult> {
    let base_url = ctx.base_url()?;
    let token = ctx.credential().token_for(&req.provider);
    let translated = providers::translate(&base_url, &token, req);
    ctx.log_call("Chat API", &translated.url, &token);
    tracing::debug!("Chat API body: {}", translated.body);

    let client = client_with_timeout(translated.timeout)?;
    let mut builder = client.post(&translated.url);
    for (name, value) in &translated.headers {
        builder = builder.header(*name, value);
    }
    let resp = send("Chat API", &translated.url, builder.json(&translated.body)).await?;
    let raw = json_body(resp).await?;
    Ok(providers::normalize(translated.wire_format, translated.endpoint, raw))
}

pub fn output_record(req: &ChatRequest, result: NormalizedResult) -> Value {
    json!({
        "content": result.content,
        "tool_calls": result.tool_calls,
        "reasoning": result.reasoning,
        "model": req.model,
        "provider": req.provider,
        "api_endpoint": req.endpoint.as_str(),
        "usage": result.usage,
        "full_response": result.raw,
    })
}

pub struct ChatNode;

#[async_trait]
impl Node for ChatNode {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn execute(&self, ctx: &NodeContext<'_>, params: Value) -> Result<Vec<OutputItem>> {
        let req = parse_params::<ChatParams>(params)?.into_request(ctx)?;
        let result = complete(ctx, &req).await?;
        Ok(vec![OutputItem::json(output_record(&req, result))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support;

    #[test]
    fn params_fill_defaults_from_catalog_and_settings() {
        let s = test_support::settings("https://api.demeterics.com");
        let c = test_support::catalog();
        let ctx = NodeContext::new(&s, &c);
        let params: ChatParams = serde_json::from_value(json!({
            "provider": "gemini",
            "system_prompt": "  ",
            "user_message": "hello"
        }))
        .unwrap();
        let req = params.into_request(&ctx).unwrap();
        assert_eq!(req.provider, ChatProvider::Google);
        assert_eq!(req.model, "gemini-2.5-flash");
        assert_eq!(req.messages, vec![ChatMessage::new(Role::User, "hello")]);
        assert_eq!(req.options.timeout, Some(60));
        assert_eq!(req.endpoint, ApiEndpoint::Completions);
    }

    #[test]
    fn system_prompt_leads_messages() {
        let s = test_support::settings("https://api.demeterics.com");
        let c = test_support::catalog();
        let ctx = NodeContext::new(&s, &c);
        let params: ChatParams = serde_json::from_value(json!({
            "provider": "anthropic",
            "model": "claude-sonnet-4-5",
            "system_prompt": "Be brief.",
            "user_message": "hi",
            "api_endpoint": "responses",
            "options": {"timeout": 5, "temperature": 0.1}
        }))
        .unwrap();
        let req = params.into_request(&ctx).unwrap();
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.options.timeout, Some(5));
        assert_eq!(req.endpoint, ApiEndpoint::Responses);
    }

    #[test]
    fn output_record_shape() {
        let req = ChatRequest {
            provider: ChatProvider::Groq,
            model: "llama".into(),
            messages: vec![],
            options: ChatOptions::default(),
            endpoint: ApiEndpoint::Completions,
        };
        let result = NormalizedResult::empty(json!({"usage": {"total_tokens": 3}}));
        let v = output_record(&req, result);
        assert_eq!(v["content"], "");
        assert!(v["tool_calls"].is_null());
        assert_eq!(v["provider"], "groq");
        assert_eq!(v["api_endpoint"], "completions");
        assert_eq!(v["usage"]["total_tokens"], 3);
        assert_eq!(v["full_response"]["usage"]["total_tokens"], 3);
    }
}
