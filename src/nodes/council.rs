use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{Node, NodeContext, OutputItem, non_empty, parse_params, post_json};
use crate::error::Result;
use crate::providers::ChatProvider;

fn default_personas() -> u32 {
    8
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CouncilOptions {
    pub model: Option<String>,
    pub aggregation_model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub include_raw_responses: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CouncilParams {
    pub question: String,
    pub content: String,
    #[serde(default = "default_personas")]
    pub num_personas: u32,
    #[serde(default)]
    pub options: CouncilOptions,
}

impl CouncilParams {
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("question".into(), json!(self.question));
        body.insert("content".into(), json!(self.content));
        body.insert("num_personas".into(), json!(self.num_personas));
        let o = &self.options;
        if let Some(model) = non_empty(&o.model) {
            body.insert("model".into(), json!(model));
        }
        if let Some(model) = non_empty(&o.aggregation_model) {
            body.insert("aggregation_model".into(), json!(model));
        }
        if let Some(t) = o.temperature {
            body.insert("temperature".into(), json!(t));
        }
        if let Some(m) = o.max_tokens {
            body.insert("max_tokens".into(), json!(m));
        }
        if let Some(raw) = o.include_raw_responses {
            body.insert("include_raw_responses".into(), json!(raw));
        }
        Value::Object(body)
    }
}

pub fn council_record(response: &Value) -> Value {
    let mut record = json!({
        "id": response.get("id"),
        "score": response.get("score"),
        "summary": response.get("summary"),
        "stats": response.get("stats"),
        "usage": response.get("usage"),
    });
    if let Some(obj) = record.as_object_mut() {
        for key in ["persona_responses", "error"] {
            if let Some(v) = response.get(key).filter(|v| !v.is_null()) {
                obj.insert(key.into(), v.clone());
            }
        }
    }
    record
}

pub struct CouncilNode;

#[async_trait]
impl Node for CouncilNode {
    fn name(&self) -> &'static str {
        "council"
    }

    async fn execute(&self, ctx: &NodeContext<'_>, params: Value) -> Result<Vec<OutputItem>> {
        let params: CouncilParams = parse_params(params)?;
        let base_url = ctx.base_url()?;
        // persona evaluations run on groq, so BYOK uses the groq key
        let token = ctx.credential().token_for(&ChatProvider::Groq);
        let url = format!("{}/council/v1/evaluate", base_url);
        let response = post_json(ctx, "Council API", &url, &token, &params.body(), ctx.generation_timeout()).await?;
        Ok(vec![OutputItem::json(council_record(&response))])
    }
}
