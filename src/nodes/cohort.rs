use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{Node, NodeContext, OutputItem, get_json, non_empty, parse_params, post_json};
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct CohortOutcome {
    pub cohort_id: String,
    #[serde(default)]
    pub outcome: Option<f64>,
    #[serde(default)]
    pub outcome_v2: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum CohortParams {
    Submit(CohortOutcome),
    Get { cohort_id: String },
}

impl CohortOutcome {
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("cohort_id".into(), json!(self.cohort_id));
        for (key, value) in [("outcome", self.outcome), ("outcome_v2", self.outcome_v2)] {
            if let Some(v) = value.filter(|v| v.is_finite()) {
                body.insert(key.into(), json!(v));
            }
        }
        if let Some(label) = non_empty(&self.label) {
            body.insert("label".into(), json!(label));
        }
        if let Some(date) = non_empty(&self.event_date) {
            body.insert("event_date".into(), json!(date));
        }
        Value::Object(body)
    }
}

pub struct CohortNode;

#[async_trait]
impl Node for CohortNode {
    fn name(&self) -> &'static str {
        "cohort"
    }

    async fn execute(&self, ctx: &NodeContext<'_>, params: Value) -> Result<Vec<OutputItem>> {
        let params: CohortParams = parse_params(params)?;
        let base_url = ctx.base_url()?;
        let url = format!("{}/api/v1/cohort/outcome", base_url);
        let token = ctx.credential().gateway_token();
        let timeout = ctx.generation_timeout();
        let response = match params {
            CohortParams::Submit(outcome) => {
                post_json(ctx, "Cohort API", &url, &token, &outcome.body(), timeout).await?
            }
            CohortParams::Get { cohort_id } => {
                get_json(ctx, "Cohort API", &url, &token, &[("cohort_id", cohort_id.as_str())], timeout).await?
            }
        };
        let json = if response.is_null() { json!({}) } else { response };
        Ok(vec![OutputItem::json(json)])
    }
}
