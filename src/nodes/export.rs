use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Node, NodeContext, OutputItem, non_empty, parse_params, post_json};
use crate::error::{AdapterError, Result};
use crate::export::{ExportFormat, ExportOutput, parse};
use crate::http_client::{bytes_body_limited, client_with_timeout, send};
use crate::ssrf::is_valid_request_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTable {
    Interactions,
    EvalRuns,
    EvalResults,
}

fn default_tables() -> Vec<ExportTable> {
    vec![ExportTable::Interactions]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExport {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default = "default_tables")]
    pub tables: Vec<ExportTable>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamExport {
    pub request_id: String,
    #[serde(default, alias = "stream_format")]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ExportParams {
    Create(CreateExport),
    ExportSimple(CreateExport),
    Stream(StreamExport),
}

impl CreateExport {
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("format".into(), json!(self.format));
        let tables = if self.tables.is_empty() {
            default_tables()
        } else {
            self.tables.clone()
        };
        body.insert("tables".into(), json!(tables));
        if let Some(start) = non_empty(&self.start_date) {
            body.insert("start_date".into(), json!(start));
        }
        if let Some(end) = non_empty(&self.end_date) {
            body.insert("end_date".into(), json!(end));
        }
        Value::Object(body)
    }
}

pub async fn create_export(ctx: &NodeContext<'_>, req: &CreateExport) -> Result<Value> {
    let base_url = ctx.base_url()?;
    let url = format!("{}/api/v1/exports", base_url);
    let token = ctx.credential().gateway_token();
    post_json(ctx, "Export API", &url, &token, &req.body(), ctx.generation_timeout()).await
}

/// The id is checked before any URL is built from it.
pub fn stream_url(base_url: &str, request_id: &str) -> Result<String> {
    if !is_valid_request_id(request_id) {
        return Err(AdapterError::InvalidRequestId(request_id.to_string()));
    }
    Ok(format!("{}/api/v1/exports/{}/stream", base_url, request_id))
}

pub async fn stream_export(
    ctx: &NodeContext<'_>,
    request_id: &str,
    format: ExportFormat,
) -> Result<ExportOutput> {
    let base_url = ctx.base_url()?;
    let url = stream_url(&base_url, request_id)?;
    let token = ctx.credential().gateway_token();
    ctx.log_call("Export stream", &url, &token);

    let client = client_with_timeout(Some(ctx.generation_timeout()))?;
    let builder = client
        .get(&url)
        .header("Authorization", format!("Bearer {}", token));
    let resp = send("Export stream", &url, builder).await?;
    let body = bytes_body_limited(resp, ctx.settings.http.max_export_bytes).await?;
    Ok(parse(format, &body))
}

fn request_id_of(created: &Value) -> Result<&str> {
    created
        .get("request_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(AdapterError::MissingRequestId)
}

fn into_items(output: ExportOutput) -> Vec<OutputItem> {
    match output {
        ExportOutput::Rows(rows) => rows.iter().map(|r| OutputItem::json(r.to_json())).collect(),
        ExportOutput::Binary(artifact) => vec![OutputItem {
            json: json!({}),
            binary: Some(artifact),
        }],
    }
}

pub struct ExportNode;

#[async_trait]
impl Node for ExportNode {
    fn name(&self) -> &'static str {
        "export"
    }

    async fn execute(&self, ctx: &NodeContext<'_>, params: Value) -> Result<Vec<OutputItem>> {
        match parse_params::<ExportParams>(params)? {
            ExportParams::Create(req) => Ok(vec![OutputItem::json(create_export(ctx, &req).await?)]),
            ExportParams::ExportSimple(req) => {
                let created = create_export(ctx, &req).await?;
                let request_id = request_id_of(&created)?;
                tracing::info!("Export {} created, streaming {}", request_id, req.format.as_str());
                Ok(into_items(stream_export(ctx, request_id, req.format).await?))
            }
            ExportParams::Stream(req) => Ok(into_items(stream_export(ctx, &req.request_id, req.format).await?)),
        }
    }
}
