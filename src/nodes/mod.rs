//! Per-call-kind executors. Each node takes one parameter item, re-validates
//! the base URL, composes the bearer token and returns zero or more output
//! items.

pub mod chat;
pub mod cohort;
pub mod council;
pub mod export;
pub mod image;
pub mod models;
pub mod speech;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Credential;
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::error::{AdapterError, Result};
use crate::http_client::{client_with_timeout, json_body, send};
use crate::media::BinaryArtifact;
pub(crate) use crate::util::non_empty;
use crate::util::token_hint;

/// Everything a node reads besides its own parameters.
pub struct NodeContext<'a> {
    pub settings: &'a Settings,
    pub catalog: &'a dyn Catalog,
}

impl<'a> NodeContext<'a> {
    pub fn new(settings: &'a Settings, catalog: &'a dyn Catalog) -> Self {
        Self { settings, catalog }
    }

    pub fn credential(&self) -> &Credential {
        &self.settings.credentials
    }

    /// Validated on every call; a previous verdict is never reused.
    pub fn base_url(&self) -> Result<String> {
        self.settings.credentials.validated_base_url()
    }

    pub fn generation_timeout(&self) -> Duration {
        self.settings.http.generation_timeout()
    }

    fn log_call(&self, call: &str, url: &str, token: &str) {
        match token_hint(self.settings.logging.key_log_strategy, token) {
            Some(hint) => tracing::info!("{} -> {} (key: {})", call, url, hint),
            None => tracing::info!("{} -> {}", call, url),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputItem {
    pub json: Value,
    pub binary: Option<BinaryArtifact>,
}

impl OutputItem {
    pub fn json(json: Value) -> Self {
        Self { json, binary: None }
    }
}

#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &NodeContext<'_>, params: Value) -> Result<Vec<OutputItem>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Chat,
    Image,
    Speech,
    Export,
    Council,
    Cohort,
    Models,
}

pub fn node_for(kind: NodeKind) -> Box<dyn Node> {
    match kind {
        NodeKind::Chat => Box::new(chat::ChatNode),
        NodeKind::Image => Box::new(image::ImageNode),
        NodeKind::Speech => Box::new(speech::SpeechNode),
        NodeKind::Export => Box::new(export::ExportNode),
        NodeKind::Council => Box::new(council::CouncilNode),
        NodeKind::Cohort => Box::new(cohort::CohortNode),
        NodeKind::Models => Box::new(models::ModelsNode),
    }
}

pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| AdapterError::Config(format!("Invalid parameters: {}", e)))
}


pub(crate) async fn post_json(
    ctx: &NodeContext<'_>,
    call: &'static str,
    url: &str,
    token: &str,
    body: &Value,
    timeout: Duration,
) -> Result<Value> {
    ctx.log_call(call, url, token);
    tracing::debug!("{} body: {}", call, body);
    let client = client_with_timeout(Some(timeout))?;
    let builder = client
        .post(url)
        .header("Authorization", format!("Bearer {}", token))
        .json(body);
    json_body(send(call, url, builder).await?).await
}

pub(crate) async fn get_json(
    ctx: &NodeContext<'_>,
    call: &'static str,
    url: &str,
    token: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<Value> {
    ctx.log_call(call, url, token);
    let client = client_with_timeout(Some(timeout))?;
    let builder = client
        .get(url)
        .header("Authorization", format!("Bearer {}", token))
        .query(query);
    json_body(send(call, url, builder).await?).await
}
