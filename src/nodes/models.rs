use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::image::ImageProvider;
use super::speech::SpeechProvider;
use super::{Node, NodeContext, OutputItem, get_json, parse_params};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::providers::{ChatProvider, models_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Upstream,
    Catalog,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelListing {
    pub models: Vec<String>,
    pub source: ModelSource,
}

/// Model ids from a `/models` payload: `data[]` or a bare array, each entry
/// read as `id`, then `name`, then a bare string. Sorted case-insensitively.
pub fn model_ids(raw: &Value) -> Vec<String> {
    let entries = raw
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let mut ids: Vec<String> = entries
        .iter()
        .filter_map(|m| {
            m.get("id")
                .and_then(Value::as_str)
                .or_else(|| m.get("name").and_then(Value::as_str))
                .or_else(|| m.as_str())
        })
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    ids.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    ids
}

pub fn fallback_listing(catalog: &dyn Catalog, provider: ChatProvider) -> ModelListing {
    let models = catalog.chat_models(provider);
    if !models.is_empty() {
        return ModelListing {
            models,
            source: ModelSource::Catalog,
        };
    }
    ModelListing {
        models: vec![catalog.default_chat_model(provider).unwrap_or_else(|| "default".to_string())],
        source: ModelSource::Default,
    }
}

/// Never fails: any error, including a rejected base URL, falls back to the catalog.
pub async fn list_models(ctx: &NodeContext<'_>, provider: ChatProvider) -> ModelListing {
    match fetch_models(ctx, provider).await {
        Ok(models) if !models.is_empty() => ModelListing {
            models,
            source: ModelSource::Upstream,
        },
        Ok(_) => {
            tracing::warn!("Empty model list for {}, using fallback", provider);
            fallback_listing(ctx.catalog, provider)
        }
        Err(e) => {
            tracing::warn!("Model listing for {} failed, using fallback: {}", provider, e);
            fallback_listing(ctx.catalog, provider)
        }
    }
}

async fn fetch_models(ctx: &NodeContext<'_>, provider: ChatProvider) -> Result<Vec<String>> {
    let base_url = ctx.base_url()?;
    let token = ctx.credential().token_for(&provider);
    let url = models_url(&base_url, provider);
    let raw = get_json(ctx, "Models API", &url, &token, &[], ctx.settings.http.models_timeout()).await?;
    Ok(model_ids(&raw))
}

/// What to list. Chat listings go upstream first; image and speech options
/// come from the catalog only.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ModelsParams {
    Chat { provider: ChatProvider },
    Image { provider: ImageProvider },
    Tts { provider: SpeechProvider },
}

/// Models and sizes offered for an image provider.
pub fn image_options(catalog: &dyn Catalog, provider: ImageProvider) -> Value {
    let name = provider.as_str();
    json!({
        "provider": name,
        "kind": "image",
        "models": catalog.image_models(name),
        "default_model": catalog.default_image_model(name),
        "sizes": catalog.image_sizes(name),
        "source": ModelSource::Catalog,
    })
}

/// Models, voices and formats offered for a speech provider.
pub fn tts_options(catalog: &dyn Catalog, provider: SpeechProvider) -> Value {
    let name = provider.as_str();
    json!({
        "provider": name,
        "kind": "tts",
        "models": catalog.tts_models(name),
        "default_model": catalog.default_tts_model(name),
        "voices": catalog.tts_voices(name),
        "default_voice": catalog.default_tts_voice(name),
        "formats": catalog.tts_formats(name),
        "source": ModelSource::Catalog,
    })
}

pub struct ModelsNode;

#[async_trait]
impl Node for ModelsNode {
    fn name(&self) -> &'static str {
        "models"
    }

    async fn execute(&self, ctx: &NodeContext<'_>, mut params: Value) -> Result<Vec<OutputItem>> {
        // kind 缺省为 chat
        if let Some(obj) = params.as_object_mut() {
            obj.entry("kind").or_insert_with(|| json!("chat"));
        }
        let record = match parse_params(params)? {
            ModelsParams::Chat { provider } => {
                let listing = list_models(ctx, provider).await;
                json!({
                    "provider": provider,
                    "kind": "chat",
                    "models": listing.models,
                    "source": listing.source,
                })
            }
            ModelsParams::Image { provider } => image_options(ctx.catalog, provider),
            ModelsParams::Tts { provider } => tts_options(ctx.catalog, provider),
        };
        Ok(vec![OutputItem::json(record)])
    }
}
