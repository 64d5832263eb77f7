use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Node, NodeContext, OutputItem, non_empty, parse_params, post_json};
use crate::auth::{VendorKeySlot, VendorRouted};
use crate::error::{AdapterError, Result};
use crate::media::{MediaAsset, MediaFetcher, OutputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    OpenAI,
    Google,
    Stability,
}

impl ImageProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageProvider::OpenAI => "openai",
            ImageProvider::Google => "google",
            ImageProvider::Stability => "stability",
        }
    }
}

impl VendorRouted for ImageProvider {
    fn key_slot(&self) -> VendorKeySlot {
        match self {
            ImageProvider::OpenAI => VendorKeySlot::OpenAI,
            ImageProvider::Google => VendorKeySlot::Gemini,
            ImageProvider::Stability => VendorKeySlot::Stability,
        }
    }
}

fn default_size() -> String {
    "1024x1024".to_string()
}

fn default_n() -> u32 {
    1
}

fn default_output() -> OutputMode {
    OutputMode::Binary
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageParams {
    pub provider: ImageProvider,
    #[serde(default)]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_n")]
    pub n: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default = "default_output")]
    pub output_type: OutputMode,
}

pub fn build_body(params: &ImageParams, model: &str) -> Value {
    let mut body = Map::new();
    body.insert("provider".into(), json!(params.provider.as_str()));
    body.insert("model".into(), json!(model));
    body.insert("prompt".into(), json!(params.prompt));
    body.insert("size".into(), json!(params.size));
    body.insert("n".into(), json!(params.n));
    if let Some(negative) = non_empty(&params.negative_prompt) {
        body.insert("negative_prompt".into(), json!(negative));
    }
    // quality/style are only understood by the openai image backend
    if params.provider == ImageProvider::OpenAI {
        body.insert("quality".into(), json!(non_empty(&params.quality).unwrap_or("medium")));
        body.insert("style".into(), json!(non_empty(&params.style).unwrap_or("natural")));
    }
    if params.seed > 0 {
        body.insert("seed".into(), json!(params.seed));
    }
    Value::Object(body)
}

/// Width or height: the image's own value when set, else the matching half
/// of `usage.resolution` (`"WxH"`).
fn dimension(image: &Value, response: &Value, field: &str, index: usize) -> Value {
    match image.get(field) {
        Some(v) if !v.is_null() && v.as_u64() != Some(0) => v.clone(),
        _ => response
            .pointer("/usage/resolution")
            .and_then(Value::as_str)
            .and_then(|r| r.split('x').nth(index))
            .map(|part| match part.trim().parse::<u64>() {
                Ok(n) => json!(n),
                Err(_) => json!(part),
            })
            .unwrap_or(Value::Null),
    }
}

/// One record per returned image, paired with its asset references.
pub fn image_records(response: &Value) -> Vec<(Value, MediaAsset)> {
    let images = response
        .get("images")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let total_cost = response.get("cost_usd").and_then(Value::as_f64);
    let per_image_cost = total_cost.map(|c| c / images.len().max(1) as f64);
    let metadata = response.get("metadata").cloned().unwrap_or(Value::Null);

    images
        .iter()
        .map(|image| {
            let record = json!({
                "id": response.get("id"),
                "provider": response.get("provider"),
                "model": response.get("model"),
                "width": dimension(image, response, "width", 0),
                "height": dimension(image, response, "height", 1),
                "size_bytes": image.get("size_bytes"),
                "cost_usd": per_image_cost,
                "total_cost_usd": total_cost,
                "usage": response.get("usage"),
                "metadata": metadata,
                "revised_prompt": metadata.get("revised_prompt"),
                "seed": metadata.get("seed"),
            });
            let text = |k: &str| image.get(k).and_then(Value::as_str).map(str::to_string);
            let asset = MediaAsset {
                url: text("url"),
                base64: text("base64"),
                mime_type: text("mime_type"),
            };
            (record, asset)
        })
        .collect()
}

pub struct ImageNode;

#[async_trait]
impl Node for ImageNode {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn execute(&self, ctx: &NodeContext<'_>, params: Value) -> Result<Vec<OutputItem>> {
        let params: ImageParams = parse_params(params)?;
        let base_url = ctx.base_url()?;
        let model = match non_empty(&params.model) {
            Some(m) => m.to_string(),
            None => ctx.catalog.default_image_model(params.provider.as_str()).ok_or_else(|| {
                AdapterError::Config(format!("No image model given for {}", params.provider.as_str()))
            })?,
        };

        let token = ctx.credential().token_for(&params.provider);
        let url = format!("{}/imagen/v1/generate", base_url);
        let response = post_json(
            ctx,
            "Image API",
            &url,
            &token,
            &build_body(&params, &model),
            ctx.generation_timeout(),
        )
        .await?;

        let fetcher = MediaFetcher::image(ctx.generation_timeout(), ctx.settings.http.max_media_bytes);
        let mut items = Vec::new();
        for (mut record, asset) in image_records(&response) {
            let resolved = fetcher.resolve(params.output_type, &asset).await;
            if let Some(obj) = record.as_object_mut() {
                if let Some(url) = resolved.url {
                    obj.insert("image_url".into(), json!(url));
                }
                if let Some(marker) = resolved.binary_fetch_error {
                    obj.insert("binary_fetch_error".into(), json!(marker));
                }
            }
            items.push(OutputItem {
                json: record,
                binary: resolved.binary,
            });
        }
        tracing::info!("Image API returned {} image(s)", items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(v: Value) -> ImageParams {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn openai_body_carries_quality_and_style() {
        let p = params(json!({"provider": "openai", "prompt": "a cat", "quality": "high"}));
        let body = build_body(&p, "gpt-image-1");
        assert_eq!(
            body,
            json!({
                "provider": "openai",
                "model": "gpt-image-1",
                "prompt": "a cat",
                "size": "1024x1024",
                "n": 1,
                "quality": "high",
                "style": "natural"
            })
        );
    }

    #[test]
    fn other_providers_get_negative_prompt_and_seed() {
        let p = params(json!({
            "provider": "stability",
            "prompt": "a dog",
            "negative_prompt": "blurry",
            "seed": 42,
            "n": 2,
            "size": "1344x768"
        }));
        let body = build_body(&p, "core");
        assert_eq!(body["negative_prompt"], "blurry");
        assert_eq!(body["seed"], 42);
        assert_eq!(body["n"], 2);
        assert!(body.get("quality").is_none());
        assert_eq!(p.output_type, OutputMode::Binary);
    }

    #[test]
    fn zero_seed_and_blank_negative_are_omitted() {
        let p = params(json!({"provider": "google", "prompt": "x", "negative_prompt": " ", "seed": 0}));
        let body = build_body(&p, "imagen-3.0-generate-002");
        assert!(body.get("seed").is_none());
        assert!(body.get("negative_prompt").is_none());
    }

    #[test]
    fn records_split_cost_and_fall_back_to_resolution() {
        let response = json!({
            "id": "img_1",
            "provider": "openai",
            "model": "gpt-image-1",
            "cost_usd": 0.08,
            "usage": {"resolution": "1536x1024"},
            "metadata": {"revised_prompt": "a fluffy cat", "seed": 7},
            "images": [
                {"url": "https://cdn.example.com/1.png", "size_bytes": 10},
                {"base64": "AAAA", "width": 512, "height": 512, "mime_type": "image/webp"}
            ]
        });
        let records = image_records(&response);
        assert_eq!(records.len(), 2);
        let (first, asset) = &records[0];
        assert_eq!(first["width"], 1536);
        assert_eq!(first["height"], 1024);
        assert_eq!(first["cost_usd"], 0.04);
        assert_eq!(first["total_cost_usd"], 0.08);
        assert_eq!(first["revised_prompt"], "a fluffy cat");
        assert_eq!(first["seed"], 7);
        assert_eq!(asset.url.as_deref(), Some("https://cdn.example.com/1.png"));
        let (second, asset) = &records[1];
        assert_eq!(second["width"], 512);
        assert_eq!(asset.mime_type.as_deref(), Some("image/webp"));
    }

    #[test]
    fn no_images_no_records() {
        assert!(image_records(&json!({"id": "x"})).is_empty());
    }
}
