use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Node, NodeContext, OutputItem, non_empty, parse_params, post_json};
use crate::auth::{VendorKeySlot, VendorRouted};
use crate::error::{AdapterError, Result};
use crate::media::{MediaAsset, MediaFetcher, OutputMode, audio_mime_for_format};

const SPEED_RANGE: (f64, f64) = (0.25, 4.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    OpenAI,
    ElevenLabs,
    Google,
    Murf,
}

impl SpeechProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            SpeechProvider::OpenAI => "openai",
            SpeechProvider::ElevenLabs => "elevenlabs",
            SpeechProvider::Google => "google",
            SpeechProvider::Murf => "murf",
        }
    }
}

impl VendorRouted for SpeechProvider {
    fn key_slot(&self) -> VendorKeySlot {
        match self {
            SpeechProvider::OpenAI => VendorKeySlot::OpenAI,
            SpeechProvider::ElevenLabs => VendorKeySlot::ElevenLabs,
            SpeechProvider::Google => VendorKeySlot::Gemini,
            SpeechProvider::Murf => VendorKeySlot::Murf,
        }
    }
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_speed() -> f64 {
    1.0
}

fn default_output() -> OutputMode {
    OutputMode::Url
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechParams {
    pub provider: SpeechProvider,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(alias = "input")]
    pub text: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_output")]
    pub output_type: OutputMode,
}

pub struct SpeechNode;

impl SpeechNode {
    fn resolve_model_voice(ctx: &NodeContext<'_>, params: &SpeechParams) -> Result<(String, String)> {
        let provider = params.provider.as_str();
        let model = non_empty(&params.model)
            .map(str::to_string)
            .or_else(|| ctx.catalog.default_tts_model(provider))
            .ok_or_else(|| AdapterError::Config(format!("No speech model given for {}", provider)))?;
        let voice = non_empty(&params.voice)
            .map(str::to_string)
            .or_else(|| ctx.catalog.default_tts_voice(provider))
            .ok_or_else(|| AdapterError::Config(format!("No voice given for {}", provider)))?;
        Ok((model, voice))
    }
}

pub fn build_body(params: &SpeechParams, model: &str, voice: &str) -> Result<Value> {
    if !(SPEED_RANGE.0..=SPEED_RANGE.1).contains(&params.speed) {
        return Err(AdapterError::Config(format!(
            "speed must be between {} and {}",
            SPEED_RANGE.0, SPEED_RANGE.1
        )));
    }
    let mut body = Map::new();
    body.insert("provider".into(), json!(params.provider.as_str()));
    body.insert("model".into(), json!(model));
    body.insert("voice".into(), json!(voice));
    body.insert("input".into(), json!(params.text));
    body.insert("format".into(), json!(params.format));
    body.insert("speed".into(), json!(params.speed));
    if let Some(language) = non_empty(&params.language) {
        body.insert("language".into(), json!(language));
    }
    Ok(Value::Object(body))
}

pub fn speech_record(response: &Value) -> Value {
    json!({
        "id": response.get("id"),
        "provider": response.get("provider"),
        "model": response.get("model"),
        "voice": response.get("voice"),
        "audio_url": response.get("audio_url"),
        "duration_seconds": response.get("duration_seconds"),
        "cost_usd": response.get("cost_usd"),
        "usage": response.get("usage"),
        "metadata": response.get("metadata"),
    })
}

#[async_trait]
impl Node for SpeechNode {
    fn name(&self) -> &'static str {
        "speech"
    }

    async fn execute(&self, ctx: &NodeContext<'_>, params: Value) -> Result<Vec<OutputItem>> {
        let params: SpeechParams = parse_params(params)?;
        let base_url = ctx.base_url()?;
        let (model, voice) = Self::resolve_model_voice(ctx, &params)?;
        let body = build_body(&params, &model, &voice)?;

        let token = ctx.credential().token_for(&params.provider);
        let url = format!("{}/tts/v1/generate", base_url);
        let response = post_json(ctx, "TTS API", &url, &token, &body, ctx.generation_timeout()).await?;

        let mut record = speech_record(&response);
        let text = |k: &str| response.get(k).and_then(Value::as_str).map(str::to_string);
        let asset = MediaAsset {
            url: text("audio_url"),
            base64: text("audio_base64"),
            mime_type: Some(audio_mime_for_format(&params.format).to_string()),
        };
        let fetcher = MediaFetcher::audio(ctx.generation_timeout(), ctx.settings.http.max_media_bytes);
        let resolved = fetcher.resolve(params.output_type, &asset).await;
        if let (Some(marker), Some(obj)) = (resolved.binary_fetch_error, record.as_object_mut()) {
            obj.insert("binary_fetch_error".into(), json!(marker));
        }
        Ok(vec![OutputItem {
            json: record,
            binary: resolved.binary,
        }])
    }
}
