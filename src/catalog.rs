use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::ChatProvider;

// 模型/音色/尺寸目录抽象（内置种子、TOML 文件或远端配置均可实现）
pub trait Catalog: Send + Sync {
    fn chat_models(&self, provider: ChatProvider) -> Vec<String>;
    fn default_chat_model(&self, provider: ChatProvider) -> Option<String>;
    fn image_models(&self, provider: &str) -> Vec<String>;
    fn default_image_model(&self, provider: &str) -> Option<String>;
    fn image_sizes(&self, provider: &str) -> Vec<String>;
    fn tts_models(&self, provider: &str) -> Vec<String>;
    fn tts_voices(&self, provider: &str) -> Vec<String>;
    fn tts_formats(&self, provider: &str) -> Vec<String>;
    fn default_tts_model(&self, provider: &str) -> Option<String>;
    fn default_tts_voice(&self, provider: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatEntry {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageEntry {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtsEntry {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub default_voice: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub voices: Vec<String>,
    #[serde(default)]
    pub formats: Vec<String>,
}

/// Catalog backed by plain tables, keyed by provider name.
///
/// ```toml
/// [chat.groq]
/// default = "llama-3.3-70b-versatile"
/// models = ["llama-3.3-70b-versatile", "llama-3.1-8b-instant"]
///
/// [image.openai]
/// default = "gpt-image-1"
/// models = ["gpt-image-1"]
/// sizes = ["1024x1024"]
///
/// [tts.openai]
/// default_model = "gpt-4o-mini-tts"
/// default_voice = "alloy"
/// formats = ["mp3", "wav"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub chat: HashMap<String, ChatEntry>,
    #[serde(default)]
    pub image: HashMap<String, ImageEntry>,
    #[serde(default)]
    pub tts: HashMap<String, TtsEntry>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl StaticCatalog {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded catalog from {} ({} chat, {} image, {} tts providers)",
            path.display(),
            catalog.chat.len(),
            catalog.image.len(),
            catalog.tts.len()
        );
        Ok(catalog)
    }

    /// Small seed so the runner works without a catalog file.
    pub fn builtin() -> Self {
        let chat = [
            (
                "groq",
                "llama-3.3-70b-versatile",
                &["llama-3.3-70b-versatile", "llama-3.1-8b-instant", "openai/gpt-oss-120b", "openai/gpt-oss-20b"][..],
            ),
            (
                "openai",
                "gpt-4o-mini",
                &["gpt-5", "gpt-5-mini", "gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini"][..],
            ),
            (
                "anthropic",
                "claude-sonnet-4-5",
                &["claude-opus-4-5", "claude-opus-4-1", "claude-sonnet-4-5", "claude-3-5-sonnet-20241022"][..],
            ),
            ("google", "gemini-2.5-flash", &["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash"][..]),
            ("openrouter", "openai/gpt-4o-mini", &["openai/gpt-4o-mini"][..]),
        ]
        .into_iter()
        .map(|(p, default, models)| {
            (
                p.to_string(),
                ChatEntry {
                    default: Some(default.to_string()),
                    models: strings(models),
                },
            )
        })
        .collect();

        let image = [
            (
                "openai",
                "gpt-image-1",
                &["gpt-image-1", "gpt-image-1-mini"][..],
                &["1024x1024", "1536x1024", "1024x1536", "1792x1024", "1024x1792"][..],
            ),
            (
                "google",
                "imagen-3.0-generate-002",
                &["imagen-3.0-generate-002", "imagen-3.0-fast-generate-001"][..],
                &["1024x1024", "1536x1536", "1280x768", "768x1280"][..],
            ),
            (
                "stability",
                "core",
                &["ultra", "core", "sd3-large", "sd3-medium"][..],
                &["1024x1024", "1344x768", "768x1344", "1216x832", "832x1216"][..],
            ),
        ]
        .into_iter()
        .map(|(p, default, models, sizes)| {
            (
                p.to_string(),
                ImageEntry {
                    default: Some(default.to_string()),
                    models: strings(models),
                    sizes: strings(sizes),
                },
            )
        })
        .collect();

        let tts = [
            (
                "openai",
                ("gpt-4o-mini-tts", "alloy"),
                &["gpt-4o-mini-tts", "tts-1", "tts-1-hd"][..],
                &["alloy", "echo", "fable", "onyx", "nova", "shimmer"][..],
                &["mp3", "opus", "aac", "flac", "wav", "pcm"][..],
            ),
            (
                "elevenlabs",
                ("eleven_multilingual_v2", "21m00Tcm4TlvDq8ikWAM"),
                &["eleven_multilingual_v2", "eleven_turbo_v2", "eleven_monolingual_v1"][..],
                &["21m00Tcm4TlvDq8ikWAM", "AZnzlk1XvdvUeBnXmlld", "EXAVITQu4vr4xnSDxMaL"][..],
                &["mp3_44100_128", "mp3_44100_192", "pcm_16000", "pcm_24000"][..],
            ),
            (
                "google",
                ("Neural2", "en-US-Neural2-A"),
                &["Neural2", "WaveNet", "Standard", "Studio"][..],
                &["en-US-Neural2-A", "en-US-Neural2-C", "en-US-Neural2-D", "en-GB-Neural2-A"][..],
                &["mp3", "linear16", "ogg_opus", "mulaw", "alaw"][..],
            ),
            (
                "murf",
                ("GEN2", "en-US-natalie"),
                &["GEN2", "FALCON"][..],
                &["en-US-natalie", "en-US-marcus", "en-GB-hazel"][..],
                &["mp3", "wav", "flac", "ogg", "pcm"][..],
            ),
        ]
        .into_iter()
        .map(|(p, (model, voice), models, voices, formats)| {
            (
                p.to_string(),
                TtsEntry {
                    default_model: Some(model.to_string()),
                    default_voice: Some(voice.to_string()),
                    models: strings(models),
                    voices: strings(voices),
                    formats: strings(formats),
                },
            )
        })
        .collect();

        Self { chat, image, tts }
    }
}

impl Catalog for StaticCatalog {
    fn chat_models(&self, provider: ChatProvider) -> Vec<String> {
        self.chat
            .get(provider.as_str())
            .map(|e| e.models.clone())
            .unwrap_or_default()
    }

    fn default_chat_model(&self, provider: ChatProvider) -> Option<String> {
        self.chat.get(provider.as_str()).and_then(|e| e.default.clone())
    }

    fn image_models(&self, provider: &str) -> Vec<String> {
        self.image.get(provider).map(|e| e.models.clone()).unwrap_or_default()
    }

    fn default_image_model(&self, provider: &str) -> Option<String> {
        self.image.get(provider).and_then(|e| e.default.clone())
    }

    fn image_sizes(&self, provider: &str) -> Vec<String> {
        self.image.get(provider).map(|e| e.sizes.clone()).unwrap_or_default()
    }

    fn tts_models(&self, provider: &str) -> Vec<String> {
        self.tts.get(provider).map(|e| e.models.clone()).unwrap_or_default()
    }

    fn tts_voices(&self, provider: &str) -> Vec<String> {
        self.tts.get(provider).map(|e| e.voices.clone()).unwrap_or_default()
    }

    fn tts_formats(&self, provider: &str) -> Vec<String> {
        self.tts.get(provider).map(|e| e.formats.clone()).unwrap_or_default()
    }

    fn default_tts_model(&self, provider: &str) -> Option<String> {
        self.tts.get(provider).and_then(|e| e.default_model.clone())
    }

    fn default_tts_voice(&self, provider: &str) -> Option<String> {
        self.tts.get(provider).and_then(|e| e.default_voice.clone())
    }
}
