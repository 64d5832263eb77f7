use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64_STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};
use crate::http_client::{bytes_body_limited, client_with_timeout, send};
use crate::ssrf::validate_base_url;

/// What the caller wants back for a generated asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Binary,
    Url,
    Both,
}

impl OutputMode {
    pub fn wants_binary(self) -> bool {
        matches!(self, OutputMode::Binary | OutputMode::Both)
    }

    pub fn wants_url(self) -> bool {
        matches!(self, OutputMode::Url | OutputMode::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryArtifact {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

/// Asset references as returned by the gateway. Either field may be absent.
#[derive(Debug, Clone, Default)]
pub struct MediaAsset {
    pub url: Option<String>,
    pub base64: Option<String>,
    pub mime_type: Option<String>,
}

/// `binary_fetch_error` set means the URL is known but the bytes are not;
/// the primary call still succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMedia {
    pub url: Option<String>,
    pub binary: Option<BinaryArtifact>,
    pub binary_fetch_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MediaFetcher {
    /// "image" / "audio"; used for file names and the failure marker.
    pub kind: &'static str,
    pub default_mime: &'static str,
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl MediaFetcher {
    pub fn image(timeout: Duration, max_bytes: usize) -> Self {
        Self {
            kind: "image",
            default_mime: "image/png",
            timeout,
            max_bytes,
        }
    }

    pub fn audio(timeout: Duration, max_bytes: usize) -> Self {
        Self {
            kind: "audio",
            default_mime: "audio/mpeg",
            timeout,
            max_bytes,
        }
    }

    pub fn fetch_error_marker(&self) -> String {
        format!("Failed to download {} from URL", self.kind)
    }

    pub async fn resolve(&self, mode: OutputMode, asset: &MediaAsset) -> ResolvedMedia {
        let mut out = ResolvedMedia {
            url: asset.url.clone().filter(|_| mode.wants_url()),
            ..Default::default()
        };
        if !mode.wants_binary() {
            return out;
        }

        let inline = asset
            .base64
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|b64| match B64_STANDARD.decode(b64.trim()) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!("Inline {} payload is not valid base64: {}", self.kind, e);
                    None
                }
            });

        let data = match (inline, asset.url.as_deref()) {
            (Some(bytes), _) => bytes,
            (None, Some(url)) => match self.download(url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("{} download failed, keeping URL: {}", self.kind, e);
                    out.url = Some(url.to_string());
                    out.binary_fetch_error = Some(self.fetch_error_marker());
                    return out;
                }
            },
            (None, None) => return out,
        };

        let mime_type = asset
            .mime_type
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.default_mime.to_string());
        out.binary = Some(BinaryArtifact {
            data,
            file_name: format!("{}.{}", self.kind, extension_for(&mime_type)),
            mime_type,
        });
        out
    }

    /// Signed asset URLs go through the same guard as the base URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let verdict = validate_base_url(url);
        if !verdict.valid {
            return Err(AdapterError::Config(format!(
                "Refusing to download {}: {}",
                self.kind,
                verdict.reason.unwrap_or_default()
            )));
        }
        let client = client_with_timeout(Some(self.timeout))?;
        let resp = send("Media download", url, client.get(url)).await?;
        bytes_body_limited(resp, self.max_bytes).await
    }
}

pub fn extension_for(mime_type: &str) -> &str {
    let subtype = mime_type
        .split('/')
        .nth(1)
        .and_then(|s| s.split([';', '+']).next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match subtype {
        Some("mpeg") => "mp3",
        Some("jpeg") => "jpg",
        Some(s) => s,
        None => "bin",
    }
}

/// MIME type for a speech output format (`mp3`, `mp3_44100_128`, `ogg_opus`, ...).
pub fn audio_mime_for_format(format: &str) -> &'static str {
    let family = format.split('_').next().unwrap_or_default().to_ascii_lowercase();
    match family.as_str() {
        "wav" | "linear16" => "audio/wav",
        "opus" => "audio/opus",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "pcm" => "audio/pcm",
        "mulaw" | "ulaw" => "audio/basic",
        "alaw" => "audio/x-alaw-basic",
        _ => "audio/mpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> MediaFetcher {
        MediaFetcher::image(Duration::from_secs(2), 1024)
    }

    #[tokio::test]
    async fn inline_base64_skips_download() {
        let asset = MediaAsset {
            url: Some("https://cdn.example.com/a.png".into()),
            base64: Some(B64_STANDARD.encode(b"PNGDATA")),
            mime_type: None,
        };
        let r = fetcher().resolve(OutputMode::Binary, &asset).await;
        let bin = r.binary.unwrap();
        assert_eq!(bin.data, b"PNGDATA");
        assert_eq!(bin.mime_type, "image/png");
        assert_eq!(bin.file_name, "image.png");
        assert!(r.url.is_none());
        assert!(r.binary_fetch_error.is_none());
    }

    #[tokio::test]
    async fn url_mode_never_fetches() {
        let asset = MediaAsset {
            url: Some("https://10.0.0.1/a.png".into()),
            ..Default::default()
        };
        let r = fetcher().resolve(OutputMode::Url, &asset).await;
        assert_eq!(r.url.as_deref(), Some("https://10.0.0.1/a.png"));
        assert!(r.binary.is_none());
        assert!(r.binary_fetch_error.is_none());
    }

    #[tokio::test]
    async fn guarded_url_becomes_partial_success() {
        let asset = MediaAsset {
            url: Some("https://169.254.169.254/latest".into()),
            ..Default::default()
        };
        let r = fetcher().resolve(OutputMode::Binary, &asset).await;
        assert!(r.binary.is_none());
        assert_eq!(r.url.as_deref(), Some("https://169.254.169.254/latest"));
        assert_eq!(r.binary_fetch_error.as_deref(), Some("Failed to download image from URL"));
    }

    #[tokio::test]
    async fn nothing_to_resolve() {
        let r = fetcher().resolve(OutputMode::Both, &MediaAsset::default()).await;
        assert_eq!(r, ResolvedMedia::default());
    }

    #[test]
    fn mime_helpers() {
        assert_eq!(extension_for("audio/mpeg"), "mp3");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/svg+xml"), "svg");
        assert_eq!(extension_for("garbage"), "bin");
        assert_eq!(audio_mime_for_format("mp3"), "audio/mpeg");
        assert_eq!(audio_mime_for_format("mp3_44100_128"), "audio/mpeg");
        assert_eq!(audio_mime_for_format("pcm_16000"), "audio/pcm");
        assert_eq!(audio_mime_for_format("ogg_opus"), "audio/ogg");
        assert_eq!(audio_mime_for_format("wav"), "audio/wav");
    }
}
