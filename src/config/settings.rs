use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credential;
use crate::error::{AdapterError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub credentials: Credential,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// TOML file with model/voice/size lists; the built-in catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_models_timeout")]
    pub models_timeout_secs: u64,
    #[serde(default = "default_max_media_bytes")]
    pub max_media_bytes: usize,
    #[serde(default = "default_max_export_bytes")]
    pub max_export_bytes: usize,
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_models_timeout() -> u64 {
    10
}

fn default_max_media_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_max_export_bytes() -> usize {
    256 * 1024 * 1024
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: default_generation_timeout(),
            models_timeout_secs: default_models_timeout(),
            max_media_bytes: default_max_media_bytes(),
            max_export_bytes: default_max_export_bytes(),
        }
    }
}

impl HttpConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn models_timeout(&self) -> Duration {
        Duration::from_secs(self.models_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLogStrategy {
    None,
    #[default]
    Masked,
    Plain,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub key_log_strategy: KeyLogStrategy,
}

const CONFIG_CANDIDATES: [&str; 2] = ["demeterics.toml", "config.toml"];

impl Settings {
    /// Loads settings from `path`, or from the first existing candidate file,
    /// then applies `DEMETERICS_*` environment overrides. Without any file the
    /// environment alone must provide the API key.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut settings = match &config_path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                tracing::info!("Loaded settings from {}", p.display());
                Self::from_toml_str(&content)?
            }
            None => Settings::default(),
        };

        settings.apply_env_overrides(|k| std::env::var(k).ok());
        settings.ensure_api_key()?;
        Ok(settings)
    }

    // 环境变量覆盖之后才检查
    fn ensure_api_key(&self) -> Result<()> {
        if self.credentials.api_key.trim().is_empty() {
            return Err(AdapterError::Config(
                "Missing API key: set credentials.api_key in demeterics.toml or DEMETERICS_API_KEY".into(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("DEMETERICS_API_KEY") {
            self.credentials.api_key = key;
        }
        if let Some(url) = non_empty("DEMETERICS_BASE_URL") {
            self.credentials.base_url = Some(url);
        }
        if let Some(byok) = non_empty("DEMETERICS_BYOK") {
            self.credentials.byok = matches!(byok.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    fn find_config_file() -> Option<PathBuf> {
        CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::VendorKeySlot;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn parses_full_settings() {
        let s = Settings::from_toml_str(
            r#"
            catalog_path = "catalog.toml"

            [credentials]
            api_key = "dmt_abc"
            byok = true
            base_url = "https://gw.example.com/"

            [credentials.vendor_keys]
            groq = "gsk_1"

            [http]
            generation_timeout_secs = 30

            [logging]
            key_log_strategy = "none"
            "#,
        )
        .unwrap();
        assert_eq!(s.credentials.vendor_key(VendorKeySlot::Groq), Some("gsk_1"));
        assert_eq!(s.http.generation_timeout(), Duration::from_secs(30));
        assert_eq!(s.http.models_timeout(), Duration::from_secs(10));
        assert_eq!(s.logging.key_log_strategy, KeyLogStrategy::None);
        assert_eq!(s.credentials.validated_base_url().unwrap(), "https://gw.example.com");
    }

    #[test]
    fn defaults_when_sections_missing() {
        let s = Settings::from_toml_str("[credentials]\napi_key = \"k\"\n").unwrap();
        assert!(!s.credentials.byok);
        assert_eq!(s.http.generation_timeout_secs, 60);
        assert_eq!(s.http.max_export_bytes, 256 * 1024 * 1024);
        assert_eq!(s.logging.key_log_strategy, KeyLogStrategy::Masked);
        assert!(s.catalog_path.is_none());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut s = Settings::from_toml_str("[credentials]\napi_key = \"file\"\n").unwrap();
        let env = HashMap::from([
            ("DEMETERICS_API_KEY", "env"),
            ("DEMETERICS_BYOK", "true"),
            ("DEMETERICS_BASE_URL", ""),
        ]);
        s.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.credentials.api_key, "env");
        assert!(s.credentials.byok);
        assert!(s.credentials.base_url.is_none());
    }

    #[test]
    fn key_may_come_from_env_only() {
        let mut s = Settings::from_toml_str(
            "[credentials]\nbase_url = \"https://gw.example.com\"\n\n[http]\nmodels_timeout_secs = 5\n",
        )
        .unwrap();
        assert!(matches!(s.ensure_api_key(), Err(AdapterError::Config(ref m)) if m.starts_with("Missing API key")));

        let env = HashMap::from([("DEMETERICS_API_KEY", "dmt_env")]);
        s.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert!(s.ensure_api_key().is_ok());
        assert_eq!(s.credentials.api_key, "dmt_env");
        assert_eq!(s.credentials.base_url.as_deref(), Some("https://gw.example.com"));
        assert_eq!(s.http.models_timeout_secs, 5);
    }

    #[test]
    fn credentials_section_is_optional() {
        let s = Settings::from_toml_str("[http]\ngeneration_timeout_secs = 20\n").unwrap();
        assert!(s.credentials.api_key.is_empty());
        assert_eq!(s.http.generation_timeout_secs, 20);
    }

    #[test]
    fn byok_env_flag_ignores_case() {
        for (raw, expected) in [("True", true), ("YES", true), ("1", true), ("off", false)] {
            let mut s = Settings::default();
            s.apply_env_overrides(|k| (k == "DEMETERICS_BYOK").then(|| raw.to_string()));
            assert_eq!(s.credentials.byok, expected, "DEMETERICS_BYOK={raw}");
        }
    }

    #[test]
    fn load_reads_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[credentials]\napi_key = \"dmt_from_file\"").unwrap();
        let s = Settings::load(Some(file.path())).unwrap();
        assert!(!s.credentials.api_key.is_empty());
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[credentials\napi_key = ").unwrap();
        assert!(matches!(
            Settings::load(Some(file.path())),
            Err(AdapterError::Toml(_))
        ));
    }
}
