use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ssrf::validated_base_url;

/// Credential field a vendor key is stored under. Several providers share a
/// slot (every Google surface uses the Gemini key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorKeySlot {
    Groq,
    OpenAI,
    Anthropic,
    Gemini,
    OpenRouter,
    ElevenLabs,
    Stability,
    Murf,
}

/// Anything routed through the gateway on behalf of an upstream vendor.
pub trait VendorRouted {
    fn key_slot(&self) -> VendorKeySlot;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub byok: bool,
    #[serde(default)]
    pub vendor_keys: HashMap<VendorKeySlot, String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Builds the bearer token. With BYOK on and a non-empty vendor key the token
/// is `"{gateway};{vendor}"`; otherwise the gateway key alone.
///
/// Neither key is checked or escaped: an empty gateway key yields `";vendor"`,
/// and a `;` inside either key will be mis-split by the receiving side.
pub fn compose(gateway_key: &str, byok: bool, vendor_key: Option<&str>) -> String {
    match vendor_key {
        Some(vendor) if byok && !vendor.is_empty() => format!("{};{}", gateway_key, vendor),
        _ => gateway_key.to_string(),
    }
}

impl Credential {
    pub fn vendor_key(&self, slot: VendorKeySlot) -> Option<&str> {
        self.vendor_keys.get(&slot).map(String::as_str)
    }

    /// Token for a vendor-routed call, re-derived on every call.
    pub fn token_for(&self, target: &impl VendorRouted) -> String {
        compose(&self.api_key, self.byok, self.vendor_key(target.key_slot()))
    }

    /// Token for gateway-only endpoints (exports, cohorts).
    pub fn gateway_token(&self) -> String {
        compose(&self.api_key, false, None)
    }

    pub fn validated_base_url(&self) -> Result<String> {
        validated_base_url(self.base_url.as_deref())
    }
}
