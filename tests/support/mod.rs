//! Shared fixtures for the HTTP-level tests.

#![allow(dead_code)]

use demeterics_nodes::auth::VendorKeySlot;
use demeterics_nodes::catalog::StaticCatalog;
use demeterics_nodes::config::Settings;
use mockito::{Server, ServerGuard};

pub const GATEWAY_KEY: &str = "dmt_test_key_123";

pub async fn start() -> ServerGuard {
    Server::new_async().await
}

/// Settings pointed at the mock server (plain http on loopback).
pub fn settings(server: &ServerGuard) -> Settings {
    let mut s = Settings::default();
    s.credentials.api_key = GATEWAY_KEY.to_string();
    s.credentials.base_url = Some(server.url());
    s.http.generation_timeout_secs = 5;
    s.http.models_timeout_secs = 2;
    s
}

pub fn byok_settings(server: &ServerGuard, slot: VendorKeySlot, key: &str) -> Settings {
    let mut s = settings(server);
    s.credentials.byok = true;
    s.credentials.vendor_keys.insert(slot, key.to_string());
    s
}

pub fn catalog() -> StaticCatalog {
    StaticCatalog::builtin()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
