use std::{collections::HashMap, fs, time::Duration};

use anyhow::Context;
use classifier_integration::ClassifierConfig;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub classifier_url: String,
    pub classifier_timeout_seconds: u64,
    pub session_ttl_seconds: u64,
    pub cache_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            classifier_url: "http://127.0.0.1:8000/classify".into(),
            classifier_timeout_seconds: 30,
            session_ttl_seconds: 3600,
            cache_capacity: 256,
        }
    }
}

impl Settings {
    pub fn classifier_config(&self) -> anyhow::Result<ClassifierConfig> {
        let endpoint = Url::parse(self.classifier_url.trim()).with_context(|| {
            format!("invalid classifier url '{}'", self.classifier_url)
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!(
                "classifier url '{}' must use http or https",
                self.classifier_url
            );
        }
        Ok(ClassifierConfig {
            endpoint,
            timeout: Duration::from_secs(self.classifier_timeout_seconds),
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// Applies a flat `server.toml` table. Unknown keys and unparsable values are
/// ignored.
fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    let get = |key: &str| file_cfg.get(key).and_then(scalar_to_string);

    if let Some(v) = get("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = get("classifier_url") {
        settings.classifier_url = v;
    }
    if let Some(v) = get("classifier_timeout_seconds").and_then(|v| v.parse().ok()) {
        settings.classifier_timeout_seconds = v;
    }
    if let Some(v) = get("session_ttl_seconds").and_then(|v| v.parse().ok()) {
        settings.session_ttl_seconds = v;
    }
    if let Some(v) = get("cache_capacity").and_then(|v| v.parse().ok()) {
        settings.cache_capacity = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("CLASSIFIER_URL") {
        settings.classifier_url = v;
    }
    if let Some(v) = var("APP__CLASSIFIER_URL") {
        settings.classifier_url = v;
    }

    if let Some(v) = var("APP__CLASSIFIER_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
        settings.classifier_timeout_seconds = v;
    }
    if let Some(v) = var("APP__SESSION_TTL_SECONDS").and_then(|v| v.parse().ok()) {
        settings.session_ttl_seconds = v;
    }
    if let Some(v) = var("APP__CACHE_CAPACITY").and_then(|v| v.parse().ok()) {
        settings.cache_capacity = v;
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
