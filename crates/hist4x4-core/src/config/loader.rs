//! Configuration loader for YAML files and environment overrides
//!
//! Values from the environment always win over the file. Lookups go through a
//! caller-supplied function so the loader can be exercised without touching the
//! process environment.

use std::env;
use std::path::Path;
use tokio::fs;

use crate::config::types::*;
use crate::errors::PredictError;

/// Proxy variables in priority order.
pub const PROXY_ENV_VARS: [&str; 7] = [
    "PROXY_URL",
    "ALL_PROXY",
    "HTTPS_PROXY",
    "HTTP_PROXY",
    "all_proxy",
    "https_proxy",
    "http_proxy",
];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults plus the process environment.
    pub fn from_env() -> Result<AppConfig, PredictError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    pub fn from_env_with<F>(lookup: F) -> Result<AppConfig, PredictError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        Self::apply_env_overrides(&mut config, &lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file, then apply the process environment on top.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<AppConfig, PredictError> {
        Self::from_file_with(path, |key| env::var(key).ok()).await
    }

    pub async fn from_file_with<P, F>(path: P, lookup: F) -> Result<AppConfig, PredictError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            PredictError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str_with(&content, lookup)
    }

    pub fn from_str_with<F>(content: &str, lookup: F) -> Result<AppConfig, PredictError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: AppConfig = if content.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                PredictError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };
        Self::apply_env_overrides(&mut config, &lookup);
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides<F>(config: &mut AppConfig, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = get("OPENAI_API_KEY") {
            config.openai.api_key = Some(key);
        }
        if let Some(model) = get("GPT_MODEL") {
            config.openai.model = model;
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            config.openai.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(proxy) = PROXY_ENV_VARS.iter().find_map(|key| get(key)) {
            config.openai.proxy_url = Some(proxy);
        }
        if let Some(id) = get("GOOGLE_CLIENT_ID") {
            config.auth.google_client_id = Some(id);
        }
        if let Some(secret) = get("GOOGLE_CLIENT_SECRET") {
            config.auth.google_client_secret = Some(secret);
        }
        if let Some(url) = get("PUBLIC_BASE_URL") {
            config.auth.public_base_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(secret) = get("SESSION_SECRET") {
            config.session.secret = secret;
        }
    }
}
