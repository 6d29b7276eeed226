//! Configuration type definitions
//!
//! Every section has defaults so an empty YAML document (or no file at all) yields
//! a runnable configuration; secrets normally arrive through the environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::PredictError;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SESSION_SECRET: &str = "hist4x4-secret";
pub const DEFAULT_COOKIE_NAME: &str = "hist4x4_session";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 14 * 24 * 60 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

const PROXY_SCHEMES: [&str; 4] = ["http://", "https://", "socks5://", "socks5h://"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub proxy_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub google_client_secret: Option<String>,
    /// Externally visible origin used to build the OAuth redirect URI.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_secret", skip_serializing)]
    pub secret: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Sessions unused for this long are forgotten; also the cookie `Max-Age`.
    #[serde(default = "default_session_idle_secs")]
    pub idle_timeout_secs: u64,
    /// Upper bound on sessions held in memory; the least recently used go first.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_session_secret() -> String {
    DEFAULT_SESSION_SECRET.to_string()
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_session_idle_secs() -> u64 {
    DEFAULT_SESSION_IDLE_SECS
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_timeout_secs(),
            proxy_url: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: default_session_secret(),
            cookie_name: default_cookie_name(),
            idle_timeout_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl OpenAiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl AuthConfig {
    pub fn google_enabled(&self) -> bool {
        is_set(&self.google_client_id) && is_set(&self.google_client_secret)
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), PredictError> {
        let openai = &self.openai;
        if !(0.0..=2.0).contains(&openai.temperature) {
            return Err(PredictError::ConfigError(format!(
                "temperature must be within [0, 2], got {}",
                openai.temperature
            )));
        }
        if openai.request_timeout_secs == 0 {
            return Err(PredictError::ConfigError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if openai.model.trim().is_empty() {
            return Err(PredictError::ConfigError("model must not be empty".to_string()));
        }
        if let Some(proxy) = &openai.proxy_url {
            if !PROXY_SCHEMES.iter().any(|scheme| proxy.starts_with(scheme)) {
                return Err(PredictError::ConfigError(format!(
                    "unsupported proxy URL '{}': expected one of {}",
                    proxy,
                    PROXY_SCHEMES.join(", ")
                )));
            }
        }
        if is_set(&self.auth.google_client_id) != is_set(&self.auth.google_client_secret) {
            return Err(PredictError::ConfigError(
                "Google login needs both GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET".to_string(),
            ));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(PredictError::ConfigError(
                "session cookie_name must not be empty".to_string(),
            ));
        }
        if self.session.idle_timeout_secs == 0 || self.session.max_sessions == 0 {
            return Err(PredictError::ConfigError(
                "session idle_timeout_secs and max_sessions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
