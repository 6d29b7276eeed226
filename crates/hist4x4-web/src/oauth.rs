//! Google sign-in (OAuth 2.0 authorization code flow).
//!
//! Only what the page needs: build the consent URL, trade the code for an
//! access token and read the user's email and name.

use axum::http::header::HOST;
use axum::http::HeaderMap;
use hist4x4_core::config::AuthConfig;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Result, ServerError};
use crate::session::UserInfo;

pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
pub const OAUTH_SCOPE: &str = "openid email profile";
pub const CALLBACK_PATH: &str = "/auth";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    public_base_url: Option<String>,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuth {
    /// `None` unless both client id and secret are configured.
    pub fn from_config(auth: &AuthConfig) -> Option<Self> {
        if !auth.google_enabled() {
            return None;
        }
        Some(Self {
            client: Client::new(),
            client_id: auth.google_client_id.clone().unwrap_or_default(),
            client_secret: auth.google_client_secret.clone().unwrap_or_default(),
            public_base_url: auth.public_base_url.clone(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }

    /// Points token and userinfo calls somewhere else.
    pub fn with_endpoints(mut self, token_url: String, userinfo_url: String) -> Self {
        self.token_url = token_url;
        self.userinfo_url = userinfo_url;
        self
    }

    /// The callback URL Google redirects back to.
    pub fn redirect_uri(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}{}", base.trim_end_matches('/'), CALLBACK_PATH);
        }
        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("127.0.0.1:8000");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        format!("{}://{}{}", scheme, host, CALLBACK_PATH)
    }

    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            GOOGLE_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(OAUTH_SCOPE),
            urlencoding::encode(state)
        )
    }

    /// Trades an authorization code for the signed-in user's identity.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<UserInfo> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ServerError::OAuth(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServerError::OAuth(format!(
                "token endpoint returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServerError::OAuth(format!("invalid token response: {}", e)))?;

        let info: UserInfoResponse = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServerError::OAuth(format!("userinfo request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ServerError::OAuth(format!("invalid userinfo response: {}", e)))?;

        let email = info
            .email
            .ok_or_else(|| ServerError::OAuth("userinfo response has no email".to_string()))?;
        Ok(UserInfo {
            email,
            name: info.name,
        })
    }
}
