//! Server-side sessions keyed by a signed cookie.
//!
//! The cookie carries only `<id>.<sha256(secret:id)>`; everything else lives in
//! memory. A missing, unknown, expired or forged cookie yields a fresh, empty
//! session. Idle sessions are evicted, and the store never holds more than
//! `max_sessions` entries.
//! Prediction logic never looks inside a session; only the identity check does.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use hist4x4_core::config::SessionConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};

/// Longest nickname kept, in characters.
pub const MAX_NICK_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub user: Option<UserInfo>,
    pub guest: bool,
    pub nick: Option<String>,
    pub oauth_state: Option<String>,
}

impl SessionData {
    /// Logged in or explicitly continuing as a guest.
    pub fn is_identified(&self) -> bool {
        self.user.is_some() || self.guest
    }

    pub fn enter_guest_mode(&mut self) {
        self.guest = true;
        self.user = None;
    }

    pub fn log_in(&mut self, user: UserInfo) {
        self.user = Some(user);
        self.guest = false;
    }

    /// Trims and caps the nickname; an empty one clears it.
    pub fn set_nick(&mut self, raw: &str) -> Option<&str> {
        let nick: String = raw.trim().chars().take(MAX_NICK_CHARS).collect();
        let nick = nick.trim_end().to_string();
        self.nick = if nick.is_empty() { None } else { Some(nick) };
        self.nick.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    pub data: SessionData,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }
}

struct StoredSession {
    data: SessionData,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
    secret: Arc<str>,
    cookie_name: Arc<str>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            secret: Arc::from(config.secret.as_str()),
            cookie_name: Arc::from(config.cookie_name.as_str()),
            idle_timeout: config.idle_timeout(),
            max_sessions: config.max_sessions.max(1),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// The session named by the request cookie, or a fresh one.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        if let Some(id) = self.session_id_from(headers) {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(&id) {
                Some(stored) if stored.last_seen.elapsed() < self.idle_timeout => {
                    stored.last_seen = Instant::now();
                    return Session {
                        id,
                        data: stored.data.clone(),
                    };
                }
                Some(_) => {
                    sessions.remove(&id);
                }
                None => {}
            }
        }
        Session {
            id: uuid::Uuid::new_v4().simple().to_string(),
            data: SessionData::default(),
        }
    }

    /// Persists the session and returns the `Set-Cookie` value for it.
    pub async fn save(&self, session: &Session) -> Result<HeaderValue> {
        {
            let mut sessions = self.sessions.write().await;
            let idle_timeout = self.idle_timeout;
            sessions.retain(|_, stored| stored.last_seen.elapsed() < idle_timeout);

            if !sessions.contains_key(&session.id) && sessions.len() >= self.max_sessions {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, stored)| stored.last_seen)
                    .map(|(id, _)| id.clone());
                if let Some(oldest) = oldest {
                    log::debug!("Session store full, evicting session {}", oldest);
                    sessions.remove(&oldest);
                }
            }

            sessions.insert(
                session.id.clone(),
                StoredSession {
                    data: session.data.clone(),
                    last_seen: Instant::now(),
                },
            );
        }
        self.cookie_header(&format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name,
            self.sign(&session.id),
            self.idle_timeout.as_secs()
        ))
    }

    /// Drops the session and returns a `Set-Cookie` value expiring the cookie.
    pub async fn destroy(&self, session: &Session) -> Result<HeaderValue> {
        self.sessions.write().await.remove(&session.id);
        self.cookie_header(&format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        ))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn cookie_header(&self, value: &str) -> Result<HeaderValue> {
        HeaderValue::from_str(value)
            .map_err(|e| ServerError::internal(format!("invalid {} header: {}", SET_COOKIE, e)))
    }

    fn signature(&self, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(id.as_bytes());
        hasher.finalize().iter().fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{:02x}", byte);
            out
        })
    }

    fn sign(&self, id: &str) -> String {
        format!("{}.{}", id, self.signature(id))
    }

    fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id, signature) = cookie_value.split_once('.')?;
        (!id.is_empty() && self.signature(id) == signature).then(|| id.to_string())
    }

    fn session_id_from(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == &*self.cookie_name)
            .and_then(|(_, value)| self.verify(value.trim()))
    }
}
