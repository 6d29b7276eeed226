//! HTTP front end for the hist4x4 predictor
//!
//! Serves the page, the session and login endpoints, and `/predict`, which
//! parses pasted history and hands it to a [`Predictor`]. The predictor and
//! configuration are injected at construction; handlers share no mutable state
//! beyond the session store.

pub mod error;
pub mod handlers;
pub mod oauth;
pub mod page;
pub mod session;

pub use error::{Result, ServerError};
pub use oauth::GoogleOAuth;
pub use session::{SessionData, SessionStore, UserInfo};

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Router};
use hist4x4_core::{AppConfig, Predictor};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<HeaderValue>>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable request logging
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            enable_cors: false,
            cors_origins: None,
            max_body_size: 1024 * 1024, // 1MB
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address '{}': {}", addr, e)))?;
        Ok(self)
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    /// Restricts CORS to `origins`; every entry must be a valid header value.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Result<Self> {
        let origins = origins
            .iter()
            .map(|origin| {
                let origin = origin.trim();
                if origin.is_empty() || origin == "*" {
                    return Err(ServerError::config_error(format!(
                        "Invalid CORS origin '{}': expected a concrete origin",
                        origin
                    )));
                }
                HeaderValue::from_str(origin).map_err(|e| {
                    ServerError::config_error(format!("Invalid CORS origin '{}': {}", origin, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if origins.is_empty() {
            return Err(ServerError::config_error("CORS origin list must not be empty"));
        }
        self.cors_origins = Some(origins);
        Ok(self)
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub sessions: SessionStore,
    pub oauth: Option<GoogleOAuth>,
}

pub struct Hist4x4Server {
    state: AppState,
    config: ServerConfig,
}

impl Hist4x4Server {
    pub fn new(predictor: Arc<dyn Predictor>, app_config: &AppConfig, config: ServerConfig) -> Self {
        let oauth = GoogleOAuth::from_config(&app_config.auth);
        if oauth.is_none() {
            log::info!("Google login not configured; /predict is open to every visitor");
        }
        Self {
            state: AppState {
                predictor,
                sessions: SessionStore::new(&app_config.session),
                oauth,
            },
            config,
        }
    }

    /// Replaces the login provider, e.g. to point it at another endpoint.
    pub fn with_oauth(mut self, oauth: Option<GoogleOAuth>) -> Self {
        self.state.oauth = oauth;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route("/predict", post(handlers::predict))
            .route("/whoami", get(handlers::whoami))
            .route("/guest", post(handlers::guest))
            .route("/setnick", post(handlers::set_nick))
            .route("/logout", get(handlers::logout))
            .route("/login", get(handlers::login))
            .route("/auth", get(handlers::auth_callback))
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(self.state.clone());

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async move {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let path = log_target(request.uri()).to_string();

                    // The page polls identity on every load.
                    if path == "/whoami" {
                        log::debug!("Request {} {} {}", request_id, method, path);
                    } else {
                        log::info!("Request {} {} {}", request_id, method, path);
                    }

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    log::info!(
                        "Response {} {} completed in {:?}",
                        request_id,
                        response.status(),
                        start.elapsed()
                    );
                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = match self.config.cors_origins {
                Some(ref origins) => CorsLayer::new()
                    .allow_origin(origins.clone())
                    .allow_methods(Any)
                    .allow_headers(Any),
                None => CorsLayer::permissive(),
            };
            router = router.layer(cors_layer);
        }

        router
    }

    /// Start the server; returns once `shutdown_signal` resolves and in-flight
    /// requests have finished.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!("hist4x4 server starting on http://{}", self.config.bind_addr);
        log::info!("Predict endpoint: http://{}/predict", self.config.bind_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("hist4x4 server shut down gracefully");
        Ok(())
    }
}

/// The part of a request URI that may be logged. Query strings are left out;
/// `/auth` carries the OAuth code there.
fn log_target(uri: &axum::http::Uri) -> &str {
    uri.path()
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}
