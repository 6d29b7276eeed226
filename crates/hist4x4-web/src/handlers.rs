//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use hist4x4_core::draws::extract_sufficient_draws;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, ServerError};
use crate::page::render_index;
use crate::session::UserInfo;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetNickRequest {
    #[serde(default)]
    pub nick: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub ok: bool,
    pub user: Option<UserInfo>,
    pub guest: bool,
    pub nick: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(state.oauth.is_some()))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn whoami(State(state): State<AppState>, headers: HeaderMap) -> Json<WhoAmI> {
    let session = state.sessions.load(&headers).await;
    Json(WhoAmI {
        ok: true,
        user: session.data.user,
        guest: session.data.guest,
        nick: session.data.nick,
    })
}

pub async fn guest(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let mut session = state.sessions.load(&headers).await;
    session.data.enter_guest_mode();
    let cookie = state.sessions.save(&session).await?;
    log::info!("Session {} switched to guest mode", session.id());
    Ok(([(SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response())
}

pub async fn set_nick(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<SetNickRequest>, JsonRejection>,
) -> Result<Response> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let mut session = state.sessions.load(&headers).await;
    let nick = session
        .data
        .set_nick(request.nick.as_deref().unwrap_or(""))
        .map(str::to_string);
    let cookie = state.sessions.save(&session).await?;
    Ok(([(SET_COOKIE, cookie)], Json(json!({ "ok": true, "nick": nick }))).into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let session = state.sessions.load(&headers).await;
    let cookie = state.sessions.destroy(&session).await?;
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let Some(oauth) = state.oauth.as_ref() else {
        return Ok(Redirect::to("/").into_response());
    };

    let mut session = state.sessions.load(&headers).await;
    let csrf_state = uuid::Uuid::new_v4().simple().to_string();
    session.data.oauth_state = Some(csrf_state.clone());
    let cookie = state.sessions.save(&session).await?;

    let url = oauth.authorize_url(&oauth.redirect_uri(&headers), &csrf_state);
    Ok(([(SET_COOKIE, cookie)], Redirect::to(&url)).into_response())
}

pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(callback): Query<AuthCallback>,
) -> Result<Response> {
    let Some(oauth) = state.oauth.as_ref() else {
        return Ok(Redirect::to("/").into_response());
    };

    let mut session = state.sessions.load(&headers).await;
    let expected_state = session.data.oauth_state.take();

    if let Some(error) = callback.error {
        return Err(ServerError::unauthorized(format!("login was not completed: {}", error)));
    }
    if expected_state.is_none() || callback.state != expected_state {
        return Err(ServerError::unauthorized("login state mismatch, please try again"));
    }
    let code = callback
        .code
        .ok_or_else(|| ServerError::unauthorized("login callback carried no code"))?;

    let user = oauth
        .exchange_code(&code, &oauth.redirect_uri(&headers))
        .await?;
    log::info!("Session {} logged in as {}", session.id(), user.email);
    session.data.log_in(user);
    let cookie = state.sessions.save(&session).await?;
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Response> {
    if state.oauth.is_some() {
        let session = state.sessions.load(&headers).await;
        if !session.data.is_identified() {
            return Err(ServerError::unauthorized(
                "please sign in with Google or continue as guest first",
            ));
        }
    }

    let Json(request) = payload.map_err(|e| ServerError::invalid_request(e.body_text()))?;
    let draws = extract_sufficient_draws(request.text.trim())?;
    log::info!("Predicting from {} draws", draws.len());

    let result = state.predictor.predict(&draws).await?;
    Ok(Json(result).into_response())
}
