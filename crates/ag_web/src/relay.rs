//! `POST /wp-proxy`: forwards posts and connection tests to WordPress so the
//! browser never talks to the site directly.

use std::fmt;
use std::sync::Arc;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ag_core::WordPressCredentials;
use ag_publish::{NewPost, RelayPayload, RelayTestResponse, SiteAuth, WordPressError, PROXY_KEY_HEADER};
use crate::AppState;

#[derive(Clone, Default)]
pub struct RelayConfig {
    /// Shared secret expected in `x-wp-proxy-key`. Unset means open.
    pub proxy_key: Option<String>,
    /// Used for any credential field the request leaves blank.
    pub defaults: WordPressCredentials,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("proxy_key", &self.proxy_key.as_deref().map(|_| "<redacted>"))
            .field("defaults", &self.defaults)
            .finish()
    }
}

fn pick(hint: Option<&str>, fallback: &str) -> String {
    hint.map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.trim())
        .to_string()
}

fn wordpress_failure(error: WordPressError) -> Response {
    match error {
        WordPressError::Status { .. } => {
            tracing::warn!(error = %error, "relay: WordPress rejected the request");
            (StatusCode::BAD_GATEWAY, error.to_string()).into_response()
        }
        WordPressError::Transport(e) => {
            tracing::error!(error = %e, "relay: WordPress unreachable");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Unexpected error: {}", e)).into_response()
        }
    }
}

pub async fn wp_proxy(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let relay = &state.relay;
    if let Some(expected) = relay.proxy_key.as_deref().filter(|key| !key.is_empty()) {
        let given = headers
            .get(PROXY_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if given != expected {
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }

    let payload: RelayPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e)).into_response(),
    };

    let hints = payload.credentials.clone().unwrap_or_default();
    let url = pick(hints.url.as_deref(), &relay.defaults.url);
    let username = pick(hints.username.as_deref(), &relay.defaults.username);
    let app_password = pick(hints.app_password.as_deref(), &relay.defaults.app_password);
    if url.is_empty() || username.is_empty() || app_password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing WordPress credentials").into_response();
    }
    let site = SiteAuth { url: &url, username: &username, app_password: &app_password };

    if payload.test {
        return match state.wordpress.current_user(&site).await {
            Ok(user) => Json(RelayTestResponse { ok: true, user }).into_response(),
            Err(e) => wordpress_failure(e),
        };
    }

    let post = NewPost {
        title: payload.title.as_deref().unwrap_or_default(),
        content: payload.content_html.as_deref().unwrap_or_default(),
        status: payload.status.unwrap_or_default(),
        excerpt: payload.excerpt.as_deref(),
    };
    match state.wordpress.create_post(&site, &post).await {
        Ok(created) => {
            tracing::info!(id = created.id, "relay: post created");
            Json(created).into_response()
        }
        Err(e) => wordpress_failure(e),
    }
}
