// OAuth handshake controller.
// Begins the three-legged exchange and handles the provider callback.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use gdata_gateway::token_store;

use crate::handlers::{error_response, service_unavailable};
use crate::AppState;

pub fn oauth_routes() -> Router {
    Router::new()
        .route("/youtube/connect", get(connect))
        .route("/youtube/callback", get(callback))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
}

/// Starts the handshake. Returns the authorize URL as JSON so the frontend
/// can redirect; the request-token secret (HMAC/PLAINTEXT) is parked in the
/// token store until the callback arrives.
async fn connect(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let oauth = state
        .oauth_client
        .as_ref()
        .ok_or_else(|| service_unavailable("OAuth consumer credentials not configured"))?;

    let response = oauth
        .request_token(&state.callback_url)
        .await
        .map_err(error_response)?;

    if let Some(secret) = &response.token_secret {
        state
            .token_store
            .put(
                &token_store::request_secret_key(&response.token),
                secret.clone(),
            )
            .await;
    }

    tracing::info!("OAuth handshake started, redirecting user to consent page");

    Ok(Json(json!({
        "success": true,
        "authorize_url": response.authorize_url,
        "message": "Redirect the user to authorize_url"
    })))
}

/// Provider callback: exchanges the authorized request token for the
/// long-lived access token and persists it.
async fn callback(
    Query(params): Query<CallbackQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let oauth = state.oauth_client.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Html("<h1>OAuth consumer credentials not configured</h1>".to_string()),
    ))?;

    let token = params.oauth_token.ok_or((
        StatusCode::BAD_REQUEST,
        Html("<h1>Missing oauth_token parameter</h1>".to_string()),
    ))?;
    let verifier = params.oauth_verifier.ok_or((
        StatusCode::BAD_REQUEST,
        Html("<h1>Missing oauth_verifier parameter</h1>".to_string()),
    ))?;

    let secret = state
        .token_store
        .take(&token_store::request_secret_key(&token))
        .await;

    let access = oauth
        .access_token(&token, secret.as_deref(), &verifier)
        .await
        .map_err(|e| {
            tracing::error!("access token exchange failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Html(format!("<h1>Token exchange failed</h1><p>{}</p>", e)),
            )
        })?;

    let serialized = serde_json::to_string(&access).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("<h1>Failed to persist token</h1><p>{}</p>", e)),
        )
    })?;
    state
        .token_store
        .put(&token_store::access_token_key("default"), serialized)
        .await;

    tracing::info!("✅ YouTube account connected");

    Ok(Html(
        r#"<!DOCTYPE html><html><head><title>Account Connected</title></head>
<body><h1>✅ YouTube Account Connected</h1>
<p>The access token has been stored. You can close this window.</p>
</body></html>"#
            .to_string(),
    ))
}
