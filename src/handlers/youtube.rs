// YouTube GData routes: feed reads, comment/rating writes and direct upload.

use std::collections::HashMap;
use std::path::Path as FilePath;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use gdata_gateway::oauth_client::AccessToken;
use gdata_gateway::token_store;
use gdata_gateway::youtube_client::{self, StandardFeed, YouTubeClient};

use crate::handlers::{error_response, service_unavailable};
use crate::AppState;

pub fn youtube_routes() -> Router {
    Router::new()
        .route("/api/videos/search", get(search_videos))
        .route("/api/videos/:video_id", get(video_entry))
        .route("/api/videos/:video_id/related", get(related_videos))
        .route(
            "/api/videos/:video_id/comments",
            get(video_comments).post(add_comment),
        )
        .route("/api/videos/:video_id/rating", post(rate_video))
        .route("/api/feeds/:feed", get(standard_feed))
        .route("/api/users/:user/uploads", get(user_uploads))
        .route("/api/users/:user/playlists", get(user_playlists))
        .route("/api/upload", post(direct_upload))
}

type JsonError = (StatusCode, Json<Value>);
type AtomResponse = ([(HeaderName, &'static str); 1], String);

fn atom(body: String) -> AtomResponse {
    (
        [(header::CONTENT_TYPE, "application/atom+xml; charset=UTF-8")],
        body,
    )
}

/// Builds the client for this request: the shared API-key client, upgraded
/// with the stored access token when one exists.
async fn youtube_for_request(state: &AppState) -> Result<YouTubeClient, JsonError> {
    let base = state
        .youtube_client
        .as_ref()
        .ok_or_else(|| service_unavailable("YouTube API key not configured"))?;

    let mut client = base.clone();
    if let Some(oauth) = state.oauth_client.as_ref() {
        if let Some(raw) = state
            .token_store
            .get(&token_store::access_token_key("default"))
            .await
        {
            match serde_json::from_str::<AccessToken>(&raw) {
                Ok(token) => client = client.with_oauth(oauth.consumer().clone(), token),
                Err(e) => tracing::warn!("stored access token is unreadable: {}", e),
            }
        }
    }
    Ok(client)
}

fn query_params(params: HashMap<String, String>) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = params.into_iter().collect();
    params.sort();
    params
}

// ============================================================================
// Feed reads
// ============================================================================

async fn search_videos(
    Query(mut params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<AtomResponse, JsonError> {
    let query = params.remove("q").ok_or((
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": "missing query parameter 'q'"})),
    ))?;
    let youtube = youtube_for_request(&state).await?;
    let body = youtube
        .keyword_search(&query, &query_params(params))
        .await
        .map_err(error_response)?;
    Ok(atom(body))
}

async fn video_entry(
    Path(video_id): Path<String>,
    Query(mut params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<AtomResponse, JsonError> {
    let full = params.remove("full").as_deref() == Some("true");
    let youtube = youtube_for_request(&state).await?;
    let body = youtube
        .video_entry(&video_id, full, &query_params(params))
        .await
        .map_err(error_response)?;
    Ok(atom(body))
}

async fn related_videos(
    Path(video_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<AtomResponse, JsonError> {
    let youtube = youtube_for_request(&state).await?;
    let body = youtube
        .related_videos(&video_id, &query_params(params))
        .await
        .map_err(error_response)?;
    Ok(atom(body))
}

async fn video_comments(
    Path(video_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<AtomResponse, JsonError> {
    let youtube = youtube_for_request(&state).await?;
    let body = youtube
        .video_comments(&video_id, &query_params(params))
        .await
        .map_err(error_response)?;
    Ok(atom(body))
}

async fn standard_feed(
    Path(feed): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<AtomResponse, JsonError> {
    let feed = StandardFeed::from_name(&feed).ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": format!("unknown standard feed '{feed}'")})),
    ))?;
    let youtube = youtube_for_request(&state).await?;
    let body = youtube
        .standard_feed(feed, &query_params(params))
        .await
        .map_err(error_response)?;
    Ok(atom(body))
}

async fn user_uploads(
    Path(user): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<AtomResponse, JsonError> {
    let youtube = youtube_for_request(&state).await?;
    let body = youtube
        .user_uploads(&user, &query_params(params))
        .await
        .map_err(error_response)?;
    Ok(atom(body))
}

async fn user_playlists(
    Path(user): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<AtomResponse, JsonError> {
    let youtube = youtube_for_request(&state).await?;
    let body = youtube
        .user_playlists(&user, &query_params(params))
        .await
        .map_err(error_response)?;
    Ok(atom(body))
}

// ============================================================================
// Data writes
// ============================================================================

#[derive(Deserialize)]
pub struct AddCommentRequest {
    pub comment: String,
    pub in_reply_to: Option<String>,
}

async fn add_comment(
    Path(video_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Json<Value>, JsonError> {
    let youtube = youtube_for_request(&state).await?;
    let response = youtube
        .add_comment(&video_id, &payload.comment, payload.in_reply_to.as_deref())
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "success": true,
        "message": "Comment posted",
        "response": response
    })))
}

#[derive(Deserialize)]
pub struct RateVideoRequest {
    pub rating: Option<u8>,
    pub like: Option<bool>,
}

async fn rate_video(
    Path(video_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RateVideoRequest>,
) -> Result<Json<Value>, JsonError> {
    let youtube = youtube_for_request(&state).await?;
    let response = match (payload.rating, payload.like) {
        (Some(rating), _) => youtube.add_numeric_rating(&video_id, rating).await,
        (None, Some(like)) => youtube.add_like_dislike(&video_id, like).await,
        (None, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "provide either 'rating' (1-5) or 'like' (true/false)"
                })),
            ))
        }
    }
    .map_err(error_response)?;

    Ok(Json(json!({
        "success": true,
        "message": "Rating submitted",
        "response": response
    })))
}

// ============================================================================
// Direct upload
// ============================================================================

#[derive(Deserialize)]
pub struct DirectUploadRequest {
    /// Path of the video file on this server.
    pub file_path: String,
    /// MIME type of the video, e.g. `video/3gpp`.
    pub content_type: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub user: Option<String>,
}

async fn direct_upload(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<DirectUploadRequest>,
) -> Result<Json<Value>, JsonError> {
    let file_path = FilePath::new(&payload.file_path);
    if !file_path.exists() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "video file not found"})),
        ));
    }

    let youtube = youtube_for_request(&state).await?;
    let metadata = youtube_client::video_metadata_xml(
        &payload.title,
        payload.description.as_deref().unwrap_or(""),
        payload.category.as_deref().unwrap_or("People"),
        payload.keywords.as_deref().unwrap_or(&[]),
    );

    tracing::info!("📤 uploading {} to YouTube", payload.file_path);

    let response = youtube
        .direct_upload(
            file_path,
            &payload.content_type,
            &metadata,
            payload.user.as_deref().unwrap_or("default"),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "success": true,
        "message": "Video uploaded",
        "response": response
    })))
}
