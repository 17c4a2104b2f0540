// src/handlers/mod.rs
pub mod oauth;
pub mod youtube;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use gdata_gateway::error::ApiError;

/// Maps a client error onto the HTTP surface: authentication problems are
/// the caller's 401, upstream failures are gateway-class.
pub(crate) fn error_response(err: ApiError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
        ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ApiError::Transport(cause) if cause.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        ApiError::Transport(_) => StatusCode::BAD_GATEWAY,
        ApiError::Protocol { .. } | ApiError::Parse(_) => StatusCode::BAD_GATEWAY,
        ApiError::Io(_) | ApiError::Signature(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let upstream_status = err.upstream_status().map(|s| s.as_u16());
    tracing::error!("request failed: {}", err);
    (
        status,
        Json(json!({
            "success": false,
            "message": err.to_string(),
            "upstream_status": upstream_status,
        })),
    )
}

pub(crate) fn service_unavailable(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"success": false, "message": message})),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_401() {
        let (status, _) = error_response(ApiError::Auth("no token"));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn protocol_errors_map_to_502_and_carry_upstream_status() {
        let (status, Json(body)) = error_response(ApiError::Protocol {
            endpoint: "feed request",
            status: StatusCode::FORBIDDEN,
            body: "too_many_recent_calls".to_string(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["upstream_status"], 403);
    }

    #[test]
    fn invalid_request_maps_to_400() {
        let (status, _) = error_response(ApiError::InvalidRequest("rating".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
