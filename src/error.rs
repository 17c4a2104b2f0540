// Error taxonomy shared by the OAuth and GData clients.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection or timeout failure before a response was read.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Operation needs credentials that are missing or incomplete. Raised
    /// before any network I/O happens.
    #[error("not authenticated: {0}")]
    Auth(&'static str),

    /// The endpoint answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Protocol {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The response body did not carry the fields the protocol requires.
    #[error("malformed response: {0}")]
    Parse(String),

    /// Caller-supplied arguments failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Local file access failed (upload sources).
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// The signing collaborator could not produce a signature.
    #[error("signing failed: {0}")]
    Signature(String),
}

impl ApiError {
    /// Status code of the upstream response, when there was one.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Turns a non-2xx response into `ApiError::Protocol`, logging the body the
/// way the upstream sent it.
pub(crate) async fn check_status(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!("{} failed with HTTP {}: {}", endpoint, status, body);
    Err(ApiError::Protocol {
        endpoint,
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_carries_status() {
        let err = ApiError::Protocol {
            endpoint: "request token",
            status: StatusCode::UNAUTHORIZED,
            body: "signature_invalid".to_string(),
        };
        assert_eq!(err.upstream_status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("signature_invalid"));
    }

    #[test]
    fn auth_error_has_no_upstream_status() {
        let err = ApiError::Auth("data requests require an access token");
        assert_eq!(err.upstream_status(), None);
    }

    #[tokio::test]
    async fn non_2xx_response_becomes_protocol_error() {
        let response = axum::http::Response::builder()
            .status(403)
            .body("too_many_recent_calls")
            .unwrap();
        let err = check_status("feed request", reqwest::Response::from(response))
            .await
            .unwrap_err();
        match err {
            ApiError::Protocol {
                status, ref body, ..
            } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "too_many_recent_calls");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_response_passes_through() {
        let response = axum::http::Response::builder()
            .status(200)
            .body("<feed/>")
            .unwrap();
        let response = check_status("feed request", reqwest::Response::from(response))
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "<feed/>");
    }
}
