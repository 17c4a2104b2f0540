// Google legacy OAuth 1.0a token exchange (three-legged flow):
// request token -> user authorization redirect -> access token.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{check_status, ApiError};
use crate::signer::{self, Consumer};

const REQUEST_TOKEN_URL: &str = "https://www.google.com/accounts/OAuthGetRequestToken";
const AUTHORIZE_URL: &str = "https://www.google.com/accounts/OAuthAuthorizeToken";
const ACCESS_TOKEN_URL: &str = "https://www.google.com/accounts/OAuthGetAccessToken";

/// GData service the issued tokens are scoped to.
const SCOPE: &str = "https://gdata.youtube.com";

#[derive(Debug, Clone)]
pub struct GoogleOauthClient {
    client: Client,
    consumer: Consumer,
}

/// Outcome of the first handshake leg. The caller redirects the user agent
/// to `authorize_url`; with HMAC/PLAINTEXT signing it must also retain
/// `token_secret` until the callback arrives.
#[derive(Debug, Clone)]
pub struct RequestTokenResponse {
    pub token: String,
    pub authorize_url: String,
    pub token_secret: Option<String>,
}

/// Long-lived credential pair, persisted through a `TokenStore` and attached
/// to the YouTube client for authenticated calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
}

impl GoogleOauthClient {
    pub fn new(consumer: Consumer, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, consumer })
    }

    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// First leg: obtain an unauthorized request token and the URL the user
    /// must visit to grant access. `callback` is where Google sends the user
    /// agent afterwards, carrying `oauth_token` and `oauth_verifier`.
    pub async fn request_token(&self, callback: &str) -> Result<RequestTokenResponse, ApiError> {
        // scope rides on the URL so it is signed but kept out of the header
        let url = format!(
            "{}?scope={}",
            REQUEST_TOKEN_URL,
            signer::percent_encode(SCOPE)
        );
        let auth = signer::authorization_header(
            &self.consumer,
            "GET",
            &url,
            &[("oauth_callback", callback)],
            None,
        )?;

        tracing::info!("requesting OAuth request token");
        let response = self
            .client
            .get(&url)
            .header("Authorization", auth)
            .send()
            .await?;
        let response = check_status("request token", response).await?;
        let body = response.text().await?;

        let (token, secret) = parse_token_body(&body)?;
        let authorize_url = format!(
            "{}?oauth_token={}",
            AUTHORIZE_URL,
            signer::percent_encode(&token)
        );
        let token_secret = self
            .consumer
            .method
            .needs_token_secret()
            .then_some(secret);

        Ok(RequestTokenResponse {
            token,
            authorize_url,
            token_secret,
        })
    }

    /// Final leg: trade the authorized request token plus verifier for the
    /// long-lived access token. `token_secret` is the value retained from
    /// `request_token` (HMAC/PLAINTEXT only; pass `None` for RSA).
    pub async fn access_token(
        &self,
        token: &str,
        token_secret: Option<&str>,
        verifier: &str,
    ) -> Result<AccessToken, ApiError> {
        let auth = signer::authorization_header(
            &self.consumer,
            "GET",
            ACCESS_TOKEN_URL,
            &[("oauth_token", token), ("oauth_verifier", verifier)],
            token_secret,
        )?;

        let response = self
            .client
            .get(ACCESS_TOKEN_URL)
            .header("Authorization", auth)
            .send()
            .await?;
        let response = check_status("access token", response).await?;
        let body = response.text().await?;

        let (token, secret) = parse_token_body(&body)?;
        tracing::info!("OAuth access token issued");
        Ok(AccessToken { token, secret })
    }
}

/// Token endpoints answer with a URL-encoded body:
/// `oauth_token=...&oauth_token_secret=...`. Both fields are required; a
/// response missing either is a protocol defect, not a half-usable token.
fn parse_token_body(body: &str) -> Result<(String, String), ApiError> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
            Ok((token, secret))
        }
        (None, _) => Err(ApiError::Parse(
            "token response missing oauth_token".to_string(),
        )),
        (_, None) => Err(ApiError::Parse(
            "token response missing oauth_token_secret".to_string(),
        )),
        _ => Err(ApiError::Parse(
            "token response has empty token fields".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_body() {
        let (token, secret) =
            parse_token_body("oauth_token=ab%2Fcd&oauth_token_secret=xyz&oauth_callback_confirmed=true")
                .unwrap();
        assert_eq!(token, "ab/cd");
        assert_eq!(secret, "xyz");
    }

    #[test]
    fn missing_token_is_a_parse_error() {
        let err = parse_token_body("oauth_token_secret=xyz").unwrap_err();
        assert!(matches!(err, ApiError::Parse(ref msg) if msg.contains("oauth_token")));
    }

    #[test]
    fn missing_secret_is_a_parse_error() {
        let err = parse_token_body("oauth_token=abcd").unwrap_err();
        assert!(matches!(err, ApiError::Parse(ref msg) if msg.contains("oauth_token_secret")));
    }

    #[test]
    fn empty_fields_are_a_parse_error() {
        let err = parse_token_body("oauth_token=&oauth_token_secret=").unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
