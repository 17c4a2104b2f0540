// OAuth 1.0a request signing: signature base string construction and the
// Authorization header. HMAC-SHA1 and PLAINTEXT are implemented here;
// RSA-SHA1 is delegated to a caller-provided collaborator because the key
// material lives outside this service.

use std::fmt;
use std::sync::Arc;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use rand::RngCore;
use ring::hmac;

use crate::error::ApiError;

const OAUTH_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    HmacSha1,
    Plaintext,
    RsaSha1,
}

impl SignatureMethod {
    /// Wire name sent as `oauth_signature_method`.
    pub fn label(self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::Plaintext => "PLAINTEXT",
            SignatureMethod::RsaSha1 => "RSA-SHA1",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "HMAC-SHA1" => Some(SignatureMethod::HmacSha1),
            "PLAINTEXT" => Some(SignatureMethod::Plaintext),
            "RSA-SHA1" => Some(SignatureMethod::RsaSha1),
            _ => None,
        }
    }

    /// Whether the request-token secret must be retained between handshake
    /// legs. RSA signatures never involve the token secret.
    pub fn needs_token_secret(self) -> bool {
        !matches!(self, SignatureMethod::RsaSha1)
    }
}

/// RSA-SHA1 signing collaborator. Receives the finished signature base
/// string and returns the raw signature bytes.
pub trait RsaSha1Sign: Send + Sync {
    fn sign(&self, base_string: &str) -> Result<Vec<u8>, String>;
}

/// Immutable consumer credentials plus the signature algorithm they were
/// registered with. An access token obtained through one consumer is only
/// ever signed with that same consumer.
#[derive(Clone)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
    pub method: SignatureMethod,
    rsa: Option<Arc<dyn RsaSha1Sign>>,
}

impl Consumer {
    pub fn new(key: impl Into<String>, secret: impl Into<String>, method: SignatureMethod) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            method,
            rsa: None,
        }
    }

    /// Attach the RSA collaborator; required before signing with
    /// `SignatureMethod::RsaSha1`.
    pub fn with_rsa_signer(mut self, signer: Arc<dyn RsaSha1Sign>) -> Self {
        self.rsa = Some(signer);
        self
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("key", &self.key)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// RFC 3986 percent-encoding: everything but unreserved characters.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `enc(consumer_secret)&enc(token_secret)`, with an empty token part when
/// no token secret applies.
fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or(""))
    )
}

fn hmac_sha1(key: &str, data: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key.as_bytes());
    let tag = hmac::sign(&key, data.as_bytes());
    BASE64_STANDARD.encode(tag.as_ref())
}

/// `METHOD&enc(base_url)&enc(sorted k=v pairs)`. Query parameters already on
/// the URL are folded into the parameter set so the URL can be signed as it
/// will be sent.
pub(crate) fn signature_base_string(
    http_method: &str,
    url: &str,
    params: &[(String, String)],
) -> String {
    let (base_url, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    if let Some(query) = query {
        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            pairs.push((percent_encode(&k), percent_encode(&v)));
        }
    }
    pairs.sort();

    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        http_method.to_uppercase(),
        percent_encode(base_url),
        percent_encode(&joined)
    )
}

/// Builds the `Authorization: OAuth ...` header for one request.
///
/// `extra` carries the protocol parameters beyond the five standard ones:
/// `oauth_callback`, `oauth_token`, `oauth_verifier` as the leg requires.
/// Query parameters on `url` are signed but never emitted in the header, so
/// non-protocol values like `scope` belong on the URL.
pub fn authorization_header(
    consumer: &Consumer,
    http_method: &str,
    url: &str,
    extra: &[(&str, &str)],
    token_secret: Option<&str>,
) -> Result<String, ApiError> {
    let mut params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), consumer.key.clone()),
        ("oauth_nonce".to_string(), nonce()),
        (
            "oauth_signature_method".to_string(),
            consumer.method.label().to_string(),
        ),
        (
            "oauth_timestamp".to_string(),
            chrono::Utc::now().timestamp().to_string(),
        ),
        ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
    ];
    params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    let base = signature_base_string(http_method, url, &params);
    let signature = match consumer.method {
        SignatureMethod::HmacSha1 => hmac_sha1(&signing_key(&consumer.secret, token_secret), &base),
        SignatureMethod::Plaintext => signing_key(&consumer.secret, token_secret),
        SignatureMethod::RsaSha1 => {
            let signer = consumer.rsa.as_ref().ok_or_else(|| {
                ApiError::Signature(
                    "RSA-SHA1 selected but no signing collaborator configured".to_string(),
                )
            })?;
            BASE64_STANDARD.encode(signer.sign(&base).map_err(ApiError::Signature)?)
        }
    };
    params.push(("oauth_signature".to_string(), signature));
    params.sort();

    let fields = params
        .iter()
        .filter(|(k, _)| k.starts_with("oauth_"))
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {fields}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference request from OAuth Core 1.0 Appendix A.5.
    fn reference_params() -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), "dpf43f3p2l4k3l03".to_string()),
            ("oauth_token".to_string(), "nnch734d00sl2jdk".to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), "1191242096".to_string()),
            ("oauth_nonce".to_string(), "kllo9940pd9333jh".to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]
    }

    #[test]
    fn base_string_matches_reference_vector() {
        let base = signature_base_string(
            "GET",
            "http://photos.example.net/photos?file=vacation.jpg&size=original",
            &reference_params(),
        );
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26\
             oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096%26\
             oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn hmac_sha1_matches_reference_vector() {
        let base = signature_base_string(
            "GET",
            "http://photos.example.net/photos?file=vacation.jpg&size=original",
            &reference_params(),
        );
        let key = signing_key("kd94hf93k423kf44", Some("pfkkdhi9sl3r4s00"));
        assert_eq!(hmac_sha1(&key, &base), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
    }

    #[test]
    fn signing_key_with_and_without_token_secret() {
        assert_eq!(signing_key("abc", Some("xyz")), "abc&xyz");
        assert_eq!(signing_key("abc", None), "abc&");
        assert_eq!(signing_key("a b", Some("x/z")), "a%20b&x%2Fz");
    }

    #[test]
    fn header_contains_only_oauth_parameters() {
        let consumer = Consumer::new("key", "secret", SignatureMethod::HmacSha1);
        let header = authorization_header(
            &consumer,
            "GET",
            "https://www.google.com/accounts/OAuthGetRequestToken?scope=https%3A%2F%2Fgdata.youtube.com",
            &[("oauth_callback", "http://localhost:3000/youtube/callback")],
            None,
        )
        .unwrap();
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"key\""));
        assert!(header.contains("oauth_signature="));
        assert!(header.contains("oauth_callback="));
        assert!(!header.contains("scope="));
    }

    #[test]
    fn plaintext_signature_is_the_signing_key() {
        let consumer = Consumer::new("key", "secret", SignatureMethod::Plaintext);
        let header =
            authorization_header(&consumer, "GET", "https://example.org/token", &[], Some("ts"))
                .unwrap();
        // secret&ts, percent-encoded for the header: & -> %26
        assert!(header.contains("oauth_signature=\"secret%26ts\""));
    }

    #[test]
    fn rsa_without_collaborator_is_a_signature_error() {
        let consumer = Consumer::new("key", "secret", SignatureMethod::RsaSha1);
        let err = authorization_header(&consumer, "GET", "https://example.org/token", &[], None)
            .unwrap_err();
        assert!(matches!(err, ApiError::Signature(_)));
    }

    #[test]
    fn rsa_collaborator_output_is_base64_encoded() {
        struct Fixed;
        impl RsaSha1Sign for Fixed {
            fn sign(&self, _base: &str) -> Result<Vec<u8>, String> {
                Ok(vec![1, 2, 3])
            }
        }
        let consumer = Consumer::new("key", "secret", SignatureMethod::RsaSha1)
            .with_rsa_signer(Arc::new(Fixed));
        let header = authorization_header(&consumer, "GET", "https://example.org/token", &[], None)
            .unwrap();
        assert!(header.contains(&format!(
            "oauth_signature=\"{}\"",
            percent_encode(&BASE64_STANDARD.encode([1u8, 2, 3]))
        )));
    }

    #[test]
    fn secret_retention_follows_signature_method() {
        assert!(SignatureMethod::HmacSha1.needs_token_secret());
        assert!(SignatureMethod::Plaintext.needs_token_secret());
        assert!(!SignatureMethod::RsaSha1.needs_token_secret());
    }

    #[test]
    fn method_labels_round_trip() {
        for method in [
            SignatureMethod::HmacSha1,
            SignatureMethod::Plaintext,
            SignatureMethod::RsaSha1,
        ] {
            assert_eq!(SignatureMethod::from_label(method.label()), Some(method));
        }
        assert_eq!(SignatureMethod::from_label("HMAC-SHA256"), None);
    }
}
