use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router};
use tower_http::cors::CorsLayer;

use gdata_gateway::{oauth_client, signer, token_store, youtube_client};

mod handlers;
mod middleware;

/// Shared per-process state: the two API clients (absent when their
/// credentials are not configured) and the token store collaborator.
pub struct AppState {
    pub youtube_client: Option<youtube_client::YouTubeClient>,
    pub oauth_client: Option<oauth_client::GoogleOauthClient>,
    pub callback_url: String,
    pub token_store: token_store::SharedTokenStore,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let timeout = http_timeout();

    // Initialize the OAuth exchange client if consumer credentials are provided
    let oauth_client = match (
        std::env::var("OAUTH_CONSUMER_KEY").ok(),
        std::env::var("OAUTH_CONSUMER_SECRET").ok(),
    ) {
        (Some(key), Some(secret)) if !key.is_empty() => {
            let method = std::env::var("OAUTH_SIGNATURE_METHOD")
                .ok()
                .map(|label| {
                    signer::SignatureMethod::from_label(&label).unwrap_or_else(|| {
                        tracing::warn!(
                            "unknown OAUTH_SIGNATURE_METHOD '{}', using HMAC-SHA1",
                            label
                        );
                        signer::SignatureMethod::HmacSha1
                    })
                })
                .unwrap_or(signer::SignatureMethod::HmacSha1);

            tracing::info!("Initializing Google OAuth client ({})...", method.label());
            let consumer = signer::Consumer::new(key, secret, method);
            match oauth_client::GoogleOauthClient::new(consumer, timeout) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::error!("Failed to build OAuth client: {}", e);
                    None
                }
            }
        }
        _ => {
            tracing::warn!("OAuth consumer credentials not found. Account connection disabled.");
            tracing::info!("To enable OAuth, set: OAUTH_CONSUMER_KEY, OAUTH_CONSUMER_SECRET");
            None
        }
    };

    // Initialize the YouTube GData client if an API key is provided
    let youtube_client = match std::env::var("YOUTUBE_API_KEY").ok() {
        Some(api_key) if !api_key.is_empty() => {
            tracing::info!("Initializing YouTube GData client...");
            match youtube_client::YouTubeClient::new(api_key, timeout) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::error!("Failed to build YouTube client: {}", e);
                    None
                }
            }
        }
        _ => {
            tracing::warn!("YOUTUBE_API_KEY not found. YouTube routes disabled.");
            None
        }
    };

    let callback_url = std::env::var("OAUTH_CALLBACK_URL")
        .unwrap_or_else(|_| "http://localhost:3000/youtube/callback".to_string());

    let shared_state = Arc::new(AppState {
        youtube_client,
        oauth_client,
        callback_url,
        token_store: Arc::new(token_store::MemoryTokenStore::new()),
    });

    let app = Router::new()
        .merge(handlers::oauth::oauth_routes())
        .merge(handlers::youtube::youtube_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));
    tracing::info!("listening on {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("server exited with an error");
}

/// Transport bound for every upstream call; expiry surfaces as a transport
/// error to the caller.
fn http_timeout() -> Duration {
    let secs = std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    Duration::from_secs(secs)
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,gdata_gateway=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,gdata_gateway=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON logging for production aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("📺 GData gateway starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        }
    );

    Ok(())
}

// API Status endpoint
async fn api_status(
    Extension(state): Extension<Arc<AppState>>,
) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    let youtube_status = if state.youtube_client.is_some() {
        "configured"
    } else {
        "not_configured"
    };
    let oauth_status = if state.oauth_client.is_some() {
        "configured"
    } else {
        "not_configured"
    };
    let connected = state
        .token_store
        .get(&token_store::access_token_key("default"))
        .await
        .is_some();

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "youtube_gdata": youtube_status,
            "google_oauth": oauth_status,
        },
        "account_connected": connected,
        "endpoints": {
            "status": "/api/status",
            "connect": "/youtube/connect",
            "callback": "/youtube/callback",
            "search": "/api/videos/search?q=",
            "feeds": "/api/feeds/:feed",
            "upload": "/api/upload"
        }
    }))
}
