//! Client library for Google's legacy OAuth 1.0a handshake and the YouTube
//! GData v2 API. The binary in `main.rs` wires these into an axum service.

pub mod error;
pub mod oauth_client;
pub mod signer;
pub mod token_store;
pub mod youtube_client;
