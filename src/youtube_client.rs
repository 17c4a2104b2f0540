// YouTube GData API v2 client: feed reads, authenticated Atom data writes
// and streaming multipart direct uploads.
// Protocol reference: http://code.google.com/apis/youtube/2.0/reference.html

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use rand::RngCore;
use reqwest::{Body, Client, Method};
use tokio_util::io::ReaderStream;

use crate::error::{check_status, ApiError};
use crate::oauth_client::AccessToken;
use crate::signer::{self, Consumer};

const FEED_BASE: &str = "http://gdata.youtube.com";
/// Direct uploads go to a dedicated host; it is a per-request URL, never a
/// change to the client's own base.
const UPLOAD_BASE: &str = "http://uploads.gdata.youtube.com";

const GDATA_VERSION: &str = "2.0";
const API_VERSION: &str = "2";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const YT_NS: &str = "http://gdata.youtube.com/schemas/2007";
const GD_NS: &str = "http://schemas.google.com/g/2005";
const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";

/// Read granularity for the streamed file part of a direct upload.
const UPLOAD_CHUNK_SIZE: usize = 8192;

// ============================================================================
// Endpoint catalog
// ============================================================================

/// GData resources this client talks to, mapped to their path templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    TopRated,
    MostPopular,
    MostRecent,
    RecentlyFeatured,
    WatchOnMobile,
    Playlists,
    Users,
    Inbox,
    Subscriptions,
    Favorites,
    Videos,
    UploadToken,
}

impl Feed {
    pub fn path(self) -> &'static str {
        match self {
            Feed::TopRated => "feeds/api/standardfeeds/top_rated",
            Feed::MostPopular => "feeds/api/standardfeeds/most_popular",
            Feed::MostRecent => "feeds/api/standardfeeds/most_recent",
            Feed::RecentlyFeatured => "feeds/api/standardfeeds/recently_featured",
            Feed::WatchOnMobile => "feeds/api/standardfeeds/watch_on_mobile",
            Feed::Playlists => "feeds/api/playlists",
            Feed::Users => "feeds/api/users",
            Feed::Inbox => "feeds/api/users/default/inbox",
            Feed::Subscriptions => "feeds/api/users/default/subscriptions",
            Feed::Favorites => "feeds/api/users/default/favorites",
            Feed::Videos => "feeds/api/videos",
            Feed::UploadToken => "action/GetUploadToken",
        }
    }
}

/// The site-wide feeds YouTube publishes without any user in the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFeed {
    TopRated,
    MostPopular,
    MostRecent,
    RecentlyFeatured,
    WatchOnMobile,
}

impl StandardFeed {
    pub fn feed(self) -> Feed {
        match self {
            StandardFeed::TopRated => Feed::TopRated,
            StandardFeed::MostPopular => Feed::MostPopular,
            StandardFeed::MostRecent => Feed::MostRecent,
            StandardFeed::RecentlyFeatured => Feed::RecentlyFeatured,
            StandardFeed::WatchOnMobile => Feed::WatchOnMobile,
        }
    }

    /// Route-facing names. `most_viewed` is the historical alias for
    /// `most_popular`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "top_rated" => Some(StandardFeed::TopRated),
            "most_popular" | "most_viewed" => Some(StandardFeed::MostPopular),
            "most_recent" => Some(StandardFeed::MostRecent),
            "recently_featured" => Some(StandardFeed::RecentlyFeatured),
            "watch_on_mobile" => Some(StandardFeed::WatchOnMobile),
            _ => None,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// OAuth credentials attached to a client: the consumer that issued the
/// token and the token itself. The pairing is fixed at construction, so a
/// token can never be signed with a foreign consumer.
#[derive(Debug, Clone)]
pub struct OauthSession {
    pub consumer: Consumer,
    pub token: AccessToken,
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    oauth: Option<OauthSession>,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            oauth: None,
        })
    }

    /// Returns a client whose requests are OAuth-signed. Reads work either
    /// way; data requests and uploads require this.
    pub fn with_oauth(mut self, consumer: Consumer, token: AccessToken) -> Self {
        self.oauth = Some(OauthSession { consumer, token });
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.oauth.is_some()
    }

    fn auth_header(&self, method: &str, url: &str) -> Result<Option<String>, ApiError> {
        match &self.oauth {
            Some(session) => {
                let header = signer::authorization_header(
                    &session.consumer,
                    method,
                    url,
                    &[("oauth_token", session.token.token.as_str())],
                    Some(session.token.secret.as_str()),
                )?;
                Ok(Some(header))
            }
            None => Ok(None),
        }
    }

    fn session(&self, operation: &'static str) -> Result<&OauthSession, ApiError> {
        self.oauth.as_ref().ok_or(ApiError::Auth(operation))
    }

    // ========================================================================
    // Core request paths
    // ========================================================================

    /// GET against a feed path. Signed when OAuth credentials are attached,
    /// plain API-key access otherwise.
    pub async fn request(&self, path: &str, params: &[(String, String)]) -> Result<String, ApiError> {
        let url = build_url(FEED_BASE, path, params);
        let mut request = self
            .client
            .get(&url)
            .header("X-GData-Key", format!("key={}", self.api_key));
        if let Some(auth) = self.auth_header("GET", &url)? {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await?;
        let response = check_status("feed request", response).await?;
        Ok(response.text().await?)
    }

    /// Sends an Atom XML body to a data endpoint. Fails with an
    /// authentication error before any network I/O when no access token is
    /// attached.
    pub async fn data_request(
        &self,
        path: &str,
        xml: &str,
        method: Method,
    ) -> Result<String, ApiError> {
        let session = self.session("data requests require an OAuth access token")?;
        let url = build_url(FEED_BASE, path, &[]);
        let auth = signer::authorization_header(
            &session.consumer,
            method.as_str(),
            &url,
            &[("oauth_token", session.token.token.as_str())],
            Some(session.token.secret.as_str()),
        )?;

        let response = self
            .client
            .request(method, &url)
            .header("X-GData-Key", format!("key={}", self.api_key))
            .header("Authorization", auth)
            .header("Content-Type", "application/atom+xml; charset=UTF-8")
            .header("GData-Version", GDATA_VERSION)
            .body(xml.to_string())
            .send()
            .await?;
        let response = check_status("data request", response).await?;
        Ok(response.text().await?)
    }

    /// Uploads a video file from local disk to the dedicated upload host.
    ///
    /// The body is multipart/related: an Atom metadata part followed by the
    /// binary part, with `Content-Length` declared as the exact sum of both
    /// parts plus the closing boundary. The file itself is streamed in
    /// fixed-size chunks; it is never buffered whole, and the handle lives
    /// inside the body stream so it is released on every exit path.
    pub async fn direct_upload(
        &self,
        file_path: &Path,
        content_type: &str,
        metadata_xml: &str,
        user: &str,
    ) -> Result<String, ApiError> {
        let session = self.session("direct upload requires an OAuth access token")?;

        let path = format!("{}/{}/uploads", Feed::Users.path(), user);
        let url = build_url(UPLOAD_BASE, &path, &[]);

        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let file_len = tokio::fs::metadata(file_path).await?.len();

        let framing = UploadFraming::new(metadata_xml, content_type);
        let content_length = framing.content_length(file_len);

        let auth = signer::authorization_header(
            &session.consumer,
            "POST",
            &url,
            &[("oauth_token", session.token.token.as_str())],
            Some(session.token.secret.as_str()),
        )?;

        let file = tokio::fs::File::open(file_path).await?;
        let preamble = Bytes::from(framing.preamble.clone());
        let epilogue = Bytes::from(framing.epilogue.clone());
        let body_stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(preamble) })
            .chain(ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE))
            .chain(futures::stream::once(async move { Ok(epilogue) }));

        tracing::info!(file = %file_name, bytes = content_length, "starting direct upload");

        let response = self
            .client
            .post(&url)
            .header("X-GData-Key", format!("key={}", self.api_key))
            .header("Authorization", auth)
            .header("GData-Version", GDATA_VERSION)
            .header("Slug", &file_name)
            .header("Content-Type", framing.header_value())
            .header("Content-Length", content_length)
            .body(Body::wrap_stream(body_stream))
            .send()
            .await?;
        let response = check_status("direct upload", response).await?;

        tracing::info!(file = %file_name, "direct upload accepted");
        Ok(response.text().await?)
    }

    /// Requests a browser-upload token for a video described by `metadata_xml`.
    pub async fn form_upload_token(&self, metadata_xml: &str) -> Result<String, ApiError> {
        self.data_request(Feed::UploadToken.path(), metadata_xml, Method::POST)
            .await
    }

    // ========================================================================
    // Feed wrappers (URL builders over `request`)
    // ========================================================================

    /// One of the site-wide standard feeds.
    pub async fn standard_feed(
        &self,
        feed: StandardFeed,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        self.request(feed.feed().path(), &list_defaults(params)).await
    }

    /// A single video entry. `full` retrieves the authenticated owner's full
    /// metadata form from the uploads feed.
    pub async fn video_entry(
        &self,
        video_id: &str,
        full: bool,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = if full {
            format!("{}/default/uploads/{}", Feed::Users.path(), video_id)
        } else {
            format!("{}/{}", Feed::Videos.path(), video_id)
        };
        self.request(&path, params).await
    }

    pub async fn related_videos(
        &self,
        video_id: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/related", Feed::Videos.path(), video_id);
        self.request(&path, &list_defaults(params)).await
    }

    pub async fn video_responses(
        &self,
        video_id: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/responses", Feed::Videos.path(), video_id);
        self.request(&path, &list_defaults(params)).await
    }

    /// Keyword search over the videos feed. `query` supports the GData
    /// operators: quotes for exact phrases, `-` for exclusion, `|` for or.
    pub async fn keyword_search(
        &self,
        query: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let mut params = list_defaults(params);
        upsert(&mut params, "q", query);
        self.request(Feed::Videos.path(), &params).await
    }

    pub async fn video_comments(
        &self,
        video_id: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/comments", Feed::Videos.path(), video_id);
        self.request(&path, &list_defaults(params)).await
    }

    pub async fn user_uploads(
        &self,
        user: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/uploads", Feed::Users.path(), user);
        self.request(&path, &list_defaults(params)).await
    }

    pub async fn user_favorites(
        &self,
        user: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/favorites", Feed::Users.path(), user);
        self.request(&path, &list_defaults(params)).await
    }

    pub async fn user_playlists(
        &self,
        user: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/playlists", Feed::Users.path(), user);
        self.request(&path, &versioned(params)).await
    }

    pub async fn playlist(
        &self,
        playlist_id: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}", Feed::Playlists.path(), playlist_id);
        self.request(&path, &versioned(params)).await
    }

    pub async fn subscriptions(
        &self,
        user: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/subscriptions", Feed::Users.path(), user);
        self.request(&path, &list_defaults(params)).await
    }

    pub async fn user_contacts(
        &self,
        user: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/contacts", Feed::Users.path(), user);
        self.request(&path, &versioned(params)).await
    }

    pub async fn user_profile(
        &self,
        user: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}", Feed::Users.path(), user);
        self.request(&path, &versioned(params)).await
    }

    pub async fn user_activity(
        &self,
        user: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/events", Feed::Users.path(), user);
        self.request(&path, &versioned(params)).await
    }

    /// The authenticated user's inbox feed; there is no unauthenticated form.
    pub async fn inbox(&self, params: &[(String, String)]) -> Result<String, ApiError> {
        self.session("the inbox feed requires an OAuth access token")?;
        self.request(Feed::Inbox.path(), &versioned(params)).await
    }

    // ========================================================================
    // Data wrappers (XML builders over `data_request`)
    // ========================================================================

    /// Adds a comment to a video, or a reply when `in_reply_to` names an
    /// existing comment on the same video.
    pub async fn add_comment(
        &self,
        video_id: &str,
        comment: &str,
        in_reply_to: Option<&str>,
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/comments", Feed::Videos.path(), video_id);
        let mut xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}' xmlns:yt='{YT_NS}'>"
        );
        if let Some(comment_id) = in_reply_to {
            xml.push_str(&format!(
                "<link rel='{YT_NS}#in-reply-to' type='application/atom+xml' \
                 href='{FEED_BASE}/{path}/{}'/>",
                xml_escape(comment_id)
            ));
        }
        xml.push_str(&format!("<content>{}</content></entry>", xml_escape(comment)));
        self.data_request(&path, &xml, Method::POST).await
    }

    /// Posts `response_id` as a video response to `video_id`.
    pub async fn add_video_response(
        &self,
        video_id: &str,
        response_id: &str,
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/responses", Feed::Videos.path(), video_id);
        let xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}'><id>{}</id></entry>",
            xml_escape(response_id)
        );
        self.data_request(&path, &xml, Method::POST).await
    }

    /// Rates a video on the 1..=5 star scale.
    pub async fn add_numeric_rating(&self, video_id: &str, rating: u8) -> Result<String, ApiError> {
        if !(1..=5).contains(&rating) {
            return Err(ApiError::InvalidRequest(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }
        let path = format!("{}/{}/ratings", Feed::Videos.path(), video_id);
        let xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}' xmlns:gd='{GD_NS}'>\
             <gd:rating value='{rating}' min='1' max='5'/></entry>"
        );
        self.data_request(&path, &xml, Method::POST).await
    }

    /// Adds a like (`true`) or dislike (`false`) rating.
    pub async fn add_like_dislike(&self, video_id: &str, like: bool) -> Result<String, ApiError> {
        let path = format!("{}/{}/ratings", Feed::Videos.path(), video_id);
        let value = if like { "like" } else { "dislike" };
        let xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}' xmlns:yt='{YT_NS}'>\
             <yt:rating value='{value}'/></entry>"
        );
        self.data_request(&path, &xml, Method::POST).await
    }

    /// Subscribes the authenticated user to `channel_user`'s channel.
    pub async fn add_subscription(&self, channel_user: &str) -> Result<String, ApiError> {
        let xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}' xmlns:yt='{YT_NS}'>\
             <category scheme='{YT_NS}/subscriptiontypes.cat' term='channel'/>\
             <yt:username>{}</yt:username></entry>",
            xml_escape(channel_user)
        );
        self.data_request(Feed::Subscriptions.path(), &xml, Method::POST)
            .await
    }

    /// Adds a video to the authenticated user's favorites.
    pub async fn add_favorite(&self, video_id: &str) -> Result<String, ApiError> {
        let xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}'><id>{}</id></entry>",
            xml_escape(video_id)
        );
        self.data_request(Feed::Favorites.path(), &xml, Method::POST)
            .await
    }

    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}", Feed::Playlists.path(), playlist_id);
        let xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}' xmlns:yt='{YT_NS}'><id>{}</id></entry>",
            xml_escape(video_id)
        );
        self.data_request(&path, &xml, Method::POST).await
    }

    /// Moves a playlist entry to `position` (1-based).
    pub async fn set_playlist_position(
        &self,
        playlist_id: &str,
        entry_id: &str,
        position: u32,
    ) -> Result<String, ApiError> {
        let path = format!("{}/{}/{}", Feed::Playlists.path(), playlist_id, entry_id);
        let xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <entry xmlns='{ATOM_NS}' xmlns:yt='{YT_NS}'>\
             <yt:position>{position}</yt:position></entry>"
        );
        self.data_request(&path, &xml, Method::PUT).await
    }
}

// ============================================================================
// Request assembly helpers
// ============================================================================

fn build_url(base: &str, path: &str, params: &[(String, String)]) -> String {
    let mut url = format!("{base}/{path}");
    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    signer::percent_encode(k),
                    signer::percent_encode(v)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        url.push('?');
        url.push_str(&query);
    }
    url
}

/// Inserts or replaces a query parameter.
fn upsert(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value.to_string(),
        None => params.push((key.to_string(), value.to_string())),
    }
}

/// List feeds page from entry 1 with 10 results unless the caller says
/// otherwise.
fn list_defaults(extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut params = vec![
        ("start-index".to_string(), "1".to_string()),
        ("max-results".to_string(), "10".to_string()),
    ];
    for (key, value) in extra {
        upsert(&mut params, key, value);
    }
    params
}

/// Entry feeds only need the protocol version pinned.
fn versioned(extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut params = vec![("v".to_string(), API_VERSION.to_string())];
    for (key, value) in extra {
        upsert(&mut params, key, value);
    }
    params
}

/// Atom entry describing a video to upload: title, description, category
/// and keywords inside a `media:group`.
pub fn video_metadata_xml(
    title: &str,
    description: &str,
    category: &str,
    keywords: &[String],
) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8'?>\
         <entry xmlns='{ATOM_NS}' xmlns:media='{MEDIA_NS}' xmlns:yt='{YT_NS}'>\
         <media:group>\
         <media:title type='plain'>{}</media:title>\
         <media:description type='plain'>{}</media:description>\
         <media:category scheme='{YT_NS}/categories.cat'>{}</media:category>\
         <media:keywords>{}</media:keywords>\
         </media:group></entry>",
        xml_escape(title),
        xml_escape(description),
        xml_escape(category),
        xml_escape(&keywords.join(", "))
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

/// Byte framing of a multipart/related upload. The declared length must
/// equal the bytes on the wire exactly or the GData front end rejects the
/// request.
#[derive(Debug)]
struct UploadFraming {
    boundary: String,
    preamble: String,
    epilogue: String,
}

impl UploadFraming {
    fn new(metadata_xml: &str, content_type: &str) -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::with_boundary(hex::encode(bytes), metadata_xml, content_type)
    }

    fn with_boundary(boundary: String, metadata_xml: &str, content_type: &str) -> Self {
        let preamble = format!(
            "--{boundary}\r\n\
             Content-Type: application/atom+xml; charset=UTF-8\r\n\r\n\
             {metadata_xml}\r\n\
             --{boundary}\r\n\
             Content-Type: {content_type}\r\n\
             Content-Transfer-Encoding: binary\r\n\r\n"
        );
        let epilogue = format!("\r\n--{boundary}--\r\n");
        Self {
            boundary,
            preamble,
            epilogue,
        }
    }

    fn content_length(&self, file_len: u64) -> u64 {
        self.preamble.len() as u64 + file_len + self.epilogue.len() as u64
    }

    fn header_value(&self) -> String {
        format!("multipart/related; boundary=\"{}\"", self.boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::SignatureMethod;

    fn authed_client() -> YouTubeClient {
        let consumer = Consumer::new("ckey", "csecret", SignatureMethod::HmacSha1);
        let token = AccessToken {
            token: "atoken".to_string(),
            secret: "asecret".to_string(),
        };
        YouTubeClient::new("devkey", Duration::from_secs(10))
            .unwrap()
            .with_oauth(consumer, token)
    }

    fn anon_client() -> YouTubeClient {
        YouTubeClient::new("devkey", Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn feed_catalog_paths() {
        assert_eq!(Feed::TopRated.path(), "feeds/api/standardfeeds/top_rated");
        assert_eq!(Feed::Videos.path(), "feeds/api/videos");
        assert_eq!(Feed::Users.path(), "feeds/api/users");
        assert_eq!(Feed::Inbox.path(), "feeds/api/users/default/inbox");
        assert_eq!(Feed::UploadToken.path(), "action/GetUploadToken");
    }

    #[test]
    fn standard_feed_names() {
        assert_eq!(
            StandardFeed::from_name("top_rated"),
            Some(StandardFeed::TopRated)
        );
        // historical alias
        assert_eq!(
            StandardFeed::from_name("most_viewed"),
            Some(StandardFeed::MostPopular)
        );
        assert_eq!(StandardFeed::from_name("inbox"), None);
    }

    #[test]
    fn query_values_round_trip_through_encoding() {
        let params = vec![
            ("q".to_string(), "pac man \"arcade\" -clone".to_string()),
            ("max-results".to_string(), "25".to_string()),
        ];
        let url = build_url(FEED_BASE, Feed::Videos.path(), &params);
        let query = url.split_once('?').unwrap().1;
        let decoded: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(decoded, params);
    }

    #[test]
    fn list_defaults_are_overridable() {
        let params = list_defaults(&[("max-results".to_string(), "50".to_string())]);
        assert!(params.contains(&("start-index".to_string(), "1".to_string())));
        assert!(params.contains(&("max-results".to_string(), "50".to_string())));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn upload_framing_length_is_exact() {
        let metadata = "<entry xmlns='http://www.w3.org/2005/Atom'/>";
        let framing = UploadFraming::with_boundary("b0undary".to_string(), metadata, "video/3gpp");
        let file_bytes = b"0123456789abcdef";

        let mut wire = Vec::new();
        wire.extend_from_slice(framing.preamble.as_bytes());
        wire.extend_from_slice(file_bytes);
        wire.extend_from_slice(framing.epilogue.as_bytes());

        assert_eq!(framing.content_length(file_bytes.len() as u64), wire.len() as u64);
        // two opening boundaries plus the terminator
        let wire = String::from_utf8(wire).unwrap();
        assert_eq!(wire.matches("--b0undary\r\n").count(), 2);
        assert!(wire.ends_with("\r\n--b0undary--\r\n"));
        assert!(wire.contains("Content-Transfer-Encoding: binary\r\n\r\n"));
    }

    #[test]
    fn upload_framing_header_quotes_boundary() {
        let framing = UploadFraming::with_boundary("abc123".to_string(), "<entry/>", "video/mp4");
        assert_eq!(
            framing.header_value(),
            "multipart/related; boundary=\"abc123\""
        );
    }

    #[test]
    fn upload_metadata_entry_is_escaped() {
        let xml = video_metadata_xml(
            "Cats & Dogs",
            "a <test> upload",
            "People",
            &["pets".to_string(), "funny".to_string()],
        );
        assert!(xml.contains("<media:title type='plain'>Cats &amp; Dogs</media:title>"));
        assert!(xml.contains("<media:description type='plain'>a &lt;test&gt; upload</media:description>"));
        assert!(xml.contains("<media:keywords>pets, funny</media:keywords>"));
        assert!(xml.starts_with("<?xml version='1.0' encoding='UTF-8'?>"));
    }

    #[test]
    fn xml_escaping() {
        assert_eq!(
            xml_escape("5 < 6 & \"quotes\""),
            "5 &lt; 6 &amp; &quot;quotes&quot;"
        );
        assert_eq!(xml_escape("it's"), "it&apos;s");
    }

    #[test]
    fn oauth_attachment_is_visible() {
        assert!(authed_client().is_authenticated());
        assert!(!anon_client().is_authenticated());
    }

    #[tokio::test]
    async fn data_request_without_token_fails_before_network() {
        let err = anon_client()
            .data_request("feeds/api/videos/abc/comments", "<entry/>", Method::POST)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn direct_upload_without_token_fails_before_network() {
        let err = anon_client()
            .direct_upload(Path::new("/nonexistent.mp4"), "video/mp4", "<entry/>", "default")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn inbox_without_token_fails_before_network() {
        let err = anon_client().inbox(&[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected_locally() {
        let client = authed_client();
        for rating in [0u8, 6] {
            let err = client.add_numeric_rating("abc", rating).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidRequest(_)));
        }
    }

    #[tokio::test]
    async fn missing_upload_file_is_an_io_error() {
        let err = authed_client()
            .direct_upload(
                Path::new("/definitely/not/here.mp4"),
                "video/mp4",
                "<entry/>",
                "default",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Io(_)));
    }
}
