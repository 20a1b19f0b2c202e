use crate::api::types::{Category, ErrorBody, ReactionResponse, WireComment, WirePost};
use crate::feed::{NewPost, ReactionKind};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum response body size. Feed pages and comment threads are small;
/// anything past this is a misbehaving server.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Shown when a failure response carries no parsable `{message}` body.
const FALLBACK_MESSAGE: &str = "The server returned an unexpected error";

// ============================================================================
// Error Types
// ============================================================================

/// Errors from remote calls.
///
/// `Unauthorized` is split out from `Status` because a 401/403 is not a
/// transport failure: it means the session cookie is gone and the session
/// gate must drop to the logged-out state.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response with the server's `{message}` body (or the fallback)
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },
    /// 401/403 response. The viewer is not (or no longer) authenticated.
    #[error("Not authenticated")]
    Unauthorized,
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response body was not the JSON shape the endpoint promises
    #[error("Malformed response: {0}")]
    Decode(String),
    /// The configured server URL could not be parsed or has a bad scheme
    #[error("Invalid server URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// True if the failure is transient and worth a retry affordance.
    ///
    /// Retries are never issued automatically; this only classifies the
    /// failure for display.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Unauthorized
            | ApiError::ResponseTooLarge(_)
            | ApiError::Decode(_)
            | ApiError::InvalidBaseUrl(_) => false,
        }
    }

    /// True for 401/403-equivalent failures that must log the session out.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for one feed server.
///
/// Holds the session cookie jar, so a single `ApiClient` must be shared by
/// every component for the lifetime of the session. All calls run under a
/// bounded timeout and bounded body reads.
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let mut base =
            Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;
        match base.scheme() {
            "https" => {}
            "http" => {
                let host = base.host_str().unwrap_or("");
                if host != "localhost" && host != "127.0.0.1" {
                    tracing::warn!(url = %base, "Using plain HTTP to a non-local server; the session cookie travels unencrypted");
                }
            }
            other => {
                return Err(ApiError::InvalidBaseUrl(format!(
                    "unsupported scheme '{other}' (expected http or https)"
                )));
            }
        }
        // Relative endpoint joins need the trailing slash, otherwise the last
        // path segment of the base is replaced instead of appended.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            // Backstop for stalled body reads; headroom over the per-call
            // timeout so send() failures always surface as Timeout.
            .timeout(Duration::from_secs(timeout_secs.saturating_add(10)))
            .build()?;

        Ok(Self {
            client,
            base,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{path}: {e}")))
    }

    // ------------------------------------------------------------------
    // Auth endpoints
    // ------------------------------------------------------------------

    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("api/register")?;
        let body = serde_json::json!({
            "username": username,
            "password": password.expose_secret(),
        });
        self.send(self.client.post(url).json(&body)).await?;
        tracing::info!(username, "Registered new account");
        Ok(())
    }

    /// Logs in. The session cookie set by the server lands in the cookie jar
    /// and credentials every subsequent call.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), ApiError> {
        let url = self.endpoint("api/login")?;
        let body = serde_json::json!({
            "username": username,
            "password": password.expose_secret(),
        });
        self.send(self.client.post(url).json(&body)).await?;
        tracing::info!(username, "Logged in");
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let url = self.endpoint("api/logout")?;
        self.send(self.client.post(url)).await?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Credentialed auth probe. 2xx means the session cookie is still good.
    pub async fn check_auth(&self) -> Result<(), ApiError> {
        let url = self.endpoint("api/check-auth")?;
        self.send(self.client.get(url)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Feed endpoints
    // ------------------------------------------------------------------

    pub async fn fetch_posts(&self) -> Result<Vec<WirePost>, ApiError> {
        let url = self.endpoint("api/posts")?;
        self.json(self.client.get(url)).await
    }

    pub async fn fetch_posts_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<WirePost>, ApiError> {
        let url = self.endpoint(&format!("api/categories/{category_id}/posts"))?;
        self.json(self.client.get(url)).await
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint("api/categories")?;
        self.json(self.client.get(url)).await
    }

    /// Creates a post. Content and categories are validated by the caller
    /// before this is reached; the request is multipart because an image may
    /// ride along.
    pub async fn create_post(&self, new_post: &NewPost) -> Result<WirePost, ApiError> {
        let url = self.endpoint("api/posts/create")?;

        let mut form = reqwest::multipart::Form::new().text("content", new_post.content.clone());
        for category in &new_post.categories {
            form = form.text("categories", category.clone());
        }
        if let Some(image) = &new_post.image {
            let part = reqwest::multipart::Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.mime)?;
            form = form.part("image", part);
        }

        self.json(self.client.post(url).multipart(form)).await
    }

    /// Sends a like/dislike and returns the server's authoritative counts
    /// and vote state.
    pub async fn react(
        &self,
        post_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionResponse, ApiError> {
        let url = self.endpoint(&format!("api/posts/{post_id}/react"))?;
        let body = serde_json::json!({ "type": kind.as_str() });
        self.json(self.client.post(url).json(&body)).await
    }

    // ------------------------------------------------------------------
    // Comment endpoints
    // ------------------------------------------------------------------

    pub async fn fetch_comments(&self, post_id: &str) -> Result<Vec<WireComment>, ApiError> {
        let url = self.endpoint(&format!("api/posts/{post_id}/comments"))?;
        self.json(self.client.get(url)).await
    }

    /// Posts a comment. The response body is a bare integer: the post's new
    /// total comment count.
    pub async fn create_comment(&self, post_id: &str, content: &str) -> Result<u32, ApiError> {
        let url = self.endpoint(&format!("api/posts/{post_id}/comments"))?;
        let body = serde_json::json!({ "content": content });
        self.json(self.client.post(url).json(&body)).await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    /// Issues a request under the configured timeout and maps non-success
    /// statuses into the error taxonomy.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout(self.timeout.as_secs()))?
            .map_err(ApiError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = Self::error_message(response).await;
            tracing::debug!(status = status.as_u16(), body = %message, "Request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let bytes = read_limited(response, MAX_BODY_SIZE).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Extracts the server's `{message}` from a failure body, falling back
    /// to a fixed message when the body is missing or unparsable.
    async fn error_message(response: reqwest::Response) -> String {
        match read_limited(response, MAX_BODY_SIZE).await {
            Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.message)
                .unwrap_or_else(|_| FALLBACK_MESSAGE.to_string()),
            Err(_) => FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Streams a response body into memory, bailing out as soon as the limit is
/// crossed rather than buffering an unbounded body first.
async fn read_limited(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: trust Content-Length when present
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
