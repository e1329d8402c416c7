//! Reqwest client shared by the REST port implementations.
//!
//! Owns transport details only: endpoint construction, auth headers, timeout
//! and HTTP failure classification. Port impls map [`HttpFailure`] into their
//! own error types.

use std::time::Duration;

use mockable::{Clock, DefaultClock};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;
use zeroize::Zeroizing;

use super::dto::ErrorBodyDto;
use crate::domain::Session;
use crate::domain::ports::AuthChangeHub;

/// Classified failure of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum HttpFailure {
    /// The request never completed.
    Transport(String),
    /// The request timed out.
    Timeout(String),
    /// The server answered with a non-success status.
    Status {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },
    /// The body could not be decoded.
    Decode(String),
}

impl HttpFailure {
    pub(super) fn describe(&self) -> String {
        match self {
            Self::Transport(message) | Self::Timeout(message) | Self::Decode(message) => {
                message.clone()
            }
            Self::Status { message, .. } => message.clone(),
        }
    }
}

/// Hosted backend reached over its REST API.
///
/// Implements every driven port. The current session is cached in the adapter
/// and changes to it are broadcast to [`crate::domain::ports::AuthBackend`]
/// subscribers.
pub struct RestBackend {
    pub(super) http: Client,
    base: Url,
    anon_key: Zeroizing<String>,
    pub(super) session: RwLock<Option<Session>>,
    pub(super) hub: AuthChangeHub,
    pub(super) clock: Arc<dyn Clock>,
}

impl RestBackend {
    /// Build an adapter for the project at `base` using a reqwest client with
    /// an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, anon_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            anon_key: Zeroizing::new(anon_key.to_owned()),
            session: RwLock::new(None),
            hub: AuthChangeHub::default(),
            clock: Arc::new(DefaultClock),
        })
    }

    /// Replace the clock used to compute session expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve `path` (e.g. `rest/v1/users`) against the project URL.
    pub(super) fn endpoint(&self, path: &str) -> Result<Url, HttpFailure> {
        endpoint(&self.base, path)
    }

    /// Public URL of an object in a public bucket.
    pub(super) fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.base.as_str().trim_end_matches('/')
        )
    }

    /// Request carrying the project key and the session bearer, falling back
    /// to the project key when signed out.
    pub(super) async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .session
            .read()
            .await
            .as_ref()
            .map_or_else(|| self.anon_key.as_str().to_owned(), |s| s.access_token().to_owned());
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(bearer)
    }

    /// Send and decode a JSON body.
    pub(super) async fn execute<T>(&self, builder: RequestBuilder) -> Result<T, HttpFailure>
    where
        T: DeserializeOwned,
    {
        let body = self.execute_raw(builder).await?;
        serde_json::from_slice(&body)
            .map_err(|err| HttpFailure::Decode(format!("invalid response payload: {err}")))
    }

    /// Send and discard the body.
    pub(super) async fn execute_empty(&self, builder: RequestBuilder) -> Result<(), HttpFailure> {
        self.execute_raw(builder).await.map(drop)
    }

    async fn execute_raw(&self, builder: RequestBuilder) -> Result<Vec<u8>, HttpFailure> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }
}

pub(super) fn endpoint(base: &Url, path: &str) -> Result<Url, HttpFailure> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|err| HttpFailure::Transport(format!("invalid endpoint {joined}: {err}")))
}

/// Append a PostgREST `column=eq.value` filter.
pub(super) fn eq_filter(mut url: Url, column: &str, value: &str) -> Url {
    url.query_pairs_mut().append_pair(column, &format!("eq.{value}"));
    url
}

pub(super) fn map_transport_error(error: reqwest::Error) -> HttpFailure {
    if error.is_timeout() {
        HttpFailure::Timeout(error.to_string())
    } else {
        HttpFailure::Transport(error.to_string())
    }
}

pub(super) fn map_status_error(status: StatusCode, body: &[u8]) -> HttpFailure {
    let parsed = ErrorBodyDto::parse(body);
    let detail = parsed
        .message()
        .map_or_else(|| body_preview(body), str::to_owned);
    let message = if detail.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        detail
    };
    HttpFailure::Status {
        status,
        message,
        code: parsed.code(),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
