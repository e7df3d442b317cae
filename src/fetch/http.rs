//! HTTP page sources.
//!
//! [`ApiSource`] reads paginated JSON documents (`{"results": [...], "next": url}`),
//! [`ListingSource`] reads a bare JSON array that is always the last page.

use crate::error::FetchError;
use crate::fetch::PageSource;
use crate::models::{Cursor, Page};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest response body quoted in a status error.
const MAX_ERROR_BODY: usize = 200;

/// Connection settings for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Extra attempts after a retryable failure.
    pub retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_backoff_ms: u64,
    pub user_agent: String,
    /// Sent as `Authorization: Bearer` when set.
    pub bearer_token: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retries: 2,
            retry_backoff_ms: 500,
            user_agent: concat!("l10n-report/", env!("CARGO_PKG_VERSION")).to_string(),
            bearer_token: None,
        }
    }
}

impl From<&crate::config::ApiConfig> for HttpSettings {
    fn from(config: &crate::config::ApiConfig) -> Self {
        Self {
            timeout_seconds: config.timeout_seconds,
            retries: config.retries,
            retry_backoff_ms: config.retry_backoff_ms,
            ..Self::default()
        }
    }
}

/// Shared HTTP client with timeout and bounded retry.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    settings: HttpSettings,
}

impl HttpClient {
    /// Build a client from settings.
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(settings.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http, settings })
    }

    /// Same client, authenticating with `token`.
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.settings.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// GET `url` and return the body, retrying transient failures.
    pub async fn get_text(&self, url: &str, source_id: &str, page: usize) -> Result<String, FetchError> {
        let mut attempt = 0u32;

        loop {
            match self.get_once(url, source_id, page).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < self.settings.retries => {
                    let wait = Duration::from_millis(self.settings.retry_backoff_ms)
                        .saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        "{} (attempt {}/{}), retrying in {}ms",
                        err,
                        attempt,
                        self.settings.retries + 1,
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once(&self, url: &str, source_id: &str, page: usize) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(ref token) = self.settings.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e, source_id, page))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(FetchError::Status {
                source_id: source_id.to_string(),
                page,
                status: status.as_u16(),
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.transport_error(e, source_id, page))
    }

    fn transport_error(&self, err: reqwest::Error, source_id: &str, page: usize) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                source_id: source_id.to_string(),
                page,
                seconds: self.settings.timeout_seconds,
            }
        } else {
            FetchError::Transport {
                source_id: source_id.to_string(),
                page,
                message: err.to_string(),
            }
        }
    }
}

/// Wire shape of a paginated API document.
#[derive(Debug, Deserialize)]
struct ApiPage<R> {
    #[serde(alias = "localizations")]
    results: Vec<R>,
    #[serde(default)]
    next: Option<String>,
}

/// Paginated JSON API endpoint.
pub struct ApiSource<R> {
    label: String,
    client: HttpClient,
    _record: PhantomData<fn() -> R>,
}

impl<R> ApiSource<R> {
    pub fn new(label: impl Into<String>, client: HttpClient) -> Self {
        Self {
            label: label.into(),
            client,
            _record: PhantomData,
        }
    }
}

impl<R: DeserializeOwned> PageSource for ApiSource<R> {
    type Record = R;

    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self, cursor: &Cursor, page: usize) -> Result<Page<R>, FetchError> {
        let body = self.client.get_text(cursor.as_str(), &self.label, page).await?;

        let decoded: ApiPage<R> = serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            source_id: self.label.clone(),
            page,
            message: e.to_string(),
        })?;

        Ok(Page {
            records: decoded.results,
            next: Cursor::from_next(decoded.next),
        })
    }
}

/// Unpaginated endpoint returning a bare JSON array.
pub struct ListingSource<R> {
    label: String,
    client: HttpClient,
    _record: PhantomData<fn() -> R>,
}

impl<R> ListingSource<R> {
    pub fn new(label: impl Into<String>, client: HttpClient) -> Self {
        Self {
            label: label.into(),
            client,
            _record: PhantomData,
        }
    }
}

impl<R: DeserializeOwned> PageSource for ListingSource<R> {
    type Record = R;

    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self, cursor: &Cursor, page: usize) -> Result<Page<R>, FetchError> {
        let body = self.client.get_text(cursor.as_str(), &self.label, page).await?;

        let records: Vec<R> = serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            source_id: self.label.clone(),
            page,
            message: e.to_string(),
        })?;

        Ok(Page::last(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fetch_all;
    use crate::models::{LocaleRecord, LocalizationRecord, RepoEntry};
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client(retries: u32) -> HttpClient {
        HttpClient::new(HttpSettings {
            timeout_seconds: 5,
            retries,
            retry_backoff_ms: 1,
            ..HttpSettings::default()
        })
        .unwrap()
    }

    fn locale(code: &str, missing: u64, unreviewed: u64) -> serde_json::Value {
        json!({
            "code": code,
            "name": "ignored",
            "projects": ["firefox"],
            "missing_strings": missing,
            "unreviewed_strings": unreviewed
        })
    }

    #[tokio::test]
    async fn test_api_source_follows_next_pointer() {
        let server = MockServer::start_async().await;
        let next = server.url("/api/v2/locales?page=2");

        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/locales")
                    .query_param_missing("page");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "count": 3,
                        "next": next,
                        "results": [locale("de", 1, 2), locale("fr", 3, 4)]
                    }));
            })
            .await;

        let page2 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/locales")
                    .query_param("page", "2");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "count": 3,
                        "next": null,
                        "results": [locale("it", 5, 6)]
                    }));
            })
            .await;

        let source = ApiSource::<LocaleRecord>::new("locales", test_client(0));
        let records = fetch_all(&source, Cursor::new(server.url("/api/v2/locales")))
            .await
            .unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        let codes: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["de", "fr", "it"]);
    }

    #[tokio::test]
    async fn test_api_source_reads_localizations() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/projects/firefox");
                then.status(200).json_body(json!({
                    "slug": "firefox",
                    "localizations": [{
                        "locale": "en-GB",
                        "missing_strings": 1,
                        "pretranslated_strings": 0,
                        "approved_strings": 8,
                        "strings_with_warnings": 1,
                        "total_strings": 10
                    }]
                }));
            })
            .await;

        let source = ApiSource::<LocalizationRecord>::new("firefox", test_client(0));
        let records = fetch_all(&source, Cursor::new(server.url("/api/v2/projects/firefox")))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].locale, "en-GB");
    }

    #[tokio::test]
    async fn test_status_error_aborts() {
        let server = MockServer::start_async().await;

        let failing = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/locales");
                then.status(404).body("not found");
            })
            .await;

        let source = ApiSource::<LocaleRecord>::new("locales", test_client(2));
        let err = fetch_all(&source, Cursor::new(server.url("/api/v2/locales")))
            .await
            .unwrap_err();

        // 404 is not retried
        failing.assert_calls_async(1).await;
        match err {
            FetchError::Status {
                status, page, body, ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(page, 1);
                assert_eq!(body, "not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_retries_then_fails() {
        let server = MockServer::start_async().await;

        let failing = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/locales");
                then.status(503);
            })
            .await;

        let source = ApiSource::<LocaleRecord>::new("locales", test_client(2));
        let err = fetch_all(&source, Cursor::new(server.url("/api/v2/locales")))
            .await
            .unwrap_err();

        failing.assert_calls_async(3).await;
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_rate_limit_retries_then_fails() {
        let server = MockServer::start_async().await;

        let limited = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/locales");
                then.status(429).body("slow down");
            })
            .await;

        let source = ApiSource::<LocaleRecord>::new("locales", test_client(2));
        let err = fetch_all(&source, Cursor::new(server.url("/api/v2/locales")))
            .await
            .unwrap_err();

        limited.assert_calls_async(3).await;
        assert!(matches!(err, FetchError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/locales");
                then.status(200)
                    .delay(Duration::from_millis(1500))
                    .json_body(json!({"results": [], "next": null}));
            })
            .await;

        let client = HttpClient::new(HttpSettings {
            timeout_seconds: 1,
            retries: 0,
            ..HttpSettings::default()
        })
        .unwrap();
        let source = ApiSource::<LocaleRecord>::new("locales", client);
        let err = fetch_all(&source, Cursor::new(server.url("/api/v2/locales")))
            .await
            .unwrap_err();

        match &err {
            FetchError::Timeout {
                source_id,
                page,
                seconds,
            } => {
                assert_eq!(source_id, "locales");
                assert_eq!(*page, 1);
                assert_eq!(*seconds, 1);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_refused_connection_is_retried() {
        // Reserve a port, then free it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let client = HttpClient::new(HttpSettings {
            timeout_seconds: 5,
            retries: 2,
            retry_backoff_ms: 50,
            ..HttpSettings::default()
        })
        .unwrap();
        let source = ApiSource::<LocaleRecord>::new("locales", client);

        let started = std::time::Instant::now();
        let err = fetch_all(&source, Cursor::new(format!("http://127.0.0.1:{port}/api/v2/locales")))
            .await
            .unwrap_err();

        // Two backoffs: 50ms then 100ms.
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(matches!(err, FetchError::Transport { page: 1, .. }));
        assert!(err.is_retryable());
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_malformed_page_is_decode_error() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/locales");
                then.status(200)
                    .json_body(json!({"results": [{"code": "de"}], "next": null}));
            })
            .await;

        let source = ApiSource::<LocaleRecord>::new("locales", test_client(0));
        let err = fetch_all(&source, Cursor::new(server.url("/api/v2/locales")))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode { page: 1, .. }));
    }

    #[tokio::test]
    async fn test_self_referential_next_pointer() {
        let server = MockServer::start_async().await;
        let own_url = server.url("/api/v2/locales");

        let looping = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/locales");
                then.status(200)
                    .json_body(json!({"results": [locale("de", 0, 0)], "next": own_url}));
            })
            .await;

        let source = ApiSource::<LocaleRecord>::new("locales", test_client(0));
        let err = fetch_all(&source, Cursor::new(server.url("/api/v2/locales")))
            .await
            .unwrap_err();

        looping.assert_calls_async(1).await;
        assert!(matches!(err, FetchError::CursorCycle { .. }));
    }

    #[tokio::test]
    async fn test_listing_source_is_single_page() {
        let server = MockServer::start_async().await;

        let listing = server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/mozilla-l10n/vpn-l10n/contents");
                then.status(200).json_body(json!([
                    {"name": "fr", "type": "dir", "sha": "abc"},
                    {"name": "README.md", "type": "file"}
                ]));
            })
            .await;

        let source = ListingSource::<RepoEntry>::new("vpn-l10n", test_client(0));
        let entries = fetch_all(
            &source,
            Cursor::new(server.url("/repos/mozilla-l10n/vpn-l10n/contents")),
        )
        .await
        .unwrap();

        listing.assert_async().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "dir");
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start_async().await;

        let authed = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/o/r/contents")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = test_client(0).with_bearer_token(Some("secret".to_string()));
        let source = ListingSource::<RepoEntry>::new("r", client);
        let entries = fetch_all(&source, Cursor::new(server.url("/repos/o/r/contents")))
            .await
            .unwrap();

        authed.assert_async().await;
        assert!(entries.is_empty());
    }
}
