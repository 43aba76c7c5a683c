use crate::catalog::source::CatalogSource;
use crate::catalog::types::{
    CatalogFilters, CatalogPage, GameDetails, NamedRef, RawGame, RawGameDetails, RawNamed,
    RawScreenshot, Screenshot,
};
use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.rawg.io/api";

const MAX_RETRIES: u32 = 3;
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Ordering used by browse mode: highest rated first.
const BROWSE_ORDERING: &str = "-rating";

/// Errors returned by the games API client.
///
/// Network-level failures never carry the request URL, since the URL holds
/// the API key in its query string.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Connection, DNS or TLS failure
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    /// Request exceeded the 20-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx status that carried no readable error message
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// 429 Too Many Requests after the retry budget was spent
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// The API reported an application-level failure
    #[error("Catalog source error: {0}")]
    Source(String),
    #[error("Invalid catalog base URL")]
    InvalidBaseUrl,
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Coarse classification of a catalog failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NetworkFailure,
    MalformedResponse,
    SourceError,
}

impl CatalogError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CatalogError::Network(_)
            | CatalogError::Timeout
            | CatalogError::InvalidBaseUrl
            | CatalogError::InsecureBaseUrl => FailureKind::NetworkFailure,
            CatalogError::MalformedResponse(_) | CatalogError::ResponseTooLarge => {
                FailureKind::MalformedResponse
            }
            CatalogError::HttpStatus(_) | CatalogError::RateLimited(_) | CatalogError::Source(_) => {
                FailureKind::SourceError
            }
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        CatalogError::Network(e.without_url())
    }
}

/// HTTP client for a RAWG-compatible games API.
#[derive(Debug)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    retry_base: Duration,
}

impl CatalogClient {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidBaseUrl`] if `base_url` does not parse
    /// - [`CatalogError::InsecureBaseUrl`] for plain HTTP to a non-local host
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: Option<SecretString>,
    ) -> Result<Self, CatalogError> {
        let parsed = url::Url::parse(base_url).map_err(|_| CatalogError::InvalidBaseUrl)?;
        match parsed.scheme() {
            "https" => {}
            "http" => {
                let local = matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1"));
                if !local {
                    tracing::error!(base_url = %base_url, "Rejecting non-HTTPS catalog base URL");
                    return Err(CatalogError::InsecureBaseUrl);
                }
                tracing::warn!(base_url = %base_url, "Using non-HTTPS catalog base URL (localhost only)");
            }
            _ => return Err(CatalogError::InvalidBaseUrl),
        }

        if api_key.is_none() {
            tracing::warn!("No catalog API key configured; requests may be rejected");
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            retry_base: Duration::from_secs(1),
        })
    }

    /// Overrides the first backoff delay (later retries double it).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base = delay;
        self
    }

    fn games_query(page: u32, page_size: u32, filters: &CatalogFilters) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(genre) = &filters.genre {
            query.push(("genres", genre.clone()));
        }
        if let Some(platform) = &filters.platform {
            query.push(("parent_platforms", platform.clone()));
        }
        query
    }

    /// GET `{base}{path}` and parse the body as JSON, retrying 429 and 5xx.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let mut retry_count = 0;

        loop {
            let mut request = self.http.get(&url).query(query);
            if let Some(key) = &self.api_key {
                request = request.query(&[("key", key.expose_secret())]);
            }

            let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
                .await
                .map_err(|_| CatalogError::Timeout)??;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(if status.is_server_error() {
                        CatalogError::HttpStatus(status.as_u16())
                    } else {
                        CatalogError::RateLimited(MAX_RETRIES)
                    });
                }

                let delay = self.retry_base * (1u32 << retry_count); // 1s, 2s, 4s
                tracing::warn!(
                    path = %path,
                    status = %status,
                    retry = retry_count + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Catalog request failed, backing off"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                // 4xx fails immediately; surface the API's own message when it has one
                let message = read_limited_bytes(response, MAX_RESPONSE_SIZE)
                    .await
                    .ok()
                    .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
                    .and_then(|body| source_error(&body));
                return Err(match message {
                    Some(msg) => CatalogError::Source(msg),
                    None => CatalogError::HttpStatus(status.as_u16()),
                });
            }

            let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| CatalogError::MalformedResponse(e.to_string()));
        }
    }

    async fn fetch_screenshots(&self, id: u64) -> Result<Vec<Screenshot>, CatalogError> {
        let body = self
            .get_json(&format!("/games/{id}/screenshots"), &[])
            .await?;
        let results = results_array(&body)?;
        Ok(results
            .iter()
            .filter_map(|v| serde_json::from_value::<RawScreenshot>(v.clone()).ok())
            .filter_map(RawScreenshot::into_screenshot)
            .collect())
    }

    async fn fetch_named_list(&self, path: &str) -> Result<Vec<NamedRef>, CatalogError> {
        let body = self.get_json(path, &[]).await?;
        let results = results_array(&body)?;
        let mut named: Vec<NamedRef> = results
            .iter()
            .filter_map(|v| serde_json::from_value::<RawNamed>(v.clone()).ok())
            .filter_map(|raw| {
                Some(NamedRef {
                    id: raw.id?,
                    name: raw.name?,
                })
            })
            .collect();
        named.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(named)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn list_items(
        &self,
        page: u32,
        page_size: u32,
        filters: &CatalogFilters,
    ) -> Result<CatalogPage, CatalogError> {
        let mut query = Self::games_query(page, page_size, filters);
        query.push(("ordering", BROWSE_ORDERING.to_string()));
        let body = self.get_json("/games", &query).await?;
        parse_page(&body)
    }

    async fn search_items(
        &self,
        search: &str,
        page: u32,
        page_size: u32,
        filters: &CatalogFilters,
    ) -> Result<CatalogPage, CatalogError> {
        let mut query = Self::games_query(page, page_size, filters);
        query.push(("search", search.to_string()));
        let body = self.get_json("/games", &query).await?;
        parse_page(&body)
    }

    async fn get_item(&self, id: u64) -> Result<GameDetails, CatalogError> {
        let detail_path = format!("/games/{id}");
        let (body, screenshots) = tokio::join!(
            self.get_json(&detail_path, &[]),
            self.fetch_screenshots(id)
        );
        let body = body?;
        if let Some(msg) = source_error(&body) {
            return Err(CatalogError::Source(msg));
        }

        // Screenshots are decoration; a failure there does not fail the page
        let screenshots = screenshots.unwrap_or_else(|e| {
            tracing::warn!(game_id = id, error = %e, "Failed to load screenshots");
            Vec::new()
        });

        let raw: RawGameDetails = serde_json::from_value(body)
            .map_err(|e| CatalogError::MalformedResponse(e.to_string()))?;
        raw.into_details(screenshots)
            .ok_or_else(|| CatalogError::MalformedResponse("game has no id".into()))
    }

    async fn list_genres(&self) -> Result<Vec<NamedRef>, CatalogError> {
        self.fetch_named_list("/genres").await
    }

    async fn list_platforms(&self) -> Result<Vec<NamedRef>, CatalogError> {
        self.fetch_named_list("/platforms/lists/parents").await
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Extracts an application-level error message (`error` or `detail`).
fn source_error(body: &Value) -> Option<String> {
    ["error", "detail"]
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::to_string)
}

fn results_array(body: &Value) -> Result<&Vec<Value>, CatalogError> {
    if let Some(msg) = source_error(body) {
        return Err(CatalogError::Source(msg));
    }
    body.get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::MalformedResponse("missing results array".into()))
}

/// Validates a games page and converts its entries.
///
/// Entries that fail to decode or have no id are counted in `skipped`.
pub(crate) fn parse_page(body: &Value) -> Result<CatalogPage, CatalogError> {
    let results = results_array(body)?;

    let mut items = Vec::with_capacity(results.len());
    let mut skipped = 0;
    for entry in results {
        match serde_json::from_value::<RawGame>(entry.clone())
            .ok()
            .and_then(RawGame::into_game)
        {
            Some(game) => items.push(game),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Dropped catalog entries without a usable id");
    }

    Ok(CatalogPage {
        items,
        has_next: body.get("next").is_some_and(|next| !next.is_null()),
        total: body.get("count").and_then(Value::as_u64),
        skipped,
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, CatalogError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(CatalogError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(CatalogError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
