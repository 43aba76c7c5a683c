use super::AccountError;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection details shared by the auth and row-store clients.
///
/// Every request carries the project's anonymous key in the `apikey` header.
/// Cloning is cheap.
#[derive(Clone, Debug)]
pub struct Backend {
    http: reqwest::Client,
    base_url: Arc<str>,
    anon_key: Arc<SecretString>,
}

impl Backend {
    /// # Errors
    ///
    /// - [`AccountError::InvalidBaseUrl`] if `base_url` does not parse
    /// - [`AccountError::InsecureBaseUrl`] for plain HTTP to a non-local host
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        anon_key: SecretString,
    ) -> Result<Self, AccountError> {
        let parsed = url::Url::parse(base_url).map_err(|_| AccountError::InvalidBaseUrl)?;
        match parsed.scheme() {
            "https" => {}
            "http" if matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1")) => {
                tracing::warn!(base_url = %base_url, "Using non-HTTPS backend URL (localhost only)");
            }
            "http" => return Err(AccountError::InsecureBaseUrl),
            _ => return Err(AccountError::InvalidBaseUrl),
        }

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            anon_key: Arc::new(anon_key),
        })
    }

    /// Builds a request to `{base}{path}`, authorised as `token` when given
    /// and as the anonymous role otherwise.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
    ) -> RequestBuilder {
        let bearer = token.unwrap_or(self.anon_key.as_ref());
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
            .timeout(REQUEST_TIMEOUT)
    }

    /// Sends `request`, mapping error statuses to [`AccountError::Rejected`].
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, AccountError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| match status.as_u16() {
            401 | 403 => "Not authorised".to_string(),
            _ => format!("Backend returned status {}", status.as_u16()),
        });
        tracing::warn!(status = status.as_u16(), message = %message, "Backend request rejected");
        Err(AccountError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Sends `request` and decodes a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, AccountError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| AccountError::Malformed(e.to_string()))
    }
}

/// Pulls a human-readable message out of an auth or row-store error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
