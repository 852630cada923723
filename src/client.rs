use async_trait::async_trait;
use eyre::{Result, WrapErr};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

use crate::error::HttpError;

const API_KEY_HEADER: &str = "x-api-key";
const USER_AGENT: &str = concat!("scan-gate/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Issues authenticated JSON requests against the scanning service.
///
/// Implementations never retry; callers own the retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, HttpError>;

    async fn get(&self, path: &str) -> Result<Value, HttpError> {
        self.request(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, HttpError> {
        self.request(Method::POST, path, Some(body)).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url, api_key: &str, timeout: Duration) -> Result<Self> {
        log::debug!("[client] new: base_url={} timeout={}s", base_url, timeout.as_secs());

        let mut api_key_value = HeaderValue::from_str(api_key)
            .wrap_err("API key contains characters not allowed in an HTTP header")?;
        api_key_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .wrap_err("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, HttpError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Connection(format!("invalid endpoint {}: {}", path, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, HttpError> {
        let url = self.endpoint(path)?;
        log::debug!("[client] request: method={} url={}", method, url);

        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            log::warn!("[client] request_failed: method={} url={} error={}", method, url, e);
            HttpError::Connection(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::Connection(format!("reading response body: {}", e)))?;

        log::debug!("[client] response: method={} url={} status={} duration={}ms bytes={}",
            method, url, status.as_u16(), started.elapsed().as_millis(), text.len());

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        decode_body(&text)
    }
}

/// An empty body is a valid answer (an accepted scan start may carry none).
fn decode_body(text: &str) -> Result<Value, HttpError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| HttpError::Decode(e.to_string()))
}

// Url::join drops the last segment of a base without a trailing slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
