//! Radio Browser directory client
//!
//! Read-only access to the upstream station directory. Responses are JSON arrays
//! handed back without interpretation.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_DIRECTORY_BASE: &str = "https://de1.api.radio-browser.info/json";

/// Bytes of an upstream error body kept for the error message
const ERROR_MESSAGE_BYTES: usize = 256;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("invalid upstream response: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Upstream listings the hub reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryRoute {
    TopVoted { limit: u32 },
    ByCountry { country: String, limit: u32 },
    ByName { query: String, limit: u32 },
    Countries,
}

impl DirectoryRoute {
    /// Resolve the route against the directory base URL
    pub fn url(&self, base: &Url) -> Result<Url, UpstreamError> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::Transport(format!("invalid directory base URL: {}", base)))?;
            segments.pop_if_empty();
            match self {
                DirectoryRoute::TopVoted { limit } => {
                    segments.extend(["stations", "topvote", limit.to_string().as_str()]);
                }
                DirectoryRoute::ByCountry { country, .. } => {
                    segments.extend(["stations", "bycountry", country.as_str()]);
                }
                DirectoryRoute::ByName { query, .. } => {
                    segments.extend(["stations", "byname", query.as_str()]);
                }
                DirectoryRoute::Countries => {
                    segments.push("countries");
                }
            }
        }

        match self {
            DirectoryRoute::ByCountry { limit, .. } | DirectoryRoute::ByName { limit, .. } => {
                url.query_pairs_mut().append_pair("limit", &limit.to_string());
            }
            DirectoryRoute::TopVoted { .. } | DirectoryRoute::Countries => {}
        }

        Ok(url)
    }
}

/// Source of station and country listings
#[async_trait]
pub trait StationDirectory: Send + Sync {
    async fn fetch(&self, route: &DirectoryRoute) -> Result<Vec<Value>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTORY_BASE.to_string(),
            timeout: Duration::from_secs(15),
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RadioBrowserClient {
    http: reqwest::Client,
    base: Url,
    max_body_bytes: usize,
}

impl RadioBrowserClient {
    pub fn new(config: &DirectoryConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid directory base URL {}: {}", config.base_url, e))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("GlobalMusicHub/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.timeout.min(Duration::from_secs(5)))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl StationDirectory for RadioBrowserClient {
    async fn fetch(&self, route: &DirectoryRoute) -> Result<Vec<Value>, UpstreamError> {
        let url = route.url(&self.base)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = read_prefix(resp, ERROR_MESSAGE_BYTES.min(self.max_body_bytes))
                .await
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = read_limited(resp, self.max_body_bytes).await?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| UpstreamError::InvalidPayload(e.to_string()))?;
        match body {
            Value::Array(items) => Ok(items),
            other => Err(UpstreamError::InvalidPayload(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

async fn read_limited(resp: reqwest::Response, limit: usize) -> Result<Vec<u8>, UpstreamError> {
    if let Some(len) = resp.content_length() {
        if len as usize > limit {
            return Err(UpstreamError::InvalidPayload(format!(
                "response too large ({} bytes)",
                len
            )));
        }
    }

    let mut data: Vec<u8> = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if data.len().saturating_add(chunk.len()) > limit {
            return Err(UpstreamError::InvalidPayload(
                "response exceeded size limit".to_string(),
            ));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// First `limit` bytes of a body as trimmed text. The rest is never read.
async fn read_prefix(resp: reqwest::Response, limit: usize) -> Option<String> {
    let mut data: Vec<u8> = Vec::new();
    let mut stream = resp.bytes_stream();
    while data.len() < limit {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let take = chunk.len().min(limit - data.len());
                data.extend_from_slice(&chunk[..take]);
            }
            Some(Err(e)) => {
                debug!("Failed to read upstream error body: {}", e);
                return None;
            }
            None => break,
        }
    }
    Some(String::from_utf8_lossy(&data).trim().to_string())
}
