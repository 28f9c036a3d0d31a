//! HTTP client for the API under test
//!
//! Thin wrapper over `reqwest` that joins paths onto the configured base URL,
//! attaches the JSON content type and the bearer token, applies the request
//! timeout and decodes bodies with a text fallback.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Methods a check may issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and DELETE never carry a body
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => anyhow::bail!("Unsupported method: {}", other),
        }
    }
}

// Suite files may spell methods in any case, same as `FromStr`
impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Transport-level failure; never carries an HTTP status
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Decoded response from the API under test
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined to the base URL
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.is_empty() || path == "/" {
            return format!("{}/", self.base_url);
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(path);
        let mut req = self
            .client
            .request(method.to_reqwest(), &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if method.sends_body() {
            if let Some(body) = body {
                req = req.body(body.to_string());
            }
        }

        log::debug!("{} {}", method, url);
        self.execute(req, &url).await
    }

    /// CORS preflight: OPTIONS with the given request headers
    pub async fn options(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(path);
        let mut req = self.client.request(reqwest::Method::OPTIONS, &url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        log::debug!("OPTIONS {}", url);
        self.execute(req, &url).await
    }

    async fn execute(
        &self,
        req: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<ApiResponse, ClientError> {
        let res = req.send().await.map_err(|e| self.classify(e, url))?;
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.map_err(|e| self.classify(e, url))?;

        log::debug!("{} -> {} ({} bytes)", url, status, text.len());

        Ok(ApiResponse {
            status,
            headers,
            body: decode_body(status, &text),
        })
    }

    fn classify(&self, err: reqwest::Error, url: &str) -> ClientError {
        let url = url.to_string();
        if err.is_timeout() {
            ClientError::Timeout {
                url,
                secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() {
            ClientError::Connect { url, source: err }
        } else {
            ClientError::Request { url, source: err }
        }
    }
}

/// JSON when possible, otherwise `{"text": raw, "status_code": status}`
pub fn decode_body(status: u16, text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| {
        json!({
            "text": text,
            "status_code": status,
        })
    })
}
