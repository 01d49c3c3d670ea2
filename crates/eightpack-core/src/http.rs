// HTTP transport: the request primitive the components depend on, and the
// reqwest implementation used against a live backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Status plus decoded JSON body. Application errors arrive here as normal
/// responses; only the components decide what a body means.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

/// Send one request to the backend and decode the JSON answer.
///
/// `path` is relative to the backend root (`users/token`, `drafts/5/choices`).
/// A non-empty `token` is sent as a bearer credential. Any failure to obtain
/// a JSON body is a [`TransportError`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// ReqwestClient
// ---------------------------------------------------------------------------

pub struct ReqwestClient {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.backend.url, config.timeout())
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(path);

        // POST always carries a JSON body (`{}` when the caller has none);
        // `.json()` sets the content type itself.
        let mut request = match method {
            Method::Get => self
                .http
                .get(&url)
                .header(CONTENT_TYPE, "application/json"),
            Method::Post => {
                let empty = Value::Object(Default::default());
                self.http.post(&url).json(body.unwrap_or(&empty))
            }
        };

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Request {
                path: path.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response
            .json::<Value>()
            .await
            .map_err(|source| TransportError::Decode {
                path: path.to_string(),
                source,
            })?;

        debug!(path, status, ?method, "backend responded");
        Ok(HttpResponse { status, body })
    }
}
