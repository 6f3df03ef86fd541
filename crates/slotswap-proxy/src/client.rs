//! Admin API client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ProxyError, ProxyResult};

/// The live routing document and the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub body: Value,
    /// Optimistic-concurrency token, when the proxy provides one.
    pub etag: Option<String>,
}

/// Whole-document access to the proxy's routing configuration.
#[async_trait]
pub trait ProxyAdmin: Send + Sync {
    /// Fetch the full current configuration.
    async fn read_config(&self) -> ProxyResult<ConfigDocument>;

    /// Replace the live configuration with `document`.
    ///
    /// If `document.etag` is set the write is conditional on it.
    async fn apply_config(&self, document: &ConfigDocument) -> ProxyResult<()>;
}

/// HTTP client for a Caddy-style admin endpoint
/// (`GET /config/`, `POST /load`).
#[derive(Clone)]
pub struct AdminClient {
    base: String,
    timeout: Duration,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl AdminClient {
    pub fn new(admin_url: &str, timeout: Duration) -> ProxyResult<Self> {
        let base = admin_url.trim_end_matches('/').to_string();
        let uri: http::Uri = base.parse().map_err(|e: http::uri::InvalidUri| {
            ProxyError::InvalidUrl {
                url: admin_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        if uri.scheme_str() != Some("http") || uri.host().is_none() {
            return Err(ProxyError::InvalidUrl {
                url: admin_url.to_string(),
                reason: "expected http://host[:port]".to_string(),
            });
        }

        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self {
            base,
            timeout,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Send one request; returns status, ETag header and body bytes.
    async fn send(
        &self,
        request: Request<Full<Bytes>>,
    ) -> ProxyResult<(StatusCode, Option<String>, Bytes)> {
        let url = request.uri().to_string();
        let unreachable = |reason: String| ProxyError::Unreachable {
            url: url.clone(),
            reason,
        };

        let exchange = async {
            let resp = self
                .client
                .request(request)
                .await
                .map_err(|e| unreachable(e.to_string()))?;
            let status = resp.status();
            let etag = resp
                .headers()
                .get(header::ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| unreachable(e.to_string()))?
                .to_bytes();
            Ok((status, etag, body))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(unreachable(format!("timed out after {:?}", self.timeout))),
        }
    }
}

#[async_trait]
impl ProxyAdmin for AdminClient {
    async fn read_config(&self) -> ProxyResult<ConfigDocument> {
        let url = self.url("/config/");
        let request = Request::builder()
            .method(Method::GET)
            .uri(&url)
            .header(header::ACCEPT, "application/json")
            .body(Full::new(Bytes::new()))
            .map_err(|e| ProxyError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let (status, etag, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(ProxyError::Status {
                url,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let body: Value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&body).map_err(|e| ProxyError::Decode(e.to_string()))?
        };
        debug!(%url, etag = ?etag, "routing config read");
        Ok(ConfigDocument { body, etag })
    }

    async fn apply_config(&self, document: &ConfigDocument) -> ProxyResult<()> {
        let url = self.url("/load");
        let payload =
            serde_json::to_vec(&document.body).map_err(|e| ProxyError::Decode(e.to_string()))?;

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(&url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(etag) = &document.etag {
            builder = builder.header(header::IF_MATCH, etag.as_str());
        }
        let request = builder
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| ProxyError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let (status, _, body) = self.send(request).await?;
        if status == StatusCode::PRECONDITION_FAILED {
            let etag = document.etag.clone().unwrap_or_default();
            warn!(%url, %etag, "routing config was modified concurrently");
            return Err(ProxyError::Conflict { etag });
        }
        if !status.is_success() {
            return Err(ProxyError::Status {
                url,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        info!(%url, "routing config applied");
        Ok(())
    }
}
