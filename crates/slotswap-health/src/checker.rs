//! Single health probes.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The health endpoint returned 2xx.
    Healthy,
    /// The health endpoint returned non-2xx.
    Unhealthy,
    /// The probe could not be executed (connection error or timeout).
    Failed,
}

impl ProbeResult {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeResult::Healthy)
    }
}

/// Something that can probe a unit's health endpoint once.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the unit listening at `address` (`host:port`).
    async fn probe(&self, address: &str) -> ProbeResult;
}

/// HTTP `GET` prober for a fixed health path.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    path: String,
    request_timeout: Duration,
}

impl HttpProbe {
    pub fn new(path: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            request_timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, address: &str) -> ProbeResult {
        http_probe(address, &self.path, self.request_timeout).await
    }
}

/// Perform an HTTP health probe against an endpoint.
///
/// Returns `Healthy` if the response is 2xx, `Unhealthy` for non-2xx,
/// or `Failed` if the connection fails or times out.
pub async fn http_probe(address: &str, path: &str, timeout: Duration) -> ProbeResult {
    let uri = format!("http://{address}{path}");

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "health probe connection failed");
                return ProbeResult::Failed;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "health probe handshake failed");
                return ProbeResult::Failed;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address)
            .header("user-agent", "slotswap-health/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %uri, "health probe request invalid");
                return ProbeResult::Failed;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) => {
                if resp.status().is_success() {
                    ProbeResult::Healthy
                } else {
                    debug!(status = %resp.status(), %uri, "health probe non-2xx");
                    ProbeResult::Unhealthy
                }
            }
            Err(e) => {
                debug!(error = %e, %uri, "health probe request failed");
                ProbeResult::Failed
            }
        }
    })
    .await;

    match result {
        Ok(probe) => probe,
        Err(_) => {
            debug!(%uri, "health probe timed out");
            ProbeResult::Failed
        }
    }
}
