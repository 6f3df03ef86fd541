//! Proxy admin API errors.

use thiserror::Error;

pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid admin URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("admin API unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("admin API returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("routing config changed since it was read (etag {etag})")]
    Conflict { etag: String },

    #[error("invalid config document: {0}")]
    Decode(String),
}
