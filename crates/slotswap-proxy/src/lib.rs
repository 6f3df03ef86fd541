//! slotswap-proxy — the reverse proxy's live routing configuration.
//!
//! The proxy exposes its whole configuration as one JSON document over an
//! admin API. There is no "swap this address" primitive, so a cutover is a
//! read-modify-write of the full document:
//!
//! ```text
//! ProxyAdmin::read_config()        GET  {admin}/config/   (captures ETag)
//!   → rewrite_upstream(doc, old, new)   pure, in memory
//!   → ProxyAdmin::apply_config(doc) POST {admin}/load     (If-Match: ETag)
//! ```
//!
//! When the proxy hands out an ETag it is sent back on the write, and a
//! `412 Precondition Failed` surfaces as [`ProxyError::Conflict`]. Without
//! one the write is unconditional and concurrent writers can race.

pub mod client;
pub mod document;
pub mod error;

pub use client::{AdminClient, ConfigDocument, ProxyAdmin};
pub use document::{Rewrite, rewrite_upstream, upstream_dials};
pub use error::{ProxyError, ProxyResult};
