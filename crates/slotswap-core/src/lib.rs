//! slotswap-core — shared identities and configuration for slotswap.
//!
//! A host runs exactly two deployment slots (`A` and `B`), each a fixed
//! `(name, port)` pair. Everything else in the workspace talks in terms of
//! the types defined here.

pub mod config;
pub mod types;

pub use config::{ConfigError, SlotswapConfig, parse_duration};
pub use types::*;
