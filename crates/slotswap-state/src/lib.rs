//! slotswap-state — persisted deployment state for slotswap.
//!
//! Backed by [redb](https://docs.rs/redb). The store holds one
//! `DeploymentState` record (which slot port is live, plus at most one
//! level of rollback history) and an append-only journal of deploy and
//! rollback outcomes.
//!
//! The record is only ever written at the end of a successful operation,
//! so a crash mid-operation leaves the last committed state in place.
//! redb holds an exclusive lock on the database file while a `StateStore`
//! is open, which keeps two invocations from interleaving on one host.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{DeploymentStore, StateStore};
pub use types::*;
