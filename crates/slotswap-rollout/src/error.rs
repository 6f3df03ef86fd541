//! Deploy and rollback errors.

use std::time::Duration;

use thiserror::Error;

use slotswap_core::UnitName;
use slotswap_proxy::ProxyError;
use slotswap_runtime::RuntimeError;
use slotswap_state::StateError;

pub type DeployResult<T> = Result<T, DeployError>;

/// Why a deploy or rollback did not complete.
///
/// Every variant except `PersistFailed` is raised before the cutover, so
/// live routing and persisted state are unchanged when it is returned.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("standby unit {unit} could not be cleared: {reason}")]
    StandbyOccupied { unit: UnitName, reason: String },

    #[error("{unit} did not become healthy at {address} within {timeout:?}")]
    HealthCheckTimeout {
        unit: UnitName,
        address: String,
        timeout: Duration,
        /// Recent unit output captured before the unit was cleaned up.
        logs: String,
    },

    #[error("proxy config unreachable: {0}")]
    ConfigUnreachable(#[source] ProxyError),

    #[error("applying proxy config failed: {0}")]
    ConfigApplyFailed(#[source] ProxyError),

    #[error("proxy config was changed by another writer, review routing before retrying: {0}")]
    ConfigConflict(#[source] ProxyError),

    #[error("no upstream dials {address}; live routing does not match the recorded active slot")]
    UpstreamNotFound { address: String },

    #[error("live routing already dials {address}, the slot this operation would replace; reconcile state with the proxy first")]
    RoutingDrift { address: String },

    #[error("no rollback available")]
    NoRollbackAvailable,

    #[error("previous unit {unit} no longer exists; deploy a fresh build instead")]
    PreviousUnitGone { unit: UnitName },

    /// Only ever reported as a warning: the unit is out of the traffic path.
    #[error("decommissioning {unit} failed: {reason}")]
    DecommissionFailed { unit: UnitName, reason: String },

    #[error("build failed: {0}")]
    Build(#[source] RuntimeError),

    #[error("{action} {unit} failed: {source}")]
    Runtime {
        action: &'static str,
        unit: UnitName,
        #[source]
        source: RuntimeError,
    },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("routing now points at port {active_port} but saving state failed: {source}")]
    PersistFailed {
        active_port: u16,
        #[source]
        source: StateError,
    },
}
