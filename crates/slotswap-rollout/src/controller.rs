//! Orchestrator — the deploy, rollback and status entry points.
//!
//! Each operation loads the persisted record, plans against it, runs the
//! plan through the `Executor` and journals the outcome. Planning errors
//! (nothing to roll back, a corrupt record) are returned before anything
//! external is touched and are not journaled.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{info, warn};

use slotswap_core::{ArtifactRef, Slot, UnitName};
use slotswap_health::HealthProbe;
use slotswap_proxy::{ProxyAdmin, upstream_dials};
use slotswap_runtime::{ArtifactBuilder, UnitRuntime, UnitStatus};
use slotswap_state::{DeploymentState, DeploymentStore, OperationOutcome, OperationRecord};

use crate::error::DeployResult;
use crate::executor::{ExecutionReport, Executor};
use crate::plan::{ArtifactSource, Plan, plan_deploy, plan_rollback};
use crate::settings::Settings;

/// Journal entries included in a status report.
const STATUS_HISTORY: usize = 5;

/// The external systems an operation drives.
#[derive(Clone)]
pub struct Collaborators {
    pub runtime: Arc<dyn UnitRuntime>,
    pub builder: Arc<dyn ArtifactBuilder>,
    pub proxy: Arc<dyn ProxyAdmin>,
    pub probe: Arc<dyn HealthProbe>,
    pub store: Arc<dyn DeploymentStore>,
}

/// Observed state of one slot's unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub slot: Slot,
    pub unit: UnitName,
    /// `None` when the runtime could not be queried.
    pub status: Option<UnitStatus>,
}

/// Snapshot of persisted state next to what is actually live.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: DeploymentState,
    pub active: Slot,
    pub standby: Slot,
    pub rollback_available: bool,
    /// Every upstream dial in the live proxy document.
    pub live_upstreams: Vec<String>,
    /// Set when the proxy could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_error: Option<String>,
    /// Whether live routing dials the recorded active slot and not the standby.
    pub routing_in_sync: bool,
    pub units: Vec<UnitReport>,
    pub recent_operations: Vec<OperationRecord>,
}

pub struct Orchestrator {
    settings: Settings,
    collab: Collaborators,
}

impl Orchestrator {
    pub fn new(settings: Settings, collab: Collaborators) -> Self {
        Self { settings, collab }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Deploy `source` into the standby slot and move traffic to it.
    pub async fn deploy(&self, source: ArtifactSource) -> DeployResult<ExecutionReport> {
        let state = self.collab.store.load(&self.settings.slots)?;
        let plan = plan_deploy(&state, &self.settings, source)?;
        info!(
            from = plan.from_port,
            to = plan.to_port,
            artifact = ?plan.artifact,
            "deploy starting"
        );
        self.execute(plan).await
    }

    /// Move traffic back to the previously active slot.
    pub async fn rollback(&self) -> DeployResult<ExecutionReport> {
        let state = self.collab.store.load(&self.settings.slots)?;
        let plan = plan_rollback(&state, &self.settings)?;
        info!(from = plan.from_port, to = plan.to_port, "rollback starting");
        self.execute(plan).await
    }

    async fn execute(&self, plan: Plan) -> DeployResult<ExecutionReport> {
        let result = Executor::new(&self.settings, &self.collab).run(&plan).await;

        let (artifact, outcome) = match &result {
            Ok(report) => (
                report.artifact.clone(),
                OperationOutcome::Succeeded {
                    warnings: report.warnings.clone(),
                },
            ),
            Err(e) => (
                plan.artifact.clone(),
                OperationOutcome::Aborted {
                    reason: e.to_string(),
                },
            ),
        };
        self.journal(&plan, artifact, outcome);

        if let Ok(report) = &result {
            info!(
                operation = ?report.kind,
                active_port = report.state.active_port,
                warnings = report.warnings.len(),
                "operation complete"
            );
        }
        result
    }

    fn journal(&self, plan: &Plan, artifact: Option<ArtifactRef>, outcome: OperationOutcome) {
        let entry = OperationRecord {
            kind: plan.kind,
            epoch_millis: now_millis(),
            artifact,
            from_port: plan.from_port,
            to_port: plan.to_port,
            outcome,
        };
        if let Err(e) = self.collab.store.record(&entry) {
            warn!(error = %e, "failed to journal operation");
        }
    }

    /// Compare the persisted record with live routing and unit state.
    ///
    /// Only the state store is required; proxy and runtime failures are
    /// reported inside the snapshot.
    pub async fn status(&self) -> DeployResult<StatusReport> {
        let slots = &self.settings.slots;
        let state = self.collab.store.load(slots)?;
        let active = state.active_slot(slots)?;
        let standby = state.standby_slot(slots)?;

        let (live_upstreams, proxy_error) = match self.collab.proxy.read_config().await {
            Ok(doc) => (upstream_dials(&doc.body), None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };
        let active_dial = self.settings.dial_address(active);
        let standby_dial = self.settings.dial_address(standby);
        let routing_in_sync = proxy_error.is_none()
            && live_upstreams.iter().any(|d| *d == active_dial)
            && !live_upstreams.iter().any(|d| *d == standby_dial);

        let mut units = Vec::with_capacity(2);
        for slot in slots.iter() {
            let unit = self.settings.unit(slot.name);
            let status = match self.collab.runtime.status(&unit).await {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!(%unit, error = %e, "unit status unavailable");
                    None
                }
            };
            units.push(UnitReport { slot, unit, status });
        }

        Ok(StatusReport {
            rollback_available: state.can_rollback(),
            recent_operations: self.collab.store.recent_operations(STATUS_HISTORY)?,
            state,
            active,
            standby,
            live_upstreams,
            proxy_error,
            routing_in_sync,
            units,
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
