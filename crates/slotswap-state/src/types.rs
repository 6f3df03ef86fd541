//! Persisted record types.
//!
//! `DeploymentState` is the single source of truth for which slot is live.
//! Its transitions are pure functions so the orchestrator can compute the
//! next record before touching anything external.

use serde::{Deserialize, Serialize};

use slotswap_core::{ArtifactRef, Slot, SlotPair, UnitName};

use crate::error::{StateError, StateResult};

/// The persisted deployment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    /// Port currently receiving proxied traffic.
    pub active_port: u16,
    /// Port that was active before the last cutover, if a rollback is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_port: Option<u16>,
    /// Unit that was bound to `previous_port` at the last cutover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_unit: Option<UnitName>,
}

/// One level of rollback history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackTarget {
    pub port: u16,
    pub unit: UnitName,
}

impl DeploymentState {
    /// First-run state: slot A active, no history.
    pub fn initial(slots: &SlotPair) -> Self {
        Self {
            active_port: slots.a.port,
            previous_port: None,
            previous_unit: None,
        }
    }

    /// The rollback target, present only when both history fields are set.
    pub fn rollback_target(&self) -> Option<RollbackTarget> {
        match (self.previous_port, &self.previous_unit) {
            (Some(port), Some(unit)) => Some(RollbackTarget {
                port,
                unit: unit.clone(),
            }),
            _ => None,
        }
    }

    pub fn can_rollback(&self) -> bool {
        self.rollback_target().is_some()
    }

    /// The slot currently receiving traffic.
    pub fn active_slot(&self, slots: &SlotPair) -> StateResult<Slot> {
        slots
            .by_port(self.active_port)
            .ok_or(StateError::ForeignPort(self.active_port))
    }

    /// The slot not currently receiving traffic; target of the next deploy.
    pub fn standby_slot(&self, slots: &SlotPair) -> StateResult<Slot> {
        slots
            .opposite(self.active_port)
            .ok_or(StateError::ForeignPort(self.active_port))
    }

    /// Record after a successful cutover from the current slot to `new_port`.
    ///
    /// The outgoing slot becomes the one level of rollback history.
    pub fn after_cutover(&self, new_port: u16, outgoing_unit: UnitName) -> Self {
        Self {
            active_port: new_port,
            previous_port: Some(self.active_port),
            previous_unit: Some(outgoing_unit),
        }
    }

    /// Record after a successful rollback: history is consumed.
    pub fn after_rollback(&self, restored_port: u16) -> Self {
        Self {
            active_port: restored_port,
            previous_port: None,
            previous_unit: None,
        }
    }
}

/// Which operation a journal entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deploy,
    Rollback,
}

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OperationOutcome {
    Succeeded { warnings: Vec<String> },
    Aborted { reason: String },
}

/// Journal entry for one deploy or rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub kind: OperationKind,
    /// Unix timestamp in milliseconds.
    pub epoch_millis: u64,
    pub artifact: Option<ArtifactRef>,
    pub from_port: u16,
    pub to_port: u16,
    pub outcome: OperationOutcome,
}

impl OperationRecord {
    pub fn table_key(&self) -> String {
        format!("{:020}", self.epoch_millis)
    }
}
