//! Pure planning: persisted state in, ordered steps out.
//!
//! Nothing here touches the network, the runtime or the store. The
//! planners decide *what* a deploy or rollback will do; `Plan::validate`
//! checks that the order keeps every irreversible step behind a passed
//! health gate and a successful cutover.

use slotswap_core::{ArtifactRef, UnitName};
use slotswap_health::GateConfig;
use slotswap_runtime::BuildRequest;
use slotswap_state::{DeploymentState, OperationKind};
use tracing::debug;

use crate::error::{DeployError, DeployResult};
use crate::settings::Settings;

/// Where the artifact for a deploy comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Launch an artifact that already exists.
    Prebuilt(ArtifactRef),
    /// Build first, then launch the result.
    Build(BuildRequest),
}

/// One typed step of a deploy or rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Confirm live routing dials `active` and not `standby` before any
    /// unit is touched.
    VerifyRouting { active: String, standby: String },
    /// Produce the artifact to launch.
    Build(BuildRequest),
    /// Remove any leftover unit occupying the standby slot.
    ClearStandby { unit: UnitName, port: u16 },
    /// Create and start a unit on `port` from the current artifact.
    Launch { unit: UnitName, port: u16 },
    /// Make sure an existing unit is running; it must not be recreated.
    Revive { unit: UnitName },
    /// Block until `unit` answers healthy at `address`.
    HealthGate {
        unit: UnitName,
        address: String,
        gate: GateConfig,
    },
    /// Repoint every upstream dialing `from` to `to`.
    Cutover {
        from: String,
        to: String,
        to_unit: UnitName,
    },
    /// Take a unit out of service; best effort.
    Decommission { unit: UnitName, remove: bool },
    /// Commit the new record. Always last.
    Persist(DeploymentState),
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::VerifyRouting { .. } => "verify-routing",
            Step::Build(_) => "build",
            Step::ClearStandby { .. } => "clear-standby",
            Step::Launch { .. } => "launch",
            Step::Revive { .. } => "revive",
            Step::HealthGate { .. } => "health-gate",
            Step::Cutover { .. } => "cutover",
            Step::Decommission { .. } => "decommission",
            Step::Persist(_) => "persist",
        }
    }

    /// Steps that create, remove or start units.
    fn touches_units(&self) -> bool {
        matches!(
            self,
            Step::ClearStandby { .. } | Step::Launch { .. } | Step::Revive { .. }
        )
    }

    /// Steps that may only run before the cutover (their effects are undone on abort).
    fn is_reversible(&self) -> bool {
        matches!(
            self,
            Step::VerifyRouting { .. }
                | Step::Build(_)
                | Step::ClearStandby { .. }
                | Step::Launch { .. }
                | Step::Revive { .. }
                | Step::HealthGate { .. }
        )
    }
}

/// An ordered list of steps for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub kind: OperationKind,
    pub from_port: u16,
    pub to_port: u16,
    /// Artifact known up front; a `Build` step supplies it otherwise.
    pub artifact: Option<ArtifactRef>,
    pub steps: Vec<Step>,
}

impl Plan {
    /// Check the step order.
    ///
    /// - exactly one `Persist`, and it is the last step
    /// - exactly one `Cutover`, preceded by a `HealthGate` on the unit it cuts over to
    /// - no build, launch, revive or gate after the cutover
    /// - no `Decommission` before the cutover
    /// - a `VerifyRouting` before the first step that touches a unit
    /// - a `Launch` has an artifact, either up front or from an earlier `Build`
    pub fn validate(&self) -> DeployResult<()> {
        let invalid = |msg: String| Err(DeployError::InvalidPlan(msg));

        let persists = self
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Persist(_)))
            .count();
        if persists != 1 || !matches!(self.steps.last(), Some(Step::Persist(_))) {
            return invalid("persist must appear exactly once, as the last step".into());
        }

        let cutovers: Vec<(usize, &UnitName)> = self
            .steps
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Step::Cutover { to_unit, .. } => Some((i, to_unit)),
                _ => None,
            })
            .collect();
        let [(cutover_at, to_unit)] = cutovers.as_slice() else {
            return invalid(format!("expected one cutover, found {}", cutovers.len()));
        };

        let (before, after) = self.steps.split_at(*cutover_at);

        let gated = before
            .iter()
            .any(|s| matches!(s, Step::HealthGate { unit, .. } if unit == *to_unit));
        if !gated {
            return invalid(format!("cutover to {to_unit} is not behind a health gate"));
        }

        if let Some(step) = before.iter().find(|s| !s.is_reversible()) {
            return invalid(format!("{} must come after the cutover", step.label()));
        }
        if let Some(step) = after[1..].iter().find(|s| s.is_reversible()) {
            return invalid(format!("{} must come before the cutover", step.label()));
        }

        let verified_at = self
            .steps
            .iter()
            .position(|s| matches!(s, Step::VerifyRouting { .. }));
        if let Some(touch_at) = self.steps.iter().position(Step::touches_units) {
            if !verified_at.is_some_and(|at| at < touch_at) {
                return invalid(format!(
                    "{} runs before live routing is verified",
                    self.steps[touch_at].label()
                ));
            }
        }

        let mut has_artifact = self.artifact.is_some();
        for step in before {
            match step {
                Step::Build(_) => has_artifact = true,
                Step::Launch { unit, .. } if !has_artifact => {
                    return invalid(format!("launch of {unit} has no artifact"));
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn step_labels(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::label).collect()
    }
}

/// Plan a deploy of `source` into the standby slot.
pub fn plan_deploy(
    state: &DeploymentState,
    settings: &Settings,
    source: ArtifactSource,
) -> DeployResult<Plan> {
    let active = state.active_slot(&settings.slots)?;
    let standby = state.standby_slot(&settings.slots)?;
    let active_unit = settings.unit(active.name);
    let standby_unit = settings.unit(standby.name);

    // Checked before a build so a drifted host fails fast.
    let mut steps = vec![Step::VerifyRouting {
        active: settings.dial_address(active),
        standby: settings.dial_address(standby),
    }];
    let artifact = match source {
        ArtifactSource::Prebuilt(artifact) => Some(artifact),
        ArtifactSource::Build(request) => {
            steps.push(Step::Build(request));
            None
        }
    };

    steps.extend([
        Step::ClearStandby {
            unit: standby_unit.clone(),
            port: standby.port,
        },
        Step::Launch {
            unit: standby_unit.clone(),
            port: standby.port,
        },
        Step::HealthGate {
            unit: standby_unit.clone(),
            address: settings.probe_address(standby),
            gate: settings.deploy_gate,
        },
        Step::Cutover {
            from: settings.dial_address(active),
            to: settings.dial_address(standby),
            to_unit: standby_unit,
        },
        // Stopped, not removed: it is the rollback target until the next
        // deploy clears the standby slot.
        Step::Decommission {
            unit: active_unit.clone(),
            remove: false,
        },
        Step::Persist(state.after_cutover(standby.port, active_unit)),
    ]);

    let plan = Plan {
        kind: OperationKind::Deploy,
        from_port: active.port,
        to_port: standby.port,
        artifact,
        steps,
    };
    debug!(steps = ?plan.step_labels(), from = active.port, to = standby.port, "deploy planned");
    Ok(plan)
}

/// Plan a rollback to the recorded previous slot.
pub fn plan_rollback(state: &DeploymentState, settings: &Settings) -> DeployResult<Plan> {
    let target = state
        .rollback_target()
        .ok_or(DeployError::NoRollbackAvailable)?;
    let active = state.active_slot(&settings.slots)?;
    let previous = settings
        .slots
        .by_port(target.port)
        .filter(|slot| slot.port != active.port)
        .ok_or_else(|| {
            DeployError::InvalidPlan(format!(
                "recorded previous port {} is not the standby slot",
                target.port
            ))
        })?;
    let active_unit = settings.unit(active.name);

    let steps = vec![
        Step::VerifyRouting {
            active: settings.dial_address(active),
            standby: settings.dial_address(previous),
        },
        Step::Revive {
            unit: target.unit.clone(),
        },
        Step::HealthGate {
            unit: target.unit.clone(),
            address: settings.probe_address(previous),
            gate: settings.rollback_gate,
        },
        Step::Cutover {
            from: settings.dial_address(active),
            to: settings.dial_address(previous),
            to_unit: target.unit,
        },
        // Nothing references the abandoned unit once history is consumed.
        Step::Decommission {
            unit: active_unit,
            remove: true,
        },
        Step::Persist(state.after_rollback(previous.port)),
    ];

    let plan = Plan {
        kind: OperationKind::Rollback,
        from_port: active.port,
        to_port: previous.port,
        artifact: None,
        steps,
    };
    debug!(steps = ?plan.step_labels(), from = active.port, to = previous.port, "rollback planned");
    Ok(plan)
}
