//! Step interpreter.
//!
//! Runs a validated `Plan` one step at a time. Every step reports a
//! `StepOutcome`; the first `Abort` ends the run. Before the cutover each
//! step that changes the runtime registers an undo action, and those run
//! in reverse order on abort. A successful cutover discards them: from
//! then on the new unit is serving and must not be touched.

use tracing::{error, info, warn};

use slotswap_core::{ArtifactRef, UnitName};
use slotswap_health::{ProbeError, wait_healthy};
use slotswap_proxy::{ProxyError, rewrite_upstream, upstream_dials};
use slotswap_runtime::{LaunchSpec, RuntimeError, UnitStatus};
use slotswap_state::{DeploymentState, OperationKind};

use crate::controller::Collaborators;
use crate::error::{DeployError, DeployResult};
use crate::plan::{Plan, Step};
use crate::settings::Settings;

/// Result of running one step.
#[derive(Debug)]
pub enum StepOutcome {
    Continue,
    Abort(DeployError),
}

/// Summary of a completed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub kind: OperationKind,
    /// The record that was persisted.
    pub state: DeploymentState,
    pub artifact: Option<ArtifactRef>,
    /// Non-fatal problems (failed decommissions).
    pub warnings: Vec<String>,
}

/// Undo action for a reversible step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Undo {
    Remove(UnitName),
    Stop(UnitName),
}

/// Mutable bookkeeping for one run.
#[derive(Debug, Default)]
struct RunContext {
    artifact: Option<ArtifactRef>,
    undo: Vec<Undo>,
    cut_over: bool,
    warnings: Vec<String>,
    persisted: Option<DeploymentState>,
}

/// Interprets plans against the collaborators.
pub struct Executor<'a> {
    settings: &'a Settings,
    collab: &'a Collaborators,
}

impl<'a> Executor<'a> {
    pub fn new(settings: &'a Settings, collab: &'a Collaborators) -> Self {
        Self { settings, collab }
    }

    /// Run `plan` to success or the first abort.
    pub async fn run(&self, plan: &Plan) -> DeployResult<ExecutionReport> {
        plan.validate()?;

        let mut ctx = RunContext {
            artifact: plan.artifact.clone(),
            ..Default::default()
        };
        let total = plan.steps.len();

        for (index, step) in plan.steps.iter().enumerate() {
            info!(
                operation = ?plan.kind,
                step = step.label(),
                n = index + 1,
                total,
                "running step"
            );
            if let StepOutcome::Abort(err) = self.execute(step, &mut ctx).await {
                error!(operation = ?plan.kind, step = step.label(), error = %err, "aborting");
                if !ctx.cut_over {
                    self.compensate(&mut ctx).await;
                }
                return Err(err);
            }
        }

        let state = ctx
            .persisted
            .ok_or_else(|| DeployError::InvalidPlan("plan finished without persisting".into()))?;
        Ok(ExecutionReport {
            kind: plan.kind,
            state,
            artifact: ctx.artifact,
            warnings: ctx.warnings,
        })
    }

    async fn execute(&self, step: &Step, ctx: &mut RunContext) -> StepOutcome {
        match step {
            Step::VerifyRouting { active, standby } => self.verify_routing(active, standby).await,

            Step::Build(request) => match self.collab.builder.build(request).await {
                Ok(artifact) => {
                    info!(%artifact, "artifact built");
                    ctx.artifact = Some(artifact);
                    StepOutcome::Continue
                }
                Err(e) => StepOutcome::Abort(DeployError::Build(e)),
            },

            Step::ClearStandby { unit, port } => self.clear_standby(unit, *port).await,

            Step::Launch { unit, port } => {
                let Some(artifact) = ctx.artifact.clone() else {
                    return StepOutcome::Abort(DeployError::InvalidPlan(format!(
                        "no artifact to launch {unit}"
                    )));
                };
                let spec = LaunchSpec {
                    unit: unit.clone(),
                    artifact,
                    bind_host: self.settings.probe_host.clone(),
                    host_port: *port,
                    container_port: self.settings.container_port,
                    env: self.settings.env.clone(),
                    network: self.settings.network.clone(),
                };
                // Registered first so a half-created unit is cleaned up too.
                ctx.undo.push(Undo::Remove(unit.clone()));
                match self.collab.runtime.launch(&spec).await {
                    Ok(()) => StepOutcome::Continue,
                    Err(source) => StepOutcome::Abort(DeployError::Runtime {
                        action: "launch",
                        unit: unit.clone(),
                        source,
                    }),
                }
            }

            Step::Revive { unit } => self.revive(unit, ctx).await,

            Step::HealthGate {
                unit,
                address,
                gate,
            } => match wait_healthy(self.collab.probe.as_ref(), address, *gate).await {
                Ok(_) => StepOutcome::Continue,
                Err(ProbeError::Timeout { timeout, .. }) => {
                    let logs = self.capture_logs(unit).await;
                    StepOutcome::Abort(DeployError::HealthCheckTimeout {
                        unit: unit.clone(),
                        address: address.clone(),
                        timeout,
                        logs,
                    })
                }
            },

            Step::Cutover { from, to, .. } => {
                let outcome = self.cutover(from, to).await;
                if matches!(outcome, StepOutcome::Continue) {
                    ctx.cut_over = true;
                    ctx.undo.clear();
                }
                outcome
            }

            Step::Decommission { unit, remove } => {
                if let Err(reason) = self.decommission(unit, *remove).await {
                    let warning = DeployError::DecommissionFailed {
                        unit: unit.clone(),
                        reason,
                    };
                    warn!(%warning, "continuing; unit is out of the traffic path");
                    ctx.warnings.push(warning.to_string());
                }
                StepOutcome::Continue
            }

            Step::Persist(state) => match self.collab.store.save(state) {
                Ok(()) => {
                    ctx.persisted = Some(state.clone());
                    StepOutcome::Continue
                }
                Err(source) => StepOutcome::Abort(DeployError::PersistFailed {
                    active_port: state.active_port,
                    source,
                }),
            },
        }
    }

    /// State and routing must agree before any unit is touched: the
    /// standby unit may be the one actually serving.
    async fn verify_routing(&self, active: &str, standby: &str) -> StepOutcome {
        let dials = match self.collab.proxy.read_config().await {
            Ok(doc) => upstream_dials(&doc.body),
            Err(e) => return StepOutcome::Abort(DeployError::ConfigUnreachable(e)),
        };

        if dials.iter().any(|d| d == standby) {
            warn!(%active, %standby, ?dials, "live routing disagrees with recorded state");
            return StepOutcome::Abort(DeployError::RoutingDrift {
                address: standby.to_string(),
            });
        }
        if !dials.iter().any(|d| d == active) {
            return StepOutcome::Abort(DeployError::UpstreamNotFound {
                address: active.to_string(),
            });
        }
        StepOutcome::Continue
    }

    async fn clear_standby(&self, unit: &UnitName, port: u16) -> StepOutcome {
        let occupied = |reason: String| {
            StepOutcome::Abort(DeployError::StandbyOccupied {
                unit: unit.clone(),
                reason,
            })
        };

        match self.collab.runtime.status(unit).await {
            Ok(status) if status.exists() => {
                warn!(%unit, port, ?status, "standby slot occupied, removing stale unit");
                match self.collab.runtime.remove(unit).await {
                    Ok(()) => StepOutcome::Continue,
                    Err(e) => occupied(e.to_string()),
                }
            }
            Ok(_) => StepOutcome::Continue,
            Err(e) => occupied(e.to_string()),
        }
    }

    async fn revive(&self, unit: &UnitName, ctx: &mut RunContext) -> StepOutcome {
        let status = match self.collab.runtime.status(unit).await {
            Ok(status) => status,
            Err(source) => {
                return StepOutcome::Abort(DeployError::Runtime {
                    action: "inspect",
                    unit: unit.clone(),
                    source,
                });
            }
        };

        match status {
            UnitStatus::Absent => StepOutcome::Abort(DeployError::PreviousUnitGone {
                unit: unit.clone(),
            }),
            UnitStatus::Running => {
                info!(%unit, "previous unit already running");
                StepOutcome::Continue
            }
            UnitStatus::Stopped => match self.collab.runtime.start(unit).await {
                Ok(()) => {
                    // Stopped again on abort so it stays a valid rollback target.
                    ctx.undo.push(Undo::Stop(unit.clone()));
                    StepOutcome::Continue
                }
                // Removed between the status check and the start.
                Err(RuntimeError::NoSuchUnit(_)) => {
                    StepOutcome::Abort(DeployError::PreviousUnitGone { unit: unit.clone() })
                }
                Err(source) => StepOutcome::Abort(DeployError::Runtime {
                    action: "start",
                    unit: unit.clone(),
                    source,
                }),
            },
        }
    }

    /// Read → rewrite in memory → single replace.
    async fn cutover(&self, from: &str, to: &str) -> StepOutcome {
        let current = match self.collab.proxy.read_config().await {
            Ok(doc) => doc,
            Err(e) => return StepOutcome::Abort(DeployError::ConfigUnreachable(e)),
        };

        let rewrite = rewrite_upstream(&current.body, from, to);
        if rewrite.replaced == 0 {
            return StepOutcome::Abort(DeployError::UpstreamNotFound {
                address: from.to_string(),
            });
        }

        let mut next = current;
        next.body = rewrite.document;
        match self.collab.proxy.apply_config(&next).await {
            Ok(()) => {
                info!(%from, %to, upstreams = rewrite.replaced, "traffic cut over");
                StepOutcome::Continue
            }
            Err(e @ ProxyError::Conflict { .. }) => {
                StepOutcome::Abort(DeployError::ConfigConflict(e))
            }
            Err(e) => StepOutcome::Abort(DeployError::ConfigApplyFailed(e)),
        }
    }

    async fn decommission(&self, unit: &UnitName, remove: bool) -> Result<(), String> {
        let runtime = &self.collab.runtime;
        let stopped = runtime.stop(unit, self.settings.stop_grace).await;
        if remove {
            runtime.remove(unit).await.map_err(|e| e.to_string())?;
        }
        stopped.map_err(|e| e.to_string())
    }

    async fn capture_logs(&self, unit: &UnitName) -> String {
        match self.collab.runtime.logs(unit, self.settings.log_tail).await {
            Ok(logs) => logs,
            Err(e) => format!("<logs unavailable: {e}>"),
        }
    }

    /// Undo reversible steps, newest first. Failures are logged only.
    async fn compensate(&self, ctx: &mut RunContext) {
        while let Some(undo) = ctx.undo.pop() {
            let result = match &undo {
                Undo::Remove(unit) => self.collab.runtime.remove(unit).await,
                Undo::Stop(unit) => {
                    self.collab
                        .runtime
                        .stop(unit, self.settings.stop_grace)
                        .await
                }
            };
            match result {
                Ok(()) => info!(?undo, "compensated"),
                Err(e) => warn!(?undo, error = %e, "compensation failed; manual cleanup may be needed"),
            }
        }
    }
}
