//! slotswap rollout — zero-downtime deploys and one-step rollback.
//!
//! Each operation is split in two halves. A pure planner turns the
//! persisted `DeploymentState` into an ordered list of typed steps (or
//! refuses, e.g. when there is nothing to roll back to). A small
//! interpreter then runs the steps against the runtime, the proxy and the
//! health prober, stopping at the first abort.
//!
//! # Components
//!
//! - **`plan`** — `Step`, `Plan`, `plan_deploy`, `plan_rollback`, ordering checks
//! - **`executor`** — step interpreter with pre-cutover compensation
//! - **`controller`** — `Orchestrator`: load → plan → execute → journal
//! - **`settings`** — slot, gate and launch parameters derived from config
//!
//! # Ordering
//!
//! ```text
//! deploy:   verify routing → [build] → clear standby → launch → health gate → cutover → decommission → persist
//! rollback: verify routing →           revive previous    →    health gate → cutover → decommission → persist
//! ```
//!
//! No unit is touched until live routing is confirmed to dial the recorded
//! active slot and not the slot about to be replaced. Everything before
//! the cutover is undone on abort and leaves routing and state untouched.
//! Nothing after the cutover can abort except the final persist.

pub mod controller;
pub mod error;
pub mod executor;
pub mod plan;
pub mod settings;

pub use controller::{Collaborators, Orchestrator, StatusReport, UnitReport};
pub use error::{DeployError, DeployResult};
pub use executor::{ExecutionReport, Executor, StepOutcome};
pub use plan::{ArtifactSource, Plan, Step, plan_deploy, plan_rollback};
pub use settings::Settings;
