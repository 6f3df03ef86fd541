//! slotswap-runtime — the process/container runtime behind each slot.
//!
//! The orchestrator only needs a handful of verbs on a named unit:
//! launch it bound to a host port, start, stop with a grace period,
//! remove, query whether it exists and runs, and read its recent output.
//! [`UnitRuntime`] and [`ArtifactBuilder`] capture those verbs;
//! [`DockerCli`] implements both by shelling out to `docker`.

pub mod docker;
pub mod error;
pub mod unit;

pub use docker::DockerCli;
pub use error::{RuntimeError, RuntimeResult};
pub use unit::{ArtifactBuilder, BuildRequest, LaunchSpec, UnitRuntime, UnitStatus};
