//! Runtime-facing traits and request types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use slotswap_core::{ArtifactRef, UnitName};

use crate::error::RuntimeResult;

/// Observed state of a named unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Absent,
    Stopped,
    Running,
}

impl UnitStatus {
    pub fn exists(&self) -> bool {
        !matches!(self, UnitStatus::Absent)
    }
}

/// Everything needed to create and start a unit in a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub unit: UnitName,
    pub artifact: ArtifactRef,
    /// Host interface the slot port is published on.
    pub bind_host: String,
    pub host_port: u16,
    pub container_port: u16,
    pub env: BTreeMap<String, String>,
    pub network: Option<String>,
}

/// Build an artifact from a source context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub context: PathBuf,
    pub dockerfile: Option<PathBuf>,
    /// Reference the built artifact is published under.
    pub tag: ArtifactRef,
}

/// Control over named runtime units.
#[async_trait]
pub trait UnitRuntime: Send + Sync {
    async fn status(&self, unit: &UnitName) -> RuntimeResult<UnitStatus>;

    /// Create and start a unit. The name must not be in use.
    async fn launch(&self, spec: &LaunchSpec) -> RuntimeResult<()>;

    /// Start an existing, stopped unit.
    async fn start(&self, unit: &UnitName) -> RuntimeResult<()>;

    /// Stop a unit, killing it after `grace`.
    async fn stop(&self, unit: &UnitName, grace: Duration) -> RuntimeResult<()>;

    /// Remove a unit, stopping it first if needed.
    async fn remove(&self, unit: &UnitName) -> RuntimeResult<()>;

    /// The last `tail` lines of the unit's output.
    async fn logs(&self, unit: &UnitName, tail: u32) -> RuntimeResult<String>;
}

/// Produces artifacts the runtime can launch.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> RuntimeResult<ArtifactRef>;
}
