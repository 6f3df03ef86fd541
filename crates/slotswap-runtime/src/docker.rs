//! Docker CLI backend.
//!
//! Every verb is one `docker` invocation. Argument lists are built by
//! plain functions so they can be checked without a daemon.

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use slotswap_core::{ArtifactRef, UnitName};

use crate::error::{RuntimeError, RuntimeResult};
use crate::unit::{ArtifactBuilder, BuildRequest, LaunchSpec, UnitRuntime, UnitStatus};

/// Drives units through the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run `docker <args>` and capture its output without judging the exit code.
    async fn exec(&self, args: &[String]) -> RuntimeResult<Output> {
        debug!(binary = %self.binary, ?args, "running");
        Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                binary: self.binary.clone(),
                source,
            })
    }

    /// Run `docker <args>` and fail on a non-zero exit.
    async fn run(&self, args: &[String]) -> RuntimeResult<Output> {
        let output = self.exec(args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(RuntimeError::Command {
                command: format!("{} {}", self.binary, args.join(" ")),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl UnitRuntime for DockerCli {
    async fn status(&self, unit: &UnitName) -> RuntimeResult<UnitStatus> {
        let output = self.exec(&inspect_args(unit)).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing_object(&stderr) {
                return Ok(UnitStatus::Absent);
            }
            return Err(RuntimeError::Command {
                command: format!("{} {}", self.binary, inspect_args(unit).join(" ")),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(parse_running(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn launch(&self, spec: &LaunchSpec) -> RuntimeResult<()> {
        self.run(&run_args(spec)).await?;
        info!(unit = %spec.unit, artifact = %spec.artifact, port = spec.host_port, "unit launched");
        Ok(())
    }

    async fn start(&self, unit: &UnitName) -> RuntimeResult<()> {
        match self.run(&["start".to_string(), unit.to_string()]).await {
            Ok(_) => {
                info!(%unit, "unit started");
                Ok(())
            }
            Err(RuntimeError::Command { stderr, .. }) if is_missing_object(&stderr) => {
                Err(RuntimeError::NoSuchUnit(unit.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn stop(&self, unit: &UnitName, grace: Duration) -> RuntimeResult<()> {
        self.run(&stop_args(unit, grace)).await?;
        info!(%unit, ?grace, "unit stopped");
        Ok(())
    }

    async fn remove(&self, unit: &UnitName) -> RuntimeResult<()> {
        let args = vec!["rm".to_string(), "-f".to_string(), unit.to_string()];
        match self.run(&args).await {
            Ok(_) => {
                info!(%unit, "unit removed");
                Ok(())
            }
            Err(RuntimeError::Command { stderr, .. }) if is_missing_object(&stderr) => {
                debug!(%unit, "unit already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn logs(&self, unit: &UnitName, tail: u32) -> RuntimeResult<String> {
        let args = vec![
            "logs".to_string(),
            "--tail".to_string(),
            tail.to_string(),
            unit.to_string(),
        ];
        let output = self.run(&args).await?;
        // Containers write to both streams; docker replays them separately.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

#[async_trait]
impl ArtifactBuilder for DockerCli {
    async fn build(&self, request: &BuildRequest) -> RuntimeResult<ArtifactRef> {
        info!(tag = %request.tag, context = %request.context.display(), "building artifact");
        self.run(&build_args(request)).await?;
        Ok(request.tag.clone())
    }
}

fn inspect_args(unit: &UnitName) -> Vec<String> {
    vec![
        "inspect".to_string(),
        "--type".to_string(),
        "container".to_string(),
        "--format".to_string(),
        "{{.State.Running}}".to_string(),
        unit.to_string(),
    ]
}

fn run_args(spec: &LaunchSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--detach".to_string(),
        "--name".to_string(),
        spec.unit.to_string(),
        "--publish".to_string(),
        format!("{}:{}:{}", spec.bind_host, spec.host_port, spec.container_port),
    ];
    if let Some(network) = &spec.network {
        args.push("--network".to_string());
        args.push(network.clone());
    }
    for (key, value) in &spec.env {
        args.push("--env".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(spec.artifact.to_string());
    args
}

fn stop_args(unit: &UnitName, grace: Duration) -> Vec<String> {
    vec![
        "stop".to_string(),
        "--time".to_string(),
        grace.as_secs().max(1).to_string(),
        unit.to_string(),
    ]
}

fn build_args(request: &BuildRequest) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--tag".to_string(),
        request.tag.to_string(),
    ];
    if let Some(dockerfile) = &request.dockerfile {
        args.push("--file".to_string());
        args.push(dockerfile.display().to_string());
    }
    args.push(request.context.display().to_string());
    args
}

fn parse_running(stdout: &str) -> UnitStatus {
    if stdout.trim() == "true" {
        UnitStatus::Running
    } else {
        UnitStatus::Stopped
    }
}

fn is_missing_object(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such object") || stderr.contains("no such container")
}
