use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use slotswap_core::{ArtifactRef, SlotswapConfig};
use slotswap_rollout::{ArtifactSource, DeployError};
use slotswap_runtime::BuildRequest;

use super::{Session, resolve};

pub async fn run(config_path: &Path, image: Option<String>) -> anyhow::Result<()> {
    let session = Session::open(config_path)?;
    let source = artifact_source(&session.config, &session.base_dir, image, unix_secs());

    match session.orchestrator.deploy(source).await {
        Ok(report) => {
            let artifact = report
                .artifact
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            println!(
                "✓ Deployed {artifact}: traffic now on port {}",
                report.state.active_port
            );
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            Ok(())
        }
        Err(e) => {
            print_diagnostics(&e);
            Err(e.into())
        }
    }
}

/// Choose between a given image and a fresh build tagged with `build_id`.
fn artifact_source(
    config: &SlotswapConfig,
    base_dir: &Path,
    image: Option<String>,
    build_id: u64,
) -> ArtifactSource {
    if let Some(image) = image {
        return ArtifactSource::Prebuilt(ArtifactRef(image));
    }

    let (context, dockerfile) = match &config.build {
        Some(build) => (
            resolve(base_dir, &build.context),
            build.dockerfile.as_deref().map(|f| resolve(base_dir, f)),
        ),
        None => (base_dir.to_path_buf(), None::<PathBuf>),
    };
    ArtifactSource::Build(BuildRequest {
        context,
        dockerfile,
        tag: ArtifactRef(format!("{}:{build_id}", config.image_repository())),
    })
}

pub(crate) fn print_diagnostics(err: &DeployError) {
    if let DeployError::HealthCheckTimeout { unit, logs, .. } = err {
        eprintln!("--- last output of {unit} ---");
        eprintln!("{}", logs.trim_end());
        eprintln!("---");
    }
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
