pub mod deploy;
pub mod rollback;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use slotswap_core::SlotswapConfig;
use slotswap_health::HttpProbe;
use slotswap_proxy::AdminClient;
use slotswap_rollout::{Collaborators, Orchestrator, Settings};
use slotswap_runtime::DockerCli;
use slotswap_state::StateStore;

/// Loaded config plus a ready orchestrator.
pub struct Session {
    pub config: SlotswapConfig,
    /// Directory relative paths in the config are resolved against.
    pub base_dir: PathBuf,
    pub orchestrator: Orchestrator,
}

impl Session {
    pub fn open(config_path: &Path) -> anyhow::Result<Self> {
        let config = SlotswapConfig::from_file(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        let base_dir = base_dir(config_path);

        let state_path = resolve(&base_dir, &config.state.path);
        debug!(path = %state_path.display(), "opening state store");
        let store = StateStore::open(&state_path)
            .with_context(|| format!("opening state store {}", state_path.display()))?;

        let docker = Arc::new(DockerCli::default());
        let collab = Collaborators {
            runtime: docker.clone(),
            builder: docker,
            proxy: Arc::new(AdminClient::new(
                &config.proxy.admin_url,
                config.proxy_timeout(),
            )?),
            probe: Arc::new(HttpProbe::new(
                config.service.health_path.clone(),
                config.probe_timeout(),
            )),
            store: Arc::new(store),
        };
        let orchestrator = Orchestrator::new(Settings::from_config(&config), collab);

        Ok(Self {
            config,
            base_dir,
            orchestrator,
        })
    }
}

fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Resolve `path` against `base` unless it is absolute.
pub fn resolve(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
