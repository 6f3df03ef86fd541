//! End-to-end deploy and rollback scenarios against in-memory fakes.
//!
//! Time is paused, so health gates that wait out a full 60s deadline
//! finish instantly while still observing the configured intervals.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::Instant;

use slotswap_core::{ArtifactRef, SlotPair, SlotswapConfig, UnitName};
use slotswap_health::{HealthProbe, ProbeResult};
use slotswap_proxy::{ConfigDocument, ProxyAdmin, ProxyError, ProxyResult, upstream_dials};
use slotswap_rollout::{
    ArtifactSource, Collaborators, DeployError, Orchestrator, Settings,
};
use slotswap_runtime::{
    ArtifactBuilder, BuildRequest, LaunchSpec, RuntimeError, RuntimeResult, UnitRuntime,
    UnitStatus,
};
use slotswap_state::{
    DeploymentState, DeploymentStore, OperationKind, OperationOutcome, OperationRecord,
    StateError, StateResult, StateStore,
};

const WARMUP: Duration = Duration::from_secs(3);

// ── Fakes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FakeUnit {
    artifact: String,
    port: u16,
    running: bool,
    started_at: Instant,
}

#[derive(Default)]
struct World {
    units: BTreeMap<String, FakeUnit>,
    /// Units whose health endpoint never reports healthy.
    unhealthy: HashSet<String>,
    /// Units whose stop fails.
    stuck: HashSet<String>,
    /// Units removed by someone else just as they are started.
    vanish_on_start: HashSet<String>,
    builds: Vec<String>,

    proxy_doc: Value,
    proxy_version: u64,
    proxy_writes: u32,
    /// Reads beyond this many fail as unreachable.
    fail_reads_after: Option<u32>,
    reads: u32,
    fail_apply: bool,
    conflict_on_apply: bool,

    fail_save: bool,
}

type Shared = Arc<Mutex<World>>;

fn command_error(stderr: &str) -> RuntimeError {
    RuntimeError::Command {
        command: "fake".to_string(),
        code: Some(1),
        stderr: stderr.to_string(),
    }
}

struct FakeRuntime(Shared);

#[async_trait]
impl UnitRuntime for FakeRuntime {
    async fn status(&self, unit: &UnitName) -> RuntimeResult<UnitStatus> {
        let world = self.0.lock().unwrap();
        Ok(match world.units.get(unit.as_str()) {
            None => UnitStatus::Absent,
            Some(u) if u.running => UnitStatus::Running,
            Some(_) => UnitStatus::Stopped,
        })
    }

    async fn launch(&self, spec: &LaunchSpec) -> RuntimeResult<()> {
        let mut world = self.0.lock().unwrap();
        if world.units.contains_key(spec.unit.as_str()) {
            return Err(command_error("name already in use"));
        }
        if world.units.values().any(|u| u.running && u.port == spec.host_port) {
            return Err(command_error("port is already allocated"));
        }
        world.units.insert(
            spec.unit.to_string(),
            FakeUnit {
                artifact: spec.artifact.to_string(),
                port: spec.host_port,
                running: true,
                started_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn start(&self, unit: &UnitName) -> RuntimeResult<()> {
        let mut world = self.0.lock().unwrap();
        if world.vanish_on_start.contains(unit.as_str()) {
            world.units.remove(unit.as_str());
        }
        let u = world
            .units
            .get_mut(unit.as_str())
            .ok_or_else(|| RuntimeError::NoSuchUnit(unit.to_string()))?;
        if !u.running {
            u.running = true;
            u.started_at = Instant::now();
        }
        Ok(())
    }

    async fn stop(&self, unit: &UnitName, _grace: Duration) -> RuntimeResult<()> {
        let mut world = self.0.lock().unwrap();
        if world.stuck.contains(unit.as_str()) {
            return Err(command_error("daemon timed out"));
        }
        let u = world
            .units
            .get_mut(unit.as_str())
            .ok_or_else(|| RuntimeError::NoSuchUnit(unit.to_string()))?;
        u.running = false;
        Ok(())
    }

    async fn remove(&self, unit: &UnitName) -> RuntimeResult<()> {
        self.0.lock().unwrap().units.remove(unit.as_str());
        Ok(())
    }

    async fn logs(&self, unit: &UnitName, tail: u32) -> RuntimeResult<String> {
        Ok(format!("{unit}: last {tail} lines\nerror: database unreachable\n"))
    }
}

#[async_trait]
impl ArtifactBuilder for FakeRuntime {
    async fn build(&self, request: &BuildRequest) -> RuntimeResult<ArtifactRef> {
        self.0.lock().unwrap().builds.push(request.tag.to_string());
        Ok(request.tag.clone())
    }
}

struct FakeProxy(Shared);

#[async_trait]
impl ProxyAdmin for FakeProxy {
    async fn read_config(&self) -> ProxyResult<ConfigDocument> {
        let mut world = self.0.lock().unwrap();
        world.reads += 1;
        if world.fail_reads_after.is_some_and(|n| world.reads > n) {
            return Err(ProxyError::Unreachable {
                url: "http://fake/config/".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(ConfigDocument {
            body: world.proxy_doc.clone(),
            etag: Some(format!("\"{}\"", world.proxy_version)),
        })
    }

    async fn apply_config(&self, document: &ConfigDocument) -> ProxyResult<()> {
        let mut world = self.0.lock().unwrap();
        if world.conflict_on_apply {
            return Err(ProxyError::Conflict {
                etag: document.etag.clone().unwrap_or_default(),
            });
        }
        if world.fail_apply {
            return Err(ProxyError::Status {
                url: "http://fake/load".to_string(),
                status: 400,
                body: "invalid route".to_string(),
            });
        }
        world.proxy_doc = document.body.clone();
        world.proxy_version += 1;
        world.proxy_writes += 1;
        Ok(())
    }
}

/// Healthy once a running unit on the probed port has warmed up.
struct FakeProbe(Shared);

#[async_trait]
impl HealthProbe for FakeProbe {
    async fn probe(&self, address: &str) -> ProbeResult {
        let Some(port) = address.rsplit(':').next().and_then(|p| p.parse::<u16>().ok()) else {
            return ProbeResult::Failed;
        };
        let world = self.0.lock().unwrap();
        let Some((name, unit)) = world
            .units
            .iter()
            .find(|(_, u)| u.running && u.port == port)
        else {
            return ProbeResult::Failed;
        };
        if world.unhealthy.contains(name.as_str()) {
            ProbeResult::Unhealthy
        } else if unit.started_at.elapsed() >= WARMUP {
            ProbeResult::Healthy
        } else {
            ProbeResult::Failed
        }
    }
}

/// Real in-memory store whose record writes can be made to fail.
struct FaultyStore {
    inner: StateStore,
    world: Shared,
}

impl DeploymentStore for FaultyStore {
    fn get(&self) -> StateResult<Option<DeploymentState>> {
        self.inner.get()
    }

    fn save(&self, state: &DeploymentState) -> StateResult<()> {
        if self.world.lock().unwrap().fail_save {
            return Err(StateError::Write("disk full".to_string()));
        }
        self.inner.save(state)
    }

    fn record(&self, entry: &OperationRecord) -> StateResult<()> {
        self.inner.record(entry)
    }

    fn recent_operations(&self, limit: usize) -> StateResult<Vec<OperationRecord>> {
        self.inner.recent_operations(limit)
    }
}

// ── Harness ────────────────────────────────────────────────────────

struct Harness {
    orchestrator: Orchestrator,
    world: Shared,
    store: StateStore,
}

impl Harness {
    fn world(&self) -> std::sync::MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }

    fn dials(&self) -> Vec<String> {
        upstream_dials(&self.world().proxy_doc)
    }

    fn unit(&self, name: &str) -> Option<FakeUnit> {
        self.world().units.get(name).cloned()
    }

    fn state(&self) -> Option<DeploymentState> {
        self.store.get().unwrap()
    }
}

fn caddy_config(dial: &str) -> Value {
    json!({
        "apps": {
            "http": {
                "servers": {
                    "srv0": {
                        "listen": [":443"],
                        "routes": [{
                            "match": [{ "host": ["api.example.com"] }],
                            "handle": [{
                                "handler": "reverse_proxy",
                                "upstreams": [{ "dial": dial }]
                            }]
                        }]
                    }
                }
            }
        }
    })
}

/// Slot A serving `api:v1` on 3402, routing pointed at it, nothing persisted.
fn harness() -> Harness {
    let config = SlotswapConfig::from_toml(
        r#"
        [service]
        name = "api"

        [build]
        context = "./server"
        image = "registry.local/api"
        "#,
    )
    .unwrap();
    let settings = Settings::from_config(&config);

    let world: Shared = Arc::new(Mutex::new(World {
        proxy_doc: caddy_config("localhost:3402"),
        ..Default::default()
    }));
    world.lock().unwrap().units.insert(
        "api-a".to_string(),
        FakeUnit {
            artifact: "api:v1".to_string(),
            port: 3402,
            running: true,
            started_at: Instant::now(),
        },
    );

    let store = StateStore::open_in_memory().unwrap();
    let runtime = Arc::new(FakeRuntime(world.clone()));
    let collab = Collaborators {
        runtime: runtime.clone(),
        builder: runtime,
        proxy: Arc::new(FakeProxy(world.clone())),
        probe: Arc::new(FakeProbe(world.clone())),
        store: Arc::new(FaultyStore {
            inner: store.clone(),
            world: world.clone(),
        }),
    };

    Harness {
        orchestrator: Orchestrator::new(settings, collab),
        world,
        store,
    }
}

fn prebuilt(tag: &str) -> ArtifactSource {
    ArtifactSource::Prebuilt(ArtifactRef(tag.to_string()))
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn deploy_then_rollback_round_trip() {
    let h = harness();

    let report = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(
        report.state,
        DeploymentState {
            active_port: 3403,
            previous_port: Some(3402),
            previous_unit: Some(UnitName("api-a".to_string())),
        }
    );
    assert_eq!(h.state(), Some(report.state.clone()));
    assert_eq!(h.dials(), vec!["localhost:3403"]);

    let b = h.unit("api-b").unwrap();
    assert!(b.running);
    assert_eq!(b.artifact, "api:v2");
    // Old unit is stopped but kept as the rollback target.
    let a = h.unit("api-a").unwrap();
    assert!(!a.running);

    let report = h.orchestrator.rollback().await.unwrap();
    assert_eq!(report.state, DeploymentState {
        active_port: 3402,
        previous_port: None,
        previous_unit: None,
    });
    assert_eq!(h.state(), Some(report.state));
    assert_eq!(h.dials(), vec!["localhost:3402"]);

    let a = h.unit("api-a").unwrap();
    assert!(a.running);
    assert_eq!(a.artifact, "api:v1", "rollback revives, it never rebuilds");
    assert!(h.unit("api-b").is_none());
}

#[tokio::test(start_paused = true)]
async fn unhealthy_build_never_receives_traffic() {
    let h = harness();
    h.world().unhealthy.insert("api-b".to_string());
    let doc_before = h.world().proxy_doc.clone();

    let started = Instant::now();
    let err = h.orchestrator.deploy(prebuilt("api:broken")).await.unwrap_err();

    match &err {
        DeployError::HealthCheckTimeout {
            unit,
            address,
            timeout,
            logs,
        } => {
            assert_eq!(unit.as_str(), "api-b");
            assert_eq!(address, "127.0.0.1:3403");
            assert_eq!(*timeout, Duration::from_secs(60));
            assert!(logs.contains("database unreachable"));
        }
        other => panic!("expected health timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(60));

    assert_eq!(h.state(), None, "nothing persisted");
    assert_eq!(h.world().proxy_doc, doc_before);
    assert_eq!(h.world().proxy_writes, 0);
    assert!(h.unit("api-b").is_none(), "failed unit cleaned up");
    assert!(h.unit("api-a").unwrap().running);
}

#[tokio::test(start_paused = true)]
async fn health_gate_passes_after_warmup() {
    let h = harness();
    let started = Instant::now();
    h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();
    // Probes at 0s and 2s fail, the one at 4s succeeds.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(4), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn apply_failure_leaves_old_slot_serving() {
    let h = harness();
    h.world().fail_apply = true;

    let err = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap_err();
    assert!(matches!(err, DeployError::ConfigApplyFailed(_)), "{err:?}");

    assert_eq!(h.state(), None);
    assert_eq!(h.dials(), vec!["localhost:3402"]);
    assert!(h.unit("api-b").is_none());
    assert!(h.unit("api-a").unwrap().running);
}

#[tokio::test(start_paused = true)]
async fn concurrent_proxy_edit_is_a_conflict() {
    let h = harness();
    h.world().conflict_on_apply = true;

    let err = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap_err();
    assert!(matches!(err, DeployError::ConfigConflict(_)), "{err:?}");
    assert!(h.unit("api-b").is_none());
    assert_eq!(h.state(), None);
}

#[tokio::test(start_paused = true)]
async fn routing_that_does_not_match_state_is_refused() {
    let h = harness();
    h.world().proxy_doc = caddy_config("localhost:9999");

    let err = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap_err();
    match err {
        DeployError::UpstreamNotFound { address } => assert_eq!(address, "localhost:3402"),
        other => panic!("expected UpstreamNotFound, got {other:?}"),
    }
    assert_eq!(h.world().proxy_writes, 0);
    assert!(h.unit("api-b").is_none());
}

#[tokio::test(start_paused = true)]
async fn second_rollback_has_nothing_to_restore() {
    let h = harness();
    h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();
    h.orchestrator.rollback().await.unwrap();

    let err = h.orchestrator.rollback().await.unwrap_err();
    assert!(matches!(err, DeployError::NoRollbackAvailable));
    assert_eq!(h.state().unwrap().active_port, 3402);

    // Planning failures are not journaled.
    let ops = h.store.recent_operations(10).unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].kind, OperationKind::Rollback);
    assert_eq!(ops[1].kind, OperationKind::Deploy);
}

#[tokio::test(start_paused = true)]
async fn rollback_on_fresh_host_is_refused() {
    let h = harness();
    let err = h.orchestrator.rollback().await.unwrap_err();
    assert!(matches!(err, DeployError::NoRollbackAvailable));
    assert_eq!(h.state(), None);
}

#[tokio::test(start_paused = true)]
async fn stale_standby_unit_is_replaced() {
    let h = harness();
    h.world().units.insert(
        "api-b".to_string(),
        FakeUnit {
            artifact: "api:stale".to_string(),
            port: 3403,
            running: false,
            started_at: Instant::now(),
        },
    );

    h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();
    let b = h.unit("api-b").unwrap();
    assert_eq!(b.artifact, "api:v2");
    assert!(b.running);
}

#[tokio::test(start_paused = true)]
async fn rollback_fails_cleanly_when_previous_unit_is_gone() {
    let h = harness();
    let deployed = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap().state;
    h.world().units.remove("api-a");

    let err = h.orchestrator.rollback().await.unwrap_err();
    match err {
        DeployError::PreviousUnitGone { unit } => assert_eq!(unit.as_str(), "api-a"),
        other => panic!("expected PreviousUnitGone, got {other:?}"),
    }
    assert_eq!(h.state(), Some(deployed));
    assert_eq!(h.dials(), vec!["localhost:3403"]);
    assert!(h.unit("api-b").unwrap().running);
}

#[tokio::test(start_paused = true)]
async fn unhealthy_rollback_target_is_stopped_again() {
    let h = harness();
    let deployed = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap().state;
    h.world().unhealthy.insert("api-a".to_string());

    let started = Instant::now();
    let err = h.orchestrator.rollback().await.unwrap_err();
    match &err {
        DeployError::HealthCheckTimeout { unit, timeout, .. } => {
            assert_eq!(unit.as_str(), "api-a");
            assert_eq!(*timeout, Duration::from_secs(30));
        }
        other => panic!("expected health timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(30));

    assert_eq!(h.state(), Some(deployed.clone()));
    assert!(deployed.can_rollback(), "history kept for a later attempt");
    assert_eq!(h.dials(), vec!["localhost:3403"]);
    let a = h.unit("api-a").unwrap();
    assert!(!a.running, "revived unit stopped, not removed");
}

#[tokio::test(start_paused = true)]
async fn failed_decommission_is_only_a_warning() {
    let h = harness();
    h.world().stuck.insert("api-a".to_string());

    let report = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("api-a"));
    assert_eq!(h.state().unwrap().active_port, 3403);
    assert_eq!(h.dials(), vec!["localhost:3403"]);

    let ops = h.store.recent_operations(1).unwrap();
    match &ops[0].outcome {
        OperationOutcome::Succeeded { warnings } => assert_eq!(warnings.len(), 1),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn consecutive_deploys_alternate_slots() {
    let h = harness();
    h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();
    let report = h.orchestrator.deploy(prebuilt("api:v3")).await.unwrap();

    assert_eq!(
        report.state,
        DeploymentState {
            active_port: 3402,
            previous_port: Some(3403),
            previous_unit: Some(UnitName("api-b".to_string())),
        }
    );
    assert_eq!(h.dials(), vec!["localhost:3402"]);
    assert_eq!(h.unit("api-a").unwrap().artifact, "api:v3");
    assert!(!h.unit("api-b").unwrap().running);

    // The v2 unit is now the rollback target.
    h.orchestrator.rollback().await.unwrap();
    assert_eq!(h.dials(), vec!["localhost:3403"]);
    assert_eq!(h.unit("api-b").unwrap().artifact, "api:v2");
    assert!(h.unit("api-a").is_none());
}

#[tokio::test(start_paused = true)]
async fn build_source_builds_before_launch() {
    let h = harness();
    let tag = ArtifactRef("registry.local/api:1700000000".to_string());
    let source = ArtifactSource::Build(BuildRequest {
        context: PathBuf::from("./server"),
        dockerfile: None,
        tag: tag.clone(),
    });

    let report = h.orchestrator.deploy(source).await.unwrap();
    assert_eq!(report.artifact, Some(tag.clone()));
    assert_eq!(h.world().builds, vec![tag.to_string()]);
    assert_eq!(h.unit("api-b").unwrap().artifact, tag.to_string());

    let ops = h.store.recent_operations(1).unwrap();
    assert_eq!(ops[0].artifact, Some(tag));
}

#[tokio::test(start_paused = true)]
async fn aborted_deploy_is_journaled() {
    let h = harness();
    h.world().fail_apply = true;
    h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap_err();

    let ops = h.store.recent_operations(5).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].kind, OperationKind::Deploy);
    assert_eq!((ops[0].from_port, ops[0].to_port), (3402, 3403));
    assert!(matches!(ops[0].outcome, OperationOutcome::Aborted { .. }));
}

#[tokio::test(start_paused = true)]
async fn status_compares_state_with_live_routing() {
    let h = harness();
    h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();

    let status = h.orchestrator.status().await.unwrap();
    assert_eq!(status.active.port, 3403);
    assert_eq!(status.standby.port, 3402);
    assert!(status.rollback_available);
    assert!(status.routing_in_sync);
    assert_eq!(status.live_upstreams, vec!["localhost:3403"]);
    let statuses: Vec<_> = status.units.iter().map(|u| (u.unit.as_str(), u.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("api-a", Some(UnitStatus::Stopped)),
            ("api-b", Some(UnitStatus::Running)),
        ]
    );
    assert_eq!(status.recent_operations.len(), 1);

    // Someone points the proxy back by hand.
    h.world().proxy_doc = caddy_config("localhost:3402");
    let status = h.orchestrator.status().await.unwrap();
    assert!(!status.routing_in_sync);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["state"]["active_port"], 3403);
    assert_eq!(json["units"][1]["status"], "running");
}

#[tokio::test(start_paused = true)]
async fn deploy_refuses_when_standby_is_actually_serving() {
    let h = harness();
    h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap();
    // Record rewound to before the deploy while the proxy still dials B.
    h.store
        .save(&DeploymentState::initial(&SlotPair::new(3402, 3403)))
        .unwrap();
    let writes = h.world().proxy_writes;

    let err = h.orchestrator.deploy(prebuilt("api:v3")).await.unwrap_err();
    match err {
        DeployError::RoutingDrift { address } => assert_eq!(address, "localhost:3403"),
        other => panic!("expected RoutingDrift, got {other:?}"),
    }

    let b = h.unit("api-b").unwrap();
    assert!(b.running, "serving unit untouched");
    assert_eq!(b.artifact, "api:v2");
    let a = h.unit("api-a").unwrap();
    assert!(!a.running);
    assert_eq!(a.artifact, "api:v1");
    assert_eq!(h.dials(), vec!["localhost:3403"]);
    assert_eq!(h.world().proxy_writes, writes);

    let ops = h.store.recent_operations(1).unwrap();
    assert!(matches!(ops[0].outcome, OperationOutcome::Aborted { .. }));
}

#[tokio::test(start_paused = true)]
async fn unreachable_proxy_stops_deploy_before_launch() {
    let h = harness();
    h.world().fail_reads_after = Some(0);

    let err = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap_err();
    assert!(matches!(err, DeployError::ConfigUnreachable(_)), "{err:?}");

    assert!(h.unit("api-b").is_none());
    assert!(h.unit("api-a").unwrap().running);
    assert_eq!(h.state(), None);
    assert_eq!(h.dials(), vec!["localhost:3402"]);
}

#[tokio::test(start_paused = true)]
async fn proxy_lost_at_cutover_removes_launched_unit() {
    let h = harness();
    // The routing check reads once; the cutover read fails.
    h.world().fail_reads_after = Some(1);

    let err = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap_err();
    assert!(matches!(err, DeployError::ConfigUnreachable(_)), "{err:?}");

    assert_eq!(h.world().reads, 2);
    assert!(h.unit("api-b").is_none(), "launched unit compensated");
    assert!(h.unit("api-a").unwrap().running);
    assert_eq!(h.state(), None);
    assert_eq!(h.dials(), vec!["localhost:3402"]);
    assert_eq!(h.world().proxy_writes, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_persist_reports_the_live_port() {
    let h = harness();
    h.world().fail_save = true;

    let err = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap_err();
    match &err {
        DeployError::PersistFailed { active_port, .. } => assert_eq!(*active_port, 3403),
        other => panic!("expected PersistFailed, got {other:?}"),
    }

    // Past the cutover nothing is undone.
    assert_eq!(h.dials(), vec!["localhost:3403"]);
    assert!(h.unit("api-b").unwrap().running);
    assert_eq!(h.state(), None);

    let ops = h.store.recent_operations(1).unwrap();
    assert_eq!((ops[0].from_port, ops[0].to_port), (3402, 3403));
    assert!(matches!(ops[0].outcome, OperationOutcome::Aborted { .. }));
}

#[tokio::test(start_paused = true)]
async fn previous_unit_removed_mid_rollback_is_reported_gone() {
    let h = harness();
    let deployed = h.orchestrator.deploy(prebuilt("api:v2")).await.unwrap().state;
    h.world().vanish_on_start.insert("api-a".to_string());

    let err = h.orchestrator.rollback().await.unwrap_err();
    match err {
        DeployError::PreviousUnitGone { unit } => assert_eq!(unit.as_str(), "api-a"),
        other => panic!("expected PreviousUnitGone, got {other:?}"),
    }
    assert_eq!(h.state(), Some(deployed));
    assert_eq!(h.dials(), vec!["localhost:3403"]);
    assert!(h.unit("api-b").unwrap().running);
}
