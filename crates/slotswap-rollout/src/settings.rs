//! Orchestrator settings derived from `slotswap.toml`.

use std::collections::BTreeMap;
use std::time::Duration;

use slotswap_core::{Slot, SlotName, SlotPair, SlotswapConfig, UnitName};
use slotswap_health::GateConfig;

/// Everything the planner and executor need besides the collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Unit name prefix.
    pub service: String,
    pub slots: SlotPair,
    /// Host the orchestrator probes slot ports on.
    pub probe_host: String,
    /// Host part of upstream dial addresses in the proxy document.
    pub upstream_host: String,
    pub container_port: u16,
    pub env: BTreeMap<String, String>,
    pub network: Option<String>,
    pub deploy_gate: GateConfig,
    pub rollback_gate: GateConfig,
    pub stop_grace: Duration,
    pub log_tail: u32,
}

impl Settings {
    pub fn from_config(config: &SlotswapConfig) -> Self {
        let interval = config.probe_interval();
        Self {
            service: config.service.name.clone(),
            slots: config.slots(),
            probe_host: config.service.host.clone(),
            upstream_host: config.proxy.upstream_host.clone(),
            container_port: config.runtime.container_port,
            env: config
                .runtime
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            network: config.runtime.network.clone(),
            deploy_gate: GateConfig::new(config.deploy_timeout(), interval),
            rollback_gate: GateConfig::new(config.rollback_timeout(), interval),
            stop_grace: config.stop_grace(),
            log_tail: config.runtime.log_tail,
        }
    }

    pub fn unit(&self, slot: SlotName) -> UnitName {
        UnitName::for_slot(&self.service, slot)
    }

    pub fn probe_address(&self, slot: Slot) -> String {
        slot.dial_address(&self.probe_host)
    }

    pub fn dial_address(&self, slot: Slot) -> String {
        slot.dial_address(&self.upstream_host)
    }
}
