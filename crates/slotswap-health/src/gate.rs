//! Health gate — block until a unit reports healthy or a deadline passes.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::checker::HealthProbe;

/// Deadline and polling interval for one health gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl GateConfig {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(2),
        }
    }
}

/// A gate that passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePassed {
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{address} did not report healthy within {timeout:?} ({attempts} probes)")]
    Timeout {
        address: String,
        timeout: Duration,
        attempts: u32,
    },
}

/// Probe `address` every `gate.interval` until it is healthy.
///
/// Returns as soon as a single probe succeeds. Each probe is itself cut
/// short at the deadline, so the gate never runs past `gate.timeout`.
pub async fn wait_healthy<P>(
    probe: &P,
    address: &str,
    gate: GateConfig,
) -> Result<GatePassed, ProbeError>
where
    P: HealthProbe + ?Sized,
{
    let started = Instant::now();
    let deadline = started + gate.timeout;
    let mut attempts = 0u32;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        attempts += 1;
        let result = tokio::time::timeout(remaining, probe.probe(address)).await;
        match result {
            Ok(r) if r.is_healthy() => {
                let elapsed = started.elapsed();
                info!(%address, attempts, ?elapsed, "health gate passed");
                return Ok(GatePassed { attempts, elapsed });
            }
            Ok(r) => debug!(%address, attempts, result = ?r, "not healthy yet"),
            Err(_) => debug!(%address, attempts, "probe cut off at deadline"),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(gate.interval.min(remaining)).await;
    }

    warn!(%address, attempts, timeout = ?gate.timeout, "health gate timed out");
    Err(ProbeError::Timeout {
        address: address.to_string(),
        timeout: gate.timeout,
        attempts,
    })
}
