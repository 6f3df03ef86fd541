//! slotswap-health — health probing for candidate units.
//!
//! A unit is gated on its `GET /health` endpoint before it may receive
//! traffic. The gate probes on a fixed interval and stops at the first
//! 2xx or at the deadline. There is no debounce and no backoff.
//!
//! ```text
//! wait_healthy(probe, address, gate)
//!   └── loop until deadline
//!       ├── HealthProbe::probe(address) → ProbeResult
//!       └── sleep(interval)
//! ```

pub mod checker;
pub mod gate;

pub use checker::{HealthProbe, HttpProbe, ProbeResult, http_probe};
pub use gate::{GateConfig, GatePassed, ProbeError, wait_healthy};
