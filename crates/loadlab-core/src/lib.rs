//! loadlab-core — shared plumbing for the loadlab demo services.
//!
//! Provides the two concerns every app needs:
//! - Atomic metric primitives with Prometheus text exposition
//!   ([`metrics`]).
//! - Process resource sampling from `/proc` ([`process`]).
//!
//! Each app assembles its own metrics struct from the primitives and
//! renders them on `GET /metrics`; there is no global registry.

pub mod metrics;
pub mod process;

pub use metrics::{Counter, Gauge, Histogram, LabeledCounter, TEXT_FORMAT};
pub use process::{CpuSampler, ProcError, meminfo_total_bytes, rss_bytes};

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch, for JSON timestamps.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
