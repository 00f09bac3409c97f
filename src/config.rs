//! Engine-wide tunables. Spec §3 (supplemented): everything the
//! original hard-coded as constants is here instead, with the original
//! values as defaults.

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::rib_engine::RIBEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RIBEngineConfig {
    /// Prefix prepended to every emitted metric key (§6.4).
    pub metric_prefix: String,

    /// How long, in BGP time, a record can arrive before the reference
    /// RIB's start and still be accepted into the under-construction
    /// window rather than discarded (§4.4.2/§4.4.6).
    pub rib_backlog_secs: u32,

    /// A peer that hasn't produced any record in this many BGP-time
    /// seconds is considered stale at end-of-valid-RIB promotion
    /// (§4.4.6).
    pub max_inactive_secs: u32,

    /// Minimum BGP-time gap between two `wall_time_last` refreshes for
    /// the same collector (§4.4.2).
    pub wall_update_freq_secs: u32,
}

impl Default for RIBEngineConfig {
    fn default() -> Self {
        RIBEngineConfig {
            metric_prefix: "bgp.view".to_string(),
            rib_backlog_secs: 60,
            max_inactive_secs: 3600,
            wall_update_freq_secs: 10_000,
        }
    }
}
