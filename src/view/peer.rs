//! Per-view, per-peer record: lifecycle state, per-family prefix
//! counters, and the optional user attachment slot. Spec §3.1.

use super::counts::FamilyCounts;
use super::state::FieldState;

#[derive(Debug, Clone)]
pub struct PeerInfo<PA> {
    pub state: FieldState,
    pub v4: FamilyCounts,
    pub v6: FamilyCounts,
    pub attachment: Option<PA>,
}

impl<PA> Default for PeerInfo<PA> {
    fn default() -> Self {
        PeerInfo {
            state: FieldState::Invalid,
            v4: FamilyCounts::default(),
            v6: FamilyCounts::default(),
            attachment: None,
        }
    }
}
