//! Per-collector and per-peer engine state. Spec §4.4.1.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::as_path::PathId;
use crate::peer_sig::PeerId;

/// BGP peering FSM. Only `Established` corresponds to usable route
/// exchange and maps to the view's `PeerInfo.state == Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FsmState {
    Unknown,
    Idle,
    Connect,
    Active,
    OpenSent,
    OpenConfirm,
    Established,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStatus {
    Unknown,
    Up,
    Down,
}

bitflags! {
    /// The pfx-peer user slot's status bitmask (§4.4.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PfxStatus: u8 {
        const ANNOUNCED    = 0b01;
        const UC_ANNOUNCED = 0b10;
    }
}

/// The per-`(pfx, peer)` user slot the engine attaches to every view
/// pfx-peer entry (instantiating `View<(), (), PfxPeerInfo>`).
#[derive(Debug, Clone, Default)]
pub struct PfxPeerInfo {
    pub pfx_status: PfxStatus,
    pub bgp_time_last_ts: u32,
    pub bgp_time_uc_delta_ts: u32,
    pub uc_as_path_id: Option<PathId>,
}

impl crate::view::StaleTimestamp for PfxPeerInfo {
    fn last_update_ts(&self) -> u32 {
        self.bgp_time_last_ts
    }
}

/// Per-peer engine-side bookkeeping, keyed by `PeerId` under the owning
/// collector. Everything here is engine-internal, not view state.
#[derive(Debug, Clone)]
pub struct PeerEngineState {
    pub fsm_state: FsmState,
    pub ref_rib_start: u32,
    pub ref_rib_end: u32,
    pub uc_rib_start: u32,
    pub uc_rib_end: u32,
    pub last_ts: u32,
    pub rib_messages: u64,
    pub announcements: u64,
    pub withdrawals: u64,
    pub state_messages: u64,
    pub rib_positive_mismatches: u64,
    pub rib_negative_mismatches: u64,
}

impl Default for PeerEngineState {
    fn default() -> Self {
        PeerEngineState {
            fsm_state: FsmState::Unknown,
            ref_rib_start: 0,
            ref_rib_end: 0,
            uc_rib_start: 0,
            uc_rib_end: 0,
            last_ts: 0,
            rib_messages: 0,
            announcements: 0,
            withdrawals: 0,
            state_messages: 0,
            rib_positive_mismatches: 0,
            rib_negative_mismatches: 0,
        }
    }
}

/// Per-collector engine-side bookkeeping (§4.4.1).
#[derive(Debug, Clone)]
pub struct CollectorState {
    pub bgp_time_last: u32,
    pub wall_time_last: u64,
    pub last_wall_refresh_bgp_time: u32,

    pub ref_rib_dump_time: u32,
    pub ref_rib_start_time: u32,
    pub uc_rib_dump_time: u32,
    pub uc_rib_start_time: u32,

    pub status: CollectorStatus,

    pub valid_cnt: u64,
    pub corrupted_cnt: u64,
    pub empty_cnt: u64,

    pub end_of_valid_rib_pending: bool,

    pub peers: HashMap<PeerId, PeerEngineState>,
}

impl Default for CollectorState {
    fn default() -> Self {
        CollectorState {
            bgp_time_last: 0,
            wall_time_last: 0,
            last_wall_refresh_bgp_time: 0,
            ref_rib_dump_time: 0,
            ref_rib_start_time: 0,
            uc_rib_dump_time: 0,
            uc_rib_start_time: 0,
            status: CollectorStatus::Unknown,
            valid_cnt: 0,
            corrupted_cnt: 0,
            empty_cnt: 0,
            end_of_valid_rib_pending: false,
            peers: HashMap::new(),
        }
    }
}

impl CollectorState {
    pub fn uc_in_flight(&self) -> bool {
        self.uc_rib_dump_time != 0 || self.uc_rib_start_time != 0
    }
}
