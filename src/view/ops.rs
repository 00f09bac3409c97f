//! Internal mutation primitives shared by the iterator's mutating
//! operations (spec §4.3.1 / §4.3.2). Kept separate from the public
//! cursor API in `iter.rs` so the activation-rule bookkeeping — the
//! "sole bridge between per-entry state and per-entity counters" per
//! spec §4.3.1 — lives in one place.

use std::collections::BTreeMap;

use crate::as_path::PathId;
use crate::peer_sig::PeerId;

use super::counts::FamilyCounts;
use super::peer::PeerInfo;
use super::pfx::PfxInfo;
use super::prefix::Prefix;
use super::state::{FieldState, StateMask};
use super::{Family, View};

impl<PA, XA, QA> View<PA, XA, QA> {
    /// Grows the dense peer table so `id` is addressable, transitioning
    /// a never-seen id straight to `Inactive` (spec §4.3 `add_peer`:
    /// "creates the peer as Inactive if new"). Returns whether this call
    /// actually created the peer.
    pub(crate) fn ensure_peer(&mut self, id: PeerId) -> bool {
        let needed = id as usize;
        if self.peers.len() < needed {
            self.peers.resize_with(needed, PeerInfo::default);
        }
        let idx = id as usize - 1;
        if self.peers[idx].state == FieldState::Invalid {
            self.peers[idx].state = FieldState::Inactive;
            self.peer_cnt.inactive += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn pfx_info_generic(&self, pfx: Prefix) -> Option<&PfxInfo<XA, QA>> {
        match pfx {
            Prefix::V4(n) => self.v4.get(&n),
            Prefix::V6(n) => self.v6.get(&n),
        }
    }

    pub(crate) fn pfx_peers_active_count(&self, pfx: Prefix) -> u32 {
        self.pfx_info_generic(pfx).map(|i| i.peers_cnt.active).unwrap_or(0)
    }

    pub(crate) fn pfx_peer_total(&self, pfx: Prefix) -> u32 {
        self.pfx_info_generic(pfx)
            .map(|i| i.peers_cnt.active + i.peers_cnt.inactive)
            .unwrap_or(0)
    }

    /// Creates the prefix (if needed, transitioning `Invalid -> Inactive`
    /// per §3.4) and the pfx-peer slot (same transition), then writes
    /// `path_id`. Does not touch activation; new pfx-peers start
    /// `Inactive` (spec §4.3 `add_pfx_peer`).
    pub(crate) fn ensure_pfx_peer(&mut self, pfx: Prefix, peer_id: PeerId, path_id: PathId) {
        self.ensure_pfx_peer_inner(pfx, peer_id, Some(path_id));
    }

    /// Same as [`Self::ensure_pfx_peer`] but leaves any existing
    /// `path_id` untouched — for callers that only need the slot to
    /// exist, such as a RIB element writing solely its `uc_*` fields
    /// (spec §4.4.3 step 3: "ensure a pfx-peer exists... Do NOT touch
    /// [the live path]").
    pub(crate) fn ensure_pfx_peer_slot(&mut self, pfx: Prefix, peer_id: PeerId) {
        self.ensure_pfx_peer_inner(pfx, peer_id, None);
    }

    fn ensure_pfx_peer_inner(&mut self, pfx: Prefix, peer_id: PeerId, path_id: Option<PathId>) {
        let extended = self.extended_pfxpeer;
        let was_new = match pfx {
            Prefix::V4(n) => touch_pfx_peer(&mut self.v4, &mut self.v4_cnt, n, peer_id, path_id, extended),
            Prefix::V6(n) => touch_pfx_peer(&mut self.v6, &mut self.v6_cnt, n, peer_id, path_id, extended),
        };
        if was_new {
            if let Some(p) = self.peers.get_mut(peer_id as usize - 1) {
                match pfx.family() {
                    Family::V4 => p.v4.inactive += 1,
                    Family::V6 => p.v6.inactive += 1,
                }
            }
        }
    }

    /// Single pfx-peer `Inactive -> Active`. Caller is responsible for
    /// checking preconditions and cascading to `activate_pfx_state`
    /// when `peers_cnt.active` goes `0 -> 1`.
    pub(crate) fn activate_single_pfx_peer(&mut self, pfx: Prefix, peer_id: PeerId) {
        match pfx {
            Prefix::V4(n) => {
                if let Some(info) = self.v4.get_mut(&n) {
                    info.set_peer_state(peer_id, FieldState::Active);
                    info.peers_cnt.active += 1;
                    info.peers_cnt.inactive -= 1;
                }
            }
            Prefix::V6(n) => {
                if let Some(info) = self.v6.get_mut(&n) {
                    info.set_peer_state(peer_id, FieldState::Active);
                    info.peers_cnt.active += 1;
                    info.peers_cnt.inactive -= 1;
                }
            }
        }
        if let Some(p) = self.peers.get_mut(peer_id as usize - 1) {
            match pfx.family() {
                Family::V4 => {
                    p.v4.active += 1;
                    p.v4.inactive -= 1;
                }
                Family::V6 => {
                    p.v6.active += 1;
                    p.v6.inactive -= 1;
                }
            }
        }
    }

    /// Single pfx-peer `Active -> Inactive`.
    pub(crate) fn deactivate_single_pfx_peer(&mut self, pfx: Prefix, peer_id: PeerId) {
        match pfx {
            Prefix::V4(n) => {
                if let Some(info) = self.v4.get_mut(&n) {
                    info.set_peer_state(peer_id, FieldState::Inactive);
                    info.peers_cnt.active -= 1;
                    info.peers_cnt.inactive += 1;
                }
            }
            Prefix::V6(n) => {
                if let Some(info) = self.v6.get_mut(&n) {
                    info.set_peer_state(peer_id, FieldState::Inactive);
                    info.peers_cnt.active -= 1;
                    info.peers_cnt.inactive += 1;
                }
            }
        }
        if let Some(p) = self.peers.get_mut(peer_id as usize - 1) {
            match pfx.family() {
                Family::V4 => {
                    p.v4.active -= 1;
                    p.v4.inactive += 1;
                }
                Family::V6 => {
                    p.v6.active -= 1;
                    p.v6.inactive += 1;
                }
            }
        }
    }

    /// Single pfx-peer `Inactive -> Invalid`; clears its stored path.
    pub(crate) fn invalidate_single_pfx_peer(&mut self, pfx: Prefix, peer_id: PeerId) {
        match pfx {
            Prefix::V4(n) => {
                if let Some(info) = self.v4.get_mut(&n) {
                    info.set_peer_state(peer_id, FieldState::Invalid);
                    info.peers_cnt.inactive -= 1;
                    if let Some(slot) = info.peer_slot_mut(peer_id) {
                        slot.path_id = None;
                        slot.attachment = None;
                    }
                }
            }
            Prefix::V6(n) => {
                if let Some(info) = self.v6.get_mut(&n) {
                    info.set_peer_state(peer_id, FieldState::Invalid);
                    info.peers_cnt.inactive -= 1;
                    if let Some(slot) = info.peer_slot_mut(peer_id) {
                        slot.path_id = None;
                        slot.attachment = None;
                    }
                }
            }
        }
        if let Some(p) = self.peers.get_mut(peer_id as usize - 1) {
            match pfx.family() {
                Family::V4 => p.v4.inactive -= 1,
                Family::V6 => p.v6.inactive -= 1,
            }
        }
    }

    pub(crate) fn activate_pfx_state(&mut self, pfx: Prefix) {
        match pfx {
            Prefix::V4(n) => {
                if let Some(info) = self.v4.get_mut(&n) {
                    if info.state != FieldState::Active {
                        info.state = FieldState::Active;
                        self.v4_cnt.active += 1;
                        self.v4_cnt.inactive -= 1;
                    }
                }
            }
            Prefix::V6(n) => {
                if let Some(info) = self.v6.get_mut(&n) {
                    if info.state != FieldState::Active {
                        info.state = FieldState::Active;
                        self.v6_cnt.active += 1;
                        self.v6_cnt.inactive -= 1;
                    }
                }
            }
        }
    }

    pub(crate) fn deactivate_pfx_state(&mut self, pfx: Prefix) {
        match pfx {
            Prefix::V4(n) => {
                if let Some(info) = self.v4.get_mut(&n) {
                    if info.state == FieldState::Active {
                        info.state = FieldState::Inactive;
                        self.v4_cnt.active -= 1;
                        self.v4_cnt.inactive += 1;
                    }
                }
            }
            Prefix::V6(n) => {
                if let Some(info) = self.v6.get_mut(&n) {
                    if info.state == FieldState::Active {
                        info.state = FieldState::Inactive;
                        self.v6_cnt.active -= 1;
                        self.v6_cnt.inactive += 1;
                    }
                }
            }
        }
    }

    /// Marks the whole prefix `Invalid`: every remaining `Inactive`
    /// pfx-peer is invalidated along with it (any `Active` ones must
    /// already have been deactivated by the caller).
    pub(crate) fn invalidate_pfx(&mut self, pfx: Prefix) {
        match pfx {
            Prefix::V4(n) => invalidate_pfx_table(&mut self.v4, &mut self.v4_cnt, &mut self.peers, n, Family::V4),
            Prefix::V6(n) => invalidate_pfx_table(&mut self.v6, &mut self.v6_cnt, &mut self.peers, n, Family::V6),
        }
    }

    pub(crate) fn peer_state(&self, peer_id: PeerId) -> FieldState {
        self.peer_info(peer_id).map(|p| p.state).unwrap_or(FieldState::Invalid)
    }

    /// All prefixes of `family` for which `peer_id` has a pfx-peer entry
    /// matching `mask`. O(n) over the family table — there is no reverse
    /// peer->prefix index, so this is correctness-first rather than a
    /// hot-path lookup (used by cascades and by the engine's peer-reset
    /// pass, both already O(n) in the number of a peer's routes).
    pub(crate) fn pfx_peers_of(&self, peer_id: PeerId, family: Family, mask: StateMask) -> Vec<Prefix> {
        match family {
            Family::V4 => self
                .v4
                .iter()
                .filter(|(_, i)| i.peer_state(peer_id).matches(mask))
                .map(|(k, _)| Prefix::V4(*k))
                .collect(),
            Family::V6 => self
                .v6
                .iter()
                .filter(|(_, i)| i.peer_state(peer_id).matches(mask))
                .map(|(k, _)| Prefix::V6(*k))
                .collect(),
        }
    }
}

fn touch_pfx_peer<N: Ord + Copy, XA, QA>(
    map: &mut BTreeMap<N, PfxInfo<XA, QA>>,
    table_cnt: &mut FamilyCounts,
    key: N,
    peer_id: PeerId,
    path_id: Option<PathId>,
    extended: bool,
) -> bool {
    let entry = map.entry(key).or_insert_with(|| PfxInfo::new(extended));
    if entry.state == FieldState::Invalid {
        entry.state = FieldState::Inactive;
        table_cnt.inactive += 1;
    }
    entry.ensure_peer_slot(peer_id);
    let was_new = entry.peer_state(peer_id) == FieldState::Invalid;
    if was_new {
        entry.set_peer_state(peer_id, FieldState::Inactive);
        entry.peers_cnt.inactive += 1;
    }
    if let Some(path_id) = path_id {
        entry.peer_slot_mut(peer_id).unwrap().path_id = Some(path_id);
    }
    was_new
}

fn invalidate_pfx_table<N: Ord + Copy, PA, XA, QA>(
    map: &mut BTreeMap<N, PfxInfo<XA, QA>>,
    table_cnt: &mut FamilyCounts,
    peers: &mut [PeerInfo<PA>],
    key: N,
    family: Family,
) {
    let Some(info) = map.get_mut(&key) else { return };
    let inactive_peers: Vec<PeerId> = info.peer_ids_matching(StateMask::INACTIVE).collect();
    for &peer_id in &inactive_peers {
        info.set_peer_state(peer_id, FieldState::Invalid);
        if let Some(slot) = info.peer_slot_mut(peer_id) {
            slot.path_id = None;
            slot.attachment = None;
        }
    }
    info.peers_cnt.inactive = 0;
    let was = info.state;
    info.state = FieldState::Invalid;
    match was {
        FieldState::Active => table_cnt.active -= 1,
        FieldState::Inactive => table_cnt.inactive -= 1,
        FieldState::Invalid => {}
    }
    for &peer_id in &inactive_peers {
        if let Some(p) = peers.get_mut(peer_id as usize - 1) {
            match family {
                Family::V4 => p.v4.inactive -= 1,
                Family::V6 => p.v6.inactive -= 1,
            }
        }
    }
}
