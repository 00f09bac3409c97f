//! Per-prefix state: overall lifecycle, the packed peer-state array, and
//! the dense pfx-peer record array. Spec §3.1, §3.2, §3.3.

use crate::as_path::PathId;
use crate::peer_sig::PeerId;

use super::counts::FamilyCounts;
use super::state::{FieldState, PackedStateArray, StateMask};

/// A single `(prefix, peer)` record. The base variant is exactly the
/// path id; `attachment` carries the user-pointer-equivalent slot when
/// the view was not constructed with the extended layout disabled
/// (spec §3.1, §4.3 `disable_extended_pfxpeer`).
#[derive(Debug, Clone)]
pub struct PfxPeerSlot<QA> {
    pub path_id: Option<PathId>,
    pub attachment: Option<QA>,
}

impl<QA> Default for PfxPeerSlot<QA> {
    fn default() -> Self {
        PfxPeerSlot {
            path_id: None,
            attachment: None,
        }
    }
}

/// Per-prefix record. `peers` is a dense array indexed by `peer_id - 1`,
/// grown monotonically in lockstep with `peer_states`; unseen peer ids
/// read back as `Invalid` with no path (spec §3.2). `attachment` is the
/// per-prefix user slot (spec §9's "per-entity attachments", the `X` of
/// `View<P, X, Q>`), independent of the per-pfx-peer slot in
/// [`PfxPeerSlot`].
#[derive(Debug, Clone)]
pub struct PfxInfo<XA, QA> {
    pub state: FieldState,
    pub(crate) peer_states: PackedStateArray,
    pub(crate) peers: Vec<PfxPeerSlot<QA>>,
    pub peers_cnt: FamilyCounts,
    pub attachment_slot_enabled: bool,
    pub attachment: Option<XA>,
}

impl<XA, QA> PfxInfo<XA, QA> {
    pub fn new(extended: bool) -> Self {
        PfxInfo {
            state: FieldState::Invalid,
            peer_states: PackedStateArray::new(),
            peers: Vec::new(),
            peers_cnt: FamilyCounts::default(),
            attachment_slot_enabled: extended,
            attachment: None,
        }
    }

    pub(crate) fn ensure_peer_slot(&mut self, peer_id: PeerId) {
        self.peer_states.ensure_len(peer_id);
        let needed = peer_id as usize;
        if self.peers.len() < needed {
            self.peers.resize_with(needed, PfxPeerSlot::default);
        }
    }

    pub fn peer_state(&self, peer_id: PeerId) -> FieldState {
        self.peer_states.get(peer_id)
    }

    pub(crate) fn set_peer_state(&mut self, peer_id: PeerId, state: FieldState) {
        self.peer_states.set(peer_id, state);
    }

    pub fn peer_slot(&self, peer_id: PeerId) -> Option<&PfxPeerSlot<QA>> {
        if peer_id == 0 {
            return None;
        }
        self.peers.get(peer_id as usize - 1)
    }

    pub fn peer_slot_mut(&mut self, peer_id: PeerId) -> Option<&mut PfxPeerSlot<QA>> {
        if peer_id == 0 {
            return None;
        }
        self.peers.get_mut(peer_id as usize - 1)
    }

    /// Iterates `peer_id`s (ascending) whose pfx-peer state matches `mask`.
    pub fn peer_ids_matching(&self, mask: StateMask) -> impl Iterator<Item = PeerId> + '_ {
        (1..=self.peers.len() as u32).filter_map(move |p| {
            let peer_id = p as PeerId;
            if self.peer_states.get(peer_id).matches(mask) {
                Some(peer_id)
            } else {
                None
            }
        })
    }

    pub fn next_peer_after(&self, after: Option<PeerId>, mask: StateMask) -> Option<PeerId> {
        let start = after.map(|p| p as usize).unwrap_or(0);
        ((start + 1)..=self.peers.len()).find_map(|p| {
            let peer_id = p as PeerId;
            if self.peer_states.get(peer_id).matches(mask) {
                Some(peer_id)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_peer_reads_invalid() {
        let pfx: PfxInfo<(), ()> = PfxInfo::new(false);
        assert_eq!(pfx.peer_state(7), FieldState::Invalid);
        assert!(pfx.peer_slot(7).is_none());
    }

    #[test]
    fn grows_monotonically() {
        let mut pfx: PfxInfo<(), ()> = PfxInfo::new(false);
        pfx.ensure_peer_slot(5);
        assert_eq!(pfx.peers.len(), 5);
        assert_eq!(pfx.peer_state(3), FieldState::Invalid);
        pfx.ensure_peer_slot(2);
        assert_eq!(pfx.peers.len(), 5, "shrinking below prior length is not allowed");
    }
}
