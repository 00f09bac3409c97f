//! The composite cursor: spec §4.3.1 (navigation across the peer,
//! prefix, and pfx-peer dimensions) and §4.3.2 (activation rules).
//!
//! A single `ViewIter` borrows the view mutably for its lifetime so
//! that the mutating operations (`add_peer`, `activate_pfx_peer`, ...)
//! can update the per-entity counters in lockstep with the per-entry
//! state they derive from — the invariants in spec §8 hold only if
//! those two things never drift apart, so every mutation in this file
//! goes through the shared primitives in `ops.rs`.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::ops::Bound;

use ipnet::{Ipv4Net, Ipv6Net};

use crate::as_path::{AsPath, PathId};
use crate::error::{ViewError, ViewResult};
use crate::peer_sig::PeerId;

use super::pfx::{PfxInfo, PfxPeerSlot};
use super::prefix::Prefix;
use super::state::{FieldState, StateMask};
use super::View;

/// Which address family a prefix-dimension cursor is currently parked
/// on; also used to pick which side of the per-peer `FamilyCounts` pair
/// to update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

/// Which prefix table(s) a prefix-dimension walk should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PfxSelector {
    V4Only,
    V6Only,
    Both,
}

/// The composite cursor returned by `View::iter`. Three independent
/// positions are tracked: the peer-dimension cursor, the prefix-dimension
/// cursor (which may range across both families), and the pfx-peer
/// cursor nested within whichever prefix the prefix cursor is parked on.
pub struct ViewIter<'v, PA, XA, QA> {
    view: &'v mut View<PA, XA, QA>,

    peer_pos: Option<PeerId>,
    peer_mask: StateMask,

    pfx_selector: PfxSelector,
    pfx_mask: StateMask,
    cur_family: Family,
    cur_v4: Option<Ipv4Net>,
    cur_v6: Option<Ipv6Net>,

    pp_mask: StateMask,
    pp_peer_pos: Option<PeerId>,
}

impl<'v, PA, XA, QA> ViewIter<'v, PA, XA, QA> {
    pub(crate) fn new(view: &'v mut View<PA, XA, QA>) -> Self {
        ViewIter {
            view,
            peer_pos: None,
            peer_mask: StateMask::ALL,
            pfx_selector: PfxSelector::Both,
            pfx_mask: StateMask::ALL,
            cur_family: Family::V4,
            cur_v4: None,
            cur_v6: None,
            pp_mask: StateMask::ALL,
            pp_peer_pos: None,
        }
    }

    // ---- peer dimension -------------------------------------------------

    pub fn first_peer(&mut self, mask: StateMask) -> bool {
        self.peer_mask = mask;
        self.peer_pos = None;
        self.next_peer()
    }

    pub fn next_peer(&mut self) -> bool {
        let start = self.peer_pos.map(|p| p as usize).unwrap_or(0);
        for i in start..self.view.peers.len() {
            if self.view.peers[i].state.matches(self.peer_mask) {
                self.peer_pos = Some((i + 1) as PeerId);
                return true;
            }
        }
        self.peer_pos = None;
        false
    }

    pub fn seek_peer(&mut self, id: PeerId, mask: StateMask) -> bool {
        self.peer_mask = mask;
        if self.view.peer_info(id).map(|p| p.state.matches(mask)).unwrap_or(false) {
            self.peer_pos = Some(id);
            true
        } else {
            self.peer_pos = None;
            false
        }
    }

    pub fn peer_id(&self) -> Option<PeerId> {
        self.peer_pos
    }

    // ---- prefix dimension -------------------------------------------------

    pub fn first_pfx(&mut self, selector: PfxSelector, mask: StateMask) -> bool {
        self.pfx_selector = selector;
        self.pfx_mask = mask;
        self.cur_v4 = None;
        self.cur_v6 = None;
        self.cur_family = if selector == PfxSelector::V6Only { Family::V6 } else { Family::V4 };
        self.next_pfx()
    }

    pub fn next_pfx(&mut self) -> bool {
        match self.pfx_selector {
            PfxSelector::V4Only => {
                self.cur_v4 = next_match(&self.view.v4, self.cur_v4, self.pfx_mask);
                self.cur_v4.is_some()
            }
            PfxSelector::V6Only => {
                self.cur_v6 = next_match(&self.view.v6, self.cur_v6, self.pfx_mask);
                self.cur_v6.is_some()
            }
            PfxSelector::Both => {
                if self.cur_family == Family::V4 {
                    if let Some(n) = next_match(&self.view.v4, self.cur_v4, self.pfx_mask) {
                        self.cur_v4 = Some(n);
                        return true;
                    }
                    self.cur_family = Family::V6;
                    self.cur_v4 = None;
                    self.cur_v6 = next_match(&self.view.v6, None, self.pfx_mask);
                    self.cur_v6.is_some()
                } else {
                    self.cur_v6 = next_match(&self.view.v6, self.cur_v6, self.pfx_mask);
                    self.cur_v6.is_some()
                }
            }
        }
    }

    pub fn seek_pfx(&mut self, prefix: Prefix, mask: StateMask) -> bool {
        self.pfx_mask = mask;
        match prefix {
            Prefix::V4(n) => {
                if self.view.v4.get(&n).map(|p| p.state.matches(mask)).unwrap_or(false) {
                    self.cur_family = Family::V4;
                    self.cur_v4 = Some(n);
                    self.cur_v6 = None;
                    return true;
                }
            }
            Prefix::V6(n) => {
                if self.view.v6.get(&n).map(|p| p.state.matches(mask)).unwrap_or(false) {
                    self.cur_family = Family::V6;
                    self.cur_v6 = Some(n);
                    self.cur_v4 = None;
                    return true;
                }
            }
        }
        self.cur_v4 = None;
        self.cur_v6 = None;
        false
    }

    pub fn cur_pfx(&self) -> Option<Prefix> {
        match self.cur_family {
            Family::V4 => self.cur_v4.map(Prefix::V4),
            Family::V6 => self.cur_v6.map(Prefix::V6),
        }
    }

    pub fn cur_pfx_info(&self) -> Option<&PfxInfo<XA, QA>> {
        self.cur_pfx().and_then(|p| self.view.pfx_info_generic(p))
    }

    /// Read access to the per-prefix user attachment at the cursor
    /// (spec §9's `X` slot of `View<P, X, Q>`).
    pub fn cur_pfx_attachment(&self) -> Option<&XA> {
        self.cur_pfx_info()?.attachment.as_ref()
    }

    /// Mutable access to the per-prefix attachment at the cursor,
    /// initializing it with `default` on first touch.
    pub fn cur_pfx_attachment_mut(&mut self, default: impl FnOnce() -> XA) -> Option<&mut XA> {
        let pfx = self.cur_pfx()?;
        let info = match pfx {
            Prefix::V4(n) => self.view.v4.get_mut(&n)?,
            Prefix::V6(n) => self.view.v6.get_mut(&n)?,
        };
        if info.attachment.is_none() {
            info.attachment = Some(default());
        }
        info.attachment.as_mut()
    }

    // ---- pfx-peer dimension ------------------------------------------------

    /// Positions the composite cursor on the first `(pfx, peer)` pair
    /// matching `pfx_mask`/`peer_mask`, restricted to the given address
    /// family selector (spec §4.3.1: `first_pfx_peer(version, pfx_mask,
    /// peer_mask)`).
    pub fn first_pfx_peer(&mut self, version: PfxSelector, pfx_mask: StateMask, peer_mask: StateMask) -> bool {
        self.pp_mask = peer_mask;
        if !self.first_pfx(version, pfx_mask) {
            self.pp_peer_pos = None;
            return false;
        }
        self.position_first_pp_in_current_pfx()
    }

    fn position_first_pp_in_current_pfx(&mut self) -> bool {
        loop {
            if let Some(info) = self.cur_pfx_info() {
                if let Some(pid) = info.next_peer_after(None, self.pp_mask) {
                    self.pp_peer_pos = Some(pid);
                    return true;
                }
            }
            if !self.next_pfx() {
                self.pp_peer_pos = None;
                return false;
            }
        }
    }

    pub fn next_pfx_peer(&mut self) -> bool {
        if let Some(info) = self.cur_pfx_info() {
            if let Some(pid) = info.next_peer_after(self.pp_peer_pos, self.pp_mask) {
                self.pp_peer_pos = Some(pid);
                return true;
            }
        }
        if !self.next_pfx() {
            self.pp_peer_pos = None;
            return false;
        }
        self.position_first_pp_in_current_pfx()
    }

    /// Seeks a peer within the *current* prefix only; does not cross to
    /// another prefix (distinct from `next_pfx_peer`).
    pub fn pfx_seek_peer(&mut self, id: PeerId, mask: StateMask) -> bool {
        self.pp_mask = mask;
        if self.cur_pfx_info().map(|i| i.peer_state(id).matches(mask)).unwrap_or(false) {
            self.pp_peer_pos = Some(id);
            true
        } else {
            self.pp_peer_pos = None;
            false
        }
    }

    pub fn pfx_next_peer(&mut self) -> bool {
        if let Some(info) = self.cur_pfx_info() {
            if let Some(pid) = info.next_peer_after(self.pp_peer_pos, self.pp_mask) {
                self.pp_peer_pos = Some(pid);
                return true;
            }
        }
        self.pp_peer_pos = None;
        false
    }

    pub fn seek_pfx_peer(&mut self, pfx: Prefix, id: PeerId, pfx_mask: StateMask, peer_mask: StateMask) -> bool {
        if !self.seek_pfx(pfx, pfx_mask) {
            self.pp_peer_pos = None;
            return false;
        }
        self.pfx_seek_peer(id, peer_mask)
    }

    pub fn pfx_peer_id(&self) -> Option<PeerId> {
        self.pp_peer_pos
    }

    pub fn cur_pfx_peer(&self) -> Option<(Prefix, PeerId, &PfxPeerSlot<QA>)> {
        let pfx = self.cur_pfx()?;
        let peer_id = self.pp_peer_pos?;
        let slot = self.view.pfx_info_generic(pfx)?.peer_slot(peer_id)?;
        Some((pfx, peer_id, slot))
    }

    /// The lifecycle state of the pfx-peer at the composite cursor.
    pub fn cur_pfx_peer_state(&self) -> FieldState {
        match (self.cur_pfx(), self.pp_peer_pos) {
            (Some(pfx), Some(peer_id)) => self
                .view
                .pfx_info_generic(pfx)
                .map(|i| i.peer_state(peer_id))
                .unwrap_or(FieldState::Invalid),
            _ => FieldState::Invalid,
        }
    }

    /// The lifecycle state of an arbitrary peer, independent of the
    /// cursor's own peer-dimension position.
    pub fn peer_state_of(&self, peer_id: PeerId) -> FieldState {
        self.view.peer_state(peer_id)
    }

    /// Clears the stored path on the pfx-peer at the composite cursor,
    /// without otherwise touching its lifecycle state (used by
    /// withdrawal handling, which clears the path but leaves activation
    /// to the caller's own `pfx_deactivate_peer` call).
    pub fn clear_cur_pfx_peer_path(&mut self) -> bool {
        let pfx = match self.cur_pfx() {
            Some(p) => p,
            None => return false,
        };
        let peer_id = match self.pp_peer_pos {
            Some(p) => p,
            None => return false,
        };
        let slot = match pfx {
            Prefix::V4(n) => self.view.v4.get_mut(&n).and_then(|i| i.peer_slot_mut(peer_id)),
            Prefix::V6(n) => self.view.v6.get_mut(&n).and_then(|i| i.peer_slot_mut(peer_id)),
        };
        match slot {
            Some(s) => {
                s.path_id = None;
                true
            }
            None => false,
        }
    }

    pub fn cur_pfx_peer_attachment(&self) -> Option<&QA> {
        self.cur_pfx_peer()?.2.attachment.as_ref()
    }

    /// Mutable access to the attachment slot at the composite cursor,
    /// initializing it with `default` on first touch. The generic
    /// attachment slot (spec §9 "re-model [user pointers] as a type
    /// parameter") is otherwise write-only through `add_pfx_peer*`, so
    /// this is how a caller like `RIBEngine` keeps its own per-pfx-peer
    /// bookkeeping (§4.4.1's UC fields) in step with the path/state the
    /// base API manages.
    pub fn cur_pfx_peer_attachment_mut(&mut self, default: impl FnOnce() -> QA) -> Option<&mut QA> {
        let pfx = self.cur_pfx()?;
        let peer_id = self.pp_peer_pos?;
        let slot = match pfx {
            Prefix::V4(n) => self.view.v4.get_mut(&n)?.peer_slot_mut(peer_id)?,
            Prefix::V6(n) => self.view.v6.get_mut(&n)?.peer_slot_mut(peer_id)?,
        };
        if slot.attachment.is_none() {
            slot.attachment = Some(default());
        }
        slot.attachment.as_mut()
    }

    // ---- mutating operations -----------------------------------------------

    /// Interns `(collector, peer_ip, peer_asn)` and ensures the peer
    /// exists, creating it `Inactive` if new (spec §4.3). Positions the
    /// peer cursor on it.
    pub fn add_peer(&mut self, collector: &str, peer_ip: IpAddr, peer_asn: u32) -> PeerId {
        let id = self.view.sigmap.borrow_mut().get_or_create(collector, peer_ip, peer_asn);
        if id == crate::peer_sig::PEER_ID_NONE {
            return id;
        }
        self.view.ensure_peer(id);
        self.peer_pos = Some(id);
        id
    }

    /// Deactivates the peer at the current cursor position (cascading
    /// through its active pfx-peers), marks it `Invalid`, and advances
    /// to the next matching peer.
    pub fn remove_peer(&mut self) -> bool {
        if let Some(id) = self.peer_pos {
            self.deactivate_peer();
            if let Some(p) = self.view.peers.get_mut(id as usize - 1) {
                if p.state == FieldState::Inactive {
                    self.view.peer_cnt.inactive -= 1;
                }
                p.state = FieldState::Invalid;
            }
        }
        self.next_peer()
    }

    /// Looks up the AS path's core/peer-prefix split, interns it, and
    /// writes the pfx-peer entry. Creates the prefix and/or pfx-peer slot
    /// as `Inactive` if new (spec §4.3). The owning peer must already
    /// exist (callers create it explicitly via `add_peer`, matching the
    /// RIB-engine dispatch order in §4.4.3).
    pub fn add_pfx_peer(&mut self, pfx: Prefix, peer_id: PeerId, path: &AsPath) -> ViewResult<()> {
        let peer_asn = self
            .view
            .sigmap
            .borrow()
            .lookup_sig(peer_id)
            .map(|s| s.peer_asn)
            .ok_or(ViewError::ContractViolation("add_pfx_peer: unknown peer id"))?;
        let path_id = self.view.pathstore.borrow_mut().intern(path, peer_asn);
        self.add_pfx_peer_by_id(pfx, peer_id, path_id)
    }

    pub fn add_pfx_peer_by_id(&mut self, pfx: Prefix, peer_id: PeerId, path_id: PathId) -> ViewResult<()> {
        if self.view.peer_info(peer_id).is_none() {
            return Err(ViewError::ContractViolation("add_pfx_peer_by_id: unknown peer id"));
        }
        self.view.ensure_pfx_peer(pfx, peer_id, path_id);
        self.cur_family = pfx.family();
        match pfx {
            Prefix::V4(n) => {
                self.cur_v4 = Some(n);
                self.cur_v6 = None;
            }
            Prefix::V6(n) => {
                self.cur_v6 = Some(n);
                self.cur_v4 = None;
            }
        }
        self.pp_peer_pos = Some(peer_id);
        Ok(())
    }

    /// Ensures the pfx-peer slot exists and positions the cursor there,
    /// without writing a live `path_id` — for callers that only need a
    /// UC-tagged attachment written (spec §4.4.3 step 3: a RIB element
    /// must not touch the live path until promotion).
    pub fn ensure_pfx_peer_slot(&mut self, pfx: Prefix, peer_id: PeerId) -> ViewResult<()> {
        if self.view.peer_info(peer_id).is_none() {
            return Err(ViewError::ContractViolation("ensure_pfx_peer_slot: unknown peer id"));
        }
        self.view.ensure_pfx_peer_slot(pfx, peer_id);
        self.cur_family = pfx.family();
        match pfx {
            Prefix::V4(n) => {
                self.cur_v4 = Some(n);
                self.cur_v6 = None;
            }
            Prefix::V6(n) => {
                self.cur_v6 = Some(n);
                self.cur_v4 = None;
            }
        }
        self.pp_peer_pos = Some(peer_id);
        Ok(())
    }

    pub fn pfx_add_peer(&mut self, peer_id: PeerId, path: &AsPath) -> ViewResult<()> {
        let pfx = self
            .cur_pfx()
            .ok_or(ViewError::ContractViolation("pfx_add_peer: no current prefix"))?;
        self.add_pfx_peer(pfx, peer_id, path)
    }

    pub fn pfx_add_peer_by_id(&mut self, peer_id: PeerId, path_id: PathId) -> ViewResult<()> {
        let pfx = self
            .cur_pfx()
            .ok_or(ViewError::ContractViolation("pfx_add_peer_by_id: no current prefix"))?;
        self.add_pfx_peer_by_id(pfx, peer_id, path_id)
    }

    /// Deactivates the prefix at the cursor (cascading through all its
    /// still-active pfx-peers), marks it `Invalid`, and advances.
    pub fn remove_pfx(&mut self) -> bool {
        if let Some(pfx) = self.cur_pfx() {
            self.deactivate_pfx();
            self.view.invalidate_pfx(pfx);
        }
        self.next_pfx()
    }

    /// Deactivates (if active), then invalidates, the pfx-peer at the
    /// composite cursor. If the prefix has no peers left at all, the
    /// prefix itself is removed. Does not advance; call `pfx_next_peer`
    /// explicitly.
    pub fn pfx_remove_peer(&mut self) -> bool {
        let (pfx, peer_id) = match (self.cur_pfx(), self.pp_peer_pos) {
            (Some(p), Some(q)) => (p, q),
            _ => return false,
        };
        let cur = self.view.pfx_info_generic(pfx).map(|i| i.peer_state(peer_id)).unwrap_or(FieldState::Invalid);
        if cur == FieldState::Invalid {
            return false;
        }
        if cur == FieldState::Active {
            self.view.deactivate_single_pfx_peer(pfx, peer_id);
            if self.view.pfx_peers_active_count(pfx) == 0 {
                self.view.deactivate_pfx_state(pfx);
            }
        }
        self.view.invalidate_single_pfx_peer(pfx, peer_id);
        if self.view.pfx_peer_total(pfx) == 0 {
            self.view.invalidate_pfx(pfx);
        }
        true
    }

    // ---- activation rules (spec §4.3.2) -------------------------------------

    /// `Inactive -> Active`. No-op (returns `false`) if the peer is
    /// already `Active` or does not exist.
    pub fn activate_peer(&mut self) -> bool {
        let id = match self.peer_pos {
            Some(id) => id,
            None => return false,
        };
        if self.view.peer_state(id) != FieldState::Inactive {
            return false;
        }
        if let Some(p) = self.view.peers.get_mut(id as usize - 1) {
            p.state = FieldState::Active;
        }
        self.view.peer_cnt.inactive -= 1;
        self.view.peer_cnt.active += 1;
        true
    }

    /// `Active -> Inactive`, cascading through every pfx-peer this peer
    /// still holds active (deactivating the owning prefix too, when it
    /// was its last active peer). No-op if the peer is not `Active`.
    pub fn deactivate_peer(&mut self) -> bool {
        let id = match self.peer_pos {
            Some(id) => id,
            None => return false,
        };
        if self.view.peer_state(id) != FieldState::Active {
            return false;
        }
        for pfx in self.view.pfx_peers_of(id, Family::V4, StateMask::ACTIVE) {
            self.view.deactivate_single_pfx_peer(pfx, id);
            if self.view.pfx_peers_active_count(pfx) == 0 {
                self.view.deactivate_pfx_state(pfx);
            }
        }
        for pfx in self.view.pfx_peers_of(id, Family::V6, StateMask::ACTIVE) {
            self.view.deactivate_single_pfx_peer(pfx, id);
            if self.view.pfx_peers_active_count(pfx) == 0 {
                self.view.deactivate_pfx_state(pfx);
            }
        }
        if let Some(p) = self.view.peers.get_mut(id as usize - 1) {
            p.state = FieldState::Inactive;
        }
        self.view.peer_cnt.active -= 1;
        self.view.peer_cnt.inactive += 1;
        true
    }

    /// Deactivates every `Active` pfx-peer of the prefix at the cursor,
    /// then the prefix itself. No-op if the prefix is not `Active`.
    pub fn deactivate_pfx(&mut self) -> bool {
        let pfx = match self.cur_pfx() {
            Some(p) => p,
            None => return false,
        };
        let active_peers: Vec<PeerId> = match self.view.pfx_info_generic(pfx) {
            Some(info) => info.peer_ids_matching(StateMask::ACTIVE).collect(),
            None => Vec::new(),
        };
        if active_peers.is_empty() {
            return false;
        }
        for peer_id in active_peers {
            self.view.deactivate_single_pfx_peer(pfx, peer_id);
        }
        self.view.deactivate_pfx_state(pfx);
        true
    }

    /// `Inactive -> Active` for the pfx-peer at the composite cursor.
    /// Requires the owning peer to already be `Active` (debug-asserted;
    /// a release no-op otherwise). Cascades to activate the owning
    /// prefix when this is its first active pfx-peer.
    pub fn pfx_activate_peer(&mut self) -> bool {
        let (pfx, peer_id) = match (self.cur_pfx(), self.pp_peer_pos) {
            (Some(p), Some(q)) => (p, q),
            _ => return false,
        };
        let cur = self.view.pfx_info_generic(pfx).map(|i| i.peer_state(peer_id)).unwrap_or(FieldState::Invalid);
        if cur != FieldState::Inactive {
            return false;
        }
        let owner_active = self.view.peer_state(peer_id) == FieldState::Active;
        debug_assert!(owner_active, "pfx_activate_peer: owning peer must already be Active");
        if !owner_active {
            return false;
        }
        self.view.activate_single_pfx_peer(pfx, peer_id);
        if self.view.pfx_peers_active_count(pfx) == 1 {
            self.view.activate_pfx_state(pfx);
        }
        true
    }

    /// `Active -> Inactive` for the pfx-peer at the composite cursor.
    /// Cascades to deactivate the owning prefix when this was its last
    /// active pfx-peer.
    pub fn pfx_deactivate_peer(&mut self) -> bool {
        let (pfx, peer_id) = match (self.cur_pfx(), self.pp_peer_pos) {
            (Some(p), Some(q)) => (p, q),
            _ => return false,
        };
        let cur = self.view.pfx_info_generic(pfx).map(|i| i.peer_state(peer_id)).unwrap_or(FieldState::Invalid);
        if cur != FieldState::Active {
            return false;
        }
        self.view.deactivate_single_pfx_peer(pfx, peer_id);
        if self.view.pfx_peers_active_count(pfx) == 0 {
            self.view.deactivate_pfx_state(pfx);
        }
        true
    }
}

fn next_match<N: Ord + Copy, XA, QA>(map: &BTreeMap<N, PfxInfo<XA, QA>>, after: Option<N>, mask: StateMask) -> Option<N> {
    let start = match after {
        Some(k) => Bound::Excluded(k),
        None => Bound::Unbounded,
    };
    map.range((start, Bound::Unbounded)).find(|(_, v)| v.state.matches(mask)).map(|(k, _)| *k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::as_path::Segment;
    use std::net::Ipv4Addr;

    fn v4(s: &str) -> Prefix {
        Prefix::V4(s.parse().unwrap())
    }

    #[test]
    fn add_peer_then_pfx_peer_starts_inactive_then_activates() {
        let mut view: View = View::create(None, None);
        let mut it = view.iter();
        let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 65000);
        assert_eq!(it.view.peer_cnt(StateMask::INACTIVE), 1);

        it.activate_peer();
        assert_eq!(it.view.peer_cnt(StateMask::ACTIVE), 1);

        let path = vec![Segment::Sequence(vec![65000, 65001, 65002])];
        let pfx = v4("192.0.2.0/24");
        it.add_pfx_peer(pfx, peer, &path).unwrap();
        assert_eq!(it.view.pfx_cnt(StateMask::INACTIVE), 1);

        assert!(it.seek_pfx_peer(pfx, peer, StateMask::ALL, StateMask::ALL));
        assert!(it.pfx_activate_peer());
        assert_eq!(it.view.pfx_cnt(StateMask::ACTIVE), 1);
        assert_eq!(it.view.peer_info(peer).unwrap().v4.active, 1);
    }

    #[test]
    fn deactivate_peer_cascades_to_prefixes() {
        let mut view: View = View::create(None, None);
        let mut it = view.iter();
        let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 65000);
        it.activate_peer();
        let path = vec![Segment::Sequence(vec![65000, 65001])];
        let pfx = v4("198.51.100.0/24");
        it.add_pfx_peer(pfx, peer, &path).unwrap();
        it.seek_pfx_peer(pfx, peer, StateMask::ALL, StateMask::ALL);
        it.pfx_activate_peer();
        assert_eq!(it.view.pfx_cnt(StateMask::ACTIVE), 1);

        it.seek_peer(peer, StateMask::ALL);
        it.deactivate_peer();
        assert_eq!(it.view.pfx_cnt(StateMask::ACTIVE), 0);
        assert_eq!(it.view.pfx_cnt(StateMask::INACTIVE), 1);
        assert_eq!(it.view.peer_cnt(StateMask::INACTIVE), 1);
    }

    #[test]
    fn remove_pfx_invalidates_and_advances() {
        let mut view: View = View::create(None, None);
        let mut it = view.iter();
        let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 65000);
        it.activate_peer();
        let path = vec![Segment::Sequence(vec![65000])];
        let pfx_a = v4("10.0.0.0/24");
        let pfx_b = v4("10.0.1.0/24");
        it.add_pfx_peer(pfx_a, peer, &path).unwrap();
        it.add_pfx_peer(pfx_b, peer, &path).unwrap();

        assert!(it.first_pfx(PfxSelector::V4Only, StateMask::ALL));
        assert_eq!(it.cur_pfx(), Some(pfx_a));
        assert!(it.remove_pfx());
        assert_eq!(it.cur_pfx(), Some(pfx_b));
        assert_eq!(it.view.pfx_info_v4(&pfx_a.as_v4().unwrap()).unwrap().state, FieldState::Invalid);
    }

    #[test]
    fn pfx_peer_iteration_crosses_families() {
        let mut view: View = View::create(None, None);
        let mut it = view.iter();
        let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 65000);
        it.activate_peer();
        let path = vec![Segment::Sequence(vec![65000])];
        it.add_pfx_peer(v4("10.0.0.0/24"), peer, &path).unwrap();
        let v6pfx = Prefix::V6("2001:db8::/32".parse().unwrap());
        it.add_pfx_peer(v6pfx, peer, &path).unwrap();

        assert!(it.first_pfx_peer(PfxSelector::Both, StateMask::ALL, StateMask::ALL));
        let mut seen = 0;
        loop {
            seen += 1;
            if !it.next_pfx_peer() {
                break;
            }
        }
        assert_eq!(seen, 2);
    }
}
