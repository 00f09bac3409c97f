//! The three-level routing snapshot: `prefix -> peer -> (path, state)`.
//! Spec §3 (data model) and §4.3 (non-iterator operations).

mod counts;
mod iter;
mod ops;
mod peer;
mod pfx;
mod prefix;
mod state;

pub use counts::FamilyCounts;
pub use iter::{Family, PfxSelector, ViewIter};
pub use peer::PeerInfo;
pub use pfx::{PfxInfo, PfxPeerSlot};
pub use prefix::Prefix;
pub use state::{FieldState, StateMask};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ipnet::{Ipv4Net, Ipv6Net};

use crate::as_path::AsPathStore;
use crate::peer_sig::{PeerId, PeerSignatureMap};

pub type SharedSigMap = Rc<RefCell<PeerSignatureMap>>;
pub type SharedPathStore = Rc<RefCell<AsPathStore>>;

/// Implemented by pfx-peer attachments that carry a last-update
/// timestamp, so [`View::gc_if_stale`] can judge staleness without
/// hardcoding an engine-specific field.
pub trait StaleTimestamp {
    fn last_update_ts(&self) -> u32;
}

/// A whole routing-state snapshot. Generic over optional per-entity
/// user attachments (spec §9: "re-model as a type parameter on the
/// view... with an off variant that stores nothing" — `()` is that off
/// variant, which is also the default so `View::create(..)` without
/// turbofish gives you a plain view with no attachments). `PA`/`XA`/`QA`
/// are the per-peer, per-prefix, and per-pfx-peer attachment types
/// respectively, mirroring the original's three `user` pointer kinds.
pub struct View<PA = (), XA = (), QA = ()> {
    time: u32,
    time_created: u64,

    v4: BTreeMap<Ipv4Net, PfxInfo<XA, QA>>,
    v6: BTreeMap<Ipv6Net, PfxInfo<XA, QA>>,
    peers: Vec<PeerInfo<PA>>,

    sigmap: SharedSigMap,
    pathstore: SharedPathStore,
    sigmap_shared: bool,
    pathstore_shared: bool,

    extended_pfxpeer: bool,

    v4_cnt: FamilyCounts,
    v6_cnt: FamilyCounts,
    peer_cnt: FamilyCounts,
}

impl<PA, XA, QA> View<PA, XA, QA> {
    /// Creates a fresh, empty view. `shared_sigmap`/`shared_pathstore`
    /// let a producer share interns between a parent and a working view
    /// (spec §4.5); when omitted, the view owns freshly-created stores.
    ///
    /// The original C API additionally took a `user_destructors` bundle
    /// of per-entity-kind free functions; this is unnecessary here since
    /// dropping the `Option<PA>`/`Option<QA>` slots runs their `Drop`
    /// impls automatically.
    pub fn create(shared_sigmap: Option<SharedSigMap>, shared_pathstore: Option<SharedPathStore>) -> Self {
        let sigmap_shared = shared_sigmap.is_some();
        let pathstore_shared = shared_pathstore.is_some();
        View {
            time: 0,
            time_created: now_unix_secs(),
            v4: BTreeMap::new(),
            v6: BTreeMap::new(),
            peers: Vec::new(),
            sigmap: shared_sigmap.unwrap_or_else(|| Rc::new(RefCell::new(PeerSignatureMap::new()))),
            pathstore: shared_pathstore.unwrap_or_else(|| Rc::new(RefCell::new(AsPathStore::new()))),
            sigmap_shared,
            pathstore_shared,
            extended_pfxpeer: true,
            v4_cnt: FamilyCounts::default(),
            v6_cnt: FamilyCounts::default(),
            peer_cnt: FamilyCounts::default(),
        }
    }

    /// Creates a sibling view sharing this view's interns, for the
    /// parent/working-view pairing of spec §4.5.
    pub fn fork_shared(&self) -> Self {
        View::create(Some(self.sigmap.clone()), Some(self.pathstore.clone()))
    }

    pub fn sigmap(&self) -> &SharedSigMap {
        &self.sigmap
    }

    pub fn pathstore(&self) -> &SharedPathStore {
        &self.pathstore
    }

    pub fn is_sigmap_shared(&self) -> bool {
        self.sigmap_shared
    }

    pub fn is_pathstore_shared(&self) -> bool {
        self.pathstore_shared
    }

    pub fn get_time(&self) -> u32 {
        self.time
    }

    pub fn set_time(&mut self, time: u32) {
        self.time = time;
    }

    pub fn get_time_created(&self) -> u64 {
        self.time_created
    }

    /// Valid only before the first prefix is added; switches the
    /// pfx-peer layout to the non-attachment variant.
    pub fn disable_extended_pfxpeer(&mut self) {
        assert!(
            self.v4.is_empty() && self.v6.is_empty(),
            "disable_extended_pfxpeer must be called before the first prefix is added"
        );
        self.extended_pfxpeer = false;
    }

    pub fn extended_pfxpeer(&self) -> bool {
        self.extended_pfxpeer
    }

    /// Marks all prefixes and peers `Invalid`, zeroes counters, resets
    /// `time`. Does not deallocate the backing tables — they are reused
    /// on the next epoch (spec §4.3).
    pub fn clear(&mut self) {
        for pfx in self.v4.values_mut() {
            pfx.state = FieldState::Invalid;
            pfx.peers_cnt = FamilyCounts::default();
            for slot in pfx.peers.iter_mut() {
                slot.path_id = None;
                slot.attachment = None;
            }
            pfx.peer_states = state::PackedStateArray::new();
            pfx.attachment = None;
        }
        for pfx in self.v6.values_mut() {
            pfx.state = FieldState::Invalid;
            pfx.peers_cnt = FamilyCounts::default();
            for slot in pfx.peers.iter_mut() {
                slot.path_id = None;
                slot.attachment = None;
            }
            pfx.peer_states = state::PackedStateArray::new();
            pfx.attachment = None;
        }
        for peer in self.peers.iter_mut() {
            peer.state = FieldState::Invalid;
            peer.v4 = FamilyCounts::default();
            peer.v6 = FamilyCounts::default();
            peer.attachment = None;
        }
        self.v4_cnt = FamilyCounts::default();
        self.v6_cnt = FamilyCounts::default();
        self.peer_cnt = FamilyCounts::default();
        self.time = 0;
    }

    /// Copies `other`'s prefix/peer contents into `self` in place
    /// (spec §4.5's "clear-then-copy" half of keeping a parent view in
    /// step with a working view). Requires both views share the same
    /// interns.
    pub fn sync_from(&mut self, other: &Self)
    where
        PA: Clone,
        XA: Clone,
        QA: Clone,
    {
        self.clear();
        self.v4 = other.v4.clone();
        self.v6 = other.v6.clone();
        self.peers = other.peers.clone();
        self.v4_cnt = other.v4_cnt;
        self.v6_cnt = other.v6_cnt;
        self.peer_cnt = other.peer_cnt;
        self.time = other.time;
        self.extended_pfxpeer = other.extended_pfxpeer;
    }

    /// Frees all prefix entries in state `Invalid` and shrinks the
    /// tables. Peer slots are addressed by stable `PeerId` (assigned by
    /// the shared `PeerSignatureMap`) and are never removed here — only
    /// prefixes are reclaimed, matching the original's garbage
    /// collection pass.
    pub fn gc(&mut self) {
        self.v4.retain(|_, pfx| pfx.state != FieldState::Invalid);
        self.v6.retain(|_, pfx| pfx.state != FieldState::Invalid);
    }

    /// Prefix count across both families, filtered by `mask`.
    pub fn pfx_cnt(&self, mask: StateMask) -> u32 {
        self.v4_cnt.masked(mask) + self.v6_cnt.masked(mask)
    }

    pub fn v4pfx_cnt(&self, mask: StateMask) -> u32 {
        self.v4_cnt.masked(mask)
    }

    pub fn v6pfx_cnt(&self, mask: StateMask) -> u32 {
        self.v6_cnt.masked(mask)
    }

    pub fn peer_cnt(&self, mask: StateMask) -> u32 {
        self.peer_cnt.masked(mask)
    }

    pub fn peer_info(&self, peer_id: PeerId) -> Option<&PeerInfo<PA>> {
        if peer_id == 0 {
            return None;
        }
        self.peers.get(peer_id as usize - 1)
    }

    pub fn pfx_info_v4(&self, pfx: &Ipv4Net) -> Option<&PfxInfo<XA, QA>> {
        self.v4.get(pfx)
    }

    pub fn pfx_info_v6(&self, pfx: &Ipv6Net) -> Option<&PfxInfo<XA, QA>> {
        self.v6.get(pfx)
    }

    /// Total addressable peer slots, including `Invalid` ones (peers
    /// removed since their `PeerId` was assigned). Used by read-only
    /// walks (e.g. transport encoding) that can't take `&mut self` for
    /// a `ViewIter`.
    pub fn peers_len(&self) -> usize {
        self.peers.len()
    }

    pub fn v4_prefixes(&self) -> impl Iterator<Item = (&Ipv4Net, &PfxInfo<XA, QA>)> {
        self.v4.iter()
    }

    pub fn v6_prefixes(&self) -> impl Iterator<Item = (&Ipv6Net, &PfxInfo<XA, QA>)> {
        self.v6.iter()
    }

    /// Begins an iterator/cursor over this view (spec §4.3.1). Mutating
    /// iterator operations take `&mut View` for their duration.
    pub fn iter(&mut self) -> ViewIter<'_, PA, XA, QA> {
        ViewIter::new(self)
    }

    /// Drops `Inactive` pfx-peer entries whose attachment reports a
    /// last-update timestamp older than `now - older_than_secs` (spec
    /// §4.4.6 "Post-pass": reclaiming memory for routes that haven't
    /// been refreshed in a long time, independent of the peer-level
    /// `MAX_INACTIVE` deactivation). Entries with no attachment, or a
    /// zero timestamp (never touched since creation), are left alone.
    pub fn gc_if_stale(&mut self, older_than_secs: u32, now: u32)
    where
        QA: StaleTimestamp,
    {
        let cutoff = now.saturating_sub(older_than_secs);

        let mut stale_v4: Vec<(Ipv4Net, PeerId)> = Vec::new();
        for (net, info) in self.v4.iter() {
            for peer_id in info.peer_ids_matching(StateMask::INACTIVE) {
                if let Some(att) = info.peer_slot(peer_id).and_then(|s| s.attachment.as_ref()) {
                    let ts = att.last_update_ts();
                    if ts != 0 && ts < cutoff {
                        stale_v4.push((*net, peer_id));
                    }
                }
            }
        }
        let mut stale_v6: Vec<(Ipv6Net, PeerId)> = Vec::new();
        for (net, info) in self.v6.iter() {
            for peer_id in info.peer_ids_matching(StateMask::INACTIVE) {
                if let Some(att) = info.peer_slot(peer_id).and_then(|s| s.attachment.as_ref()) {
                    let ts = att.last_update_ts();
                    if ts != 0 && ts < cutoff {
                        stale_v6.push((*net, peer_id));
                    }
                }
            }
        }

        let mut it = self.iter();
        for (net, peer_id) in stale_v4 {
            if it.seek_pfx_peer(Prefix::V4(net), peer_id, StateMask::ALL, StateMask::ALL) {
                it.pfx_remove_peer();
            }
        }
        for (net, peer_id) in stale_v6 {
            if it.seek_pfx_peer(Prefix::V6(net), peer_id, StateMask::ALL, StateMask::ALL) {
                it.pfx_remove_peer();
            }
        }
    }
}

fn now_unix_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod invariants {
    //! Shared test helper: validates the consistency laws from spec
    //! §3.2 / §8 against an arbitrary view. Used by unit tests in this
    //! module and the `rib_engine` scenario tests.
    use super::*;

    pub fn assert_view_invariants<PA, XA, QA>(view: &View<PA, XA, QA>) {
        let mut total_active_peers = 0u32;
        let mut total_inactive_peers = 0u32;
        for peer in &view.peers {
            match peer.state {
                FieldState::Active => total_active_peers += 1,
                FieldState::Inactive => total_inactive_peers += 1,
                FieldState::Invalid => {}
            }
        }
        assert_eq!(view.peer_cnt.active, total_active_peers);
        assert_eq!(view.peer_cnt.inactive, total_inactive_peers);

        for (fam_map, fam_cnt) in [(&view.v4, view.v4_cnt)] as [(&BTreeMap<Ipv4Net, PfxInfo<XA, QA>>, FamilyCounts); 1] {
            let mut active = 0u32;
            let mut inactive = 0u32;
            for pfx in fam_map.values() {
                match pfx.state {
                    FieldState::Active => active += 1,
                    FieldState::Inactive => inactive += 1,
                    FieldState::Invalid => {}
                }
                let has_active = pfx.peer_ids_matching(StateMask::ACTIVE).next().is_some();
                assert_eq!(
                    pfx.state == FieldState::Active,
                    has_active,
                    "prefix activity invariant violated"
                );
                assert_eq!(
                    pfx.state == FieldState::Active,
                    pfx.peers_cnt.active > 0
                );
            }
            assert_eq!(fam_cnt.active, active);
            assert_eq!(fam_cnt.inactive, inactive);
        }
        for pfx in view.v6.values() {
            let has_active = pfx.peer_ids_matching(StateMask::ACTIVE).next().is_some();
            assert_eq!(pfx.state == FieldState::Active, has_active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::invariants::assert_view_invariants;
    use super::*;
    use crate::as_path::Segment;
    use std::net::{IpAddr, Ipv4Addr};

    #[derive(Default)]
    struct Stamped {
        ts: u32,
    }

    impl StaleTimestamp for Stamped {
        fn last_update_ts(&self) -> u32 {
            self.ts
        }
    }

    fn v4(s: &str) -> Prefix {
        Prefix::V4(s.parse().unwrap())
    }

    fn path<PA, XA, QA>(view: &View<PA, XA, QA>, asn: u32) -> crate::as_path::PathId {
        view.pathstore().borrow_mut().intern(&[Segment::Sequence(vec![asn])], asn)
    }

    #[test]
    fn gc_if_stale_drops_only_old_inactive_entries() {
        let mut view: View<(), (), Stamped> = View::create(None, None);
        let path_id = path(&view, 65001);
        let peer = {
            let mut it = view.iter();
            it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 65001)
        };

        let old = v4("10.1.0.0/24");
        let fresh = v4("10.2.0.0/24");
        {
            let mut it = view.iter();
            it.add_pfx_peer_by_id(old, peer, path_id).unwrap();
            it.cur_pfx_peer_attachment_mut(Stamped::default).unwrap().ts = 100;

            it.add_pfx_peer_by_id(fresh, peer, path_id).unwrap();
            it.cur_pfx_peer_attachment_mut(Stamped::default).unwrap().ts = 900;
        }

        view.gc_if_stale(200, 1000);

        assert!(view.pfx_info_v4(&"10.1.0.0/24".parse().unwrap()).unwrap().peer_slot(peer).unwrap().path_id.is_none());
        assert!(view.pfx_info_v4(&"10.2.0.0/24".parse().unwrap()).unwrap().peer_slot(peer).unwrap().path_id.is_some());
        assert_view_invariants(&view);
    }

    #[test]
    fn clear_resets_counts_and_reclaims_state() {
        let mut view: View<(), (), Stamped> = View::create(None, None);
        {
            let path_id = path(&view, 65001);
            let mut it = view.iter();
            let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 65001);
            it.activate_peer();
            it.add_pfx_peer_by_id(v4("10.1.0.0/24"), peer, path_id).unwrap();
            it.pfx_activate_peer();
        }
        assert_eq!(view.v4pfx_cnt(StateMask::ACTIVE), 1);
        assert_eq!(view.peer_cnt(StateMask::ACTIVE), 1);

        view.clear();

        assert_eq!(view.v4pfx_cnt(StateMask::ALL), 0);
        assert_eq!(view.peer_cnt(StateMask::ALL), 0);
        assert_view_invariants(&view);

        {
            let path_id = path(&view, 65002);
            let mut it = view.iter();
            let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 65002);
            it.activate_peer();
            it.add_pfx_peer_by_id(v4("10.3.0.0/24"), peer, path_id).unwrap();
            it.pfx_activate_peer();
        }
        assert_eq!(view.v4pfx_cnt(StateMask::ACTIVE), 1);
        assert_view_invariants(&view);
    }
}
