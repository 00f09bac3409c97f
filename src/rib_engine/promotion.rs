//! End-of-valid-RIB promotion: reconciles the under-construction shadow
//! state built up during a RIB dump with the live view (spec §4.4.6).

use tracing::debug;

use crate::as_path::PathId;
use crate::error::ViewResult;
use crate::peer_sig::PeerId;
use crate::view::{Family, FieldState, StateMask};

use super::collector::{CollectorStatus, FsmState, PfxPeerInfo, PfxStatus};
use super::RIBEngine;

/// Mirrors `ROUTINGTABLES_DEPRECATED_INFO_INTERVAL`: how long an
/// `Inactive` pfx-peer entry survives after its last update before
/// `View::gc_if_stale` reclaims it.
const DEPRECATED_INFO_INTERVAL_SECS: u32 = 24 * 3600;

impl RIBEngine {
    /// Runs the end-of-valid-RIB algorithm for `collector_name`: for
    /// each peer that had a UC dump in flight, reconciles its UC-tagged
    /// pfx-peer entries against the live ones, counting mismatches,
    /// then promotes the UC window into the collector's reference
    /// window and clears UC markers. Also used to flush a half-built UC
    /// window when a new RIB dump starts before this one ended (§4.4.3
    /// step 1's "abort it").
    pub(crate) fn promote_collector(&mut self, collector_name: &str) -> ViewResult<()> {
        let peer_ids: Vec<PeerId> = self
            .collectors
            .get(collector_name)
            .map(|c| c.peers.keys().copied().collect())
            .unwrap_or_default();

        for peer_id in peer_ids {
            self.promote_peer_pfx_peers(collector_name, peer_id)?;
        }

        self.gc_stale_pfx_peers(collector_name);
        self.recompute_collector_status(collector_name);

        let uc_rib_start = self.collectors.get(collector_name).map(|c| c.uc_rib_start_time).unwrap_or(0);
        if uc_rib_start != 0 {
            self.view.gc_if_stale(DEPRECATED_INFO_INTERVAL_SECS, uc_rib_start);
        }

        if let Some(collector) = self.collectors.get_mut(collector_name) {
            collector.ref_rib_dump_time = collector.uc_rib_dump_time;
            collector.ref_rib_start_time = collector.uc_rib_start_time;
            collector.uc_rib_dump_time = 0;
            collector.uc_rib_start_time = 0;
            collector.end_of_valid_rib_pending = false;
        }
        Ok(())
    }

    /// Reconciles one peer's UC-tagged pfx-peer entries against its
    /// live state (spec §4.4.6 core loop). For each pfx-peer, let
    /// `uc_ts = uc_delta_ts + uc_rib_start`:
    ///
    /// - If `uc_ts > bgp_time_last_ts` and `bgp_time_last_ts <=
    ///   uc_rib_start - BACKLOG`, the UC is newer:
    ///   - `UC_Announced` set: adopt the UC path, activate the peer and
    ///     pfx-peer. If the pfx-peer was previously `Inactive` with a
    ///     non-zero `bgp_time_last_ts`, this is a negative mismatch (the
    ///     live stream thought it was gone, the RIB disagrees).
    ///   - `UC_Announced` absent: the dump disagrees by omission. If
    ///     the pfx-peer was `Active`, that's a positive mismatch;
    ///     deactivate it and clear its path.
    /// - Otherwise the live-derived state is newer or within the
    ///   backlog window and is kept as-is; if it is an announcement,
    ///   the pfx-peer and peer are ensured `Active`.
    /// - Either way, `UC_Announced` and the UC delta are always cleared.
    fn promote_peer_pfx_peers(&mut self, collector_name: &str, peer_id: PeerId) -> ViewResult<()> {
        let (uc_rib_start, backlog) = {
            let peer_state = match self.collectors.get(collector_name).and_then(|c| c.peers.get(&peer_id)) {
                Some(p) if p.uc_rib_start != 0 => p,
                _ => return Ok(()),
            };
            (peer_state.uc_rib_start, self.config.rib_backlog_secs)
        };

        let mut positive = 0u64;
        let mut negative = 0u64;
        let mut peer_needs_activation = false;

        enum Outcome {
            AdoptUc { path_id: Option<PathId>, uc_ts: u32, negative_mismatch: bool },
            Withdraw { positive_mismatch: bool },
            KeepAnnounced,
            KeepOther,
        }

        for family in [Family::V4, Family::V6] {
            let pfxs = self.view.pfx_peers_of(peer_id, family, StateMask::ALL);
            let mut decisions = Vec::with_capacity(pfxs.len());

            for pfx in pfxs {
                let mut it = self.view.iter();
                if !it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                    continue;
                }
                let (uc_announced, is_announced, uc_path, last_ts, uc_delta_ts) = match it.cur_pfx_peer_attachment() {
                    Some(att) => (
                        att.pfx_status.contains(PfxStatus::UC_ANNOUNCED),
                        att.pfx_status.contains(PfxStatus::ANNOUNCED),
                        att.uc_as_path_id,
                        att.bgp_time_last_ts,
                        att.bgp_time_uc_delta_ts,
                    ),
                    None => continue,
                };
                let was_active = it.cur_pfx_peer_state() == FieldState::Active;

                let uc_ts = uc_rib_start.saturating_add(uc_delta_ts);
                let uc_is_newer = uc_ts > last_ts && last_ts <= uc_rib_start.saturating_sub(backlog);

                let outcome = if uc_is_newer {
                    if uc_announced {
                        let was_inactive_with_history = !was_active && last_ts != 0;
                        peer_needs_activation = true;
                        Outcome::AdoptUc { path_id: uc_path, uc_ts, negative_mismatch: was_inactive_with_history }
                    } else {
                        Outcome::Withdraw { positive_mismatch: was_active }
                    }
                } else if is_announced {
                    peer_needs_activation = true;
                    Outcome::KeepAnnounced
                } else {
                    Outcome::KeepOther
                };

                decisions.push((pfx, outcome));
            }

            if peer_needs_activation {
                let mut it = self.view.iter();
                if it.seek_peer(peer_id, StateMask::ALL) {
                    it.activate_peer();
                }
                peer_needs_activation = false;
            }

            for (pfx, outcome) in decisions {
                let mut it = self.view.iter();
                if !it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                    continue;
                }

                match outcome {
                    Outcome::AdoptUc { path_id, uc_ts, negative_mismatch } => {
                        if negative_mismatch {
                            negative += 1;
                        }
                        if let Some(path_id) = path_id {
                            it.pfx_add_peer_by_id(peer_id, path_id)?;
                        }
                        if let Some(att) = it.cur_pfx_peer_attachment_mut(PfxPeerInfo::default) {
                            att.pfx_status.insert(PfxStatus::ANNOUNCED);
                            att.bgp_time_last_ts = uc_ts;
                        }
                        if it.cur_pfx_peer_state() == FieldState::Inactive {
                            it.pfx_activate_peer();
                        }
                    }
                    Outcome::Withdraw { positive_mismatch } => {
                        if positive_mismatch {
                            positive += 1;
                        }
                        let was_active = it.cur_pfx_peer_state() == FieldState::Active;
                        if let Some(att) = it.cur_pfx_peer_attachment_mut(PfxPeerInfo::default) {
                            att.pfx_status.remove(PfxStatus::ANNOUNCED);
                            att.bgp_time_last_ts = 0;
                        }
                        it.clear_cur_pfx_peer_path();
                        if was_active {
                            it.pfx_deactivate_peer();
                        }
                    }
                    Outcome::KeepAnnounced => {
                        if it.cur_pfx_peer_state() == FieldState::Inactive {
                            it.pfx_activate_peer();
                        }
                    }
                    Outcome::KeepOther => {}
                }

                if let Some(att) = it.cur_pfx_peer_attachment_mut(PfxPeerInfo::default) {
                    att.pfx_status.remove(PfxStatus::UC_ANNOUNCED);
                    att.bgp_time_uc_delta_ts = 0;
                    att.uc_as_path_id = None;
                }
            }
        }

        if let Some(peer_state) = self.collectors.get_mut(collector_name).and_then(|c| c.peers.get_mut(&peer_id)) {
            peer_state.rib_positive_mismatches += positive;
            peer_state.rib_negative_mismatches += negative;
            peer_state.ref_rib_start = peer_state.uc_rib_start;
            peer_state.ref_rib_end = peer_state.uc_rib_end;
            peer_state.uc_rib_start = 0;
            peer_state.uc_rib_end = 0;
        }
        Ok(())
    }

    /// Peers with no activity since `uc_rib_start - MAX_INACTIVE` are
    /// dropped from the live view entirely at promotion time (spec
    /// §4.4.6): their pfx-peers are cleared and the peer itself goes
    /// `Invalid`.
    fn gc_stale_pfx_peers(&mut self, collector_name: &str) {
        let (uc_rib_start, max_inactive) = match self.collectors.get(collector_name) {
            Some(c) if c.uc_rib_start_time != 0 => (c.uc_rib_start_time, self.config.max_inactive_secs),
            _ => return,
        };

        let stale: Vec<PeerId> = self
            .collectors
            .get(collector_name)
            .map(|c| {
                c.peers
                    .iter()
                    .filter(|(_, p)| p.last_ts != 0 && p.last_ts.saturating_add(max_inactive) < uc_rib_start)
                    .map(|(&id, _)| id)
                    .collect()
            })
            .unwrap_or_default();

        for peer_id in stale {
            debug!(collector = collector_name, peer_id, "peer idle past max-inactive, dropping");
            self.reset_pfx_peer(peer_id, true);
            {
                let mut it = self.view.iter();
                it.seek_peer(peer_id, StateMask::ALL);
                it.deactivate_peer();
                it.remove_peer();
            }
            if let Some(collector) = self.collectors.get_mut(collector_name) {
                collector.peers.remove(&peer_id);
            }
        }
    }

    /// Recomputes `Up`/`Down` from whether any peer of this collector
    /// is currently `Established` (spec §4.4.1).
    pub(crate) fn recompute_collector_status(&mut self, collector_name: &str) {
        let any_established = self
            .collectors
            .get(collector_name)
            .map(|c| c.peers.values().any(|p| p.fsm_state == FsmState::Established))
            .unwrap_or(false);
        if let Some(collector) = self.collectors.get_mut(collector_name) {
            collector.status = if any_established { CollectorStatus::Up } else { CollectorStatus::Down };
        }
    }
}
