//! The per-collector routing-table reconstruction engine (spec §4.4):
//! ingests a stream of [`Record`]s and drives a [`View`], reconciling
//! overlapping RIB dumps with live updates.

mod collector;
mod promotion;
mod record;

pub use collector::{CollectorState, CollectorStatus, FsmState, PeerEngineState, PfxPeerInfo, PfxStatus};
pub use record::{DumpPosition, Elem, Record, RecordStatus, RecordType};

use std::collections::HashMap;
use std::net::IpAddr;

use tracing::{debug, warn};

use crate::as_path::{AsPath, Segment};
use crate::config::RIBEngineConfig;
use crate::error::{ViewError, ViewResult};
use crate::peer_sig::PeerId;
use crate::view::{Family, FieldState, Prefix, StateMask, View};

/// The view flavor the engine drives: no peer-level attachment, and a
/// [`PfxPeerInfo`] attachment per pfx-peer carrying the engine's own
/// UC/announce bookkeeping (spec §4.4.1).
pub type EngineView = View<(), (), PfxPeerInfo>;

/// Drives one [`EngineView`] from a stream of [`Record`]s, one
/// collector's worth of per-peer/per-collector bookkeeping at a time.
pub struct RIBEngine {
    view: EngineView,
    collectors: HashMap<String, CollectorState>,
    config: RIBEngineConfig,
    last_error: Option<ViewError>,
}

impl RIBEngine {
    pub fn new(config: RIBEngineConfig) -> Self {
        RIBEngine {
            view: View::create(None, None),
            collectors: HashMap::new(),
            config,
            last_error: None,
        }
    }

    pub fn view(&self) -> &EngineView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut EngineView {
        &mut self.view
    }

    pub fn config(&self) -> &RIBEngineConfig {
        &self.config
    }

    /// The typed error from the most recent record that returned
    /// nonzero from [`Self::process_record`] (spec §7: "a single
    /// integer result per record").
    pub fn last_error(&self) -> Option<&ViewError> {
        self.last_error.as_ref()
    }

    pub(crate) fn collectors(&self) -> &HashMap<String, CollectorState> {
        &self.collectors
    }

    /// Processes one record. Returns `0` on success, `<0` on error — a
    /// record error never tears down the engine (spec §7).
    pub fn process_record(&mut self, record: &Record) -> i32 {
        match self.process_record_inner(record) {
            Ok(()) => 0,
            Err(err) => {
                warn!(collector = %record.collector, error = %err, "record processing failed");
                self.last_error = Some(err);
                -1
            }
        }
    }

    fn process_record_inner(&mut self, record: &Record) -> ViewResult<()> {
        if self.touch_collector_clock(record) {
            debug!(collector = %record.collector, time = record.time_sec, "discarding record before reference rib");
            return Ok(());
        }

        match record.status {
            RecordStatus::ValidRecord => {
                self.collectors.get_mut(&record.collector).unwrap().valid_cnt += 1;
                match record.record_type {
                    RecordType::Rib => self.process_rib_record(record)?,
                    RecordType::Update => self.process_update_record(record)?,
                }
            }
            RecordStatus::CorruptedRecord | RecordStatus::CorruptedSource => {
                self.collectors.get_mut(&record.collector).unwrap().corrupted_cnt += 1;
                self.handle_corruption(record);
            }
            RecordStatus::EmptySource => {
                self.collectors.get_mut(&record.collector).unwrap().empty_cnt += 1;
            }
            RecordStatus::FilteredSource | RecordStatus::OutsideTimeInterval => {}
        }
        Ok(())
    }

    /// Updates `bgp_time_last`/`wall_time_last` and evaluates the
    /// discard guard. Returns whether the record should be dropped
    /// without further processing (spec §4.4.2).
    fn touch_collector_clock(&mut self, record: &Record) -> bool {
        let wall_freq = self.config.wall_update_freq_secs;
        let collector = self.collectors.entry(record.collector.clone()).or_default();

        let before_ref = record.time_sec < collector.ref_rib_start_time;
        let within_uc_window = collector.uc_in_flight() && record.time_sec >= collector.uc_rib_start_time;
        let discard = before_ref && !within_uc_window;

        collector.bgp_time_last = collector.bgp_time_last.max(record.time_sec);
        if record.time_sec.saturating_sub(collector.last_wall_refresh_bgp_time) >= wall_freq {
            collector.wall_time_last = now_unix_secs();
            collector.last_wall_refresh_bgp_time = record.time_sec;
        }
        discard
    }

    /// Interns and ensures the peer exists in the view, creating it
    /// `Inactive` if new (spec §4.3 `add_peer`).
    fn ensure_peer(&mut self, collector_name: &str, peer_ip: IpAddr, peer_asn: u32) -> PeerId {
        let mut it = self.view.iter();
        it.add_peer(collector_name, peer_ip, peer_asn)
    }

    // ---- RIB messages (§4.4.3) -------------------------------------------

    fn process_rib_record(&mut self, record: &Record) -> ViewResult<()> {
        if record.dump_position == DumpPosition::Start {
            let uc_in_flight = self.collectors.get(&record.collector).map(|c| c.uc_in_flight()).unwrap_or(false);
            if uc_in_flight {
                self.promote_collector(&record.collector)?;
            }
            let collector = self.collectors.get_mut(&record.collector).unwrap();
            collector.uc_rib_dump_time = record.dump_time_sec;
            collector.uc_rib_start_time = record.time_sec;
        }

        let accept = self
            .collectors
            .get(&record.collector)
            .map(|c| c.uc_rib_dump_time == record.dump_time_sec)
            .unwrap_or(false);
        if accept {
            for elem in &record.elems {
                if let Elem::Rib {
                    pfx,
                    peer_ip,
                    peer_asn,
                    path,
                } = elem
                {
                    self.apply_rib_elem(&record.collector, *pfx, *peer_ip, *peer_asn, path, record.time_sec)?;
                }
            }
        }

        if record.dump_position == DumpPosition::End {
            self.collectors.get_mut(&record.collector).unwrap().end_of_valid_rib_pending = true;
        }
        Ok(())
    }

    fn apply_rib_elem(
        &mut self,
        collector_name: &str,
        pfx: Prefix,
        peer_ip: IpAddr,
        peer_asn: u32,
        path: &AsPath,
        time_sec: u32,
    ) -> ViewResult<()> {
        if path.is_empty() || !path_starts_with_asn(path, peer_asn) {
            return Ok(());
        }

        let peer_id = self.ensure_peer(collector_name, peer_ip, peer_asn);

        let uc_rib_start = {
            let collector = self.collectors.get_mut(collector_name).unwrap();
            let uc_start = collector.uc_rib_start_time;
            let peer_state = collector.peers.entry(peer_id).or_default();
            peer_state.last_ts = time_sec;
            peer_state.rib_messages += 1;
            peer_state.uc_rib_start = uc_start;
            uc_start
        };

        let path_id = self.view.pathstore().borrow_mut().intern(path, peer_asn);

        let mut it = self.view.iter();
        it.ensure_pfx_peer_slot(pfx, peer_id)?;
        let att = it
            .cur_pfx_peer_attachment_mut(PfxPeerInfo::default)
            .expect("cursor positioned by ensure_pfx_peer_slot");
        att.pfx_status.insert(PfxStatus::UC_ANNOUNCED);
        att.bgp_time_uc_delta_ts = time_sec.saturating_sub(uc_rib_start);
        att.uc_as_path_id = Some(path_id);
        Ok(())
    }

    // ---- updates and peer-state (§4.4.4) ----------------------------------

    fn process_update_record(&mut self, record: &Record) -> ViewResult<()> {
        for elem in &record.elems {
            match elem {
                Elem::Announcement {
                    pfx,
                    peer_ip,
                    peer_asn,
                    path,
                } => {
                    self.apply_announcement(&record.collector, *pfx, *peer_ip, *peer_asn, path, record.time_sec)?;
                }
                Elem::Withdrawal { pfx, peer_ip, peer_asn } => {
                    self.apply_withdrawal(&record.collector, *pfx, *peer_ip, *peer_asn, record.time_sec)?;
                }
                Elem::PeerState {
                    peer_ip,
                    peer_asn,
                    new_state,
                } => {
                    self.apply_peer_state(&record.collector, *peer_ip, *peer_asn, *new_state, record.time_sec)?;
                }
                Elem::Rib { .. } => {}
            }
        }
        Ok(())
    }

    fn apply_announcement(
        &mut self,
        collector_name: &str,
        pfx: Prefix,
        peer_ip: IpAddr,
        peer_asn: u32,
        path: &AsPath,
        time_sec: u32,
    ) -> ViewResult<()> {
        if path.is_empty() || !path_starts_with_asn(path, peer_asn) {
            return Ok(());
        }

        let peer_id = self.ensure_peer(collector_name, peer_ip, peer_asn);
        {
            let collector = self.collectors.get_mut(collector_name).unwrap();
            let peer_state = collector.peers.entry(peer_id).or_default();
            peer_state.last_ts = time_sec;
            peer_state.announcements += 1;
        }

        let existing_ts = {
            let mut it = self.view.iter();
            if it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                it.cur_pfx_peer_attachment().map(|a| a.bgp_time_last_ts)
            } else {
                None
            }
        };
        if let Some(ts) = existing_ts {
            if ts > time_sec {
                return Ok(());
            }
        }

        let path_id = self.view.pathstore().borrow_mut().intern(path, peer_asn);
        {
            let mut it = self.view.iter();
            it.add_pfx_peer_by_id(pfx, peer_id, path_id)?;
            let att = it
                .cur_pfx_peer_attachment_mut(PfxPeerInfo::default)
                .expect("cursor positioned by add_pfx_peer_by_id");
            att.bgp_time_last_ts = time_sec;
            att.pfx_status.insert(PfxStatus::ANNOUNCED);
        }

        self.activate_peer_on_update(collector_name, peer_id, time_sec);

        let owner_active = self.view.peer_info(peer_id).map(|p| p.state == FieldState::Active).unwrap_or(false);
        if owner_active {
            let mut it = self.view.iter();
            if it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                it.pfx_activate_peer();
            }
        }
        Ok(())
    }

    fn apply_withdrawal(
        &mut self,
        collector_name: &str,
        pfx: Prefix,
        peer_ip: IpAddr,
        peer_asn: u32,
        time_sec: u32,
    ) -> ViewResult<()> {
        let peer_id = self.ensure_peer(collector_name, peer_ip, peer_asn);
        {
            let collector = self.collectors.get_mut(collector_name).unwrap();
            let peer_state = collector.peers.entry(peer_id).or_default();
            peer_state.last_ts = time_sec;
            peer_state.withdrawals += 1;
        }

        let existing_ts = {
            let mut it = self.view.iter();
            if it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                it.cur_pfx_peer_attachment().map(|a| a.bgp_time_last_ts)
            } else {
                None
            }
        };
        let ts = match existing_ts {
            Some(ts) => ts,
            None => return Ok(()), // nothing to withdraw
        };
        if ts > time_sec {
            return Ok(());
        }

        let owner_active = self.view.peer_info(peer_id).map(|p| p.state == FieldState::Active).unwrap_or(false);
        let mut it = self.view.iter();
        it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL);
        if let Some(att) = it.cur_pfx_peer_attachment_mut(PfxPeerInfo::default) {
            att.bgp_time_last_ts = time_sec;
            att.pfx_status.remove(PfxStatus::ANNOUNCED);
        }
        it.clear_cur_pfx_peer_path();
        if owner_active {
            it.pfx_deactivate_peer();
        }
        Ok(())
    }

    /// Activates the peer when it's `Inactive` but the engine has
    /// session evidence (`fsm_state != Unknown`): "receiving any update
    /// implies the session is Established" (spec §4.4.4 step 4).
    fn activate_peer_on_update(&mut self, collector_name: &str, peer_id: PeerId, time_sec: u32) {
        let fsm_unknown = self
            .collectors
            .get(collector_name)
            .and_then(|c| c.peers.get(&peer_id))
            .map(|p| p.fsm_state == FsmState::Unknown)
            .unwrap_or(true);
        if fsm_unknown {
            return;
        }
        let currently_inactive = self.view.peer_info(peer_id).map(|p| p.state == FieldState::Inactive).unwrap_or(false);
        if !currently_inactive {
            return;
        }
        {
            let mut it = self.view.iter();
            it.seek_peer(peer_id, StateMask::ALL);
            it.activate_peer();
        }
        if let Some(peer_state) = self.collectors.get_mut(collector_name).and_then(|c| c.peers.get_mut(&peer_id)) {
            peer_state.ref_rib_start = time_sec;
            peer_state.ref_rib_end = time_sec;
        }
    }

    fn apply_peer_state(
        &mut self,
        collector_name: &str,
        peer_ip: IpAddr,
        peer_asn: u32,
        new_state: FsmState,
        time_sec: u32,
    ) -> ViewResult<()> {
        let peer_id = self.ensure_peer(collector_name, peer_ip, peer_asn);
        {
            let collector = self.collectors.get_mut(collector_name).unwrap();
            let peer_state = collector.peers.entry(peer_id).or_default();
            peer_state.state_messages += 1;
            peer_state.last_ts = time_sec;
        }

        let old_state = self
            .collectors
            .get(collector_name)
            .and_then(|c| c.peers.get(&peer_id))
            .map(|p| p.fsm_state)
            .unwrap_or(FsmState::Unknown);
        if old_state == new_state {
            return Ok(());
        }

        if old_state == FsmState::Established && new_state != FsmState::Established {
            let (uc_in_progress, uc_rib_start) = self
                .collectors
                .get(collector_name)
                .and_then(|c| c.peers.get(&peer_id))
                .map(|p| (p.uc_rib_start != 0, p.uc_rib_start))
                .unwrap_or((false, 0));
            if uc_in_progress && time_sec >= uc_rib_start {
                let pending = self.collectors.get(collector_name).map(|c| c.end_of_valid_rib_pending).unwrap_or(false);
                if pending {
                    self.promote_collector(collector_name)?;
                }
            }
            if let Some(peer_state) = self.collectors.get_mut(collector_name).and_then(|c| c.peers.get_mut(&peer_id)) {
                peer_state.uc_rib_start = 0;
                peer_state.uc_rib_end = 0;
                peer_state.fsm_state = new_state;
            }
            self.reset_pfx_peer(peer_id, true);
            let mut it = self.view.iter();
            it.seek_peer(peer_id, StateMask::ALL);
            it.deactivate_peer();
        } else if new_state == FsmState::Established {
            if let Some(peer_state) = self.collectors.get_mut(collector_name).and_then(|c| c.peers.get_mut(&peer_id)) {
                peer_state.fsm_state = new_state;
                peer_state.ref_rib_start = time_sec;
                peer_state.ref_rib_end = time_sec;
            }
            let mut it = self.view.iter();
            it.seek_peer(peer_id, StateMask::ALL);
            it.activate_peer();
        } else {
            if let Some(peer_state) = self.collectors.get_mut(collector_name).and_then(|c| c.peers.get_mut(&peer_id)) {
                peer_state.fsm_state = new_state;
                peer_state.ref_rib_start = time_sec;
                peer_state.ref_rib_end = time_sec;
            }
        }
        Ok(())
    }

    /// Resets every pfx-peer of `peer_id`, across both families (spec
    /// §4.4.7). `reset_uc` additionally clears the UC slots.
    fn reset_pfx_peer(&mut self, peer_id: PeerId, reset_uc: bool) {
        for family in [Family::V4, Family::V6] {
            let prefixes = self.view.pfx_peers_of(peer_id, family, StateMask::ALL);
            for pfx in prefixes {
                let mut it = self.view.iter();
                if !it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                    continue;
                }
                let was_active = it.cur_pfx_peer_state() == FieldState::Active;
                if let Some(att) = it.cur_pfx_peer_attachment_mut(PfxPeerInfo::default) {
                    if reset_uc {
                        att.pfx_status.remove(PfxStatus::UC_ANNOUNCED);
                        att.bgp_time_uc_delta_ts = 0;
                        att.uc_as_path_id = None;
                    }
                    att.pfx_status.remove(PfxStatus::ANNOUNCED);
                    att.bgp_time_last_ts = 0;
                }
                it.clear_cur_pfx_peer_path();
                if was_active {
                    it.pfx_deactivate_peer();
                }
            }
        }
    }

    // ---- corruption handling (§4.4.5) -------------------------------------

    fn handle_corruption(&mut self, record: &Record) {
        let t = record.time_sec;
        let collector_name = record.collector.as_str();

        let active_affected: Vec<PeerId> = self
            .collectors
            .get(collector_name)
            .map(|c| c.peers.iter().filter(|(_, p)| p.ref_rib_start <= t).map(|(&id, _)| id).collect())
            .unwrap_or_default();
        let uc_affected: Vec<PeerId> = self
            .collectors
            .get(collector_name)
            .map(|c| {
                c.peers
                    .iter()
                    .filter(|(_, p)| p.uc_rib_start != 0 && p.uc_rib_start <= t)
                    .map(|(&id, _)| id)
                    .collect()
            })
            .unwrap_or_default();

        if record.record_type == RecordType::Update {
            for &peer_id in &active_affected {
                for family in [Family::V4, Family::V6] {
                    for pfx in self.view.pfx_peers_of(peer_id, family, StateMask::ALL) {
                        let mut it = self.view.iter();
                        if !it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                            continue;
                        }
                        let should_clear = it.cur_pfx_peer_attachment().map(|a| a.bgp_time_last_ts <= t).unwrap_or(false);
                        if !should_clear {
                            continue;
                        }
                        let was_active = it.cur_pfx_peer_state() == FieldState::Active;
                        if let Some(att) = it.cur_pfx_peer_attachment_mut(PfxPeerInfo::default) {
                            att.pfx_status.remove(PfxStatus::ANNOUNCED);
                        }
                        it.clear_cur_pfx_peer_path();
                        if was_active {
                            it.pfx_deactivate_peer();
                        }
                    }
                }
            }
        }

        for &peer_id in &uc_affected {
            for family in [Family::V4, Family::V6] {
                for pfx in self.view.pfx_peers_of(peer_id, family, StateMask::ALL) {
                    let mut it = self.view.iter();
                    if !it.seek_pfx_peer(pfx, peer_id, StateMask::ALL, StateMask::ALL) {
                        continue;
                    }
                    if let Some(att) = it.cur_pfx_peer_attachment_mut(PfxPeerInfo::default) {
                        att.pfx_status.remove(PfxStatus::UC_ANNOUNCED);
                        att.bgp_time_uc_delta_ts = 0;
                    }
                }
            }
        }

        if record.record_type == RecordType::Update {
            for &peer_id in &active_affected {
                if let Some(peer_state) = self.collectors.get_mut(collector_name).and_then(|c| c.peers.get_mut(&peer_id)) {
                    peer_state.fsm_state = FsmState::Unknown;
                }
                let mut it = self.view.iter();
                it.seek_peer(peer_id, StateMask::ALL);
                it.deactivate_peer();
            }
        }
        for &peer_id in &uc_affected {
            if let Some(peer_state) = self.collectors.get_mut(collector_name).and_then(|c| c.peers.get_mut(&peer_id)) {
                peer_state.uc_rib_start = 0;
                peer_state.uc_rib_end = 0;
            }
        }

        if let Some(collector) = self.collectors.get_mut(collector_name) {
            collector.end_of_valid_rib_pending = false;
        }
    }

    /// Flushes any collector with a pending end-of-RIB promotion, then
    /// returns the epoch's metric points (spec §4.4.6 trigger (a), §6.4).
    pub fn interval_end(&mut self, now: u32) -> Vec<crate::metrics::MetricPoint> {
        let pending: Vec<String> = self
            .collectors
            .iter()
            .filter(|(_, c)| c.end_of_valid_rib_pending)
            .map(|(name, _)| name.clone())
            .collect();
        for name in pending {
            if let Err(err) = self.promote_collector(&name) {
                warn!(collector = %name, error = %err, "end-of-rib promotion failed");
                self.last_error = Some(err);
            }
        }
        crate::metrics::collect(self, now)
    }
}

fn path_starts_with_asn(path: &AsPath, peer_asn: u32) -> bool {
    match path.first() {
        Some(Segment::Sequence(v)) | Some(Segment::Set(v)) | Some(Segment::ConfedSequence(v)) | Some(Segment::ConfedSet(v)) => {
            v.first() == Some(&peer_asn)
        }
        None => false,
    }
}

fn now_unix_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::as_path::Segment;
    use std::net::Ipv4Addr;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    fn pfx(s: &str) -> Prefix {
        Prefix::V4(s.parse().unwrap())
    }

    fn rib_elem(pfx: Prefix, peer_ip: IpAddr, peer_asn: u32, path: Vec<u32>) -> Elem {
        Elem::Rib {
            pfx,
            peer_ip,
            peer_asn,
            path: vec![Segment::Sequence(path)],
        }
    }

    fn announce(pfx: Prefix, peer_ip: IpAddr, peer_asn: u32, path: Vec<u32>) -> Elem {
        Elem::Announcement {
            pfx,
            peer_ip,
            peer_asn,
            path: vec![Segment::Sequence(path)],
        }
    }

    fn base_record(collector: &str, time_sec: u32, record_type: RecordType) -> Record {
        Record {
            project: "test".to_string(),
            collector: collector.to_string(),
            time_sec,
            dump_time_sec: 0,
            dump_position: DumpPosition::Middle,
            record_type,
            status: RecordStatus::ValidRecord,
            elems: Vec::new(),
        }
    }

    #[test]
    fn s1_single_peer_single_announce() {
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let peer_ip = ip(10, 0, 0, 1);
        let p = pfx("10.1.0.0/24");

        let mut rec = base_record("rrc00", 10, RecordType::Update);
        rec.elems.push(Elem::PeerState {
            peer_ip,
            peer_asn: 65001,
            new_state: FsmState::Established,
        });
        assert_eq!(engine.process_record(&rec), 0);

        let mut rec2 = base_record("rrc00", 11, RecordType::Update);
        rec2.elems.push(announce(p, peer_ip, 65001, vec![65001, 65002, 65003]));
        assert_eq!(engine.process_record(&rec2), 0);

        assert_eq!(engine.view().v4pfx_cnt(StateMask::ACTIVE), 1);
        assert_eq!(engine.view().peer_cnt(StateMask::ACTIVE), 1);
    }

    #[test]
    fn s2_withdrawal_deactivates_prefix() {
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let peer_ip = ip(10, 0, 0, 1);
        let p = pfx("10.1.0.0/24");

        let mut rec = base_record("rrc00", 10, RecordType::Update);
        rec.elems.push(Elem::PeerState {
            peer_ip,
            peer_asn: 65001,
            new_state: FsmState::Established,
        });
        engine.process_record(&rec);

        let mut rec2 = base_record("rrc00", 11, RecordType::Update);
        rec2.elems.push(announce(p, peer_ip, 65001, vec![65001, 65002, 65003]));
        engine.process_record(&rec2);

        let mut rec3 = base_record("rrc00", 12, RecordType::Update);
        rec3.elems.push(Elem::Withdrawal {
            pfx: p,
            peer_ip,
            peer_asn: 65001,
        });
        engine.process_record(&rec3);

        assert_eq!(engine.view().v4pfx_cnt(StateMask::ACTIVE), 0);
        assert_eq!(engine.view().v4pfx_cnt(StateMask::INACTIVE), 1);
        assert_eq!(engine.view().peer_cnt(StateMask::ACTIVE), 1);
    }

    #[test]
    fn s3_old_update_is_ignored() {
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let peer_ip = ip(10, 0, 0, 1);
        let p = pfx("10.1.0.0/24");

        let mut rec = base_record("rrc00", 10, RecordType::Update);
        rec.elems.push(Elem::PeerState {
            peer_ip,
            peer_asn: 65001,
            new_state: FsmState::Established,
        });
        engine.process_record(&rec);

        let mut rec2 = base_record("rrc00", 1000, RecordType::Update);
        rec2.elems.push(announce(p, peer_ip, 65001, vec![65001, 65002]));
        engine.process_record(&rec2);

        let mut rec3 = base_record("rrc00", 999, RecordType::Update);
        rec3.elems.push(Elem::Withdrawal {
            pfx: p,
            peer_ip,
            peer_asn: 65001,
        });
        engine.process_record(&rec3);

        assert_eq!(engine.view().v4pfx_cnt(StateMask::ACTIVE), 1, "withdrawal older than bgp_time_last_ts must be ignored");
    }

    #[test]
    fn s4_rib_promotion_picks_newer_uc_path() {
        // Literal scenario S4 (spec §8): Announcement of P/Q with path A
        // at t=100; UC-RIB starts at t=200; RIB entry for P/Q with path B
        // at t=201; dump-End at t=300. Expect promoted path == B and
        // rib_negative_mismatches == 0 (the pfx-peer was already Active
        // from the t=100 announcement, not previously Inactive).
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let peer_ip = ip(10, 0, 0, 1);
        let p = pfx("10.1.0.0/24");
        let Prefix::V4(net) = p else { unreachable!() };

        let mut rec = base_record("rrc00", 90, RecordType::Update);
        rec.elems.push(Elem::PeerState {
            peer_ip,
            peer_asn: 65001,
            new_state: FsmState::Established,
        });
        engine.process_record(&rec);

        let path_a = vec![65001, 65002, 65003];
        let mut rec_announce = base_record("rrc00", 100, RecordType::Update);
        rec_announce.elems.push(announce(p, peer_ip, 65001, path_a));
        engine.process_record(&rec_announce);
        assert_eq!(engine.view().v4pfx_cnt(StateMask::ACTIVE), 1, "announcement at t=100 must be live immediately");

        let rec_start = Record {
            dump_position: DumpPosition::Start,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 200, RecordType::Rib)
        };
        engine.process_record(&rec_start);

        let path_b = vec![65001, 65002, 65004];
        let mut rec_rib = Record {
            dump_position: DumpPosition::Middle,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 201, RecordType::Rib)
        };
        rec_rib.elems.push(rib_elem(p, peer_ip, 65001, path_b.clone()));
        engine.process_record(&rec_rib);

        let rec_end = Record {
            dump_position: DumpPosition::End,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 300, RecordType::Rib)
        };
        engine.process_record(&rec_end);
        engine.interval_end(1000);

        assert_eq!(engine.view().v4pfx_cnt(StateMask::ACTIVE), 1, "pfx-peer must remain live after promotion");
        let promoted_path_id = engine.view().pfx_info_v4(&net).unwrap().peer_slot(1).unwrap().path_id;
        let expected_path_id = engine.view().pathstore().borrow_mut().intern(&vec![Segment::Sequence(path_b)], 65001);
        assert_eq!(promoted_path_id, Some(expected_path_id), "the RIB dump's newer path must replace the update's path");
        let peer_state = &engine.collectors().get("rrc00").unwrap().peers[&1];
        assert_eq!(
            peer_state.rib_negative_mismatches, 0,
            "pfx-peer was already Active before the dump, so this is not a negative mismatch"
        );
    }

    #[test]
    fn s5_rib_loses_to_backlogged_update() {
        // Literal scenario S5 (spec §8): Announcement of P/Q with path A
        // at t=100; UC-RIB starts at t=120; RIB entry with path B at
        // t=121; dump-End at t=200. bgp_time_last_ts=100 is not <=
        // 120-60=60, so the update wins and path stays A.
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let peer_ip = ip(10, 0, 0, 1);
        let p = pfx("10.1.0.0/24");
        let Prefix::V4(net) = p else { unreachable!() };

        let mut rec = base_record("rrc00", 90, RecordType::Update);
        rec.elems.push(Elem::PeerState {
            peer_ip,
            peer_asn: 65001,
            new_state: FsmState::Established,
        });
        engine.process_record(&rec);

        let path_a = vec![65001, 65002];
        let mut rec_announce = base_record("rrc00", 100, RecordType::Update);
        rec_announce.elems.push(announce(p, peer_ip, 65001, path_a.clone()));
        engine.process_record(&rec_announce);

        let rec_start = Record {
            dump_position: DumpPosition::Start,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 120, RecordType::Rib)
        };
        engine.process_record(&rec_start);

        let mut rec_rib = Record {
            dump_position: DumpPosition::Middle,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 121, RecordType::Rib)
        };
        rec_rib.elems.push(rib_elem(p, peer_ip, 65001, vec![65001, 65002, 65005]));
        engine.process_record(&rec_rib);

        let rec_end = Record {
            dump_position: DumpPosition::End,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 200, RecordType::Rib)
        };
        engine.process_record(&rec_end);
        engine.interval_end(1000);

        assert_eq!(engine.view().v4pfx_cnt(StateMask::ACTIVE), 1, "pfx-peer must remain live");
        let path_id = engine.view().pfx_info_v4(&net).unwrap().peer_slot(1).unwrap().path_id;
        let expected_path_id = engine.view().pathstore().borrow_mut().intern(&vec![Segment::Sequence(path_a)], 65001);
        assert_eq!(path_id, Some(expected_path_id), "the update's path must survive since it is within the backlog window");
    }

    #[test]
    fn s6_peer_down_clears_prefixes() {
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let peer_ip = ip(10, 0, 0, 1);
        let p = pfx("10.1.0.0/24");

        let mut rec = base_record("rrc00", 10, RecordType::Update);
        rec.elems.push(Elem::PeerState {
            peer_ip,
            peer_asn: 65001,
            new_state: FsmState::Established,
        });
        engine.process_record(&rec);

        let mut rec2 = base_record("rrc00", 11, RecordType::Update);
        rec2.elems.push(announce(p, peer_ip, 65001, vec![65001, 65002]));
        engine.process_record(&rec2);
        assert_eq!(engine.view().peer_cnt(StateMask::ACTIVE), 1);

        let mut rec3 = base_record("rrc00", 12, RecordType::Update);
        rec3.elems.push(Elem::PeerState {
            peer_ip,
            peer_asn: 65001,
            new_state: FsmState::Idle,
        });
        engine.process_record(&rec3);

        assert_eq!(engine.view().peer_cnt(StateMask::ACTIVE), 0);
        assert_eq!(engine.view().v4pfx_cnt(StateMask::ACTIVE), 0);
    }

    #[test]
    fn corrupted_rib_record_is_counted_without_panicking() {
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let mut rec = base_record("rrc00", 10, RecordType::Rib);
        rec.status = RecordStatus::CorruptedRecord;
        assert_eq!(engine.process_record(&rec), 0);
        assert_eq!(engine.collectors().get("rrc00").unwrap().corrupted_cnt, 1);
    }

    #[test]
    fn discards_record_before_reference_rib_start() {
        let mut engine = RIBEngine::new(RIBEngineConfig::default());
        let rec_start = Record {
            dump_position: DumpPosition::Start,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 1000, RecordType::Rib)
        };
        engine.process_record(&rec_start);
        let rec_end = Record {
            dump_position: DumpPosition::End,
            record_type: RecordType::Rib,
            ..base_record("rrc00", 1000, RecordType::Rib)
        };
        engine.process_record(&rec_end);
        engine.interval_end(2000);

        assert!(engine.collectors().get("rrc00").unwrap().ref_rib_start_time > 0);

        let rec_old = base_record("rrc00", 10, RecordType::Update);
        assert_eq!(engine.process_record(&rec_old), 0);
        assert_eq!(engine.collectors().get("rrc00").unwrap().valid_cnt, 0, "discarded record must not be counted as valid");
    }

    fn _unused(p: Prefix, ip: IpAddr) -> Elem {
        rib_elem(p, ip, 0, vec![])
    }
}
