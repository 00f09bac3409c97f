//! Per-epoch metric emission (spec §6.4): flat named points keyed
//! `<metric_prefix>.<plugin>.<collector>.<metric>` for collector-level
//! figures and `<metric_prefix>.<plugin>.<collector>.<peer>.<metric>`
//! for per-peer ones. The sink itself (statsd, a file, a channel) is
//! the caller's concern — `collect` only produces the points, the way
//! the teacher's stats binaries produce plain serializable records for
//! whichever writer they're wired to.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::rib_engine::{CollectorStatus, FsmState, RIBEngine};
use crate::view::StateMask;

const PLUGIN: &str = "rib_engine";

/// One named, timestamped sample. Cheap enough to build thousands of
/// per epoch; the sink decides what to do with the flat list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub key: String,
    pub value: f64,
    pub time: u32,
}

impl MetricPoint {
    fn new(key: String, value: f64, time: u32) -> Self {
        MetricPoint { key, value, time }
    }
}

/// Replaces `.` with `-` and `*` with `_` so a collector or peer
/// identifier can be embedded as a dotted-key segment (spec §6.4).
fn sanitize_key_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '.' => '-',
            '*' => '_',
            other => other,
        })
        .collect()
}

fn fsm_status_value(status: CollectorStatus) -> f64 {
    match status {
        CollectorStatus::Unknown => 0.0,
        CollectorStatus::Down => 1.0,
        CollectorStatus::Up => 2.0,
    }
}

fn peer_status_value(state: FsmState) -> f64 {
    match state {
        FsmState::Unknown => 0.0,
        FsmState::Idle => 1.0,
        FsmState::Connect => 2.0,
        FsmState::Active => 3.0,
        FsmState::OpenSent => 4.0,
        FsmState::OpenConfirm => 5.0,
        FsmState::Established => 6.0,
    }
}

/// Builds this epoch's metric points for every collector currently
/// known to `engine` (spec §6.4's full key/field list).
pub fn collect(engine: &RIBEngine, now: u32) -> Vec<MetricPoint> {
    let mut points = Vec::new();
    let prefix = &engine.config().metric_prefix;

    for (collector_name, collector) in engine.collectors() {
        let collector_key = sanitize_key_segment(collector_name);
        let base = format!("{prefix}.{PLUGIN}.{collector_key}");

        let active_peer_asn_set: HashSet<u32> = collector
            .peers
            .keys()
            .filter_map(|&peer_id| {
                let active = engine.view().peer_info(peer_id).map(|p| p.state == crate::view::FieldState::Active).unwrap_or(false);
                if !active {
                    return None;
                }
                engine.view().sigmap().borrow().lookup_sig(peer_id).map(|s| s.peer_asn)
            })
            .collect();

        let active_peers_cnt = collector
            .peers
            .keys()
            .filter(|&&peer_id| engine.view().peer_info(peer_id).map(|p| p.state == crate::view::FieldState::Active).unwrap_or(false))
            .count();

        points.push(MetricPoint::new(format!("{base}.status"), fsm_status_value(collector.status), now));
        points.push(MetricPoint::new(format!("{base}.peers_cnt"), collector.peers.len() as f64, now));
        points.push(MetricPoint::new(format!("{base}.active_peers_cnt"), active_peers_cnt as f64, now));
        points.push(MetricPoint::new(
            format!("{base}.active_peer_asns_cnt"),
            active_peer_asn_set.len() as f64,
            now,
        ));
        points.push(MetricPoint::new(
            format!("{base}.processing_time"),
            now.saturating_sub(collector.bgp_time_last) as f64,
            now,
        ));
        points.push(MetricPoint::new(
            format!("{base}.realtime_delay"),
            (collector.wall_time_last as i64 - collector.bgp_time_last as i64).unsigned_abs() as f64,
            now,
        ));
        points.push(MetricPoint::new(format!("{base}.valid_record_cnt"), collector.valid_cnt as f64, now));
        points.push(MetricPoint::new(format!("{base}.corrupted_record_cnt"), collector.corrupted_cnt as f64, now));
        points.push(MetricPoint::new(format!("{base}.empty_record_cnt"), collector.empty_cnt as f64, now));

        for (&peer_id, peer_state) in &collector.peers {
            let peer_ip_key = engine
                .view()
                .sigmap()
                .borrow()
                .lookup_sig(peer_id)
                .map(|s| sanitize_key_segment(&s.peer_ip.to_string()))
                .unwrap_or_else(|| format!("peer{peer_id}"));
            let pbase = format!("{base}.{peer_ip_key}");

            let (v4_active, v4_inactive, v6_active, v6_inactive) = engine
                .view()
                .peer_info(peer_id)
                .map(|p| (p.v4.active, p.v4.inactive, p.v6.active, p.v6.inactive))
                .unwrap_or((0, 0, 0, 0));

            let origin_asns = origin_asn_count(engine, peer_id);

            points.push(MetricPoint::new(format!("{pbase}.status"), peer_status_value(peer_state.fsm_state), now));
            points.push(MetricPoint::new(format!("{pbase}.active_v4_pfx_cnt"), v4_active as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.inactive_v4_pfx_cnt"), v4_inactive as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.active_v6_pfx_cnt"), v6_active as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.inactive_v6_pfx_cnt"), v6_inactive as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.announcing_origin_as_cnt"), origin_asns as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.announced_pfx_cnt"), (v4_active + v6_active) as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.withdrawn_pfx_cnt"), (v4_inactive + v6_inactive) as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.rib_message_cnt"), peer_state.rib_messages as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.announcement_cnt"), peer_state.announcements as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.withdrawal_cnt"), peer_state.withdrawals as f64, now));
            points.push(MetricPoint::new(format!("{pbase}.state_message_cnt"), peer_state.state_messages as f64, now));
            points.push(MetricPoint::new(
                format!("{pbase}.rib_positive_mismatches"),
                peer_state.rib_positive_mismatches as f64,
                now,
            ));
            points.push(MetricPoint::new(
                format!("{pbase}.rib_negative_mismatches"),
                peer_state.rib_negative_mismatches as f64,
                now,
            ));
        }
    }
    points
}

/// Distinct origin ASNs among the active routes `peer_id` currently
/// announces, across both families. O(n) in the peer's active route
/// count, same cost class as the rest of the engine's peer-scoped
/// sweeps.
fn origin_asn_count(engine: &RIBEngine, peer_id: crate::peer_sig::PeerId) -> usize {
    let mut origins = HashSet::new();
    for family in [crate::view::Family::V4, crate::view::Family::V6] {
        for pfx in engine.view().pfx_peers_of(peer_id, family, StateMask::ACTIVE) {
            let info = match pfx {
                crate::view::Prefix::V4(n) => engine.view().pfx_info_v4(&n),
                crate::view::Prefix::V6(n) => engine.view().pfx_info_v6(&n),
            };
            let Some(path_id) = info.and_then(|i| i.peer_slot(peer_id)).and_then(|s| s.path_id) else {
                continue;
            };
            if let Some(asn) = engine.view().pathstore().borrow().lookup(path_id).and_then(|p| p.origin_asn()) {
                origins.insert(asn);
            }
        }
    }
    origins.len()
}
