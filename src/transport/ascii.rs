//! ASCII print sink (spec §6.2): one line per pfx-peer,
//! `time|pfx|collector|peer_asn|peer_ip|as_path|origin_seg`.

use std::fmt::Write as _;

use crate::as_path::Segment;
use crate::view::{FieldState, Prefix, StateMask, View};

use super::filter::ViewFilter;

fn format_segment(segment: &Segment) -> String {
    let (open, close, asns) = match segment {
        Segment::Sequence(v) => ("", "", v),
        Segment::Set(v) => ("{", "}", v),
        Segment::ConfedSequence(v) => ("(", ")", v),
        Segment::ConfedSet(v) => ("[", "]", v),
    };
    let body = asns.iter().map(u32::to_string).collect::<Vec<_>>().join(" ");
    format!("{open}{body}{close}")
}

fn format_path(segments: &[Segment]) -> String {
    segments.iter().map(format_segment).collect::<Vec<_>>().join(" ")
}

/// Writes one line per pfx-peer currently `Active` or `Inactive` in
/// `view`, honoring `filter`.
pub fn write_view_ascii<PA, XA, QA>(view: &View<PA, XA, QA>, filter: &ViewFilter, out: &mut String) {
    let time = view.get_time();
    let sigmap = view.sigmap().borrow();
    let pathstore = view.pathstore().borrow();

    for (net, info) in view.v4_prefixes() {
        write_pfx_lines(Prefix::V4(*net), info, filter, &sigmap, &pathstore, time, out);
    }
    for (net, info) in view.v6_prefixes() {
        write_pfx_lines(Prefix::V6(*net), info, filter, &sigmap, &pathstore, time, out);
    }
}

#[allow(clippy::too_many_arguments)]
fn write_pfx_lines<XA, QA>(
    pfx: Prefix,
    info: &crate::view::PfxInfo<XA, QA>,
    filter: &ViewFilter,
    sigmap: &crate::peer_sig::PeerSignatureMap,
    pathstore: &crate::as_path::AsPathStore,
    time: u32,
    out: &mut String,
) {
    if info.state == FieldState::Invalid || !filter.accepts_pfx(pfx) {
        return;
    }
    for peer_id in info.peer_ids_matching(StateMask::ALL) {
        let Some(sig) = sigmap.lookup_sig(peer_id) else { continue };
        if !filter.accepts_peer(sig) {
            continue;
        }
        let Some(slot) = info.peer_slot(peer_id) else { continue };
        let Some(path_id) = slot.path_id else { continue };
        let Some(path) = pathstore.lookup(path_id) else { continue };
        if !filter.accepts_pfx_peer(&path) {
            continue;
        }
        let full_path = path.segments_for(sig.peer_asn);
        let origin = path.origin_segment().map(format_segment).unwrap_or_default();
        let _ = writeln!(
            out,
            "{time}|{pfx}|{collector}|{peer_asn}|{peer_ip}|{as_path}|{origin}",
            collector = sig.collector,
            peer_asn = sig.peer_asn,
            peer_ip = sig.peer_ip,
            as_path = format_path(&full_path),
            origin = origin,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn emits_one_line_per_pfx_peer() {
        let mut view: View = View::create(None, None);
        {
            let mut it = view.iter();
            let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 65000);
            it.activate_peer();
            let path = vec![Segment::Sequence(vec![65000, 65001, 65002])];
            let pfx = Prefix::V4("10.0.0.0/24".parse().unwrap());
            it.add_pfx_peer(pfx, peer, &path).unwrap();
        }
        let mut out = String::new();
        write_view_ascii(&view, &ViewFilter::new(), &mut out);
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("rrc00"));
        assert!(out.contains("65000"));
    }
}
