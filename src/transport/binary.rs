//! Binary file sink (spec §6.2): a view encoded as magic-delimited
//! sections so a reader can resync mid-stream after a truncated or
//! corrupted write.

use std::io::Write;
use std::net::IpAddr;

use byteorder::{BigEndian, WriteBytesExt};

use crate::as_path::Segment;
use crate::error::ViewResult;
use crate::peer_sig::PeerId;
use crate::view::{FieldState, Prefix, View};

use super::filter::ViewFilter;

pub const VIEW_MAGIC: u32 = 0x4247_5056;
pub const START: u32 = 0x5354_5254;
pub const PEER_END: u32 = 0x5045_4E44;
pub const PATH_END: u32 = 0x5041_5448;
pub const PFX_END: u32 = 0x5845_4E44;
pub const END: u32 = 0x5645_4E44;

/// Sentinel peer id marking end-of-peers within a prefix's peer list
/// (spec §6.2: "a sentinel peer-id 0xFFFF marks end-of-peers").
pub const PEER_LIST_SENTINEL: PeerId = 0xFFFF;

const IP_TAG_V4: u8 = 4;
const IP_TAG_V6: u8 = 6;

fn state_byte(state: FieldState) -> u8 {
    match state {
        FieldState::Active => 1,
        FieldState::Inactive => 2,
        FieldState::Invalid => 0,
    }
}

fn write_ip<W: Write>(w: &mut W, ip: IpAddr) -> ViewResult<()> {
    match ip {
        IpAddr::V4(v4) => {
            w.write_u8(IP_TAG_V4)?;
            w.write_all(&v4.octets())?;
        }
        IpAddr::V6(v6) => {
            w.write_u8(IP_TAG_V6)?;
            w.write_all(&v6.octets())?;
        }
    }
    Ok(())
}

fn write_segment<W: Write>(w: &mut W, segment: &Segment) -> ViewResult<()> {
    let (tag, asns) = match segment {
        Segment::Sequence(v) => (0u8, v),
        Segment::Set(v) => (1u8, v),
        Segment::ConfedSequence(v) => (2u8, v),
        Segment::ConfedSet(v) => (3u8, v),
    };
    w.write_u8(tag)?;
    w.write_u16::<BigEndian>(asns.len() as u16)?;
    for asn in asns {
        w.write_u32::<BigEndian>(*asn)?;
    }
    Ok(())
}

/// Encodes `view` into the binary file framing, honoring `filter`. Only
/// prefixes/peers currently `Active` or `Inactive` (not `Invalid`) are
/// written — an invalid entry is logically absent from the view.
pub fn write_view<W: Write, PA, XA, QA>(view: &View<PA, XA, QA>, filter: &ViewFilter, w: &mut W) -> ViewResult<()> {
    w.write_u32::<BigEndian>(VIEW_MAGIC)?;
    w.write_u32::<BigEndian>(START)?;
    w.write_u32::<BigEndian>(view.get_time())?;

    let sigmap = view.sigmap().borrow();
    let mut peer_count = 0u16;
    for id in 1..=view.peers_len() as PeerId {
        let Some(info) = view.peer_info(id) else { continue };
        if info.state == FieldState::Invalid {
            continue;
        }
        let Some(sig) = sigmap.lookup_sig(id) else { continue };
        if !filter.accepts_peer(sig) {
            continue;
        }
        w.write_u16::<BigEndian>(id)?;
        w.write_u8(state_byte(info.state))?;
        w.write_u16::<BigEndian>(sig.collector.len() as u16)?;
        w.write_all(sig.collector.as_bytes())?;
        write_ip(w, sig.peer_ip)?;
        w.write_u32::<BigEndian>(sig.peer_asn)?;
        peer_count += 1;
    }
    w.write_u32::<BigEndian>(VIEW_MAGIC)?;
    w.write_u32::<BigEndian>(PEER_END)?;
    w.write_u16::<BigEndian>(peer_count)?;

    let pathstore = view.pathstore().borrow();
    let mut path_count = 0u32;
    for (_, core) in pathstore.iter_paths() {
        w.write_u16::<BigEndian>(core.len() as u16)?;
        for segment in core {
            write_segment(w, segment)?;
        }
        path_count += 1;
    }
    w.write_u32::<BigEndian>(VIEW_MAGIC)?;
    w.write_u32::<BigEndian>(PATH_END)?;
    w.write_u32::<BigEndian>(path_count)?;

    let mut pfx_count = 0u32;
    for (net, info) in view.v4_prefixes() {
        let pfx = Prefix::V4(*net);
        if info.state == FieldState::Invalid || !filter.accepts_pfx(pfx) {
            continue;
        }
        write_pfx_record(w, pfx, info, &sigmap, &pathstore, filter)?;
        pfx_count += 1;
    }
    for (net, info) in view.v6_prefixes() {
        let pfx = Prefix::V6(*net);
        if info.state == FieldState::Invalid || !filter.accepts_pfx(pfx) {
            continue;
        }
        write_pfx_record(w, pfx, info, &sigmap, &pathstore, filter)?;
        pfx_count += 1;
    }
    w.write_u32::<BigEndian>(VIEW_MAGIC)?;
    w.write_u32::<BigEndian>(PFX_END)?;
    w.write_u32::<BigEndian>(pfx_count)?;
    w.write_u32::<BigEndian>(VIEW_MAGIC)?;
    w.write_u32::<BigEndian>(END)?;
    Ok(())
}

fn write_pfx_record<W: Write, XA, QA>(
    w: &mut W,
    pfx: Prefix,
    info: &crate::view::PfxInfo<XA, QA>,
    sigmap: &crate::peer_sig::PeerSignatureMap,
    pathstore: &crate::as_path::AsPathStore,
    filter: &ViewFilter,
) -> ViewResult<()> {
    match pfx {
        Prefix::V4(n) => {
            w.write_u8(IP_TAG_V4)?;
            w.write_all(&n.addr().octets())?;
            w.write_u8(n.prefix_len())?;
        }
        Prefix::V6(n) => {
            w.write_u8(IP_TAG_V6)?;
            w.write_all(&n.addr().octets())?;
            w.write_u8(n.prefix_len())?;
        }
    }
    w.write_u8(state_byte(info.state))?;

    for peer_id in info.peer_ids_matching(crate::view::StateMask::ALL) {
        let Some(slot) = info.peer_slot(peer_id) else { continue };
        let Some(path_id) = slot.path_id else { continue };
        let Some(path) = pathstore.lookup(path_id) else { continue };
        if !filter.accepts_pfx_peer(&path) {
            continue;
        }
        let peer_sig_ok = sigmap.lookup_sig(peer_id).map(|s| filter.accepts_peer(s)).unwrap_or(false);
        if !peer_sig_ok {
            continue;
        }
        let (core_id, has_peer_prefix) = path_id.wire_parts();
        w.write_u16::<BigEndian>(peer_id)?;
        w.write_u8(state_byte(info.peer_state(peer_id)))?;
        w.write_u32::<BigEndian>(core_id)?;
        w.write_u8(has_peer_prefix as u8)?;
    }
    w.write_u16::<BigEndian>(PEER_LIST_SENTINEL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn round_trip_framing_markers_present() {
        let mut view: View = View::create(None, None);
        {
            let mut it = view.iter();
            let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 65000);
            it.activate_peer();
            let path = vec![Segment::Sequence(vec![65000, 65001])];
            let pfx = Prefix::V4("10.0.0.0/24".parse().unwrap());
            it.add_pfx_peer(pfx, peer, &path).unwrap();
            it.seek_pfx_peer(pfx, peer, crate::view::StateMask::ALL, crate::view::StateMask::ALL);
            it.pfx_activate_peer();
        }

        let mut buf = Vec::new();
        write_view(&view, &ViewFilter::new(), &mut buf).unwrap();
        assert!(buf.len() > 16);
        let magic = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_eq!(magic, VIEW_MAGIC);
        let tag = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(tag, START);
    }
}
