//! Message bus sink (spec §6.2): the same logical record stream as the
//! binary file, but framed per-record for a pub/sub transport rather
//! than length-prefixed sections. Callers provide their own publish
//! function — this module only knows how to frame one pfx record.

use std::io::Write as _;

use byteorder::{BigEndian, WriteBytesExt};

use crate::error::ViewResult;
use crate::peer_sig::PeerId;
use crate::view::{FieldState, PfxInfo, Prefix, StateMask};

use super::binary::PEER_LIST_SENTINEL;
use super::filter::ViewFilter;

/// Encodes one prefix's pfx-peer list as a standalone message: family
/// tag, address, prefix length, state, then `(peer_id, state, core_id,
/// has_peer_prefix)` tuples terminated by [`PEER_LIST_SENTINEL`].
pub fn encode_pfx_message<XA, QA>(
    pfx: Prefix,
    info: &PfxInfo<XA, QA>,
    sigmap: &crate::peer_sig::PeerSignatureMap,
    pathstore: &crate::as_path::AsPathStore,
    filter: &ViewFilter,
) -> ViewResult<Vec<u8>> {
    let mut buf = Vec::new();
    match pfx {
        Prefix::V4(n) => {
            buf.write_u8(4)?;
            buf.write_all(&n.addr().octets())?;
            buf.write_u8(n.prefix_len())?;
        }
        Prefix::V6(n) => {
            buf.write_u8(6)?;
            buf.write_all(&n.addr().octets())?;
            buf.write_u8(n.prefix_len())?;
        }
    }
    buf.write_u8(match info.state {
        FieldState::Active => 1,
        FieldState::Inactive => 2,
        FieldState::Invalid => 0,
    })?;

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
        let (core_id, has_peer_prefix) = path_id.wire_parts();
        buf.write_u16::<BigEndian>(peer_id)?;
        buf.write_u8(match info.peer_state(peer_id) {
            FieldState::Active => 1,
            FieldState::Inactive => 2,
            FieldState::Invalid => 0,
        })?;
        buf.write_u32::<BigEndian>(core_id)?;
        buf.write_u8(has_peer_prefix as u8)?;
    }
    buf.write_u16::<BigEndian>(PEER_LIST_SENTINEL)?;
    Ok(buf)
}

/// A peer id that appears in place of a real one only as the
/// end-of-peers sentinel; never returned by [`crate::peer_sig::PeerSignatureMap`].
pub fn is_sentinel(id: PeerId) -> bool {
    id == PEER_LIST_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::as_path::Segment;
    use crate::view::View;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn message_ends_with_sentinel() {
        let mut view: View = View::create(None, None);
        let pfx = Prefix::V4("10.0.0.0/24".parse().unwrap());
        {
            let mut it = view.iter();
            let peer = it.add_peer("rrc00", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 65000);
            it.activate_peer();
            let path = vec![Segment::Sequence(vec![65000, 65001])];
            it.add_pfx_peer(pfx, peer, &path).unwrap();
        }
        let sigmap = view.sigmap().borrow();
        let pathstore = view.pathstore().borrow();
        let info = view.pfx_info_v4(&pfx.as_v4().unwrap()).unwrap();
        let msg = encode_pfx_message(pfx, info, &sigmap, &pathstore, &ViewFilter::new()).unwrap();
        let tail = u16::from_be_bytes([msg[msg.len() - 2], msg[msg.len() - 1]]);
        assert_eq!(tail, PEER_LIST_SENTINEL);
    }
}
