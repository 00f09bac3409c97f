//! Interning of `(collector, peer_ip, peer_asn)` tuples to compact,
//! stable 16-bit [`PeerId`]s. See spec §4.1.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Peer identity, stable for the lifetime of the process. `0` is reserved
/// for "none" and is never returned by [`PeerSignatureMap::get_or_create`]
/// for a successfully interned tuple.
pub type PeerId = u16;

pub const PEER_ID_NONE: PeerId = 0;

/// Uniquely identifies a BGP neighbor session at a collector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerSig {
    pub collector: String,
    pub peer_ip: IpAddr,
    pub peer_asn: u32,
}

impl PeerSig {
    pub fn new(collector: impl Into<String>, peer_ip: IpAddr, peer_asn: u32) -> Self {
        PeerSig {
            collector: collector.into(),
            peer_ip,
            peer_asn,
        }
    }
}

/// Bidirectional intern table for [`PeerSig`] <-> [`PeerId`].
///
/// Ids are assigned monotonically starting at 1. The map may be shared
/// between sibling views (§4.5) via `Rc<RefCell<..>>` at the call site;
/// the map itself carries no sharing bookkeeping.
#[derive(Debug, Default)]
pub struct PeerSignatureMap {
    sig_to_id: HashMap<PeerSig, PeerId>,
    id_to_sig: Vec<PeerSig>, // index 0 unused, id i lives at id_to_sig[i-1]
}

impl PeerSignatureMap {
    pub fn new() -> Self {
        PeerSignatureMap {
            sig_to_id: HashMap::new(),
            id_to_sig: Vec::new(),
        }
    }

    /// Idempotent: returns the existing id for a previously-seen tuple,
    /// or allocates a fresh one. Returns [`PEER_ID_NONE`] if the 16-bit id
    /// space is exhausted.
    pub fn get_or_create(&mut self, collector: &str, peer_ip: IpAddr, peer_asn: u32) -> PeerId {
        let sig = PeerSig::new(collector, peer_ip, peer_asn);
        if let Some(&id) = self.sig_to_id.get(&sig) {
            return id;
        }
        let next = self.id_to_sig.len() + 1;
        if next > PeerId::MAX as usize {
            return PEER_ID_NONE;
        }
        let id = next as PeerId;
        self.id_to_sig.push(sig.clone());
        self.sig_to_id.insert(sig, id);
        id
    }

    /// Reverse lookup. Must succeed for every id previously returned by
    /// [`Self::get_or_create`].
    pub fn lookup_sig(&self, id: PeerId) -> Option<&PeerSig> {
        if id == PEER_ID_NONE {
            return None;
        }
        self.id_to_sig.get(id as usize - 1)
    }

    pub fn len(&self) -> usize {
        self.id_to_sig.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_sig.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_monotonic() {
        let mut map = PeerSignatureMap::new();
        let ip = "10.0.0.1".parse().unwrap();
        let id1 = map.get_or_create("rrc00", ip, 65001);
        let id2 = map.get_or_create("rrc00", ip, 65001);
        assert_eq!(id1, id2);
        assert_eq!(id1, 1);

        let id3 = map.get_or_create("rrc01", ip, 65001);
        assert_eq!(id3, 2);
    }

    #[test]
    fn reverse_lookup_matches() {
        let mut map = PeerSignatureMap::new();
        let ip = "2001:db8::1".parse().unwrap();
        let id = map.get_or_create("rrc00", ip, 65001);
        let sig = map.lookup_sig(id).unwrap();
        assert_eq!(sig.collector, "rrc00");
        assert_eq!(sig.peer_ip, ip);
        assert_eq!(sig.peer_asn, 65001);
    }

    #[test]
    fn none_id_never_resolves() {
        let map = PeerSignatureMap::new();
        assert!(map.lookup_sig(PEER_ID_NONE).is_none());
    }

    #[test]
    fn shared_sigmap_same_tuple_same_id() {
        // §8 property 8: two views sharing a PeerSignatureMap and given
        // the same tuple observe the same PeerId.
        let mut map = PeerSignatureMap::new();
        let ip = "10.0.0.1".parse().unwrap();
        let a = map.get_or_create("rrc00", ip, 65001);
        let b = map.get_or_create("rrc00", ip, 65001);
        assert_eq!(a, b);
    }
}
