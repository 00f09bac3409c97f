//! Interning of AS paths to compact [`PathId`]s, deduplicating the
//! "core" suffix shared by many peers while keeping the
//! collector-peer-specific leading ASN cheap to reattach. See spec §4.2.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single AS path segment. Hashed and compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Sequence(Vec<u32>),
    Set(Vec<u32>),
    ConfedSequence(Vec<u32>),
    ConfedSet(Vec<u32>),
}

impl Segment {
    fn asns(&self) -> &[u32] {
        match self {
            Segment::Sequence(v) | Segment::Set(v) | Segment::ConfedSequence(v) | Segment::ConfedSet(v) => v,
        }
    }
}

/// An ordered sequence of AS path segments, as passed in to
/// [`AsPathStore::intern`]. Host byte order is explicitly allowed
/// in-process; this is purely an in-memory intern, not a wire format.
pub type AsPath = Vec<Segment>;

/// Opaque intern handle into [`AsPathStore`].
///
/// Two-part by design: `core_id` indexes the deduplicated "core" suffix
/// (the part of the path shared across peers once the leading
/// `peer_asn` segment is stripped), and `has_peer_prefix` records
/// whether that stripping happened for this particular interning, so
/// [`StorePath::segments_for`] can reattach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathId {
    core_id: u32,
    has_peer_prefix: bool,
}

impl PathId {
    /// `(core_id, has_peer_prefix)`, for callers that need to encode a
    /// `PathId` onto the wire (the transport encoder) without going
    /// through `StorePath`.
    pub fn wire_parts(self) -> (u32, bool) {
        (self.core_id, self.has_peer_prefix)
    }
}

/// A path as stored (core suffix only); use [`StorePath::segments_for`]
/// to reconstruct the path as originally interned.
#[derive(Debug, Clone, Copy)]
pub struct StorePath<'a> {
    core: &'a [Segment],
    has_peer_prefix: bool,
}

impl<'a> StorePath<'a> {
    /// Reconstructs the full path as it was passed to `intern`, given the
    /// peer's ASN (the caller already knows this from the `PeerSig`).
    pub fn segments_for(&self, peer_asn: u32) -> AsPath {
        if !self.has_peer_prefix {
            return self.core.to_vec();
        }
        match self.core.first() {
            Some(Segment::Sequence(seq)) => {
                let mut seq = seq.clone();
                seq.insert(0, peer_asn);
                let mut out = vec![Segment::Sequence(seq)];
                out.extend(self.core[1..].iter().cloned());
                out
            }
            _ => {
                let mut out = vec![Segment::Sequence(vec![peer_asn])];
                out.extend(self.core.iter().cloned());
                out
            }
        }
    }

    /// The last AS path segment: the AS that originated the prefix.
    pub fn origin_segment(&self) -> Option<&'a Segment> {
        self.core.last()
    }

    /// Convenience accessor: the single ASN that originated the prefix.
    /// For a `Set` origin segment this is the first member (origin is
    /// ambiguous for sets; callers needing the full set should use
    /// [`Self::origin_segment`] instead).
    pub fn origin_asn(&self) -> Option<u32> {
        self.origin_segment().and_then(|s| s.asns().first().copied())
    }

    /// True iff this path carries no peer-specific prefix, i.e. it is
    /// stored verbatim as a "core" path shared across peers.
    pub fn is_core(&self) -> bool {
        !self.has_peer_prefix
    }

    pub fn core_segments(&self) -> &'a [Segment] {
        self.core
    }
}

/// Interns AS paths, deduplicating core suffixes across peers.
///
/// Never frees entries during a view's life; garbage collection (should
/// it ever be needed for long-running processes with enormous path
/// churn) is a separate, optional phase run between epochs — not
/// implemented here since no caller in this spec needs it.
#[derive(Debug, Default)]
pub struct AsPathStore {
    core_to_id: HashMap<AsPath, u32>,
    id_to_core: Vec<AsPath>,
}

impl AsPathStore {
    pub fn new() -> Self {
        AsPathStore {
            core_to_id: HashMap::new(),
            id_to_core: Vec::new(),
        }
    }

    /// Strips a leading `peer_asn` sequence entry, if present, off the
    /// front of `segments`.
    fn split_peer_prefix(segments: &[Segment], peer_asn: u32) -> (AsPath, bool) {
        if let Some(Segment::Sequence(seq)) = segments.first() {
            if seq.first() == Some(&peer_asn) {
                let mut seq = seq.clone();
                seq.remove(0);
                let mut rest: AsPath = Vec::with_capacity(segments.len());
                if !seq.is_empty() {
                    rest.push(Segment::Sequence(seq));
                }
                rest.extend(segments[1..].iter().cloned());
                return (rest, true);
            }
        }
        (segments.to_vec(), false)
    }

    fn intern_core(&mut self, core: AsPath) -> u32 {
        if let Some(&id) = self.core_to_id.get(&core) {
            return id;
        }
        let id = self.id_to_core.len() as u32;
        self.core_to_id.insert(core.clone(), id);
        self.id_to_core.push(core);
        id
    }

    /// Interns `segments` (the path's on-wire-style segment sequence),
    /// separating the leading `peer_asn` prefix (if present) from the
    /// core suffix. Injective on byte-equal `(segments, peer_asn)` pairs
    /// that produce the same core.
    pub fn intern(&mut self, segments: &[Segment], peer_asn: u32) -> PathId {
        let (core, has_peer_prefix) = Self::split_peer_prefix(segments, peer_asn);
        let core_id = self.intern_core(core);
        PathId {
            core_id,
            has_peer_prefix,
        }
    }

    pub fn lookup(&self, id: PathId) -> Option<StorePath<'_>> {
        self.id_to_core.get(id.core_id as usize).map(|core| StorePath {
            core,
            has_peer_prefix: id.has_peer_prefix,
        })
    }

    /// Enumerates all interned core paths; used by the transport
    /// encoder (§4.2 "used by the transport encoder").
    pub fn iter_paths(&self) -> impl Iterator<Item = (u32, &AsPath)> {
        self.id_to_core.iter().enumerate().map(|(i, p)| (i as u32, p))
    }

    pub fn len(&self) -> usize {
        self.id_to_core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_core.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_injective_on_equal_paths() {
        let mut store = AsPathStore::new();
        let path = vec![Segment::Sequence(vec![65001, 65002, 65003])];
        let id1 = store.intern(&path, 65001);
        let id2 = store.intern(&path, 65001);
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn round_trips_full_path() {
        let mut store = AsPathStore::new();
        let path = vec![Segment::Sequence(vec![65001, 65002, 65003])];
        let id = store.intern(&path, 65001);
        let reconstructed = store.lookup(id).unwrap().segments_for(65001);
        assert_eq!(reconstructed, path);
    }

    #[test]
    fn shares_core_across_peers() {
        let mut store = AsPathStore::new();
        let path_a = vec![Segment::Sequence(vec![65001, 65010, 65020])];
        let path_b = vec![Segment::Sequence(vec![65002, 65010, 65020])];
        let id_a = store.intern(&path_a, 65001);
        let id_b = store.intern(&path_b, 65002);
        assert_eq!(store.len(), 1, "core suffix [65010, 65020] should be shared");
        assert_eq!(
            store.lookup(id_a).unwrap().segments_for(65001),
            path_a
        );
        assert_eq!(
            store.lookup(id_b).unwrap().segments_for(65002),
            path_b
        );
    }

    #[test]
    fn origin_segment_is_last() {
        let mut store = AsPathStore::new();
        let path = vec![Segment::Sequence(vec![65001, 65002, 65003])];
        let id = store.intern(&path, 65001);
        let stored = store.lookup(id).unwrap();
        assert_eq!(stored.origin_asn(), Some(65003));
    }

    #[test]
    fn no_peer_prefix_is_core() {
        let mut store = AsPathStore::new();
        let path = vec![Segment::Sequence(vec![65010, 65020])];
        let id = store.intern(&path, 65001); // 65001 != leading ASN
        assert!(store.lookup(id).unwrap().is_core());
    }
}
