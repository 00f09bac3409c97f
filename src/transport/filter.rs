//! Subscriber-supplied filter callbacks (spec §6.3): a consumer
//! narrows what a sink emits without touching view internals.

use crate::as_path::StorePath;
use crate::peer_sig::PeerSig;
use crate::view::Prefix;

type PeerFilter = Box<dyn Fn(&PeerSig) -> bool>;
type PfxFilter = Box<dyn Fn(Prefix) -> bool>;
type PfxPeerFilter = Box<dyn Fn(&StorePath<'_>) -> bool>;

/// All three callbacks are optional; an absent one always passes.
/// Invoked in `peer, pfx, pfx_peer` order and a record is included iff
/// every supplied callback returns `true`.
#[derive(Default)]
pub struct ViewFilter {
    pub filter_peer: Option<PeerFilter>,
    pub filter_pfx: Option<PfxFilter>,
    pub filter_pfx_peer: Option<PfxPeerFilter>,
}

impl ViewFilter {
    pub fn new() -> Self {
        ViewFilter::default()
    }

    pub fn with_peer_filter(mut self, f: impl Fn(&PeerSig) -> bool + 'static) -> Self {
        self.filter_peer = Some(Box::new(f));
        self
    }

    pub fn with_pfx_filter(mut self, f: impl Fn(Prefix) -> bool + 'static) -> Self {
        self.filter_pfx = Some(Box::new(f));
        self
    }

    pub fn with_pfx_peer_filter(mut self, f: impl Fn(&StorePath<'_>) -> bool + 'static) -> Self {
        self.filter_pfx_peer = Some(Box::new(f));
        self
    }

    pub fn accepts_peer(&self, sig: &PeerSig) -> bool {
        self.filter_peer.as_ref().map(|f| f(sig)).unwrap_or(true)
    }

    pub fn accepts_pfx(&self, pfx: Prefix) -> bool {
        self.filter_pfx.as_ref().map(|f| f(pfx)).unwrap_or(true)
    }

    pub fn accepts_pfx_peer(&self, path: &StorePath<'_>) -> bool {
        self.filter_pfx_peer.as_ref().map(|f| f(path)).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn absent_filters_pass_everything() {
        let filter = ViewFilter::new();
        let sig = PeerSig::new("rrc00", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 65001);
        assert!(filter.accepts_peer(&sig));
    }

    #[test]
    fn peer_filter_narrows() {
        let filter = ViewFilter::new().with_peer_filter(|s| s.peer_asn == 65001);
        let matching = PeerSig::new("rrc00", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 65001);
        let other = PeerSig::new("rrc00", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 65002);
        assert!(filter.accepts_peer(&matching));
        assert!(!filter.accepts_peer(&other));
    }
}
