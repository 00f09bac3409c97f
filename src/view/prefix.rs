//! A unified IPv4/IPv6 prefix key used where the iterator crosses
//! families (seek, composite pfx-peer cursor). Internally the view
//! keeps two separate tables (spec §3.1) for cache and iteration
//! locality; `Prefix` is only the caller-facing handle.

use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};

use super::Family;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Prefix {
    V4(Ipv4Net),
    V6(Ipv6Net),
}

impl Prefix {
    pub fn family(&self) -> Family {
        match self {
            Prefix::V4(_) => Family::V4,
            Prefix::V6(_) => Family::V6,
        }
    }

    pub fn addr(&self) -> IpAddr {
        match self {
            Prefix::V4(n) => IpAddr::V4(n.addr()),
            Prefix::V6(n) => IpAddr::V6(n.addr()),
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            Prefix::V4(n) => n.prefix_len(),
            Prefix::V6(n) => n.prefix_len(),
        }
    }

    pub fn as_v4(&self) -> Option<Ipv4Net> {
        match self {
            Prefix::V4(n) => Some(*n),
            Prefix::V6(_) => None,
        }
    }

    pub fn as_v6(&self) -> Option<Ipv6Net> {
        match self {
            Prefix::V6(n) => Some(*n),
            Prefix::V4(_) => None,
        }
    }
}

impl From<Ipv4Net> for Prefix {
    fn from(n: Ipv4Net) -> Self {
        Prefix::V4(n)
    }
}

impl From<Ipv6Net> for Prefix {
    fn from(n: Ipv6Net) -> Self {
        Prefix::V6(n)
    }
}

impl From<IpNet> for Prefix {
    fn from(n: IpNet) -> Self {
        match n {
            IpNet::V4(n) => Prefix::V4(n),
            IpNet::V6(n) => Prefix::V6(n),
        }
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prefix::V4(n) => write!(f, "{n}"),
            Prefix::V6(n) => write!(f, "{n}"),
        }
    }
}
