//! The input contract the engine is driven by: `Record`s carrying a
//! sequence of `Elem`s. Spec §4.4.2 / §6.1. The record source itself
//! (parsing wire BGP into these types) is out of scope — `Record` is
//! the only coupling point.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::as_path::AsPath;
use crate::view::Prefix;

use super::FsmState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpPosition {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    Rib,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    ValidRecord,
    CorruptedRecord,
    CorruptedSource,
    FilteredSource,
    EmptySource,
    OutsideTimeInterval,
}

impl RecordStatus {
    pub fn is_corrupted(self) -> bool {
        matches!(self, RecordStatus::CorruptedRecord | RecordStatus::CorruptedSource)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Elem {
    Rib {
        pfx: Prefix,
        peer_ip: IpAddr,
        peer_asn: u32,
        path: AsPath,
    },
    Announcement {
        pfx: Prefix,
        peer_ip: IpAddr,
        peer_asn: u32,
        path: AsPath,
    },
    Withdrawal {
        pfx: Prefix,
        peer_ip: IpAddr,
        peer_asn: u32,
    },
    PeerState {
        peer_ip: IpAddr,
        peer_asn: u32,
        new_state: FsmState,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub project: String,
    pub collector: String,
    pub time_sec: u32,
    pub dump_time_sec: u32,
    pub dump_position: DumpPosition,
    pub record_type: RecordType,
    pub status: RecordStatus,
    pub elems: Vec<Elem>,
}
