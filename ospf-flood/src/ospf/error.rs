use std::net::Ipv4Addr;

use thiserror::Error;

use super::lsa::{FloodScope, LsaKey, OspfLsType};
use super::lsdb::Scope;
use super::neigh::NeighborId;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("LS type {ls_type} has no flooding scope")]
    UnknownScope { ls_type: OspfLsType },

    #[error("LSA {key} has {expected} scope but was placed in {scope}")]
    ScopeMismatch {
        key: LsaKey,
        expected: FloodScope,
        scope: Scope,
    },

    #[error("Malformed LSA {key}: length {length}, expected {expected}")]
    Malformed {
        key: LsaKey,
        length: u16,
        expected: usize,
    },

    #[error("Unknown area {0}")]
    UnknownArea(Ipv4Addr),

    #[error("Unknown interface ifindex {0}")]
    UnknownLink(u32),

    #[error("Unknown neighbor {0}")]
    UnknownNeighbor(NeighborId),

    #[error("Unknown router {0}")]
    UnknownRouter(Ipv4Addr),
}
