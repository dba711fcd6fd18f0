use std::fmt::Display;
use std::net::Ipv4Addr;

use super::nfsm::NfsmState;
use super::req::ReqList;
use super::rxmt::RxmtList;
use super::timer::Tick;

/// A neighbor is known by the interface it sits on and its address there.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct NeighborId {
    pub ifindex: u32,
    pub addr: Ipv4Addr,
}

impl NeighborId {
    pub fn new(ifindex: u32, addr: Ipv4Addr) -> Self {
        Self { ifindex, addr }
    }
}

impl Display for NeighborId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%{}", self.addr, self.ifindex)
    }
}

#[derive(Debug)]
pub struct Neighbor {
    pub id: NeighborId,
    pub router_id: Ipv4Addr,
    pub state: NfsmState,
    pub ostate: NfsmState,
    pub state_change: usize,
    pub ls_rxmt: RxmtList,
    pub ls_req: ReqList,
    // Last targeted correction, for MinLSArrival pacing.
    pub last_correction: Option<Tick>,
}

impl Neighbor {
    pub fn new(id: NeighborId, router_id: Ipv4Addr) -> Self {
        Self {
            id,
            router_id,
            state: NfsmState::Down,
            ostate: NfsmState::Down,
            state_change: 0,
            ls_rxmt: RxmtList::default(),
            ls_req: ReqList::default(),
            last_correction: None,
        }
    }

    /// Exchange, Loading and Full neighbors take part in flooding.
    pub fn is_flooding(&self) -> bool {
        self.state >= NfsmState::Exchange
    }

    /// Database exchange in progress.
    pub fn is_syncing(&self) -> bool {
        matches!(self.state, NfsmState::Exchange | NfsmState::Loading)
    }
}

pub fn ospf_ls_request_count(nbr: &Neighbor) -> usize {
    nbr.ls_req.len()
}

pub fn ospf_ls_retransmit_count(nbr: &Neighbor) -> usize {
    nbr.ls_rxmt.len()
}
