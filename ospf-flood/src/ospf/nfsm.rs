use std::fmt::Display;
use std::net::Ipv4Addr;

use serde::Deserialize;

use super::error::Error;
use super::inst::Ospf;
use super::lsdb::Scope;
use super::neigh::{Neighbor, NeighborId};
use super::timer::TimerEvent;
use crate::{ospf_event_trace, ospf_info};

/// Neighbor state as driven by the external adjacency state machine.
#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone, Copy, Deserialize)]
pub enum NfsmState {
    Down,
    Attempt,
    Init,
    TwoWay,
    ExStart,
    Exchange,
    Loading,
    Full,
}

impl Display for NfsmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use NfsmState::*;
        let state = match self {
            Down => "Down",
            Attempt => "Attempt",
            Init => "Init",
            TwoWay => "TwoWay",
            ExStart => "ExStart",
            Exchange => "Exchange",
            Loading => "Loading",
            Full => "Full",
        };
        write!(f, "{state}")
    }
}

// Clear Link State Request and Retransmission lists and stop their timers.
pub fn ospf_nfsm_reset_nbr(nbr: &mut Neighbor) {
    nbr.ls_req.clear();
    nbr.ls_rxmt.clear();
    nbr.last_correction = None;
}

impl Ospf {
    pub fn nbr(&self, id: NeighborId) -> Result<&Neighbor, Error> {
        self.links
            .get(&id.ifindex)
            .and_then(|link| link.nbrs.get(&id.addr))
            .ok_or(Error::UnknownNeighbor(id))
    }

    pub fn nbr_mut(&mut self, id: NeighborId) -> Result<&mut Neighbor, Error> {
        self.links
            .get_mut(&id.ifindex)
            .and_then(|link| link.nbrs.get_mut(&id.addr))
            .ok_or(Error::UnknownNeighbor(id))
    }

    pub fn nbr_add(&mut self, id: NeighborId, router_id: Ipv4Addr) -> Result<(), Error> {
        let link = self
            .links
            .get_mut(&id.ifindex)
            .ok_or(Error::UnknownLink(id.ifindex))?;
        link.nbrs
            .entry(id.addr)
            .or_insert_with(|| Neighbor::new(id, router_id));
        Ok(())
    }

    /// Mirror a state change of the adjacency state machine.
    pub fn nbr_state_change(&mut self, id: NeighborId, state: NfsmState) -> Result<(), Error> {
        let nbr = self.nbr_mut(id)?;
        if nbr.state == state {
            return Ok(());
        }
        nbr.ostate = nbr.state;
        nbr.state = state;
        nbr.state_change += 1;
        let ostate = nbr.ostate;
        let req_empty = nbr.ls_req.is_empty();

        ospf_info!("NFSM {}: {} -> {}", id, ostate, state);

        if ostate >= NfsmState::Exchange && state < NfsmState::Exchange {
            self.nbr_lists_clear(id);
        }
        if state == NfsmState::Loading && req_empty {
            self.observer.request_list_empty(id);
        }
        // A neighbor leaving Exchange/Loading may unblock MaxAge removal.
        if matches!(ostate, NfsmState::Exchange | NfsmState::Loading) {
            self.maxage_remove_all();
        }
        Ok(())
    }

    /// Adjacency lost. The neighbor's lists are cleared and its timers
    /// cancelled before anything else can touch it.
    pub fn nbr_teardown(&mut self, id: NeighborId) -> Result<(), Error> {
        let nbr = self.nbr_mut(id)?;
        nbr.ostate = nbr.state;
        nbr.state = NfsmState::Down;
        nbr.state_change += 1;
        self.nbr_lists_clear(id);
        self.maxage_remove_all();
        Ok(())
    }

    pub fn nbr_remove(&mut self, id: NeighborId) -> Result<(), Error> {
        self.nbr_teardown(id)?;
        if let Some(link) = self.links.get_mut(&id.ifindex) {
            link.nbrs.remove(&id.addr);
        }
        Ok(())
    }

    fn nbr_lists_clear(&mut self, id: NeighborId) {
        let Ok(nbr) = self.nbr_mut(id) else {
            return;
        };
        let pending = nbr.ls_rxmt.len();
        ospf_nfsm_reset_nbr(nbr);
        self.timers.cancel(&TimerEvent::Rxmt(id));
        self.timers.cancel(&TimerEvent::LsReq(id));
        ospf_event_trace!(
            self.tracing,
            Flooding,
            "[Flooding] {} lists cleared, {} retransmission(s) dropped",
            id,
            pending
        );
    }

    /// Neighbors that take part in flooding for a scope.
    pub fn scope_nbrs(&self, scope: Scope) -> Vec<NeighborId> {
        self.links
            .values()
            .filter(|link| match scope {
                Scope::Link(ifindex) => link.index == ifindex,
                Scope::Area(area_id) => link.area == area_id,
                Scope::As => true,
            })
            .flat_map(|link| link.nbrs.values())
            .filter(|nbr| nbr.is_flooding())
            .map(|nbr| nbr.id)
            .collect()
    }

    /// Any neighbor anywhere in Exchange or Loading.
    pub fn nbr_syncing_exists(&self) -> bool {
        self.links
            .values()
            .flat_map(|link| link.nbrs.values())
            .any(|nbr| nbr.is_syncing())
    }
}
