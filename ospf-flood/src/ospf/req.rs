use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Keys;

use super::error::Error;
use super::inst::Ospf;
use super::lsa::{LsaHeader, LsaKey, lsa_compare};
use super::neigh::NeighborId;
use super::nfsm::NfsmState;
use super::packet::Packet;
use super::timer::TimerEvent;
use crate::{ospf_debug, ospf_packet_trace};

/// LSAs a neighbor advertised during database exchange that we lack or hold
/// an older copy of. The value is the descriptor from the neighbor's
/// Database Description.
#[derive(Debug, Default)]
pub struct ReqList {
    map: BTreeMap<LsaKey, LsaHeader>,
}

impl ReqList {
    pub fn add(&mut self, h: LsaHeader) -> Option<LsaHeader> {
        self.map.insert(h.key(), h)
    }

    pub fn remove(&mut self, key: &LsaKey) -> Option<LsaHeader> {
        self.map.remove(key)
    }

    pub fn get(&self, key: &LsaKey) -> Option<&LsaHeader> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &LsaKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> Keys<'_, LsaKey, LsaHeader> {
        self.map.keys()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Ospf {
    /// Called by the adjacency layer with the descriptors a neighbor holds
    /// that we are missing.
    pub fn request_missing(&mut self, id: NeighborId, headers: &[LsaHeader]) -> Result<(), Error> {
        let nbr = self.nbr_mut(id)?;
        if !nbr.is_syncing() {
            ospf_debug!("LS request for {} ignored in state {}", id, nbr.state);
            return Ok(());
        }
        for h in headers {
            nbr.ls_req.add(h.clone());
        }
        self.ls_req_send(id);
        Ok(())
    }

    fn ls_req_send(&mut self, id: NeighborId) {
        let Ok(nbr) = self.nbr(id) else {
            return;
        };
        if nbr.ls_req.is_empty() {
            self.timers.cancel(&TimerEvent::LsReq(id));
            return;
        }
        let keys: Vec<LsaKey> = nbr.ls_req.keys().copied().collect();
        ospf_packet_trace!(
            self.tracing,
            LsRequest,
            Send,
            "[LS Request] {} entries to {}",
            keys.len(),
            id
        );
        self.send(Packet::LsRequest(keys), id.ifindex, Some(id.addr));
        let at = self.now + self.config.rxmt_interval();
        self.timers.arm(TimerEvent::LsReq(id), at);
    }

    pub fn ls_req_timer(&mut self, id: NeighborId) {
        match self.nbr(id) {
            Ok(nbr) if nbr.is_syncing() => self.ls_req_send(id),
            _ => {}
        }
    }

    /// Drop the request entry once an instance at least as recent as the
    /// requested one has arrived.
    pub fn ls_req_satisfy(&mut self, id: NeighborId, h: &LsaHeader) {
        let max_age_diff = self.config.max_age_diff();
        let Ok(nbr) = self.nbr_mut(id) else {
            return;
        };
        let key = h.key();
        let Some(req) = nbr.ls_req.get(&key) else {
            return;
        };
        if lsa_compare(h, req, max_age_diff) == Ordering::Less {
            return;
        }
        nbr.ls_req.remove(&key);
        self.ls_req_check_empty(id);
    }

    /// Stop the request timer once nothing is outstanding and let the
    /// adjacency layer finish Loading.
    pub fn ls_req_check_empty(&mut self, id: NeighborId) {
        let Ok(nbr) = self.nbr(id) else {
            return;
        };
        if !nbr.ls_req.is_empty() {
            return;
        }
        let loading = nbr.state == NfsmState::Loading;
        self.timers.cancel(&TimerEvent::LsReq(id));
        if loading {
            self.observer.request_list_empty(id);
        }
    }

    /// Answer a Link State Request with the database copies.
    pub fn on_receive_request(&mut self, id: NeighborId, keys: &[LsaKey]) -> Result<(), Error> {
        let nbr = self.nbr(id)?;
        if !nbr.is_flooding() {
            return Ok(());
        }
        ospf_packet_trace!(
            self.tracing,
            LsRequest,
            Recv,
            "[LS Request] {} entries from {}",
            keys.len(),
            id
        );

        let now = self.now;
        let inf_trans_delay = self.config.inf_trans_delay();
        let mut lsas = vec![];
        for key in keys {
            let found = self
                .lsa_scope(id.ifindex, key.ls_type)
                .ok()
                .and_then(|scope| self.lookup(scope, key));
            match found {
                Some(lsa) => lsas.push(lsa.for_send(now, inf_trans_delay)),
                None => {
                    ospf_debug!("LS request from {} for unknown LSA {}", id, key);
                    self.observer.bad_ls_request(id);
                    return Ok(());
                }
            }
        }
        if !lsas.is_empty() {
            self.send(Packet::LsUpdate(lsas), id.ifindex, Some(id.addr));
        }
        Ok(())
    }
}
