use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::error::Error;
use super::inst::Ospf;
use super::lsa::{Lsa, LsaHeader, LsaKey, MAX_AGE, MAX_SEQUENCE_NUMBER, lsa_compare};
use super::lsdb::Scope;
use super::neigh::NeighborId;
use super::packet::Packet;
use super::timer::TimerEvent;
use crate::{ospf_debug, ospf_error, ospf_event_trace, ospf_packet_trace, ospf_warn};

/// Outcome of the receive procedure for one LSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodAction {
    InstallFlood,
    InstallNoFlood,
    AckOnly,
    Discard,
    DirectAckDiscard,
}

// Acknowledgments produced by one LS Update. An LSA is acknowledged at most
// once per batch, either delayed or direct.
#[derive(Default)]
struct AckBatch {
    direct: Vec<LsaHeader>,
    acked: BTreeSet<LsaKey>,
}

impl AckBatch {
    fn direct(&mut self, h: &LsaHeader) {
        if self.acked.insert(h.key()) {
            self.direct.push(h.clone());
        }
    }

    fn delayed(&mut self, key: LsaKey) {
        self.acked.insert(key);
    }
}

impl Ospf {
    /// Link State Update from a neighbor. Direct acknowledgments produced by
    /// the batch go out as one LS Ack.
    pub fn on_receive_update(
        &mut self,
        id: NeighborId,
        lsas: Vec<Lsa>,
    ) -> Result<Vec<FloodAction>, Error> {
        let nbr = self.nbr(id)?;
        if !nbr.is_flooding() {
            ospf_debug!("LS Update from {} ignored in state {}", id, nbr.state);
            return Ok(vec![]);
        }
        ospf_packet_trace!(
            self.tracing,
            LsUpdate,
            Recv,
            "[LS Update] {} LSA(s) from {}",
            lsas.len(),
            id
        );

        let mut acks = AckBatch::default();
        let mut actions = vec![];
        let mut failed = None;
        for mut lsa in lsas {
            lsa.recv = self.now;
            if let Err(err) = lsa.validate() {
                ospf_warn!("{} from {}, discarded", err, id);
                actions.push(FloodAction::Discard);
                continue;
            }
            match self.lsa_recv(id, lsa, &mut acks) {
                Ok(action) => actions.push(action),
                Err(err) => {
                    ospf_error!("LS Update from {}: {}", id, err);
                    actions.push(FloodAction::Discard);
                    failed.get_or_insert(err);
                }
            }
        }
        if !acks.direct.is_empty() {
            self.ls_ack_direct(id, acks.direct);
        }
        match failed {
            Some(err) => Err(err),
            None => Ok(actions),
        }
    }

    fn lsa_recv(
        &mut self,
        id: NeighborId,
        x: Lsa,
        acks: &mut AckBatch,
    ) -> Result<FloodAction, Error> {
        let scope = self.lsa_scope(id.ifindex, x.h.ls_type)?;
        let key = x.key();
        let now = self.now;
        let current = self.lookup(scope, &key).cloned();

        // Withdrawal of something nobody holds.
        if x.h.is_maxage() && current.is_none() && !self.nbr_syncing_exists() {
            acks.direct(&x.h);
            return Ok(FloodAction::DirectAckDiscard);
        }

        let Some(current) = current else {
            self.ls_req_satisfy(id, &x.h);
            if key.adv_router == self.router_id {
                // Stale copy of our own from before a restart.
                let mut flushed = x.clone();
                flushed.h.ls_age = MAX_AGE;
                ospf_event_trace!(
                    self.tracing,
                    Flush,
                    "[Flush] unknown self-originated {} from {}",
                    key,
                    id
                );
                self.lsa_install_flood(scope, flushed, None, true)?;
                return Ok(FloodAction::InstallFlood);
            }
            let h = x.h.clone();
            let flooded = self.lsa_install_flood(scope, x, Some(id), false)?;
            self.ls_ack_delayed(id.ifindex, h);
            acks.delayed(key);
            return Ok(if flooded {
                FloodAction::InstallFlood
            } else {
                FloodAction::InstallNoFlood
            });
        };

        let ch = current.header_at(now);
        match lsa_compare(&x.h, &ch, self.config.max_age_diff()) {
            Ordering::Equal => {
                self.ls_req_satisfy(id, &x.h);
                if self.ls_rxmt_remove(id, &key).is_some() {
                    ospf_event_trace!(
                        self.tracing,
                        Flooding,
                        "[Flooding] implicit ack of {} from {}",
                        key,
                        id
                    );
                    self.maxage_remove_check(scope, &key);
                    Ok(FloodAction::Discard)
                } else {
                    acks.direct(&x.h);
                    Ok(FloodAction::AckOnly)
                }
            }
            Ordering::Less => {
                // The database copy is flushed at MaxSequenceNumber and will
                // go away on its own.
                if ch.is_maxage() && ch.ls_seq_number == MAX_SEQUENCE_NUMBER {
                    return Ok(FloodAction::Discard);
                }
                self.lsa_correct(id, &current);
                Ok(FloodAction::Discard)
            }
            Ordering::Greater => {
                self.ls_req_satisfy(id, &x.h);
                let h = x.h.clone();
                if key.adv_router == self.router_id {
                    if ch.is_maxage() {
                        let mut flushed = x;
                        flushed.h.ls_age = MAX_AGE;
                        self.lsa_install_flood(scope, flushed, None, true)?;
                    } else if h.ls_seq_number == MAX_SEQUENCE_NUMBER {
                        // No instance of ours can beat X. Age X out as it is
                        // and restart at InitialSequenceNumber once it is gone.
                        ospf_event_trace!(
                            self.tracing,
                            Flush,
                            "[Flush] {} at MaxSequenceNumber from {}, flushing before wrap",
                            key,
                            id
                        );
                        self.timers.cancel(&TimerEvent::Refresh(scope, key));
                        self.pending
                            .insert((scope, key), (current.h.options, current.body.clone()));
                        let mut flushed = x;
                        flushed.h.ls_age = MAX_AGE;
                        self.lsa_install_flood(scope, flushed, None, true)?;
                    } else {
                        ospf_event_trace!(
                            self.tracing,
                            Originate,
                            "[Originate] {} seq {:#010x} from {} is newer than ours",
                            key,
                            h.ls_seq_number,
                            id
                        );
                        self.lsa_originate_seq(
                            scope,
                            key,
                            current.h.options,
                            current.body.clone(),
                            Some(h.ls_seq_number),
                        )?;
                    }
                    self.ls_ack_delayed(id.ifindex, h);
                    acks.delayed(key);
                    return Ok(FloodAction::InstallFlood);
                }
                let flooded = self.lsa_install_flood(scope, x, Some(id), true)?;
                self.ls_ack_delayed(id.ifindex, h);
                acks.delayed(key);
                Ok(if flooded {
                    FloodAction::InstallFlood
                } else {
                    FloodAction::InstallNoFlood
                })
            }
        }
    }

    // Send the newer database copy straight back to a neighbor that still
    // has our copy outstanding. Paced per neighbor at MinLSArrival.
    fn lsa_correct(&mut self, id: NeighborId, current: &Lsa) {
        let key = current.key();
        let now = self.now;
        let min_ls_arrival = self.config.min_ls_arrival();
        let inf_trans_delay = self.config.inf_trans_delay();
        let Ok(nbr) = self.nbr_mut(id) else {
            return;
        };
        if !nbr.ls_rxmt.contains(&key) {
            return;
        }
        if let Some(last) = nbr.last_correction {
            if now < last + min_ls_arrival {
                return;
            }
        }
        nbr.last_correction = Some(now);
        ospf_event_trace!(
            self.tracing,
            Flooding,
            "[Flooding] older {} from {}, sending database copy",
            key,
            id
        );
        let lsa = current.for_send(now, inf_trans_delay);
        self.send(Packet::LsUpdate(vec![lsa]), id.ifindex, Some(id.addr));
    }

    /// Install an instance and flood it through its scope. `from` is the
    /// neighbor it arrived from, `None` for local origination or flush.
    /// Returns whether the instance went out on any interface.
    pub fn lsa_install_flood(
        &mut self,
        scope: Scope,
        lsa: Lsa,
        from: Option<NeighborId>,
        flood_back: bool,
    ) -> Result<bool, Error> {
        let key = lsa.key();
        self.lsdb_install(scope, lsa.clone())?;
        self.rxmt_reconcile(scope, &lsa, from);
        let flooded = self.ospf_flood(scope, &lsa, from, flood_back);
        self.maxage_remove_check(scope, &key);
        Ok(flooded)
    }

    // Point every outstanding retransmission of the identity at the new
    // instance. The sender and neighbors that stopped flooding lose theirs.
    fn rxmt_reconcile(&mut self, scope: Scope, lsa: &Lsa, from: Option<NeighborId>) {
        let key = lsa.key();
        let mut emptied = vec![];
        for link in self.links.values_mut() {
            if !link.is_in_scope(scope) {
                continue;
            }
            for nbr in link.nbrs.values_mut() {
                let keep = nbr.is_flooding() && Some(nbr.id) != from;
                if keep {
                    if let Some(entry) = nbr.ls_rxmt.get_mut(&key) {
                        entry.lsa = lsa.clone();
                    }
                } else if nbr.ls_rxmt.remove(&key).is_some() && nbr.ls_rxmt.is_empty() {
                    emptied.push(nbr.id);
                }
            }
        }
        for id in emptied {
            self.timers.cancel(&TimerEvent::Rxmt(id));
        }
    }

    /// Add the instance to the retransmission list of every eligible
    /// neighbor in scope and multicast it on each interface that gained an
    /// entry.
    pub fn ospf_flood(
        &mut self,
        scope: Scope,
        lsa: &Lsa,
        from: Option<NeighborId>,
        flood_back: bool,
    ) -> bool {
        let key = lsa.key();
        let now = self.now;
        let max_age_diff = self.config.max_age_diff();
        let deadline = now + self.config.rxmt_interval();
        let h = lsa.header_at(now);

        let mut added = vec![];
        let mut req_done = vec![];
        let mut links = vec![];
        for link in self.links.values_mut() {
            if !link.is_in_scope(scope) {
                continue;
            }
            let receiving = from.is_some_and(|id| id.ifindex == link.index);
            if receiving && (!flood_back || link.flooding_nbr_count() <= 1) {
                continue;
            }
            let mut flooded = false;
            for nbr in link.nbrs.values_mut() {
                if !nbr.is_flooding() || Some(nbr.id) == from {
                    continue;
                }
                if nbr.is_syncing() {
                    if let Some(req) = nbr.ls_req.get(&key) {
                        let cmp = lsa_compare(&h, req, max_age_diff);
                        if cmp != Ordering::Less {
                            nbr.ls_req.remove(&key);
                            req_done.push(nbr.id);
                        }
                        if cmp != Ordering::Greater {
                            continue;
                        }
                    }
                }
                nbr.ls_rxmt.add(lsa.clone(), deadline);
                added.push(nbr.id);
                flooded = true;
            }
            if flooded {
                links.push(link.index);
            }
        }

        for id in added {
            self.timers.arm_if_idle(TimerEvent::Rxmt(id), deadline);
        }
        for id in req_done {
            self.ls_req_check_empty(id);
        }
        if links.is_empty() {
            return false;
        }
        ospf_event_trace!(
            self.tracing,
            Flooding,
            "[Flooding] {} seq {:#010x} age {} in {} on {} interface(s)",
            key,
            h.ls_seq_number,
            h.ls_age,
            scope,
            links.len()
        );
        let inf_trans_delay = self.config.inf_trans_delay();
        for ifindex in links {
            let lsa = lsa.for_send(now, inf_trans_delay);
            self.send(Packet::LsUpdate(vec![lsa]), ifindex, None);
        }
        true
    }

    /// Link State Acknowledgment. An ack removes the retransmission entry
    /// only when it names the exact instance outstanding.
    pub fn on_receive_ack(&mut self, id: NeighborId, headers: Vec<LsaHeader>) -> Result<(), Error> {
        let nbr = self.nbr(id)?;
        if !nbr.is_flooding() {
            return Ok(());
        }
        ospf_packet_trace!(
            self.tracing,
            LsAck,
            Recv,
            "[LS Ack] {} header(s) from {}",
            headers.len(),
            id
        );

        let now = self.now;
        let max_age_diff = self.config.max_age_diff();
        for h in headers {
            let key = h.key();
            let matched = self
                .nbr(id)
                .ok()
                .and_then(|nbr| nbr.ls_rxmt.get(&key))
                .is_some_and(|entry| {
                    lsa_compare(&h, &entry.lsa.header_at(now), max_age_diff) == Ordering::Equal
                });
            if !matched {
                ospf_debug!("LS Ack for {} from {} does not match", key, id);
                continue;
            }
            self.ls_rxmt_remove(id, &key);
            if let Ok(scope) = self.lsa_scope(id.ifindex, key.ls_type) {
                self.maxage_remove_check(scope, &key);
            }
        }
        Ok(())
    }
}
