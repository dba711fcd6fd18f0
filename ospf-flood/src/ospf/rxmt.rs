use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Keys;

use super::error::Error;
use super::inst::Ospf;
use super::lsa::{Lsa, LsaKey, lsa_compare};
use super::neigh::NeighborId;
use super::packet::Packet;
use super::timer::{Tick, TimerEvent};
use crate::ospf_event_trace;

/// Snapshot of an instance sent to a neighbor and not yet acknowledged.
#[derive(Debug, Clone)]
pub struct RxmtEntry {
    pub lsa: Lsa,
    pub deadline: Tick,
}

#[derive(Debug, Default)]
pub struct RxmtList {
    map: BTreeMap<LsaKey, RxmtEntry>,
}

impl RxmtList {
    /// Idempotent on identity: a newer snapshot replaces the older one.
    pub fn add(&mut self, lsa: Lsa, deadline: Tick) -> Option<RxmtEntry> {
        self.map.insert(lsa.key(), RxmtEntry { lsa, deadline })
    }

    pub fn remove(&mut self, key: &LsaKey) -> Option<RxmtEntry> {
        self.map.remove(key)
    }

    pub fn get(&self, key: &LsaKey) -> Option<&RxmtEntry> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &LsaKey) -> Option<&mut RxmtEntry> {
        self.map.get_mut(key)
    }

    pub fn contains(&self, key: &LsaKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> Keys<'_, LsaKey, RxmtEntry> {
        self.map.keys()
    }

    pub fn due(&self, now: Tick) -> Vec<LsaKey> {
        self.map
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        self.map.values().map(|entry| entry.deadline).min()
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
    pub fn ls_rxmt_add(&mut self, id: NeighborId, lsa: Lsa) -> Result<(), Error> {
        let deadline = self.now + self.config.rxmt_interval();
        let nbr = self.nbr_mut(id)?;
        nbr.ls_rxmt.add(lsa, deadline);
        self.timers.arm_if_idle(TimerEvent::Rxmt(id), deadline);
        Ok(())
    }

    pub fn ls_rxmt_remove(&mut self, id: NeighborId, key: &LsaKey) -> Option<Lsa> {
        let nbr = self.nbr_mut(id).ok()?;
        let entry = nbr.ls_rxmt.remove(key)?;
        if nbr.ls_rxmt.is_empty() {
            self.timers.cancel(&TimerEvent::Rxmt(id));
        }
        Some(entry.lsa)
    }

    /// Retransmission timer. Due entries are re-sent using the database copy
    /// as it stands now; entries the database no longer backs are dropped.
    pub fn ls_rxmt_timer(&mut self, id: NeighborId) {
        let now = self.now;
        let max_age_diff = self.config.max_age_diff();
        let rxmt_interval = self.config.rxmt_interval();
        let inf_trans_delay = self.config.inf_trans_delay();

        let due = match self.nbr(id) {
            Ok(nbr) if nbr.is_flooding() && !nbr.ls_rxmt.is_empty() => nbr.ls_rxmt.due(now),
            _ => return,
        };

        let mut lsas = vec![];
        for key in due {
            let current = self
                .lsa_scope(id.ifindex, key.ls_type)
                .ok()
                .and_then(|scope| self.lookup(scope, &key))
                .cloned();
            let Ok(nbr) = self.nbr_mut(id) else {
                return;
            };
            let Some(entry) = nbr.ls_rxmt.get_mut(&key) else {
                continue;
            };
            let Some(current) = current else {
                nbr.ls_rxmt.remove(&key);
                continue;
            };
            match lsa_compare(&current.header_at(now), &entry.lsa.header_at(now), max_age_diff) {
                Ordering::Less => {
                    nbr.ls_rxmt.remove(&key);
                    continue;
                }
                Ordering::Greater => {
                    entry.lsa = current.clone();
                }
                Ordering::Equal => {}
            }
            entry.deadline = now + rxmt_interval;
            lsas.push(current.for_send(now, inf_trans_delay));
        }

        if !lsas.is_empty() {
            ospf_event_trace!(
                self.tracing,
                Retransmit,
                "[Retransmit] {} LSA(s) to {}",
                lsas.len(),
                id
            );
            self.send(Packet::LsUpdate(lsas), id.ifindex, Some(id.addr));
        }

        let next = self.nbr(id).ok().and_then(|nbr| nbr.ls_rxmt.next_deadline());
        if let Some(next) = next {
            self.timers.arm(TimerEvent::Rxmt(id), next.max(now + 1));
        }
    }
}
