use std::net::Ipv4Addr;

use bytes::Bytes;

use super::error::Error;
use super::inst::Ospf;
use super::lsa::{
    INITIAL_SEQUENCE_NUMBER, Lsa, LsaHeader, LsaKey, MAX_AGE, MAX_SEQUENCE_NUMBER, OspfLsType,
};
use super::lsdb::Scope;
use super::timer::TimerEvent;
use crate::{ospf_error, ospf_event_trace, ospf_info};

impl Ospf {
    /// Originate a new instance of a self-originated LSA, or replace the
    /// content of the current one.
    pub fn originate(
        &mut self,
        scope: Scope,
        ls_type: OspfLsType,
        ls_id: Ipv4Addr,
        body: Bytes,
    ) -> Result<(), Error> {
        let key = LsaKey::new(ls_type, ls_id, self.router_id);
        if let Err(err) = self.scope_check(scope, &key) {
            ospf_error!("Originate {}: {}", key, err);
            return Err(err);
        }
        // Flushed at MaxSequenceNumber; the new content goes out once the
        // old instance is gone.
        if let Some(pending) = self.pending.get_mut(&(scope, key)) {
            pending.1 = body;
            return Ok(());
        }
        let (options, prev) = match self.lookup(scope, &key) {
            Some(current) => (current.h.options, Some(current.h.ls_seq_number)),
            None => (0, None),
        };
        self.lsa_originate_seq(scope, key, options, body, prev)
    }

    /// Periodic refresh of a self-originated LSA at LSRefreshTime.
    pub fn refresh(&mut self, scope: Scope, key: LsaKey) -> Result<(), Error> {
        let now = self.now;
        let Some(current) = self.lookup(scope, &key).cloned() else {
            return Ok(());
        };
        if key.adv_router != self.router_id || current.is_maxage(now) {
            return Ok(());
        }
        ospf_event_trace!(
            self.tracing,
            Refresh,
            "[Refresh] {} seq {:#010x}",
            key,
            current.h.ls_seq_number
        );
        self.lsa_originate_seq(
            scope,
            key,
            current.h.options,
            current.body,
            Some(current.h.ls_seq_number),
        )
    }

    /// Originate the instance following `prev`. Reaching MaxSequenceNumber
    /// flushes the identity instead and parks the content until the flushed
    /// instance has left the database.
    pub fn lsa_originate_seq(
        &mut self,
        scope: Scope,
        key: LsaKey,
        options: u8,
        body: Bytes,
        prev: Option<i32>,
    ) -> Result<(), Error> {
        let now = self.now;
        let seq = match prev {
            Some(prev) => prev.saturating_add(1),
            None => INITIAL_SEQUENCE_NUMBER,
        };
        let mut h = LsaHeader::new(key.ls_type, key.ls_id, key.adv_router);
        h.options = options;
        h.ls_seq_number = seq;

        if seq == MAX_SEQUENCE_NUMBER {
            h.ls_age = MAX_AGE;
            let lsa = Lsa::originate(h, body.clone(), now);
            self.timers.cancel(&TimerEvent::Refresh(scope, key));
            self.pending.insert((scope, key), (options, body));
            ospf_event_trace!(
                self.tracing,
                Flush,
                "[Flush] {} reached MaxSequenceNumber, flushing before wrap",
                key
            );
            self.lsa_install_flood(scope, lsa, None, true)?;
            return Ok(());
        }

        let lsa = Lsa::originate(h, body, now);
        ospf_event_trace!(
            self.tracing,
            Originate,
            "[Originate] {} in {} seq {:#010x}",
            key,
            scope,
            seq
        );
        self.lsa_install_flood(scope, lsa, None, true)?;
        let at = now + self.config.ls_refresh_time();
        self.timers.arm(TimerEvent::Refresh(scope, key), at);
        Ok(())
    }

    /// Called when an identity leaves the database. A wrapped LSA restarts
    /// at InitialSequenceNumber.
    pub fn reoriginate_pending(&mut self, scope: Scope, key: &LsaKey) {
        let Some((options, body)) = self.pending.remove(&(scope, *key)) else {
            return;
        };
        ospf_info!("Re-originating {} at InitialSequenceNumber", key);
        if let Err(err) = self.lsa_originate_seq(scope, *key, options, body, None) {
            ospf_error!("Re-originate {}: {}", key, err);
        }
    }

    /// Premature aging: the current instance is installed with MaxAge, its
    /// sequence and checksum unchanged, and flooded through the scope.
    pub fn flush(&mut self, scope: Scope, key: LsaKey) -> Result<(), Error> {
        if let Err(err) = self.scope_check(scope, &key) {
            ospf_error!("Flush {}: {}", key, err);
            return Err(err);
        }
        let now = self.now;
        self.timers.cancel(&TimerEvent::Refresh(scope, key));
        self.pending.remove(&(scope, key));

        let Some(mut lsa) = self.lookup(scope, &key).cloned() else {
            return Ok(());
        };
        if lsa.h.is_maxage() {
            return Ok(());
        }
        lsa.h.ls_age = MAX_AGE;
        lsa.recv = now;
        ospf_event_trace!(self.tracing, Flush, "[Flush] {} in {}", key, scope);
        self.lsa_install_flood(scope, lsa, None, true)?;
        Ok(())
    }

    pub fn flush_area(&mut self, area_id: Ipv4Addr, key: LsaKey) -> Result<(), Error> {
        self.flush(Scope::Area(area_id), key)
    }

    pub fn flush_domain(&mut self, key: LsaKey) -> Result<(), Error> {
        self.flush(Scope::As, key)
    }

    /// Flush every self-originated LSA in every scope.
    pub fn flush_all(&mut self) -> Result<(), Error> {
        for scope in self.scopes() {
            let keys = self.lsdb(scope)?.self_originated_keys(self.router_id);
            for key in keys {
                self.flush(scope, key)?;
            }
        }
        Ok(())
    }

    pub fn area_add(&mut self, area_id: Ipv4Addr) {
        self.areas.fetch(area_id);
    }

    /// Withdraw our LSAs from the area and from its interfaces before they
    /// go away.
    pub fn area_remove(&mut self, area_id: Ipv4Addr) -> Result<(), Error> {
        let scope = Scope::Area(area_id);
        let keys = self.lsdb(scope)?.self_originated_keys(self.router_id);
        for key in keys {
            self.flush(scope, key)?;
        }
        let links: Vec<u32> = self
            .areas
            .get(area_id)
            .map(|area| area.links.iter().copied().collect())
            .unwrap_or_default();
        for ifindex in links.iter().copied() {
            let scope = Scope::Link(ifindex);
            let keys = self.lsdb(scope)?.self_originated_keys(self.router_id);
            for key in keys {
                self.flush(scope, key)?;
            }
        }
        for ifindex in links {
            self.link_remove(ifindex)?;
        }
        self.pending.retain(|(pending, _), _| *pending != scope);
        self.areas.remove(area_id);
        ospf_info!("Area {} removed", area_id);
        Ok(())
    }

    /// Remove a MaxAge instance once no neighbor has it outstanding and no
    /// database exchange is in progress.
    pub fn maxage_remove_check(&mut self, scope: Scope, key: &LsaKey) -> bool {
        let now = self.now;
        match self.lookup(scope, key) {
            Some(lsa) if lsa.is_maxage(now) => {}
            _ => return false,
        }
        if self.nbr_syncing_exists() {
            return false;
        }
        let outstanding = self.scope_nbrs(scope).into_iter().any(|id| {
            self.nbr(id)
                .map(|nbr| nbr.ls_rxmt.contains(key))
                .unwrap_or(false)
        });
        if outstanding {
            return false;
        }
        ospf_event_trace!(self.tracing, MaxAge, "[MaxAge] remove {} from {}", key, scope);
        self.lsdb_remove(scope, key);
        true
    }

    pub fn maxage_remove_all(&mut self) {
        if self.nbr_syncing_exists() {
            return;
        }
        let now = self.now;
        for scope in self.scopes() {
            let Ok(lsdb) = self.lsdb(scope) else {
                continue;
            };
            for key in lsdb.maxage_keys(now) {
                self.maxage_remove_check(scope, &key);
            }
        }
    }

    /// Refloods instances that aged out on their own and removes MaxAge
    /// instances nobody waits for any more.
    pub fn maxage_walker(&mut self) {
        let now = self.now;
        for scope in self.scopes() {
            let Ok(lsdb) = self.lsdb(scope) else {
                continue;
            };
            for key in lsdb.maxage_keys(now) {
                let Some(mut lsa) = self.lookup(scope, &key).cloned() else {
                    continue;
                };
                if lsa.h.is_maxage() {
                    self.maxage_remove_check(scope, &key);
                    continue;
                }
                ospf_event_trace!(self.tracing, MaxAge, "[MaxAge] {} aged out", key);
                self.timers.cancel(&TimerEvent::Refresh(scope, key));
                lsa.h.ls_age = MAX_AGE;
                lsa.recv = now;
                if let Err(err) = self.lsa_install_flood(scope, lsa, None, true) {
                    ospf_error!("MaxAge {}: {}", key, err);
                }
            }
        }
        let at = now + self.config.maxage_walker_interval();
        self.timers.arm(TimerEvent::MaxAgeWalker, at);
    }
}
