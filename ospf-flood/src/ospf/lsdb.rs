use std::collections::BTreeMap;
use std::collections::btree_map::{Iter, Values};
use std::fmt::Display;
use std::net::Ipv4Addr;

use super::error::Error;
use super::inst::Ospf;
use super::lsa::{FloodScope, Lsa, LsaKey, OspfLsType};
use super::timer::Tick;
use crate::ospf_database_trace;

/// Concrete flooding domain an LSDB belongs to.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Scope {
    Link(u32),
    Area(Ipv4Addr),
    As,
}

impl Scope {
    pub fn kind(&self) -> FloodScope {
        match self {
            Scope::Link(_) => FloodScope::Link,
            Scope::Area(_) => FloodScope::Area,
            Scope::As => FloodScope::As,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Link(ifindex) => write!(f, "link {ifindex}"),
            Scope::Area(area_id) => write!(f, "area {area_id}"),
            Scope::As => write!(f, "as"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Lsdb {
    map: BTreeMap<LsaKey, Lsa>,
}

impl Lsdb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LsaKey) -> Option<&Lsa> {
        self.map.get(key)
    }

    /// Replace the current instance, returning the previous one.
    pub fn install(&mut self, lsa: Lsa) -> Option<Lsa> {
        self.map.insert(lsa.key(), lsa)
    }

    pub fn remove(&mut self, key: &LsaKey) -> Option<Lsa> {
        self.map.remove(key)
    }

    pub fn contains_key(&self, key: &LsaKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn iter(&self) -> Iter<'_, LsaKey, Lsa> {
        self.map.iter()
    }

    pub fn values(&self) -> Values<'_, LsaKey, Lsa> {
        self.map.values()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn maxage_keys(&self, now: Tick) -> Vec<LsaKey> {
        self.map
            .values()
            .filter(|lsa| lsa.is_maxage(now))
            .map(|lsa| lsa.key())
            .collect()
    }

    pub fn self_originated_keys(&self, router_id: Ipv4Addr) -> Vec<LsaKey> {
        self.map
            .keys()
            .filter(|key| key.adv_router == router_id)
            .copied()
            .collect()
    }
}

impl Ospf {
    /// Resolve the LSDB an LS type belongs to as seen from an interface.
    pub fn lsa_scope(&self, ifindex: u32, ls_type: OspfLsType) -> Result<Scope, Error> {
        let link = self.links.get(&ifindex).ok_or(Error::UnknownLink(ifindex))?;
        match ls_type.flood_scope() {
            Some(FloodScope::Link) => Ok(Scope::Link(ifindex)),
            Some(FloodScope::Area) => Ok(Scope::Area(link.area)),
            Some(FloodScope::As) => Ok(Scope::As),
            None => Err(Error::UnknownScope { ls_type }),
        }
    }

    pub fn scope_check(&self, scope: Scope, key: &LsaKey) -> Result<(), Error> {
        let expected = key.ls_type.flood_scope().ok_or(Error::UnknownScope {
            ls_type: key.ls_type,
        })?;
        if expected != scope.kind() {
            return Err(Error::ScopeMismatch {
                key: *key,
                expected,
                scope,
            });
        }
        self.lsdb(scope).map(|_| ())
    }

    pub fn lsdb(&self, scope: Scope) -> Result<&Lsdb, Error> {
        match scope {
            Scope::Link(ifindex) => self
                .links
                .get(&ifindex)
                .map(|link| &link.lsdb)
                .ok_or(Error::UnknownLink(ifindex)),
            Scope::Area(area_id) => self
                .areas
                .get(area_id)
                .map(|area| &area.lsdb)
                .ok_or(Error::UnknownArea(area_id)),
            Scope::As => Ok(&self.lsdb_as),
        }
    }

    pub fn lsdb_mut(&mut self, scope: Scope) -> Result<&mut Lsdb, Error> {
        match scope {
            Scope::Link(ifindex) => self
                .links
                .get_mut(&ifindex)
                .map(|link| &mut link.lsdb)
                .ok_or(Error::UnknownLink(ifindex)),
            Scope::Area(area_id) => self
                .areas
                .get_mut(area_id)
                .map(|area| &mut area.lsdb)
                .ok_or(Error::UnknownArea(area_id)),
            Scope::As => Ok(&mut self.lsdb_as),
        }
    }

    pub fn lookup(&self, scope: Scope, key: &LsaKey) -> Option<&Lsa> {
        self.lsdb(scope).ok()?.get(key)
    }

    pub fn scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.links.keys().map(|ifindex| Scope::Link(*ifindex)).collect();
        scopes.extend(self.areas.iter().map(|area| Scope::Area(area.area_id)));
        scopes.push(Scope::As);
        scopes
    }

    pub fn lsdb_install(&mut self, scope: Scope, lsa: Lsa) -> Result<Option<Lsa>, Error> {
        let key = lsa.key();
        let now = self.now;
        let incoming = lsa.clone();
        let prev = self.lsdb_mut(scope)?.install(lsa);

        let changed = match &prev {
            Some(prev) => !prev.same_content(&incoming),
            None => true,
        };
        ospf_database_trace!(
            self.tracing,
            Lsdb,
            "[LSDB] install {} in {} seq {:#010x} age {} changed {}",
            key,
            scope,
            incoming.h.ls_seq_number,
            incoming.age(now),
            changed
        );
        if changed {
            self.observer.lsdb_changed(scope, key);
        }
        Ok(prev)
    }

    pub fn lsdb_remove(&mut self, scope: Scope, key: &LsaKey) -> Option<Lsa> {
        let lsa = self.lsdb_mut(scope).ok()?.remove(key)?;
        ospf_database_trace!(self.tracing, Lsdb, "[LSDB] remove {} from {}", key, scope);
        self.observer.lsdb_changed(scope, *key);
        self.reoriginate_pending(scope, key);
        Some(lsa)
    }

    /// Current instances of one scope for a full route recomputation. Ages
    /// are those at the time of the call.
    pub fn snapshot_lsdb(&self, scope: Scope) -> Result<Vec<Lsa>, Error> {
        let now = self.now;
        Ok(self
            .lsdb(scope)?
            .values()
            .map(|lsa| {
                let mut lsa = lsa.clone();
                lsa.h.ls_age = lsa.age(now);
                lsa.recv = now;
                lsa
            })
            .collect())
    }
}
