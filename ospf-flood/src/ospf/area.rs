use std::collections::btree_map::Values;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use super::lsdb::Lsdb;

#[derive(Debug, Default)]
pub struct OspfAreaMap {
    map: BTreeMap<Ipv4Addr, OspfArea>,
}

impl OspfAreaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, area_id: Ipv4Addr) -> Option<&OspfArea> {
        self.map.get(&area_id)
    }

    pub fn get_mut(&mut self, area_id: Ipv4Addr) -> Option<&mut OspfArea> {
        self.map.get_mut(&area_id)
    }

    pub fn fetch(&mut self, area_id: Ipv4Addr) -> &mut OspfArea {
        self.map
            .entry(area_id)
            .or_insert_with(|| OspfArea::new(area_id))
    }

    pub fn remove(&mut self, area_id: Ipv4Addr) -> Option<OspfArea> {
        self.map.remove(&area_id)
    }

    pub fn iter(&self) -> Values<'_, Ipv4Addr, OspfArea> {
        self.map.values()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

#[derive(Debug)]
pub struct OspfArea {
    pub area_id: Ipv4Addr,
    pub links: BTreeSet<u32>,
    pub lsdb: Lsdb,
}

impl OspfArea {
    pub fn new(area_id: Ipv4Addr) -> Self {
        Self {
            area_id,
            links: BTreeSet::new(),
            lsdb: Lsdb::new(),
        }
    }
}
