use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use super::error::Error;
use super::inst::Ospf;
use super::lsa::LsaHeader;
use super::lsdb::{Lsdb, Scope};
use super::neigh::{Neighbor, NeighborId};
use super::packet::Packet;
use super::timer::TimerEvent;
use crate::ospf_packet_trace;

pub struct OspfLink {
    pub index: u32,
    pub name: String,
    pub area: Ipv4Addr,
    pub nbrs: BTreeMap<Ipv4Addr, Neighbor>,
    // Link-local scope LSAs.
    pub lsdb: Lsdb,
    // Pending delayed acknowledgments.
    pub ls_ack: Vec<LsaHeader>,
}

impl OspfLink {
    pub fn new(index: u32, name: &str, area: Ipv4Addr) -> Self {
        Self {
            index,
            name: name.to_owned(),
            area,
            nbrs: BTreeMap::new(),
            lsdb: Lsdb::new(),
            ls_ack: Vec::new(),
        }
    }

    pub fn flooding_nbr_count(&self) -> usize {
        self.nbrs.values().filter(|nbr| nbr.is_flooding()).count()
    }

    pub fn is_in_scope(&self, scope: Scope) -> bool {
        match scope {
            Scope::Link(ifindex) => self.index == ifindex,
            Scope::Area(area_id) => self.area == area_id,
            Scope::As => true,
        }
    }
}

impl Ospf {
    pub fn link_add(&mut self, ifindex: u32, name: &str, area_id: Ipv4Addr) -> Result<(), Error> {
        let area = self
            .areas
            .get_mut(area_id)
            .ok_or(Error::UnknownArea(area_id))?;
        area.links.insert(ifindex);
        self.links
            .entry(ifindex)
            .or_insert_with(|| OspfLink::new(ifindex, name, area_id));
        Ok(())
    }

    pub fn link_remove(&mut self, ifindex: u32) -> Result<(), Error> {
        let link = self.links.get(&ifindex).ok_or(Error::UnknownLink(ifindex))?;
        let area_id = link.area;
        let nbrs: Vec<NeighborId> = link.nbrs.values().map(|nbr| nbr.id).collect();
        for id in nbrs {
            self.nbr_teardown(id)?;
        }
        self.timers.cancel(&TimerEvent::AckDelay(ifindex));
        self.links.remove(&ifindex);
        if let Some(area) = self.areas.get_mut(area_id) {
            area.links.remove(&ifindex);
        }
        Ok(())
    }

    /// Queue an acknowledgment to go out with the next delayed LS Ack on the
    /// interface.
    pub fn ls_ack_delayed(&mut self, ifindex: u32, h: LsaHeader) {
        let at = self.now + self.config.ack_delay();
        let Some(link) = self.links.get_mut(&ifindex) else {
            return;
        };
        if !link.ls_ack.contains(&h) {
            link.ls_ack.push(h);
        }
        self.timers.arm_if_idle(TimerEvent::AckDelay(ifindex), at);
    }

    pub fn ls_ack_timer(&mut self, ifindex: u32) {
        let Some(link) = self.links.get_mut(&ifindex) else {
            return;
        };
        if link.ls_ack.is_empty() {
            return;
        }
        let acks = std::mem::take(&mut link.ls_ack);
        ospf_packet_trace!(
            self.tracing,
            LsAck,
            Send,
            "[LS Ack] delayed {} header(s) on ifindex {}",
            acks.len(),
            ifindex
        );
        self.send(Packet::LsAck(acks), ifindex, None);
    }

    pub fn ls_ack_direct(&self, id: NeighborId, acks: Vec<LsaHeader>) {
        ospf_packet_trace!(
            self.tracing,
            LsAck,
            Send,
            "[LS Ack] direct {} header(s) to {}",
            acks.len(),
            id
        );
        self.send(Packet::LsAck(acks), id.ifindex, Some(id.addr));
    }
}
