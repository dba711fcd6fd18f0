//! In-process network of flooding engines.
//!
//! Routers are wired by point-to-point links. Each link end is an interface
//! whose only neighbor is the router at the other end, addressed by its
//! router ID. Packets are delivered synchronously at the end of every
//! logical second and may be dropped with a fixed, seeded probability.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::ospf::{
    Error, LsaKey, NeighborId, NfsmState, Notification, Ospf, OspfConfig, OspfLsType,
    PacketMessage, Scope,
};
use crate::{ospf_debug, ospf_warn};

// Deliveries that may cascade within one second before the rest waits for
// the next step.
const DELIVERY_ROUNDS: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Topology {
    pub routers: Vec<Ipv4Addr>,
    pub links: Vec<(Ipv4Addr, Ipv4Addr)>,
    #[serde(default)]
    pub area: Option<Ipv4Addr>,
    #[serde(default)]
    pub loss: f64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub ospf: OspfConfig,
}

const DEFAULT_DURATION: u64 = 60;

impl Topology {
    pub fn area(&self) -> Ipv4Addr {
        self.area.unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    pub fn duration(&self) -> u64 {
        self.duration.unwrap_or(DEFAULT_DURATION)
    }
}

pub struct Router {
    pub ospf: Ospf,
    pub rx: UnboundedReceiver<PacketMessage>,
    pub notify: UnboundedReceiver<Notification>,
    pub lsdb_changes: usize,
}

impl Router {
    pub fn new(router_id: Ipv4Addr, config: OspfConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ntx, notify) = mpsc::unbounded_channel();
        Self {
            ospf: Ospf::new(router_id, config, Box::new(tx), Box::new(ntx)),
            rx,
            notify,
            lsdb_changes: 0,
        }
    }

    fn drain_notify(&mut self) {
        while let Ok(msg) = self.notify.try_recv() {
            if let Notification::LsdbChanged(..) = msg {
                self.lsdb_changes += 1;
            }
        }
    }
}

pub struct Fabric {
    pub area: Ipv4Addr,
    pub routers: BTreeMap<Ipv4Addr, Router>,
    // Link end (router, ifindex) to the opposite end.
    wires: BTreeMap<(Ipv4Addr, u32), (Ipv4Addr, u32)>,
    rng: StdRng,
    loss: f64,
    pub delivered: usize,
    pub dropped: usize,
}

impl Fabric {
    pub fn new(area: Ipv4Addr, loss: f64, seed: u64) -> Self {
        Self {
            area,
            routers: BTreeMap::new(),
            wires: BTreeMap::new(),
            rng: StdRng::seed_from_u64(seed),
            loss: loss.clamp(0.0, 1.0),
            delivered: 0,
            dropped: 0,
        }
    }

    pub fn from_topology(topo: &Topology) -> Result<Self, Error> {
        let mut fabric = Fabric::new(topo.area(), topo.loss, topo.seed);
        for router_id in topo.routers.iter() {
            fabric.add_router(*router_id, topo.ospf.clone());
        }
        for (a, b) in topo.links.iter() {
            fabric.connect(*a, *b)?;
        }
        Ok(fabric)
    }

    pub fn add_router(&mut self, router_id: Ipv4Addr, config: OspfConfig) {
        let mut router = Router::new(router_id, config);
        router.ospf.area_add(self.area);
        self.routers.insert(router_id, router);
    }

    fn router_mut(&mut self, router_id: Ipv4Addr) -> Result<&mut Router, Error> {
        self.routers
            .get_mut(&router_id)
            .ok_or(Error::UnknownRouter(router_id))
    }

    /// Wire two routers together and bring the adjacency to Full on both
    /// ends.
    pub fn connect(&mut self, a: Ipv4Addr, b: Ipv4Addr) -> Result<(u32, u32), Error> {
        let area = self.area;
        let a_if = self.router_mut(a)?.ospf.links.len() as u32 + 1;
        let b_if = self.router_mut(b)?.ospf.links.len() as u32 + 1;

        for (local, ifindex, peer) in [(a, a_if, b), (b, b_if, a)] {
            let ospf = &mut self.router_mut(local)?.ospf;
            ospf.link_add(ifindex, &format!("p2p{ifindex}"), area)?;
            let id = NeighborId::new(ifindex, peer);
            ospf.nbr_add(id, peer)?;
            ospf.nbr_state_change(id, NfsmState::Full)?;
        }
        self.wires.insert((a, a_if), (b, b_if));
        self.wires.insert((b, b_if), (a, a_if));
        Ok((a_if, b_if))
    }

    /// Take both ends of a link down.
    pub fn disconnect(&mut self, a: Ipv4Addr, a_if: u32) -> Result<(), Error> {
        let Some((b, b_if)) = self.wires.remove(&(a, a_if)) else {
            return Ok(());
        };
        self.wires.remove(&(b, b_if));
        let id = NeighborId::new(a_if, b);
        self.router_mut(a)?.ospf.nbr_teardown(id)?;
        let id = NeighborId::new(b_if, a);
        self.router_mut(b)?.ospf.nbr_teardown(id)?;
        Ok(())
    }

    /// Originate one router LSA per router.
    pub fn originate_router_lsas(&mut self) -> Result<(), Error> {
        let scope = Scope::Area(self.area);
        for (router_id, router) in self.routers.iter_mut() {
            let links = router.ospf.links.len() as u16;
            let mut body = vec![0u8, 0];
            body.extend_from_slice(&links.to_be_bytes());
            router
                .ospf
                .originate(scope, OspfLsType::Router, *router_id, Bytes::from(body))?;
        }
        Ok(())
    }

    /// Deliver everything queued so far, including what the deliveries
    /// themselves trigger.
    pub fn deliver(&mut self) {
        for _ in 0..DELIVERY_ROUNDS {
            let mut queued = vec![];
            for (router_id, router) in self.routers.iter_mut() {
                while let Ok(msg) = router.rx.try_recv() {
                    queued.push((*router_id, msg));
                }
                router.drain_notify();
            }
            if queued.is_empty() {
                return;
            }
            for (src, PacketMessage::Send(packet, ifindex, dst)) in queued {
                let Some(&(peer, peer_if)) = self.wires.get(&(src, ifindex)) else {
                    continue;
                };
                if dst.is_some_and(|addr| addr != peer) {
                    continue;
                }
                if self.loss > 0.0 && self.rng.random_bool(self.loss) {
                    ospf_debug!("sim: dropped packet {} -> {}", src, peer);
                    self.dropped += 1;
                    continue;
                }
                self.delivered += 1;
                let Some(router) = self.routers.get_mut(&peer) else {
                    continue;
                };
                if let Err(err) = router.ospf.recv(NeighborId::new(peer_if, src), packet) {
                    ospf_warn!("sim: {} rejected packet from {}: {}", peer, src, err);
                }
            }
        }
    }

    /// One logical second on every router followed by delivery.
    pub fn step(&mut self) {
        for router in self.routers.values_mut() {
            router.ospf.advance(1);
        }
        self.deliver();
    }

    pub fn run(&mut self, secs: u64) {
        self.deliver();
        for _ in 0..secs {
            self.step();
        }
    }

    /// Every router holds the same instance of every area LSA.
    pub fn converged(&self) -> bool {
        let scope = Scope::Area(self.area);
        let mut views = self.routers.values().map(|router| {
            router.ospf.lsdb(scope).map(|lsdb| {
                lsdb.iter()
                    .map(|(key, lsa)| (*key, lsa.h.ls_seq_number, lsa.h.ls_checksum))
                    .collect::<Vec<(LsaKey, i32, u16)>>()
            })
        });
        let first = match views.next() {
            None => return true,
            Some(Err(_)) => return false,
            Some(Ok(first)) => first,
        };
        views.all(|view| view.is_ok_and(|view| view == first))
    }

    /// Nothing waits for an acknowledgment anywhere.
    pub fn quiescent(&self) -> bool {
        self.routers.values().all(|router| {
            router
                .ospf
                .links
                .values()
                .flat_map(|link| link.nbrs.values())
                .all(|nbr| nbr.ls_rxmt.is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(n, n, n, n)
    }

    #[test]
    fn topology_from_yaml() {
        let yaml = r#"
routers: [1.1.1.1, 2.2.2.2]
links:
  - [1.1.1.1, 2.2.2.2]
loss: 0.1
seed: 7
ospf:
  rxmt-interval: 2
"#;
        let topo: Topology = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(topo.routers.len(), 2);
        assert_eq!(topo.area(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(topo.duration(), 60);
        assert_eq!(topo.ospf.rxmt_interval(), 2);
    }

    #[test]
    fn two_routers_converge() {
        let mut fabric = Fabric::new(Ipv4Addr::UNSPECIFIED, 0.0, 1);
        fabric.add_router(rid(1), OspfConfig::default());
        fabric.add_router(rid(2), OspfConfig::default());
        assert_eq!(fabric.connect(rid(1), rid(2)).unwrap(), (1, 1));
        fabric.originate_router_lsas().unwrap();
        fabric.run(3);
        assert!(fabric.converged());
        assert!(fabric.quiescent());
        let lsdb = fabric.routers[&rid(1)]
            .ospf
            .lsdb(Scope::Area(Ipv4Addr::UNSPECIFIED))
            .unwrap();
        assert_eq!(lsdb.len(), 2);
    }

    #[test]
    fn connect_unknown_router() {
        let mut fabric = Fabric::new(Ipv4Addr::UNSPECIFIED, 0.0, 1);
        fabric.add_router(rid(1), OspfConfig::default());
        assert!(fabric.connect(rid(1), rid(9)).is_err());
    }
}
