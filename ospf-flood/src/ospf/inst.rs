use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use super::api::Observer;
use super::area::OspfAreaMap;
use super::config::OspfConfig;
use super::error::Error;
use super::link::OspfLink;
use super::lsa::{LsaHeader, LsaKey, OspfLsType};
use super::lsdb::{Lsdb, Scope};
use super::neigh::NeighborId;
use super::nfsm::NfsmState;
use super::packet::{Packet, Transport};
use super::timer::{Tick, TimerEvent, Timers};
use super::tracing::OspfTracing;
use crate::{ospf_error, ospf_warn};

pub type ShowCallback = fn(&Ospf, bool) -> String;

pub struct Ospf {
    pub router_id: Ipv4Addr,
    pub config: OspfConfig,
    pub tracing: OspfTracing,
    pub now: Tick,
    pub tx: UnboundedSender<Message>,
    pub rx: UnboundedReceiver<Message>,
    pub links: BTreeMap<u32, OspfLink>,
    pub areas: OspfAreaMap,
    pub lsdb_as: Lsdb,
    pub timers: Timers,
    pub transport: Box<dyn Transport>,
    pub observer: Box<dyn Observer>,
    // Content of LSAs flushed at MaxSequenceNumber, waiting for the flushed
    // instance to leave the database.
    pub pending: BTreeMap<(Scope, LsaKey), (u8, Bytes)>,
    pub show_cb: HashMap<String, ShowCallback>,
}

impl Ospf {
    pub fn new(
        router_id: Ipv4Addr,
        config: OspfConfig,
        transport: Box<dyn Transport>,
        observer: Box<dyn Observer>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut ospf = Self {
            router_id,
            config,
            tracing: OspfTracing::default(),
            now: 0,
            tx,
            rx,
            links: BTreeMap::new(),
            areas: OspfAreaMap::new(),
            lsdb_as: Lsdb::new(),
            timers: Timers::default(),
            transport,
            observer,
            pending: BTreeMap::new(),
            show_cb: HashMap::new(),
        };
        let at = ospf.config.maxage_walker_interval();
        ospf.timers.arm(TimerEvent::MaxAgeWalker, at);
        ospf.show_build();
        ospf
    }

    /// Advance the logical clock one second at a time, firing every timer
    /// that falls due on the way.
    pub fn advance(&mut self, secs: Tick) {
        for _ in 0..secs {
            self.now += 1;
            self.timer_expire();
        }
    }

    pub fn timer_expire(&mut self) {
        for ev in self.timers.expire(self.now) {
            match ev {
                TimerEvent::Rxmt(id) => self.ls_rxmt_timer(id),
                TimerEvent::LsReq(id) => self.ls_req_timer(id),
                TimerEvent::AckDelay(ifindex) => self.ls_ack_timer(ifindex),
                TimerEvent::Refresh(scope, key) => {
                    if let Err(err) = self.refresh(scope, key) {
                        ospf_error!("Refresh {}: {}", key, err);
                    }
                }
                TimerEvent::MaxAgeWalker => self.maxage_walker(),
            }
        }
    }

    /// Dispatch a packet handed over by the adjacency layer.
    pub fn recv(&mut self, id: NeighborId, packet: Packet) -> Result<(), Error> {
        match packet {
            Packet::LsUpdate(lsas) => self.on_receive_update(id, lsas).map(|_| ()),
            Packet::LsAck(headers) => self.on_receive_ack(id, headers),
            Packet::LsRequest(keys) => self.on_receive_request(id, &keys),
        }
    }

    fn process_msg(&mut self, msg: Message) -> Result<(), Error> {
        match msg {
            Message::Recv(id, packet) => self.recv(id, packet)?,
            Message::AreaAdd(area_id) => self.area_add(area_id),
            Message::AreaRemove(area_id) => self.area_remove(area_id)?,
            Message::LinkAdd(ifindex, name, area_id) => self.link_add(ifindex, &name, area_id)?,
            Message::LinkRemove(ifindex) => self.link_remove(ifindex)?,
            Message::NbrAdd(id, router_id) => self.nbr_add(id, router_id)?,
            Message::NbrState(id, state) => self.nbr_state_change(id, state)?,
            Message::NbrTeardown(id) => self.nbr_teardown(id)?,
            Message::NbrRemove(id) => self.nbr_remove(id)?,
            Message::RequestMissing(id, headers) => self.request_missing(id, &headers)?,
            Message::Originate(scope, ls_type, ls_id, body) => {
                self.originate(scope, ls_type, ls_id, body)?
            }
            Message::Refresh(scope, key) => self.refresh(scope, key)?,
            Message::Flush(scope, key) => self.flush(scope, key)?,
            Message::FlushAll => self.flush_all()?,
            Message::Show(path, json, resp) => {
                let out = match self.show_cb.get(&path) {
                    Some(cb) => cb(self, json),
                    None => format!("% Unknown command {path}"),
                };
                let _ = resp.send(out);
            }
        }
        Ok(())
    }

    pub async fn event_loop(&mut self) {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        // The first tick completes immediately.
        tick.tick().await;
        loop {
            tokio::select! {
                msg = self.rx.recv() => {
                    let Some(msg) = msg else {
                        break;
                    };
                    if let Err(err) = self.process_msg(msg) {
                        ospf_warn!("{}", err);
                    }
                }
                _ = tick.tick() => {
                    self.advance(1);
                }
            }
        }
    }
}

pub fn serve(mut ospf: Ospf) {
    tokio::spawn(async move {
        ospf.event_loop().await;
    });
}

#[derive(Debug)]
pub enum Message {
    Recv(NeighborId, Packet),
    AreaAdd(Ipv4Addr),
    AreaRemove(Ipv4Addr),
    LinkAdd(u32, String, Ipv4Addr),
    LinkRemove(u32),
    NbrAdd(NeighborId, Ipv4Addr),
    NbrState(NeighborId, NfsmState),
    NbrTeardown(NeighborId),
    NbrRemove(NeighborId),
    RequestMissing(NeighborId, Vec<LsaHeader>),
    Originate(Scope, OspfLsType, Ipv4Addr, Bytes),
    Refresh(Scope, LsaKey),
    Flush(Scope, LsaKey),
    FlushAll,
    Show(String, bool, oneshot::Sender<String>),
}
