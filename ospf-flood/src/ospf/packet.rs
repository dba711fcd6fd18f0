use std::net::Ipv4Addr;

use tokio::sync::mpsc::UnboundedSender;

use super::inst::Ospf;
use super::lsa::{Lsa, LsaHeader, LsaKey};
use crate::ospf_packet_trace;

/// Flooding related OSPF packets. Encoding is left to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    LsUpdate(Vec<Lsa>),
    LsAck(Vec<LsaHeader>),
    LsRequest(Vec<LsaKey>),
}

impl Packet {
    /// Number of LSAs, headers or request entries carried.
    pub fn lsa_count(&self) -> usize {
        match self {
            Packet::LsUpdate(v) => v.len(),
            Packet::LsAck(v) => v.len(),
            Packet::LsRequest(v) => v.len(),
        }
    }
}

/// Outbound packet on an interface. `None` destination is the
/// AllSPFRouters group, otherwise the neighbor address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketMessage {
    Send(Packet, u32, Option<Ipv4Addr>),
}

/// Fire-and-forget packet output. One implementation per transport.
pub trait Transport: Send {
    fn send(&self, msg: PacketMessage);
}

impl Transport for () {
    fn send(&self, _msg: PacketMessage) {}
}

impl Transport for UnboundedSender<PacketMessage> {
    fn send(&self, msg: PacketMessage) {
        let _ = UnboundedSender::send(self, msg);
    }
}

impl Ospf {
    pub fn send(&self, packet: Packet, ifindex: u32, dst: Option<Ipv4Addr>) {
        if let Packet::LsUpdate(_) = packet {
            ospf_packet_trace!(
                self.tracing,
                LsUpdate,
                Send,
                "[LS Update] {} LSA(s) on ifindex {} to {}",
                packet.lsa_count(),
                ifindex,
                dst.map_or("AllSPFRouters".to_string(), |addr| addr.to_string())
            );
        }
        self.transport.send(PacketMessage::Send(packet, ifindex, dst));
    }
}
