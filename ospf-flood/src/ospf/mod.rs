pub mod inst;
pub use inst::{Message, Ospf, serve};

pub mod api;
pub use api::{Notification, Observer};

pub mod area;
pub use area::{OspfArea, OspfAreaMap};

pub mod config;
pub use config::OspfConfig;

pub mod error;
pub use error::Error;

pub mod flood;
pub use flood::FloodAction;

pub mod flush;

pub mod link;
pub use link::OspfLink;

pub mod lsa;
pub use lsa::*;

pub mod lsdb;
pub use lsdb::{Lsdb, Scope};

pub mod neigh;
pub use neigh::{Neighbor, NeighborId};

pub mod nfsm;
pub use nfsm::NfsmState;

pub mod packet;
pub use packet::{Packet, PacketMessage, Transport};

pub mod req;

pub mod rxmt;

pub mod show;

pub mod timer;
pub use timer::{Tick, TimerEvent, Timers};

pub mod tracing;
pub use tracing::OspfTracing;
