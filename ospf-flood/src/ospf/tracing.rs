// Conditional tracing for the flooding engine.
//
// Packet, event and database categories can be switched on one by one so
// that a busy router only logs what is being debugged.

use std::str::FromStr;

use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Default)]
pub struct OspfTracing {
    // Enable all OSPF tracing
    pub all: bool,
    pub packet: PacketTracing,
    pub event: EventTracing,
    pub database: DatabaseTracing,
}

#[derive(Debug, Clone, Default)]
pub struct PacketTracing {
    pub ls_req: PacketConfig,
    pub ls_update: PacketConfig,
    pub ls_ack: PacketConfig,
    pub all: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PacketConfig {
    pub enabled: bool,
    pub direction: PacketDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, EnumString)]
pub enum PacketDirection {
    #[strum(serialize = "send")]
    Send,
    #[strum(serialize = "recv", serialize = "receive")]
    Recv,
    #[default]
    #[strum(serialize = "both")]
    Both,
}

#[derive(Debug, Clone, Default)]
pub struct EventTracing {
    pub originate: EventConfig,
    pub refresh: EventConfig,
    pub flush: EventConfig,
    pub flooding: EventConfig,
    pub retransmit: EventConfig,
    pub maxage: EventConfig,
    pub all: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EventConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseTracing {
    pub lsdb: DatabaseConfig,
    pub all: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Display, EnumString)]
pub enum PacketType {
    #[strum(serialize = "ls-request")]
    LsRequest,
    #[strum(serialize = "ls-update")]
    LsUpdate,
    #[strum(serialize = "ls-ack")]
    LsAck,
}

#[derive(Debug, Clone, Copy, PartialEq, Display, EnumString)]
pub enum EventType {
    #[strum(serialize = "originate")]
    Originate,
    #[strum(serialize = "refresh")]
    Refresh,
    #[strum(serialize = "flush")]
    Flush,
    #[strum(serialize = "flooding")]
    Flooding,
    #[strum(serialize = "retransmit")]
    Retransmit,
    #[strum(serialize = "maxage")]
    MaxAge,
}

#[derive(Debug, Clone, Copy, PartialEq, Display, EnumString)]
pub enum DatabaseType {
    #[strum(serialize = "lsdb")]
    Lsdb,
}

impl OspfTracing {
    pub fn should_trace_packet(&self, packet_type: PacketType, direction: PacketDirection) -> bool {
        if self.all || self.packet.all {
            return true;
        }
        let config = match packet_type {
            PacketType::LsRequest => &self.packet.ls_req,
            PacketType::LsUpdate => &self.packet.ls_update,
            PacketType::LsAck => &self.packet.ls_ack,
        };
        if !config.enabled {
            return false;
        }
        config.direction == PacketDirection::Both || config.direction == direction
    }

    pub fn should_trace_event(&self, event_type: EventType) -> bool {
        if self.all || self.event.all {
            return true;
        }
        let config = match event_type {
            EventType::Originate => &self.event.originate,
            EventType::Refresh => &self.event.refresh,
            EventType::Flush => &self.event.flush,
            EventType::Flooding => &self.event.flooding,
            EventType::Retransmit => &self.event.retransmit,
            EventType::MaxAge => &self.event.maxage,
        };
        config.enabled
    }

    pub fn should_trace_database(&self, db_type: DatabaseType) -> bool {
        if self.all || self.database.all {
            return true;
        }
        match db_type {
            DatabaseType::Lsdb => self.database.lsdb.enabled,
        }
    }

    fn packet_config(&mut self, packet_type: PacketType) -> &mut PacketConfig {
        match packet_type {
            PacketType::LsRequest => &mut self.packet.ls_req,
            PacketType::LsUpdate => &mut self.packet.ls_update,
            PacketType::LsAck => &mut self.packet.ls_ack,
        }
    }

    fn event_config(&mut self, event_type: EventType) -> &mut EventConfig {
        match event_type {
            EventType::Originate => &mut self.event.originate,
            EventType::Refresh => &mut self.event.refresh,
            EventType::Flush => &mut self.event.flush,
            EventType::Flooding => &mut self.event.flooding,
            EventType::Retransmit => &mut self.event.retransmit,
            EventType::MaxAge => &mut self.event.maxage,
        }
    }

    /// Enable one tracing item. Items look like `all`, `packet`,
    /// `packet:ls-update`, `packet:ls-ack:send`, `event:flooding` or
    /// `database:lsdb`.
    pub fn enable(&mut self, item: &str) -> Option<()> {
        let mut args = item.split(':');
        let category = args.next()?;
        let typ = args.next();
        match category {
            "all" => self.all = true,
            "packet" => match typ {
                None | Some("all") => self.packet.all = true,
                Some(typ) => {
                    let packet_type = PacketType::from_str(typ).ok()?;
                    let direction = match args.next() {
                        Some(dir) => PacketDirection::from_str(dir).ok()?,
                        None => PacketDirection::Both,
                    };
                    let config = self.packet_config(packet_type);
                    config.enabled = true;
                    config.direction = direction;
                }
            },
            "event" => match typ {
                None | Some("all") => self.event.all = true,
                Some(typ) => {
                    let event_type = EventType::from_str(typ).ok()?;
                    self.event_config(event_type).enabled = true;
                }
            },
            "database" => match typ {
                None | Some("all") => self.database.all = true,
                Some(typ) => match DatabaseType::from_str(typ).ok()? {
                    DatabaseType::Lsdb => self.database.lsdb.enabled = true,
                },
            },
            _ => return None,
        }
        Some(())
    }
}

// Log an info-level message with proto="ospf" field
#[macro_export]
macro_rules! ospf_info {
    ($($arg:tt)*) => {
        ::tracing::info!(proto = "ospf", $($arg)*)
    };
}

// Log a warning-level message with proto="ospf" field
#[macro_export]
macro_rules! ospf_warn {
    ($($arg:tt)*) => {
        ::tracing::warn!(proto = "ospf", $($arg)*)
    };
}

// Log an error-level message with proto="ospf" field
#[macro_export]
macro_rules! ospf_error {
    ($($arg:tt)*) => {
        ::tracing::error!(proto = "ospf", $($arg)*)
    };
}

// Log a debug-level message with proto="ospf" field
#[macro_export]
macro_rules! ospf_debug {
    ($($arg:tt)*) => {
        ::tracing::debug!(proto = "ospf", $($arg)*)
    };
}

// Conditional packet tracing macro
#[macro_export]
macro_rules! ospf_packet_trace {
    ($tracing:expr, $packet_type:ident, $direction:ident, $($arg:tt)*) => {
        if $tracing.should_trace_packet(
            $crate::ospf::tracing::PacketType::$packet_type,
            $crate::ospf::tracing::PacketDirection::$direction,
        ) {
            ::tracing::info!(
                proto = "ospf",
                category = "packet",
                packet_type = stringify!($packet_type),
                direction = stringify!($direction),
                $($arg)*
            )
        }
    };
}

// Conditional event tracing macro
#[macro_export]
macro_rules! ospf_event_trace {
    ($tracing:expr, $event_type:ident, $($arg:tt)*) => {
        if $tracing.should_trace_event($crate::ospf::tracing::EventType::$event_type) {
            ::tracing::info!(
                proto = "ospf",
                category = "event",
                event_type = stringify!($event_type),
                $($arg)*
            )
        }
    };
}

// Conditional database tracing macro
#[macro_export]
macro_rules! ospf_database_trace {
    ($tracing:expr, $db_type:ident, $($arg:tt)*) => {
        if $tracing.should_trace_database($crate::ospf::tracing::DatabaseType::$db_type) {
            ::tracing::info!(
                proto = "ospf",
                category = "database",
                db_type = stringify!($db_type),
                $($arg)*
            )
        }
    };
}
