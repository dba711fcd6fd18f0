use std::cmp::Ordering;
use std::fmt::Display;
use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};

use super::error::Error;
use super::timer::Tick;

// Architectural constants (RFC 2328 Appendix B).
pub const MAX_AGE: u16 = 3600;
pub const INITIAL_SEQUENCE_NUMBER: i32 = 0x80000001_u32 as i32;
pub const MAX_SEQUENCE_NUMBER: i32 = 0x7fffffff;

pub const LSA_HEADER_LEN: u16 = 20;

#[repr(u8)]
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum OspfLsType {
    #[default]
    Router = 1,
    Network = 2,
    Summary = 3,
    SummaryAsbr = 4,
    AsExternal = 5,
    NssaAsExternal = 7,
    OpaqueLinkLocal = 9,
    OpaqueAreaLocal = 10,
    OpaqueAsWide = 11,
    Unknown(u8),
}

impl Display for OspfLsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use OspfLsType::*;
        let str = match self {
            Router => "Router",
            Network => "Network",
            Summary => "Summary",
            SummaryAsbr => "Summary ASBR",
            AsExternal => "AS External",
            NssaAsExternal => "NSSA AS External",
            OpaqueLinkLocal => "Opaque Link Local",
            OpaqueAreaLocal => "Opaque Area Local",
            OpaqueAsWide => "Opaque AS Wide",
            Unknown(_) => "Unknown",
        };
        write!(f, "{str}")
    }
}

impl From<OspfLsType> for u8 {
    fn from(typ: OspfLsType) -> Self {
        use OspfLsType::*;
        match typ {
            Router => 1,
            Network => 2,
            Summary => 3,
            SummaryAsbr => 4,
            AsExternal => 5,
            NssaAsExternal => 7,
            OpaqueLinkLocal => 9,
            OpaqueAreaLocal => 10,
            OpaqueAsWide => 11,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for OspfLsType {
    fn from(typ: u8) -> Self {
        use OspfLsType::*;
        match typ {
            1 => Router,
            2 => Network,
            3 => Summary,
            4 => SummaryAsbr,
            5 => AsExternal,
            7 => NssaAsExternal,
            9 => OpaqueLinkLocal,
            10 => OpaqueAreaLocal,
            11 => OpaqueAsWide,
            v => Unknown(v),
        }
    }
}

/// The set of routers an LS type must reach.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FloodScope {
    Link,
    Area,
    As,
}

impl Display for FloodScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            FloodScope::Link => "link",
            FloodScope::Area => "area",
            FloodScope::As => "as",
        };
        write!(f, "{str}")
    }
}

impl OspfLsType {
    pub fn flood_scope(&self) -> Option<FloodScope> {
        use OspfLsType::*;
        match self {
            Router | Network | Summary | SummaryAsbr | NssaAsExternal | OpaqueAreaLocal => {
                Some(FloodScope::Area)
            }
            AsExternal | OpaqueAsWide => Some(FloodScope::As),
            OpaqueLinkLocal => Some(FloodScope::Link),
            Unknown(_) => None,
        }
    }
}

/// LSA identity. Exactly one instance per key is current within a scope.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct LsaKey {
    pub ls_type: OspfLsType,
    pub ls_id: Ipv4Addr,
    pub adv_router: Ipv4Addr,
}

impl LsaKey {
    pub fn new(ls_type: OspfLsType, ls_id: Ipv4Addr, adv_router: Ipv4Addr) -> Self {
        Self {
            ls_type,
            ls_id,
            adv_router,
        }
    }
}

impl Display for LsaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.ls_type, self.ls_id, self.adv_router)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LsaHeader {
    pub ls_age: u16,
    pub options: u8,
    pub ls_type: OspfLsType,
    pub ls_id: Ipv4Addr,
    pub adv_router: Ipv4Addr,
    pub ls_seq_number: i32,
    pub ls_checksum: u16,
    pub length: u16,
}

impl LsaHeader {
    pub fn new(ls_type: OspfLsType, ls_id: Ipv4Addr, adv_router: Ipv4Addr) -> Self {
        Self {
            ls_age: 0,
            options: 0,
            ls_type,
            ls_id,
            adv_router,
            ls_seq_number: INITIAL_SEQUENCE_NUMBER,
            ls_checksum: 0,
            length: LSA_HEADER_LEN,
        }
    }

    pub fn key(&self) -> LsaKey {
        LsaKey::new(self.ls_type, self.ls_id, self.adv_router)
    }

    pub fn is_maxage(&self) -> bool {
        self.ls_age >= MAX_AGE
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        buf.put_u16(self.ls_age);
        buf.put_u8(self.options);
        buf.put_u8(self.ls_type.into());
        buf.put(&self.ls_id.octets()[..]);
        buf.put(&self.adv_router.octets()[..]);
        buf.put_i32(self.ls_seq_number);
        buf.put_u16(self.ls_checksum);
        buf.put_u16(self.length);
    }
}

/// Freshness comparison of two instances of the same LSA. Both headers must
/// carry their current age. `Greater` means `a` is the more recent instance.
pub fn lsa_compare(a: &LsaHeader, b: &LsaHeader, max_age_diff: u16) -> Ordering {
    if a.ls_seq_number != b.ls_seq_number {
        return a.ls_seq_number.cmp(&b.ls_seq_number);
    }
    if a.ls_checksum != b.ls_checksum {
        return a.ls_checksum.cmp(&b.ls_checksum);
    }
    match (a.is_maxage(), b.is_maxage()) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    if a.ls_age.abs_diff(b.ls_age) > max_age_diff {
        // Younger wins.
        return b.ls_age.cmp(&a.ls_age);
    }
    Ordering::Equal
}

// ISO 8473 checksum over the LSA without LS age. The checksum field sits at
// offset 16 of the LSA, offset 14 once the age is skipped.
pub fn lsa_checksum(h: &LsaHeader, body: &[u8]) -> u16 {
    let mut h = h.clone();
    h.ls_checksum = 0;

    let mut buf = BytesMut::new();
    h.emit(&mut buf);
    buf.put(body);
    let data = &buf[2..];

    let checksum = fletcher::calc_fletcher16(data);
    let mut c0 = (checksum & 0x00FF) as i32;
    let mut c1 = ((checksum >> 8) & 0x00FF) as i32;

    let sop = data.len() as i32 - 15;
    let mut x = (sop * c0 - c1) % 255;
    if x <= 0 {
        x += 255;
    }
    c1 = 510 - c0 - x;
    if c1 > 255 {
        c1 -= 255;
    }
    c0 = x;
    ((c0 as u16) << 8) | (c1 as u16)
}

/// One LSA instance together with the logical time its age was sampled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lsa {
    pub h: LsaHeader,
    pub body: Bytes,
    pub recv: Tick,
}

impl Lsa {
    pub fn from(h: LsaHeader, body: Bytes) -> Self {
        Self { h, body, recv: 0 }
    }

    /// Build a fresh instance with length and checksum filled in.
    pub fn originate(mut h: LsaHeader, body: Bytes, now: Tick) -> Self {
        h.length = LSA_HEADER_LEN + body.len() as u16;
        h.ls_checksum = lsa_checksum(&h, &body);
        Self { h, body, recv: now }
    }

    pub fn key(&self) -> LsaKey {
        self.h.key()
    }

    pub fn age(&self, now: Tick) -> u16 {
        if self.h.is_maxage() {
            return MAX_AGE;
        }
        let elapsed = now.saturating_sub(self.recv);
        let age = self.h.ls_age as u64 + elapsed;
        age.min(MAX_AGE as u64) as u16
    }

    pub fn is_maxage(&self, now: Tick) -> bool {
        self.age(now) >= MAX_AGE
    }

    pub fn header_at(&self, now: Tick) -> LsaHeader {
        let mut h = self.h.clone();
        h.ls_age = self.age(now);
        h
    }

    /// Copy placed on the wire: current age plus the transmission delay.
    pub fn for_send(&self, now: Tick, inf_trans_delay: u16) -> Lsa {
        let mut lsa = self.clone();
        lsa.h.ls_age = self.age(now).saturating_add(inf_trans_delay).min(MAX_AGE);
        lsa.recv = now;
        lsa
    }

    pub fn validate(&self) -> Result<(), Error> {
        let expected = LSA_HEADER_LEN as usize + self.body.len();
        if self.h.length as usize != expected {
            return Err(Error::Malformed {
                key: self.key(),
                length: self.h.length,
                expected,
            });
        }
        Ok(())
    }

    // Whether replacing `self` by `other` changes what route computation sees.
    pub fn same_content(&self, other: &Lsa) -> bool {
        self.h.options == other.h.options
            && self.body == other.body
            && self.h.is_maxage() == other.h.is_maxage()
    }
}
