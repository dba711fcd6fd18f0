use std::net::Ipv4Addr;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use ospf_flood::ospf::*;

const AREA: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
const SCOPE: Scope = Scope::Area(AREA);

fn rid(n: u8) -> Ipv4Addr {
    Ipv4Addr::new(n, n, n, n)
}

fn lsa(adv: Ipv4Addr, seq: i32, age: u16) -> Lsa {
    lsa_body(adv, seq, age, &[0, 0, 0, 1])
}

fn lsa_body(adv: Ipv4Addr, seq: i32, age: u16, body: &'static [u8]) -> Lsa {
    let mut h = LsaHeader::new(OspfLsType::Router, adv, adv);
    h.ls_seq_number = seq;
    h.ls_age = age;
    Lsa::originate(h, Bytes::from_static(body), 0)
}

struct Harness {
    ospf: Ospf,
    rx: UnboundedReceiver<PacketMessage>,
    notify: UnboundedReceiver<Notification>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(OspfConfig::default())
    }

    fn with_config(config: OspfConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ntx, notify) = mpsc::unbounded_channel();
        let mut ospf = Ospf::new(rid(1), config, Box::new(tx), Box::new(ntx));
        ospf.area_add(AREA);
        Self { ospf, rx, notify }
    }

    fn link(&mut self, ifindex: u32, nbrs: &[Ipv4Addr], state: NfsmState) -> Vec<NeighborId> {
        self.ospf
            .link_add(ifindex, &format!("eth{ifindex}"), AREA)
            .unwrap();
        nbrs.iter()
            .map(|addr| {
                let id = NeighborId::new(ifindex, *addr);
                self.ospf.nbr_add(id, *addr).unwrap();
                self.ospf.nbr_state_change(id, state).unwrap();
                id
            })
            .collect()
    }

    fn sent(&mut self) -> Vec<PacketMessage> {
        let mut sent = vec![];
        while let Ok(msg) = self.rx.try_recv() {
            sent.push(msg);
        }
        sent
    }

    fn notifications(&mut self) -> Vec<Notification> {
        let mut notes = vec![];
        while let Ok(msg) = self.notify.try_recv() {
            notes.push(msg);
        }
        notes
    }

    fn recv(&mut self, from: NeighborId, lsas: Vec<Lsa>) -> Vec<FloodAction> {
        self.ospf.on_receive_update(from, lsas).unwrap()
    }

    fn current(&self, key: &LsaKey) -> Option<Lsa> {
        self.ospf.lookup(SCOPE, key).cloned()
    }

    fn rxmt_seq(&self, id: NeighborId, key: &LsaKey) -> Option<i32> {
        self.ospf
            .nbr(id)
            .unwrap()
            .ls_rxmt
            .get(key)
            .map(|entry| entry.lsa.h.ls_seq_number)
    }
}

fn updates(sent: &[PacketMessage]) -> Vec<(u32, Option<Ipv4Addr>, Vec<Lsa>)> {
    sent.iter()
        .filter_map(|PacketMessage::Send(packet, ifindex, dst)| match packet {
            Packet::LsUpdate(lsas) => Some((*ifindex, *dst, lsas.clone())),
            _ => None,
        })
        .collect()
}

fn acks(sent: &[PacketMessage]) -> Vec<(u32, Option<Ipv4Addr>, Vec<LsaHeader>)> {
    sent.iter()
        .filter_map(|PacketMessage::Send(packet, ifindex, dst)| match packet {
            Packet::LsAck(headers) => Some((*ifindex, *dst, headers.clone())),
            _ => None,
        })
        .collect()
}

#[test]
pub fn new_lsa_installed_and_flooded() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let n2 = h.link(2, &[rid(3)], NfsmState::Full)[0];

    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, 0);
    let key = x.key();
    assert_eq!(h.recv(n1, vec![x.clone()]), vec![FloodAction::InstallFlood]);

    assert_eq!(h.current(&key).unwrap().h, x.h);
    assert_eq!(h.rxmt_seq(n2, &key), Some(INITIAL_SEQUENCE_NUMBER));
    assert_eq!(h.rxmt_seq(n1, &key), None);
    assert!(h.ospf.timers.is_armed(&TimerEvent::Rxmt(n2)));

    let sent = h.sent();
    let ups = updates(&sent);
    assert_eq!(ups.len(), 1);
    assert_eq!((ups[0].0, ups[0].1), (2, None));
    assert_eq!(ups[0].2[0].h.ls_age, 1);
    assert!(acks(&sent).is_empty());
    assert_eq!(
        h.notifications(),
        vec![Notification::LsdbChanged(SCOPE, key)]
    );

    // Delayed acknowledgment goes out on the receiving interface.
    h.ospf.advance(1);
    let acks = acks(&h.sent());
    assert_eq!(acks.len(), 1);
    assert_eq!((acks[0].0, acks[0].1), (1, None));
    assert_eq!(acks[0].2, vec![x.h]);
}

#[test]
pub fn duplicate_delivery_is_idempotent() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];

    // Both copies in one batch: installed once, acknowledged once.
    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER + 3, 10);
    assert_eq!(
        h.recv(n1, vec![x.clone(), x.clone()]),
        vec![FloodAction::InstallNoFlood, FloodAction::AckOnly]
    );
    assert!(acks(&h.sent()).is_empty());
    h.ospf.advance(2);
    let delayed = acks(&h.sent());
    assert_eq!(delayed.len(), 1);
    assert_eq!((delayed[0].0, delayed[0].1), (1, None));
    assert_eq!(delayed[0].2, vec![x.h.clone()]);
    h.notifications();

    let actions = h.recv(n1, vec![x.clone(), x.clone()]);
    assert_eq!(actions, vec![FloodAction::AckOnly, FloodAction::AckOnly]);

    let sent = h.sent();
    let acks = acks(&sent);
    assert_eq!(acks.len(), 1);
    assert_eq!((acks[0].0, acks[0].1), (1, Some(rid(2))));
    assert_eq!(acks[0].2, vec![x.h.clone()]);
    assert!(updates(&sent).is_empty());
    assert!(h.notifications().is_empty());

    let lsdb = h.ospf.lsdb(SCOPE).unwrap();
    assert_eq!(lsdb.len(), 1);
    assert_eq!(lsdb.get(&x.key()).unwrap().h, x.h);
}

#[test]
pub fn same_copy_from_neighbor_is_implicit_ack() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let n2 = h.link(2, &[rid(3)], NfsmState::Full)[0];

    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, 0);
    let key = x.key();
    h.recv(n1, vec![x.clone()]);
    assert!(h.rxmt_seq(n2, &key).is_some());
    h.sent();

    // N2 floods the same instance back: its retransmission entry goes away
    // without an explicit acknowledgment.
    assert_eq!(h.recv(n2, vec![x.clone()]), vec![FloodAction::Discard]);
    assert_eq!(h.rxmt_seq(n2, &key), None);
    assert!(!h.ospf.timers.is_armed(&TimerEvent::Rxmt(n2)));
    assert!(acks(&h.sent()).is_empty());

    // Nothing outstanding any more, so the next copy is acknowledged.
    assert_eq!(h.recv(n2, vec![x.clone()]), vec![FloodAction::AckOnly]);
    let acks = acks(&h.sent());
    assert_eq!(acks.len(), 1);
    assert_eq!((acks[0].0, acks[0].1), (2, Some(rid(3))));
}

#[test]
pub fn explicit_ack_removes_exact_instance() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), Bytes::from_static(&[1, 2, 3, 4]))
        .unwrap();
    let key = LsaKey::new(OspfLsType::Router, rid(1), rid(1));
    assert_eq!(h.rxmt_seq(n1, &key), Some(INITIAL_SEQUENCE_NUMBER));

    let sent = h.sent();
    let ups = updates(&sent);
    assert_eq!(ups.len(), 1);
    let header = ups[0].2[0].h.clone();

    let mut stale = header.clone();
    stale.ls_seq_number -= 1;
    h.ospf.on_receive_ack(n1, vec![stale]).unwrap();
    assert!(h.rxmt_seq(n1, &key).is_some());

    h.ospf.on_receive_ack(n1, vec![header]).unwrap();
    assert_eq!(h.rxmt_seq(n1, &key), None);
    assert!(!h.ospf.timers.is_armed(&TimerEvent::Rxmt(n1)));
}

#[test]
pub fn retransmission_after_rxmt_interval() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), Bytes::from_static(&[1, 2, 3, 4]))
        .unwrap();
    h.sent();

    h.ospf.advance(4);
    assert!(updates(&h.sent()).is_empty());

    h.ospf.advance(1);
    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    assert_eq!((ups[0].0, ups[0].1), (1, Some(rid(2))));
    assert_eq!(ups[0].2[0].h.ls_seq_number, INITIAL_SEQUENCE_NUMBER);
    assert_eq!(ups[0].2[0].h.ls_age, 6);

    h.ospf.advance(5);
    assert_eq!(updates(&h.sent()).len(), 1);
    assert!(h.ospf.timers.is_armed(&TimerEvent::Rxmt(n1)));
}

#[test]
pub fn teardown_with_pending_retransmissions() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    for n in 1..=5 {
        h.ospf
            .originate(
                SCOPE,
                OspfLsType::Network,
                Ipv4Addr::new(10, 0, n, 1),
                Bytes::from_static(&[255, 255, 255, 0]),
            )
            .unwrap();
    }
    assert_eq!(h.ospf.nbr(n1).unwrap().ls_rxmt.len(), 5);
    h.sent();

    h.ospf.nbr_teardown(n1).unwrap();
    let nbr = h.ospf.nbr(n1).unwrap();
    assert!(nbr.ls_rxmt.is_empty());
    assert_eq!(nbr.state, NfsmState::Down);
    assert!(!h.ospf.timers.is_armed(&TimerEvent::Rxmt(n1)));

    h.ospf.advance(30);
    assert!(updates(&h.sent()).is_empty());
}

#[test]
pub fn older_copy_gets_rate_limited_correction() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let n2 = h.link(2, &[rid(3)], NfsmState::Full)[0];
    let seq = INITIAL_SEQUENCE_NUMBER + 4;

    // Newer copies arrive via N2 and are flooded to N1.
    h.recv(n2, vec![lsa(rid(9), seq + 1, 0), lsa(rid(8), seq + 1, 0)]);
    h.sent();

    let older = lsa(rid(9), seq, 0);
    assert_eq!(h.recv(n1, vec![older.clone()]), vec![FloodAction::Discard]);
    let sent = h.sent();
    let ups = updates(&sent);
    assert_eq!(ups.len(), 1);
    assert_eq!((ups[0].0, ups[0].1), (1, Some(rid(2))));
    assert_eq!(ups[0].2[0].h.ls_seq_number, seq + 1);
    assert!(acks(&sent).is_empty());

    // Within MinLSArrival no second correction to N1, whatever the LSA.
    h.recv(n1, vec![older.clone()]);
    assert!(updates(&h.sent()).is_empty());
    h.recv(n1, vec![lsa(rid(8), seq, 0)]);
    assert!(updates(&h.sent()).is_empty());

    h.ospf.advance(1);
    h.sent();
    h.recv(n1, vec![older.clone()]);
    assert_eq!(updates(&h.sent()).len(), 1);

    // N2 has nothing outstanding from us, so its stale copy is dropped.
    assert_eq!(h.recv(n2, vec![older]), vec![FloodAction::Discard]);
    assert!(h.sent().is_empty());
}

#[test]
pub fn newer_self_originated_copy_is_superseded() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let body = Bytes::from_static(&[0, 0, 0, 1]);
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), body.clone())
        .unwrap();
    h.sent();
    h.notifications();

    let stale = lsa_body(rid(1), INITIAL_SEQUENCE_NUMBER + 5, 0, &[9, 9, 9, 9]);
    let key = stale.key();
    assert_eq!(h.recv(n1, vec![stale]), vec![FloodAction::InstallFlood]);

    let current = h.current(&key).unwrap();
    assert_eq!(current.h.ls_seq_number, INITIAL_SEQUENCE_NUMBER + 6);
    assert_eq!(current.body, body);
    assert_eq!(h.rxmt_seq(n1, &key), Some(INITIAL_SEQUENCE_NUMBER + 6));

    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    assert_eq!(ups[0].2[0].h.ls_seq_number, INITIAL_SEQUENCE_NUMBER + 6);
    // Route computation never saw the foreign content.
    assert!(h.notifications().is_empty());
}

#[test]
pub fn newer_self_originated_copy_at_max_sequence_is_aged_out() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let body = Bytes::from_static(&[0, 0, 0, 1]);
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), body.clone())
        .unwrap();
    let key = LsaKey::new(OspfLsType::Router, rid(1), rid(1));
    h.sent();

    let x = lsa_body(rid(1), MAX_SEQUENCE_NUMBER, 0, &[0, 0, 0, 2]);
    assert_eq!(h.recv(n1, vec![x.clone()]), vec![FloodAction::InstallFlood]);

    // The database holds X itself at MaxAge, never something older than X.
    let current = h.current(&key).unwrap();
    assert_eq!(current.h.ls_seq_number, MAX_SEQUENCE_NUMBER);
    assert_eq!(current.h.ls_checksum, x.h.ls_checksum);
    assert!(current.h.is_maxage());
    assert_ne!(
        lsa_compare(&x.h, &current.h, OspfConfig::default().max_age_diff()),
        std::cmp::Ordering::Greater
    );
    assert!(!h.ospf.timers.is_armed(&TimerEvent::Refresh(SCOPE, key)));

    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    let flushed = ups[0].2[0].h.clone();
    assert_eq!(flushed.ls_seq_number, MAX_SEQUENCE_NUMBER);
    assert_eq!(flushed.ls_checksum, x.h.ls_checksum);
    assert_eq!(flushed.ls_age, MAX_AGE);

    // Once the neighbor acknowledges the flush our content restarts.
    h.ospf.on_receive_ack(n1, vec![flushed]).unwrap();
    let current = h.current(&key).unwrap();
    assert_eq!(current.h.ls_seq_number, INITIAL_SEQUENCE_NUMBER);
    assert!(!current.h.is_maxage());
    assert_eq!(current.body, body);
    assert_eq!(h.rxmt_seq(n1, &key), Some(INITIAL_SEQUENCE_NUMBER));
}

#[test]
pub fn unknown_self_originated_copy_is_flushed() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];

    let stale = lsa(rid(1), INITIAL_SEQUENCE_NUMBER + 3, 0);
    let key = stale.key();
    assert_eq!(h.recv(n1, vec![stale]), vec![FloodAction::InstallFlood]);

    let current = h.current(&key).unwrap();
    assert!(current.h.is_maxage());
    assert_eq!(current.h.ls_seq_number, INITIAL_SEQUENCE_NUMBER + 3);

    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    assert_eq!(ups[0].0, 1);
    let flushed = ups[0].2[0].h.clone();
    assert_eq!(flushed.ls_age, MAX_AGE);

    h.ospf.on_receive_ack(n1, vec![flushed]).unwrap();
    assert!(h.current(&key).is_none());
}

#[test]
pub fn newer_copy_reconciles_retransmission_lists() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let n2 = h.link(2, &[rid(3)], NfsmState::Full)[0];
    let seq = INITIAL_SEQUENCE_NUMBER;
    let key = lsa(rid(9), seq, 0).key();

    h.recv(n1, vec![lsa(rid(9), seq, 0)]);
    assert_eq!(h.rxmt_seq(n2, &key), Some(seq));

    assert_eq!(
        h.recv(n1, vec![lsa(rid(9), seq + 1, 0)]),
        vec![FloodAction::InstallFlood]
    );
    assert_eq!(h.rxmt_seq(n2, &key), Some(seq + 1));
    assert_eq!(h.current(&key).unwrap().h.ls_seq_number, seq + 1);

    // The sender of the newer copy no longer needs ours.
    assert_eq!(
        h.recv(n2, vec![lsa(rid(9), seq + 2, 0)]),
        vec![FloodAction::InstallFlood]
    );
    assert_eq!(h.rxmt_seq(n2, &key), None);
    assert_eq!(h.rxmt_seq(n1, &key), Some(seq + 2));
}

#[test]
pub fn flood_back_only_with_multiple_neighbors() {
    let mut h = Harness::new();
    let lan = h.link(1, &[rid(2), rid(3)], NfsmState::Full);
    let p2p = h.link(2, &[rid(4)], NfsmState::Full)[0];
    let seq = INITIAL_SEQUENCE_NUMBER;
    let key = lsa(rid(9), seq, 0).key();

    // A new LSA never goes back out the receiving interface.
    h.recv(lan[0], vec![lsa(rid(9), seq, 0)]);
    assert_eq!(h.rxmt_seq(lan[1], &key), None);
    assert_eq!(h.rxmt_seq(p2p, &key), Some(seq));
    h.sent();

    // A newer instance is flooded back on a multi-neighbor interface.
    h.recv(lan[0], vec![lsa(rid(9), seq + 1, 0)]);
    assert_eq!(h.rxmt_seq(lan[1], &key), Some(seq + 1));
    assert_eq!(h.rxmt_seq(lan[0], &key), None);
    let ifindexes: Vec<u32> = updates(&h.sent()).iter().map(|up| up.0).collect();
    assert_eq!(ifindexes, vec![1, 2]);

    // On a single-neighbor interface it is not.
    h.sent();
    h.recv(p2p, vec![lsa(rid(9), seq + 2, 0)]);
    let ifindexes: Vec<u32> = updates(&h.sent()).iter().map(|up| up.0).collect();
    assert_eq!(ifindexes, vec![1]);
}

#[test]
pub fn unknown_maxage_gets_direct_ack() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];

    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, MAX_AGE);
    let before = h.ospf.lsdb(SCOPE).unwrap().len();
    assert_eq!(h.recv(n1, vec![x.clone()]), vec![FloodAction::DirectAckDiscard]);
    assert_eq!(h.ospf.lsdb(SCOPE).unwrap().len(), before);

    let acks = acks(&h.sent());
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0], (1, Some(rid(2)), vec![x.h]));
    assert!(h.notifications().is_empty());
}

#[test]
pub fn unknown_maxage_is_flooded_during_exchange() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let n2 = h.link(2, &[rid(3)], NfsmState::Exchange)[0];

    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, MAX_AGE);
    assert_eq!(h.recv(n1, vec![x.clone()]), vec![FloodAction::InstallFlood]);
    assert!(h.current(&x.key()).is_some());
    assert!(h.rxmt_seq(n2, &x.key()).is_some());

    // Removed once the exchange is over and the instance acknowledged.
    h.ospf.nbr_state_change(n2, NfsmState::Full).unwrap();
    assert!(h.current(&x.key()).is_some());
    h.ospf.on_receive_ack(n2, vec![x.h.clone()]).unwrap();
    assert!(h.current(&x.key()).is_none());
}

#[test]
pub fn sequence_wraparound_ends_at_initial() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let body = Bytes::from_static(&[0, 0, 0, 1]);
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), body.clone())
        .unwrap();
    let key = LsaKey::new(OspfLsType::Router, rid(1), rid(1));

    // Pull our own sequence up to MaxSequenceNumber - 1.
    h.recv(n1, vec![lsa(rid(1), MAX_SEQUENCE_NUMBER - 2, 0)]);
    assert_eq!(
        h.current(&key).unwrap().h.ls_seq_number,
        MAX_SEQUENCE_NUMBER - 1
    );
    let ups = updates(&h.sent());
    let header = ups.last().unwrap().2[0].h.clone();
    h.ospf.on_receive_ack(n1, vec![header]).unwrap();
    assert!(h.ospf.nbr(n1).unwrap().ls_rxmt.is_empty());

    h.ospf.refresh(SCOPE, key).unwrap();
    let current = h.current(&key).unwrap();
    assert_eq!(current.h.ls_seq_number, MAX_SEQUENCE_NUMBER);
    assert!(current.h.is_maxage());

    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    let flushed = ups[0].2[0].h.clone();
    assert_eq!(flushed.ls_seq_number, MAX_SEQUENCE_NUMBER);
    assert_eq!(flushed.ls_age, MAX_AGE);

    // Nothing restarts while the flushed instance is outstanding.
    h.ospf.advance(1);
    assert_eq!(
        h.current(&key).unwrap().h.ls_seq_number,
        MAX_SEQUENCE_NUMBER
    );
    h.sent();

    h.ospf.on_receive_ack(n1, vec![flushed]).unwrap();
    let current = h.current(&key).unwrap();
    assert_eq!(current.h.ls_seq_number, INITIAL_SEQUENCE_NUMBER);
    assert!(!current.h.is_maxage());
    assert_eq!(current.body, body);

    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    assert_eq!(ups[0].2[0].h.ls_seq_number, INITIAL_SEQUENCE_NUMBER);
    assert!(
        h.ospf
            .timers
            .is_armed(&TimerEvent::Refresh(SCOPE, key))
    );
}

#[test]
pub fn refresh_timer_bumps_sequence() {
    let mut h = Harness::new();
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), Bytes::from_static(&[0, 0, 0, 0]))
        .unwrap();
    let key = LsaKey::new(OspfLsType::Router, rid(1), rid(1));

    h.ospf.advance(1799);
    assert_eq!(
        h.current(&key).unwrap().h.ls_seq_number,
        INITIAL_SEQUENCE_NUMBER
    );
    h.ospf.advance(1);
    let current = h.current(&key).unwrap();
    assert_eq!(current.h.ls_seq_number, INITIAL_SEQUENCE_NUMBER + 1);
    assert_eq!(current.age(h.ospf.now), 0);
}

#[test]
pub fn request_list_drives_loading() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Exchange)[0];
    let a = lsa(rid(7), INITIAL_SEQUENCE_NUMBER, 0);
    let b = lsa(rid(8), INITIAL_SEQUENCE_NUMBER, 0);

    h.ospf
        .request_missing(n1, &[a.h.clone(), b.h.clone()])
        .unwrap();
    let sent = h.sent();
    assert_eq!(
        sent,
        vec![PacketMessage::Send(
            Packet::LsRequest(vec![a.key(), b.key()]),
            1,
            Some(rid(2))
        )]
    );
    assert!(h.ospf.timers.is_armed(&TimerEvent::LsReq(n1)));

    // Outstanding requests are repeated every RxmtInterval.
    h.ospf.advance(5);
    assert_eq!(h.sent().len(), 1);

    h.ospf.nbr_state_change(n1, NfsmState::Loading).unwrap();
    h.recv(n1, vec![a]);
    assert_eq!(h.ospf.nbr(n1).unwrap().ls_req.len(), 1);
    h.notifications();

    h.recv(n1, vec![b]);
    assert!(h.ospf.nbr(n1).unwrap().ls_req.is_empty());
    assert!(!h.ospf.timers.is_armed(&TimerEvent::LsReq(n1)));
    assert!(
        h.notifications()
            .contains(&Notification::RequestListEmpty(n1))
    );
}

#[test]
pub fn older_instance_does_not_satisfy_request() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Loading)[0];
    let wanted = lsa(rid(7), INITIAL_SEQUENCE_NUMBER + 2, 0);
    h.ospf.request_missing(n1, &[wanted.h.clone()]).unwrap();

    h.recv(n1, vec![lsa(rid(7), INITIAL_SEQUENCE_NUMBER, 0)]);
    assert_eq!(h.ospf.nbr(n1).unwrap().ls_req.len(), 1);

    h.recv(n1, vec![wanted]);
    assert!(h.ospf.nbr(n1).unwrap().ls_req.is_empty());
}

#[test]
pub fn link_state_request_is_answered() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let n2 = h.link(2, &[rid(3)], NfsmState::Full)[0];
    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, 0);
    h.recv(n2, vec![x.clone()]);
    h.sent();
    h.notifications();

    h.ospf.on_receive_request(n1, &[x.key()]).unwrap();
    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    assert_eq!((ups[0].0, ups[0].1), (1, Some(rid(2))));
    assert_eq!(ups[0].2[0].key(), x.key());

    let missing = LsaKey::new(OspfLsType::Router, rid(5), rid(5));
    h.ospf.on_receive_request(n1, &[x.key(), missing]).unwrap();
    assert!(updates(&h.sent()).is_empty());
    assert_eq!(h.notifications(), vec![Notification::BadLsRequest(n1)]);
}

#[test]
pub fn flush_area_withdraws_instance() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), Bytes::from_static(&[0, 0, 0, 0]))
        .unwrap();
    let key = LsaKey::new(OspfLsType::Router, rid(1), rid(1));
    let header = updates(&h.sent())[0].2[0].h.clone();
    h.ospf.on_receive_ack(n1, vec![header]).unwrap();
    h.notifications();

    h.ospf.flush_area(AREA, key).unwrap();
    let current = h.current(&key).unwrap();
    assert!(current.h.is_maxage());
    assert_eq!(current.h.ls_seq_number, INITIAL_SEQUENCE_NUMBER);
    assert!(!h.ospf.timers.is_armed(&TimerEvent::Refresh(SCOPE, key)));

    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    let flushed = ups[0].2[0].h.clone();
    assert_eq!(flushed.ls_age, MAX_AGE);

    h.ospf.on_receive_ack(n1, vec![flushed]).unwrap();
    assert!(h.current(&key).is_none());
    assert_eq!(
        h.notifications(),
        vec![
            Notification::LsdbChanged(SCOPE, key),
            Notification::LsdbChanged(SCOPE, key)
        ]
    );
}

#[test]
pub fn flush_all_covers_every_self_originated_lsa() {
    let mut h = Harness::new();
    h.link(1, &[rid(2)], NfsmState::Full);
    let n1 = NeighborId::new(1, rid(2));
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), Bytes::from_static(&[0, 0, 0, 0]))
        .unwrap();
    h.ospf
        .originate(
            Scope::As,
            OspfLsType::AsExternal,
            Ipv4Addr::new(192, 168, 0, 0),
            Bytes::from_static(&[255, 255, 0, 0]),
        )
        .unwrap();
    h.recv(n1, vec![lsa(rid(9), INITIAL_SEQUENCE_NUMBER, 0)]);

    h.ospf.flush_all().unwrap();
    for lsa in h.ospf.lsdb(SCOPE).unwrap().values() {
        assert_eq!(lsa.h.is_maxage(), lsa.h.adv_router == rid(1));
    }
    assert!(
        h.ospf
            .lsdb(Scope::As)
            .unwrap()
            .values()
            .all(|lsa| lsa.h.is_maxage())
    );
}

#[test]
pub fn area_remove_flushes_first() {
    let mut h = Harness::new();
    h.link(1, &[rid(2)], NfsmState::Full);
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), Bytes::from_static(&[0, 0, 0, 0]))
        .unwrap();
    h.sent();

    h.ospf
        .originate(
            Scope::Link(1),
            OspfLsType::OpaqueLinkLocal,
            Ipv4Addr::new(4, 0, 0, 1),
            Bytes::from_static(&[0, 1, 0, 4]),
        )
        .unwrap();
    let opaque = LsaKey::new(OspfLsType::OpaqueLinkLocal, Ipv4Addr::new(4, 0, 0, 1), rid(1));
    h.sent();

    h.ospf.area_remove(AREA).unwrap();
    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 2);
    assert!(ups.iter().all(|(ifindex, _, lsas)| *ifindex == 1 && lsas[0].h.is_maxage()));
    assert!(ups.iter().any(|(_, _, lsas)| lsas[0].key() == opaque));
    assert!(h.ospf.links.is_empty());
    assert!(matches!(h.ospf.lsdb(SCOPE), Err(Error::UnknownArea(_))));
}

#[test]
pub fn maxage_walker_refloods_aged_instance() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let n2 = h.link(2, &[rid(3)], NfsmState::Full)[0];
    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, 3590);
    let key = x.key();
    h.recv(n1, vec![x.clone()]);
    h.notifications();

    h.ospf.advance(10);
    let current = h.current(&key).unwrap();
    assert!(current.h.is_maxage());
    assert_eq!(h.notifications(), vec![Notification::LsdbChanged(SCOPE, key)]);
    assert!(h.rxmt_seq(n1, &key).is_some());
    assert!(h.rxmt_seq(n2, &key).is_some());

    let mut aged = x.h.clone();
    aged.ls_age = MAX_AGE;
    h.ospf.on_receive_ack(n1, vec![aged.clone()]).unwrap();
    assert!(h.current(&key).is_some());
    h.ospf.on_receive_ack(n2, vec![aged]).unwrap();
    assert!(h.current(&key).is_none());
}

#[test]
pub fn scope_mismatch_is_surfaced() {
    let mut h = Harness::new();
    let body = Bytes::from_static(&[0, 0, 0, 0]);

    let err = h
        .ospf
        .originate(Scope::As, OspfLsType::Router, rid(1), body.clone())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ScopeMismatch {
            expected: FloodScope::Area,
            scope: Scope::As,
            ..
        }
    ));

    let err = h
        .ospf
        .originate(Scope::Area(rid(5)), OspfLsType::Router, rid(1), body.clone())
        .unwrap_err();
    assert_eq!(err, Error::UnknownArea(rid(5)));

    let err = h
        .ospf
        .originate(SCOPE, OspfLsType::from(6), rid(1), body)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownScope { .. }));
}

#[test]
pub fn malformed_lsa_is_discarded() {
    let mut h = Harness::new();
    let n1 = h.link(1, &[rid(2)], NfsmState::Full)[0];
    let mut x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, 0);
    x.h.length += 4;

    assert_eq!(h.recv(n1, vec![x.clone()]), vec![FloodAction::Discard]);
    assert!(h.current(&x.key()).is_none());
    assert!(h.sent().is_empty());
}

#[test]
pub fn updates_from_unknown_or_early_neighbors() {
    let mut h = Harness::new();
    let early = h.link(1, &[rid(2)], NfsmState::TwoWay)[0];
    let x = lsa(rid(9), INITIAL_SEQUENCE_NUMBER, 0);

    assert!(h.recv(early, vec![x.clone()]).is_empty());
    assert!(h.current(&x.key()).is_none());

    let stranger = NeighborId::new(1, rid(6));
    assert_eq!(
        h.ospf.on_receive_update(stranger, vec![x]),
        Err(Error::UnknownNeighbor(stranger))
    );
}

#[test]
pub fn flush_domain_withdraws_as_external() {
    let mut h = Harness::new();
    h.link(1, &[rid(2)], NfsmState::Full);
    let prefix = Ipv4Addr::new(192, 168, 0, 0);
    h.ospf
        .originate(
            Scope::As,
            OspfLsType::AsExternal,
            prefix,
            Bytes::from_static(&[255, 255, 0, 0]),
        )
        .unwrap();
    h.sent();

    let key = LsaKey::new(OspfLsType::AsExternal, prefix, rid(1));
    h.ospf.flush_domain(key).unwrap();
    assert!(h.ospf.lookup(Scope::As, &key).unwrap().h.is_maxage());
    let ups = updates(&h.sent());
    assert_eq!(ups.len(), 1);
    assert_eq!((ups[0].0, ups[0].1), (1, None));
}

#[test]
pub fn snapshot_reports_current_age() {
    let mut h = Harness::new();
    h.ospf
        .originate(SCOPE, OspfLsType::Router, rid(1), Bytes::from_static(&[0, 0, 0, 0]))
        .unwrap();
    h.ospf.advance(42);

    let snapshot = h.ospf.snapshot_lsdb(SCOPE).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].h.ls_age, 42);
    assert_eq!(snapshot[0].h.ls_seq_number, INITIAL_SEQUENCE_NUMBER);
}
