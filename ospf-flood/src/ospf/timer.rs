use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use super::lsa::LsaKey;
use super::lsdb::Scope;
use super::neigh::NeighborId;

/// Logical time in seconds. The event loop advances it once per second and
/// tests advance it directly, so no handler ever reads the wall clock.
pub type Tick = u64;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum TimerEvent {
    Rxmt(NeighborId),
    LsReq(NeighborId),
    AckDelay(u32),
    Refresh(Scope, LsaKey),
    MaxAgeWalker,
}

/// Deadline heap with one pending deadline per event. Cancelled or re-armed
/// events leave stale heap entries behind; those are skipped on expiry.
#[derive(Debug, Default)]
pub struct Timers {
    heap: BinaryHeap<Reverse<(Tick, TimerEvent)>>,
    armed: BTreeMap<TimerEvent, Tick>,
}

impl Timers {
    pub fn arm(&mut self, ev: TimerEvent, at: Tick) {
        self.armed.insert(ev, at);
        self.heap.push(Reverse((at, ev)));
    }

    pub fn arm_if_idle(&mut self, ev: TimerEvent, at: Tick) {
        if !self.armed.contains_key(&ev) {
            self.arm(ev, at);
        }
    }

    pub fn cancel(&mut self, ev: &TimerEvent) {
        self.armed.remove(ev);
    }

    pub fn is_armed(&self, ev: &TimerEvent) -> bool {
        self.armed.contains_key(ev)
    }

    pub fn deadline(&self, ev: &TimerEvent) -> Option<Tick> {
        self.armed.get(ev).copied()
    }

    /// Pop every event whose deadline is at or before `now`, in deadline
    /// order.
    pub fn expire(&mut self, now: Tick) -> Vec<TimerEvent> {
        let mut fired = vec![];
        while let Some(Reverse((at, ev))) = self.heap.peek().copied() {
            if at > now {
                break;
            }
            self.heap.pop();
            if self.armed.get(&ev) == Some(&at) {
                self.armed.remove(&ev);
                fired.push(ev);
            }
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}
