//! Holds tracked by the service, in creation order.

use crate::config::SweepPolicy;
use box_office_core::{Customer, HoldId, SeatHold, TicketingError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A hold plus the customer that placed it.
#[derive(Debug, Clone)]
pub(crate) struct TrackedHold {
    pub hold: Arc<SeatHold>,
    pub customer: Customer,
}

/// Insertion-ordered table of live holds, indexed by id.
#[derive(Debug, Default)]
pub(crate) struct HoldTable {
    by_age: BTreeMap<u64, TrackedHold>,
    by_id: HashMap<HoldId, u64>,
    next_seq: u64,
}

impl HoldTable {
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Start tracking a hold.
    ///
    /// A reissued id means the generator is broken, so the existing entry is
    /// left alone and the collision is reported.
    pub fn insert(&mut self, tracked: TrackedHold) -> Result<(), TicketingError> {
        let id = tracked.hold.id();
        if self.by_id.contains_key(&id) {
            return Err(TicketingError::InvariantViolation(format!(
                "Seat hold id {id} is already in use"
            )));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_id.insert(id, seq);
        self.by_age.insert(seq, tracked);
        Ok(())
    }

    pub fn get(&self, id: HoldId) -> Option<&TrackedHold> {
        self.by_id.get(&id).and_then(|seq| self.by_age.get(seq))
    }

    /// Stop tracking a hold and hand it back.
    pub fn take(&mut self, id: HoldId) -> Option<TrackedHold> {
        let seq = self.by_id.remove(&id)?;
        self.by_age.remove(&seq)
    }

    /// Remove expired holds, oldest first.
    ///
    /// Returns how many entries were examined and the holds taken out.
    pub fn take_expired(&mut self, policy: SweepPolicy) -> (usize, Vec<TrackedHold>) {
        let mut examined = 0;
        let mut expired = Vec::new();
        for (&seq, tracked) in &self.by_age {
            examined += 1;
            if tracked.hold.expired() {
                expired.push(seq);
            } else if policy == SweepPolicy::StopAtFirstLive {
                break;
            }
        }

        let taken = expired
            .into_iter()
            .filter_map(|seq| self.by_age.remove(&seq))
            .inspect(|tracked| {
                self.by_id.remove(&tracked.hold.id());
            })
            .collect();
        (examined, taken)
    }

    pub fn holds(&self) -> impl Iterator<Item = &Arc<SeatHold>> {
        self.by_age.values().map(|tracked| &tracked.hold)
    }
}
