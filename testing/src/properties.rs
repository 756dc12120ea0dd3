//! Property-based testing strategies using proptest.
//!
//! [`arb_ops`] generates random sequences of venue operations and
//! [`run_ops`] replays them against a venue, checking the accounting
//! invariant after every step.

#![allow(clippy::missing_panics_doc)]

use crate::helpers::assert_accounting;
use crate::mocks::ManualClock;
use box_office_core::{ReservationCode, SeatHold, TicketingError, Venue, VenueLayout};
use proptest::prelude::*;
use std::time::Duration;

/// One step of a random venue workload.
///
/// Indices refer to live holds or reservations modulo their current count,
/// so every generated sequence is replayable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueOp {
    /// Hold `count` seats for `ttl_secs`
    Hold {
        /// Seats requested
        count: usize,
        /// Hold lifetime
        ttl_secs: u64,
    },
    /// Return a live hold's seats
    Remove(usize),
    /// Reserve a live hold
    Reserve(usize),
    /// Cancel an existing reservation
    Cancel(usize),
    /// Move the clock forward, then remove every expired hold
    Advance(u64),
}

/// Small venue layouts, up to 12x12.
pub fn arb_layout() -> impl Strategy<Value = VenueLayout> {
    (1u32..=12, 1u32..=12).prop_map(|(rows, seats_per_row)| VenueLayout::new(rows, seats_per_row))
}

/// A single operation, weighted towards holds.
pub fn arb_op() -> impl Strategy<Value = VenueOp> {
    prop_oneof![
        4 => (0usize..20, 0u64..30).prop_map(|(count, ttl_secs)| VenueOp::Hold { count, ttl_secs }),
        1 => any::<usize>().prop_map(VenueOp::Remove),
        2 => any::<usize>().prop_map(VenueOp::Reserve),
        1 => any::<usize>().prop_map(VenueOp::Cancel),
        1 => (1u64..20).prop_map(VenueOp::Advance),
    ]
}

/// Up to `max` operations.
pub fn arb_ops(max: usize) -> impl Strategy<Value = Vec<VenueOp>> {
    prop::collection::vec(arb_op(), 0..max)
}

/// Outcome of replaying a workload.
#[derive(Debug, Default)]
pub struct Replay {
    /// Holds neither removed nor reserved
    pub live: Vec<SeatHold>,
    /// Reservations not cancelled
    pub codes: Vec<ReservationCode>,
    /// Holds that came back with fewer seats than requested
    pub short_holds: usize,
}

/// Replay `ops` against `venue`, asserting accounting after every step.
#[allow(clippy::panic)] // Test assertion
pub fn run_ops(venue: &Venue, clock: &ManualClock, ops: &[VenueOp]) -> Replay {
    let mut replay = Replay::default();
    for op in ops {
        match *op {
            VenueOp::Hold { count, ttl_secs } => {
                let available = venue.available_seats();
                let hold = match venue.hold_seats(count, Duration::from_secs(ttl_secs)) {
                    Ok(hold) => hold,
                    Err(e) => panic!("hold {count}: {e}"),
                };
                assert_eq!(hold.num_seats_held(), count.min(available));
                if hold.num_seats_held() < count {
                    replay.short_holds += 1;
                }
                replay.live.push(hold);
            }
            VenueOp::Remove(i) if !replay.live.is_empty() => {
                let hold = replay.live.swap_remove(i % replay.live.len());
                let seats = hold.num_seats_held();
                assert_eq!(venue.remove_hold(&hold).ok(), Some(seats));
            }
            VenueOp::Reserve(i) if !replay.live.is_empty() => {
                let at = i % replay.live.len();
                match venue.reserve(&replay.live[at]) {
                    Ok(code) => {
                        replay.live.swap_remove(at);
                        replay.codes.push(code);
                    }
                    Err(TicketingError::InvalidArgument(_)) => {
                        assert_eq!(replay.live[at].num_seats_held(), 0);
                    }
                    Err(e) => panic!("reserve: {e}"),
                }
            }
            VenueOp::Cancel(i) if !replay.codes.is_empty() => {
                let code = replay.codes.swap_remove(i % replay.codes.len());
                if let Err(e) = venue.cancel_reservation(code.as_str()) {
                    panic!("cancel {code}: {e}");
                }
            }
            VenueOp::Advance(secs) => {
                clock.advance(Duration::from_secs(secs));
                let (expired, live): (Vec<_>, Vec<_>) =
                    replay.live.drain(..).partition(SeatHold::expired);
                replay.live = live;
                for hold in &expired {
                    if let Err(e) = venue.remove_hold(hold) {
                        panic!("expire {}: {e}", hold.id());
                    }
                }
            }
            VenueOp::Remove(_) | VenueOp::Reserve(_) | VenueOp::Cancel(_) => {}
        }
        let live: Vec<&SeatHold> = replay.live.iter().collect();
        assert_accounting(venue, &live);
    }
    replay
}
