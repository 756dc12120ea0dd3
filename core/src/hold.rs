//! Time-boxed claims on seats.
//!
//! A [`SeatHold`] is created by [`Venue::hold_seats`](crate::venue::Venue::hold_seats)
//! after the venue has already marked its seats held. It only records which
//! seats it claims and until when; it never touches seat state itself.
//!
//! Holds are shared (`Arc<SeatHold>`) between the caller and whatever tracks
//! them, so the claim sits behind its own small lock. Lock order is always
//! venue first, then hold.

use crate::environment::Clock;
use crate::id::{HoldId, IdGenerator};
use crate::picker::Selection;
use crate::seat::SeatIndex;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Claim {
    seats: Selection,
    expires_at: DateTime<Utc>,
    released: bool,
    // Seats dropped by a bare `remove()` that the venue has not taken back
    unreturned: Selection,
}

/// A revocable claim on a list of venue seats.
pub struct SeatHold {
    id: HoldId,
    requested: usize,
    created_at: DateTime<Utc>,
    claim: Mutex<Claim>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl SeatHold {
    pub(crate) fn new(
        id: HoldId,
        seats: Selection,
        requested: usize,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            id,
            requested,
            created_at,
            claim: Mutex::new(Claim {
                seats,
                expires_at,
                released: false,
                unreturned: Selection::new(),
            }),
            clock,
            ids,
        }
    }

    fn claim(&self) -> MutexGuard<'_, Claim> {
        self.claim.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generator-issued id
    #[must_use]
    pub const fn id(&self) -> HoldId {
        self.id
    }

    /// Number of seats the caller asked for
    #[must_use]
    pub const fn num_seats_requested(&self) -> usize {
        self.requested
    }

    /// Number of seats actually claimed. Never more than requested; zero once
    /// the hold has been removed or reserved.
    #[must_use]
    pub fn num_seats_held(&self) -> usize {
        self.claim().seats.len()
    }

    /// Claimed seats, best first
    #[must_use]
    pub fn seats(&self) -> Vec<SeatIndex> {
        self.claim().seats.to_vec()
    }

    /// When the hold was placed
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Deadline after which the hold is no longer valid
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claim().expires_at
    }

    /// True once the deadline is reached (inclusive) or the hold was removed.
    #[must_use]
    pub fn expired(&self) -> bool {
        let claim = self.claim();
        claim.released || self.clock.now() >= claim.expires_at
    }

    /// Whether the claim was given up, either by removal or by reservation
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.claim().released
    }

    /// Force immediate expiry, retire the id and drop the seat references.
    ///
    /// Idempotent. Seat state is left alone: the seats stay held until the
    /// hold is passed to [`Venue::remove_hold`](crate::venue::Venue::remove_hold),
    /// which still knows which seats to return.
    pub fn remove(&self) {
        let mut claim = self.claim();
        if !claim.released {
            claim.unreturned = self.release(&mut claim);
        }
    }

    /// Whether `remove()` dropped seats the venue still counts as held
    pub(crate) fn has_unreturned_seats(&self) -> bool {
        !self.claim().unreturned.is_empty()
    }

    /// Hand the seats the venue still has to settle to the caller.
    ///
    /// Releases a live claim, or returns what a bare `remove()` left behind.
    /// `None` once everything was handed over.
    pub(crate) fn detach(&self) -> Option<Selection> {
        let mut claim = self.claim();
        if claim.released {
            return (!claim.unreturned.is_empty()).then(|| std::mem::take(&mut claim.unreturned));
        }
        Some(self.release(&mut claim))
    }

    fn release(&self, claim: &mut Claim) -> Selection {
        let now = self.clock.now();
        if claim.expires_at > now {
            claim.expires_at = now;
        }
        claim.released = true;
        self.ids.retire_hold_id(self.id);
        std::mem::take(&mut claim.seats)
    }
}

impl fmt::Debug for SeatHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let claim = self.claim();
        f.debug_struct("SeatHold")
            .field("id", &self.id)
            .field("requested", &self.requested)
            .field("seats", &claim.seats)
            .field("expires_at", &claim.expires_at)
            .field("released", &claim.released)
            .field("unreturned", &claim.unreturned)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::id::RandomIdGenerator;
    use chrono::TimeDelta;
    use smallvec::smallvec;

    struct StoppedClock(DateTime<Utc>);

    impl Clock for StoppedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn hold_with_ttl(ttl: TimeDelta) -> (SeatHold, Arc<RandomIdGenerator>) {
        let now = Utc::now();
        let ids = Arc::new(RandomIdGenerator::new());
        let id = ids.new_hold_id();
        let hold = SeatHold::new(
            id,
            smallvec![SeatIndex::new(4), SeatIndex::new(3)],
            3,
            now,
            now + ttl,
            Arc::new(StoppedClock(now)),
            ids.clone(),
        );
        (hold, ids)
    }

    #[test]
    fn test_counts() {
        let (hold, _) = hold_with_ttl(TimeDelta::minutes(1));
        assert_eq!(hold.num_seats_requested(), 3);
        assert_eq!(hold.num_seats_held(), 2);
        assert_eq!(hold.seats(), vec![SeatIndex::new(4), SeatIndex::new(3)]);
        assert!(hold.id().get() > 0);
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let (hold, _) = hold_with_ttl(TimeDelta::zero());
        assert!(hold.expired());
    }

    #[test]
    fn test_future_deadline_not_expired() {
        let (hold, _) = hold_with_ttl(TimeDelta::days(1));
        assert!(!hold.expired());
        assert!(!hold.is_released());
    }

    #[test]
    fn test_remove_forces_expiry_and_clears_seats() {
        let (hold, ids) = hold_with_ttl(TimeDelta::days(1));
        let deadline = hold.expires_at();
        hold.remove();
        assert!(hold.expired());
        assert!(hold.is_released());
        assert_eq!(hold.num_seats_held(), 0);
        assert!(hold.expires_at() < deadline);
        assert_eq!(ids.hold_ids_in_use(), 0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (hold, ids) = hold_with_ttl(TimeDelta::days(1));
        hold.remove();
        let deadline = hold.expires_at();
        hold.remove();
        assert_eq!(hold.expires_at(), deadline);
        assert_eq!(ids.hold_ids_in_use(), 0);
    }

    #[test]
    fn test_removed_seats_are_still_handed_to_venue() {
        let (hold, _) = hold_with_ttl(TimeDelta::days(1));
        hold.remove();
        assert!(hold.has_unreturned_seats());
        assert_eq!(hold.num_seats_held(), 0);

        let seats = hold.detach().unwrap();
        assert_eq!(seats.as_slice(), &[SeatIndex::new(4), SeatIndex::new(3)]);
        assert!(!hold.has_unreturned_seats());
        assert!(hold.detach().is_none());
    }

    #[test]
    fn test_remove_after_detach_keeps_nothing() {
        let (hold, _) = hold_with_ttl(TimeDelta::days(1));
        hold.detach().unwrap();
        hold.remove();
        assert!(!hold.has_unreturned_seats());
        assert!(hold.detach().is_none());
    }

    #[test]
    fn test_detach_hands_over_seats_once() {
        let (hold, _) = hold_with_ttl(TimeDelta::days(1));
        let seats = hold.detach().unwrap();
        assert_eq!(seats.as_slice(), &[SeatIndex::new(4), SeatIndex::new(3)]);
        assert!(hold.detach().is_none());
    }

    #[test]
    fn test_remove_keeps_past_deadline() {
        let (hold, _) = hold_with_ttl(TimeDelta::seconds(-5));
        let deadline = hold.expires_at();
        hold.remove();
        assert_eq!(hold.expires_at(), deadline);
    }
}
