//! Fixtures and invariant assertions for venue tests.

#![allow(clippy::missing_panics_doc)] // Assertion helpers panic by design

use crate::mocks::{ManualClock, SequentialIdGenerator, manual_clock};
use box_office_core::{InventorySnapshot, SeatHold, Venue, VenueLayout};
use std::collections::HashSet;
use std::sync::Arc;

/// Initialize test logging. Safe to call from every test.
///
/// Honors `RUST_LOG`, defaulting to `box_office=debug`.
pub fn init_test_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("box_office_core=debug,box_office_runtime=debug"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Venue with a [`ManualClock`] and a [`SequentialIdGenerator`].
///
/// The clock is returned so the test can move time forward.
#[must_use]
pub fn test_venue(rows: u32, seats_per_row: u32) -> (Venue, Arc<ManualClock>) {
    let (venue, clock, _) = test_venue_with_ids(rows, seats_per_row);
    (venue, clock)
}

/// Like [`test_venue`], also handing back the id generator.
#[must_use]
pub fn test_venue_with_ids(
    rows: u32,
    seats_per_row: u32,
) -> (Venue, Arc<ManualClock>, Arc<SequentialIdGenerator>) {
    let clock = Arc::new(manual_clock());
    let ids = Arc::new(SequentialIdGenerator::new());
    #[allow(clippy::panic)] // Fixture misuse
    let venue = match Venue::new(
        VenueLayout::new(rows, seats_per_row),
        ids.clone(),
        clock.clone(),
    ) {
        Ok(venue) => venue,
        Err(e) => panic!("test venue {rows}x{seats_per_row}: {e}"),
    };
    (venue, clock, ids)
}

/// Assert the seat accounting invariant.
///
/// `live` must be every hold on the venue that has not been removed or
/// reserved. Checks that the venue's own audit passes, that no seat is
/// claimed twice, and that
/// `available + seats in live holds + seats in reservations == total`.
#[allow(clippy::panic)] // Test assertion
pub fn assert_accounting(venue: &Venue, live: &[&SeatHold]) -> InventorySnapshot {
    let snapshot = match venue.audit() {
        Ok(snapshot) => snapshot,
        Err(e) => panic!("venue audit failed: {e}"),
    };

    let mut claimed = HashSet::new();
    for hold in live {
        for index in hold.seats() {
            assert!(
                claimed.insert(index),
                "seat {index} is claimed by more than one hold"
            );
            let held = venue.seat(index).is_some_and(|seat| seat.is_held());
            assert!(held, "seat {index} of hold {} is not held", hold.id());
        }
    }

    assert_eq!(
        claimed.len(),
        snapshot.held,
        "live holds claim {} seats but {} are held",
        claimed.len(),
        snapshot.held
    );
    assert_eq!(
        snapshot.available + claimed.len() + snapshot.reserved,
        snapshot.total,
        "seats leaked: {snapshot:?}"
    );
    snapshot
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::time::Duration;

    #[test]
    fn test_accounting_holds_across_lifecycle() {
        init_test_tracing();
        let (venue, clock) = test_venue(4, 5);
        let a = venue.hold_seats(3, Duration::from_secs(10)).unwrap();
        let b = venue.hold_seats(4, Duration::from_secs(10)).unwrap();
        assert_accounting(&venue, &[&a, &b]);

        venue.reserve(&a).unwrap();
        assert_accounting(&venue, &[&b]);

        clock.advance(Duration::from_secs(10));
        assert!(b.expired());
        venue.remove_hold(&b).unwrap();
        let snapshot = assert_accounting(&venue, &[]);
        assert_eq!(snapshot.available, 17);
    }

    #[test]
    #[should_panic(expected = "are held")]
    fn test_missing_live_hold_is_caught() {
        let (venue, _clock) = test_venue(2, 2);
        let _forgotten = venue.hold_seats(1, Duration::from_secs(10)).unwrap();
        assert_accounting(&venue, &[]);
    }
}
