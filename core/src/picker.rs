//! Best-seat selection strategies.
//!
//! A [`SeatPicker`] chooses which available seats a new hold receives. The
//! venue owns exactly one picker and calls it under the venue lock, so
//! implementations never see concurrent calls.
//!
//! Ranking is by [`Goodness`] (lower first), ties broken by row-major
//! position, which makes every selection reproducible.

use crate::seat::{Goodness, Seat, SeatIndex};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Seats chosen for a single hold, best first.
pub type Selection = SmallVec<[SeatIndex; 8]>;

type RankKey = (Goodness, SeatIndex);

fn rank(index: usize, seat: &Seat) -> RankKey {
    (seat.goodness(), SeatIndex::new(index))
}

/// Strategy for choosing the best available seats.
pub trait SeatPicker: Send + fmt::Debug {
    /// Pick up to `count` available seats, best first.
    ///
    /// Returns every available seat when fewer than `count` remain and an
    /// empty selection when `count` is zero. Never returns a seat that is not
    /// available.
    fn pick(&mut self, seats: &[Seat], count: usize) -> Selection;

    /// Notification that `returned` seats are available again.
    ///
    /// Called after the venue has transitioned them back to available.
    fn release(&mut self, seats: &[Seat], returned: &[SeatIndex]) {
        let _ = (seats, returned);
    }
}

/// Default picker backed by an ordered index of the available seats.
///
/// The index is built on the first pick. Picks pop from its front and
/// releases reinsert, so selecting `n` seats costs `O(n log seats)` instead of
/// a scan of the whole venue, and a full sell-out stays `O(seats log seats)`.
#[derive(Debug, Default)]
pub struct BestAvailablePicker {
    ranked: Option<BTreeSet<RankKey>>,
}

impl BestAvailablePicker {
    /// Creates a picker with an unbuilt index
    #[must_use]
    pub const fn new() -> Self {
        Self { ranked: None }
    }

    fn build_index(seats: &[Seat]) -> BTreeSet<RankKey> {
        seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.is_available())
            .map(|(index, seat)| rank(index, seat))
            .collect()
    }
}

impl SeatPicker for BestAvailablePicker {
    fn pick(&mut self, seats: &[Seat], count: usize) -> Selection {
        let ranked = self
            .ranked
            .get_or_insert_with(|| Self::build_index(seats));

        let mut picked = Selection::new();
        while picked.len() < count {
            let Some((_, index)) = ranked.pop_first() else {
                break;
            };
            match seats.get(index.get()) {
                Some(seat) if seat.is_available() => picked.push(index),
                _ => tracing::warn!(seat = %index, "Dropping stale entry from seat index"),
            }
        }
        picked
    }

    fn release(&mut self, seats: &[Seat], returned: &[SeatIndex]) {
        let Some(ranked) = self.ranked.as_mut() else {
            return;
        };
        for &index in returned {
            if let Some(seat) = seats.get(index.get()).filter(|seat| seat.is_available()) {
                ranked.insert(rank(index.get(), seat));
            }
        }
    }
}

/// Stateless picker that ranks the whole venue on every call.
///
/// `O(seats)` per pick. Useful as a reference for the indexed picker and for
/// small venues where keeping an index is not worth it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanningPicker;

impl SeatPicker for ScanningPicker {
    fn pick(&mut self, seats: &[Seat], count: usize) -> Selection {
        let mut available: Vec<RankKey> = seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.is_available())
            .map(|(index, seat)| rank(index, seat))
            .collect();

        if count < available.len() {
            available.select_nth_unstable(count);
            available.truncate(count);
        }
        available.sort_unstable();
        available.into_iter().map(|(_, index)| index).collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn grid(rows: u32, per_row: u32) -> Vec<Seat> {
        (0..rows)
            .flat_map(|row| {
                (0..per_row)
                    .map(move |column| Seat::new(row, column, Goodness::for_position(row, column, per_row)))
            })
            .collect()
    }

    fn labels(seats: &[Seat], picked: &[SeatIndex]) -> Vec<String> {
        picked
            .iter()
            .map(|index| seats[index.get()].id().to_string())
            .collect()
    }

    fn hold_all(seats: &mut [Seat], picked: &[SeatIndex]) {
        for index in picked {
            seats[index.get()].hold().unwrap();
        }
    }

    #[test]
    fn test_picks_front_center_first() {
        let seats = grid(3, 3);
        let picked = BestAvailablePicker::new().pick(&seats, 2);
        assert_eq!(labels(&seats, &picked), vec!["Row 1 Seat 2", "Row 1 Seat 1"]);
    }

    #[test]
    fn test_ties_break_row_major() {
        let seats = grid(3, 3);
        // Row 1 Seat 1, Row 1 Seat 3 and Row 2 Seat 2 all sit at distance 1
        let picked = BestAvailablePicker::new().pick(&seats, 4);
        assert_eq!(
            labels(&seats, &picked),
            vec!["Row 1 Seat 2", "Row 1 Seat 1", "Row 1 Seat 3", "Row 2 Seat 2"]
        );
    }

    #[test]
    fn test_zero_count_picks_nothing() {
        let seats = grid(2, 2);
        assert!(BestAvailablePicker::new().pick(&seats, 0).is_empty());
        assert!(ScanningPicker.pick(&seats, 0).is_empty());
    }

    #[test]
    fn test_short_inventory_returns_everything_available() {
        let seats = grid(3, 3);
        let mut picker = BestAvailablePicker::new();
        assert_eq!(picker.pick(&seats, 1_000_000).len(), 9);
        assert!(picker.pick(&seats, 1).is_empty());
    }

    #[test]
    fn test_index_skips_seats_held_elsewhere() {
        let mut seats = grid(1, 3);
        seats[1].hold().unwrap();
        let picked = BestAvailablePicker::new().pick(&seats, 3);
        assert_eq!(labels(&seats, &picked), vec!["Row 1 Seat 1", "Row 1 Seat 3"]);
    }

    #[test]
    fn test_release_returns_seat_to_front_of_index() {
        let mut seats = grid(3, 3);
        let mut picker = BestAvailablePicker::new();
        let first = picker.pick(&seats, 2);
        hold_all(&mut seats, &first);

        seats[first[0].get()].cancel_hold().unwrap();
        picker.release(&seats, &first[..1]);

        let again = picker.pick(&seats, 1);
        assert_eq!(labels(&seats, &again), vec!["Row 1 Seat 2"]);
    }

    #[test]
    fn test_release_ignores_seats_that_are_not_available() {
        let mut seats = grid(1, 2);
        let mut picker = BestAvailablePicker::new();
        let picked = picker.pick(&seats, 2);
        hold_all(&mut seats, &picked);

        picker.release(&seats, &picked);
        assert!(picker.pick(&seats, 2).is_empty());
    }

    #[test]
    fn test_scanning_matches_indexed_as_house_fills() {
        let mut seats = grid(7, 12);
        let mut indexed = BestAvailablePicker::new();
        for count in [1, 5, 3, 20, 2, 60] {
            let expected = ScanningPicker.pick(&seats, count);
            let actual = indexed.pick(&seats, count);
            assert_eq!(expected, actual);
            hold_all(&mut seats, &actual);
        }
        assert!(seats.iter().all(Seat::is_held));
    }
}
