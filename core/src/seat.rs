//! A single bookable seat and its three-state lifecycle.
//!
//! ```text
//!              hold              reserve
//! Available ─────────▶ Held ─────────────▶ Reserved
//!     ▲                 │                     │
//!     └── cancel_hold ──┘                     │
//!     └────────────── cancel_reservation ─────┘
//! ```
//!
//! Any other transition is rejected with
//! [`TicketingError::InvalidTransition`] so double-booking and
//! double-release bugs surface where they happen instead of as count drift.

use crate::error::{Result, TicketingError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Position of a seat in the venue's row-major seat collection.
///
/// Holds and reservations refer to seats through this index; the seats
/// themselves stay owned by the venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatIndex(usize);

impl SeatIndex {
    /// Wrap a raw row-major index
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw row-major index
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SeatIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Static desirability score of a seat. Lower is better.
///
/// Ordered with [`f64::total_cmp`] so it can key ordered collections.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Goodness(f64);

impl Goodness {
    /// Distance from the front-center of a rectangular venue.
    ///
    /// `x` is the column offset from the row's midpoint and `y` is the row
    /// number counted from the front.
    #[must_use]
    pub fn for_position(row: u32, column: u32, seats_per_row: u32) -> Self {
        let midpoint = f64::from(seats_per_row.saturating_sub(1)) / 2.0;
        let x = f64::from(column) - midpoint;
        let y = f64::from(row);
        Self(x.hypot(y))
    }

    /// Raw score
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Goodness {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Goodness {}

impl PartialOrd for Goodness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Goodness {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Lifecycle state of a seat. Exactly one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatState {
    /// Free to be held
    Available,
    /// Claimed by a live seat hold
    Held,
    /// Permanently assigned to a reservation
    Reserved,
}

impl fmt::Display for SeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Held => write!(f, "held"),
            Self::Reserved => write!(f, "reserved"),
        }
    }
}

/// A requested seat transition, reported back in transition errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatAction {
    /// `Available → Held`
    Hold,
    /// `Held → Available`
    CancelHold,
    /// `Held → Reserved`
    Reserve,
    /// `Reserved → Available`
    CancelReservation,
}

impl fmt::Display for SeatAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hold => write!(f, "hold"),
            Self::CancelHold => write!(f, "cancel hold"),
            Self::Reserve => write!(f, "reserve"),
            Self::CancelReservation => write!(f, "cancel reservation"),
        }
    }
}

/// One seat in the venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    id: String,
    row: u32,
    column: u32,
    goodness: Goodness,
    state: SeatState,
}

impl Seat {
    /// Create an available seat at a 0-indexed position.
    ///
    /// The label is 1-indexed for human consumption, e.g. `Row 1 Seat 3`.
    #[must_use]
    pub fn new(row: u32, column: u32, goodness: Goodness) -> Self {
        Self {
            id: format!("Row {} Seat {}", u64::from(row) + 1, u64::from(column) + 1),
            row,
            column,
            goodness,
            state: SeatState::Available,
        }
    }

    /// Display label
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 0-indexed row, counted from the front
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// 0-indexed column
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Desirability score, fixed at construction
    #[must_use]
    pub const fn goodness(&self) -> Goodness {
        self.goodness
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SeatState {
        self.state
    }

    /// Whether the seat can be held
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.state, SeatState::Available)
    }

    /// Whether the seat is claimed by a hold
    #[must_use]
    pub const fn is_held(&self) -> bool {
        matches!(self.state, SeatState::Held)
    }

    /// Whether the seat belongs to a reservation
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self.state, SeatState::Reserved)
    }

    /// `Available → Held`
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidTransition`] if the seat is already
    /// held or reserved.
    pub fn hold(&mut self) -> Result<()> {
        self.transition(SeatAction::Hold, SeatState::Available, SeatState::Held)
    }

    /// `Held → Available`
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidTransition`] on a double release or
    /// when the hold has already converted into a reservation.
    pub fn cancel_hold(&mut self) -> Result<()> {
        self.transition(SeatAction::CancelHold, SeatState::Held, SeatState::Available)
    }

    /// `Held → Reserved`
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidTransition`] if the seat was never
    /// held or is already reserved.
    pub fn reserve(&mut self) -> Result<()> {
        self.transition(SeatAction::Reserve, SeatState::Held, SeatState::Reserved)
    }

    /// `Reserved → Available`
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidTransition`] unless the seat is
    /// reserved.
    pub fn cancel_reservation(&mut self) -> Result<()> {
        self.transition(
            SeatAction::CancelReservation,
            SeatState::Reserved,
            SeatState::Available,
        )
    }

    fn transition(&mut self, action: SeatAction, from: SeatState, to: SeatState) -> Result<()> {
        if self.state != from {
            return Err(TicketingError::InvalidTransition {
                seat: self.id.clone(),
                from: self.state,
                action,
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    fn seat() -> Seat {
        Seat::new(0, 0, Goodness::for_position(0, 0, 1))
    }

    #[test]
    fn test_label_is_one_indexed() {
        let seat = Seat::new(2, 4, Goodness::for_position(2, 4, 10));
        assert_eq!(seat.id(), "Row 3 Seat 5");
        assert_eq!(seat.row(), 2);
        assert_eq!(seat.column(), 4);
    }

    #[test]
    fn test_new_seat_is_available() {
        let seat = seat();
        assert!(seat.is_available());
        assert!(!seat.is_held());
        assert!(!seat.is_reserved());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut seat = seat();
        seat.hold().unwrap();
        assert_eq!(seat.state(), SeatState::Held);
        seat.reserve().unwrap();
        assert_eq!(seat.state(), SeatState::Reserved);
        seat.cancel_reservation().unwrap();
        assert_eq!(seat.state(), SeatState::Available);
        seat.hold().unwrap();
        seat.cancel_hold().unwrap();
        assert!(seat.is_available());
    }

    #[test]
    fn test_double_hold_rejected() {
        let mut seat = seat();
        seat.hold().unwrap();
        let err = seat.hold().unwrap_err();
        assert_eq!(
            err,
            TicketingError::InvalidTransition {
                seat: "Row 1 Seat 1".into(),
                from: SeatState::Held,
                action: SeatAction::Hold,
            }
        );
        assert!(seat.is_held());
    }

    #[test]
    fn test_hold_reserved_seat_rejected() {
        let mut seat = seat();
        seat.hold().unwrap();
        seat.reserve().unwrap();
        assert!(seat.hold().is_err());
        assert!(seat.is_reserved());
    }

    #[test]
    fn test_double_release_rejected() {
        let mut seat = seat();
        assert!(seat.cancel_hold().is_err());
        seat.hold().unwrap();
        seat.cancel_hold().unwrap();
        assert!(seat.cancel_hold().is_err());
    }

    #[test]
    fn test_cancel_hold_after_reserve_rejected() {
        let mut seat = seat();
        seat.hold().unwrap();
        seat.reserve().unwrap();
        assert!(seat.cancel_hold().is_err());
        assert!(seat.is_reserved());
    }

    #[test]
    fn test_reserve_requires_hold() {
        let mut seat = seat();
        assert!(seat.reserve().is_err());
        seat.hold().unwrap();
        seat.reserve().unwrap();
        assert!(seat.reserve().is_err());
    }

    #[test]
    fn test_cancel_reservation_requires_reservation() {
        let mut seat = seat();
        assert!(seat.cancel_reservation().is_err());
        seat.hold().unwrap();
        assert!(seat.cancel_reservation().is_err());
        assert!(seat.is_held());
    }

    #[test]
    fn test_goodness_centered_front_row_is_zero() {
        assert_eq!(Goodness::for_position(0, 1, 3).value(), 0.0);
        assert_eq!(Goodness::for_position(0, 0, 3).value(), 1.0);
        assert_eq!(Goodness::for_position(1, 1, 3).value(), 1.0);
        assert!((Goodness::for_position(1, 0, 3).value() - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_goodness_even_row_has_two_centers() {
        let left = Goodness::for_position(0, 1, 4);
        let right = Goodness::for_position(0, 2, 4);
        assert_eq!(left, right);
        assert_eq!(left.value(), 0.5);
    }

    #[test]
    fn test_goodness_orders_lower_first() {
        let front = Goodness::for_position(0, 5, 11);
        let back = Goodness::for_position(3, 5, 11);
        assert!(front < back);
    }
}
