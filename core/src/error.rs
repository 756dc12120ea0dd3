//! Error taxonomy shared by every inventory operation.

use crate::id::HoldId;
use crate::seat::{SeatAction, SeatState};
use thiserror::Error;

/// Result alias for inventory operations.
pub type Result<T> = std::result::Result<T, TicketingError>;

/// Errors raised by the venue, its seats, and the services layered on top.
///
/// Running out of seats is never one of these: a hold that cannot be fully
/// satisfied simply carries fewer seats than were requested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    /// The caller passed a bad count, code, id or identity.
    ///
    /// Never retried; the request itself has to change.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A seat was asked to make a transition its current state does not allow.
    ///
    /// This is a double-booking or double-release bug caught at the point of
    /// occurrence.
    #[error("Seat {seat} cannot {action} while {from}")]
    InvalidTransition {
        /// Label of the seat
        seat: String,
        /// State the seat was in
        from: SeatState,
        /// Transition that was attempted
        action: SeatAction,
    },

    /// Unknown hold id or reservation code.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The hold passed its deadline or was already released.
    #[error("Seat hold {0} has expired")]
    Expired(HoldId),

    /// Inventory accounting no longer adds up, or the id generator collided.
    ///
    /// The inventory can no longer be trusted once this is returned.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl TicketingError {
    /// Whether this error means the inventory itself is corrupt.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::InvariantViolation(_)
        )
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        Self::InvariantViolation(format!("{what} lock poisoned by a panicked writer"))
    }
}
