//! # Box Office Core
//!
//! Seat inventory for a single venue and the temporary-hold → reservation
//! lifecycle that sits on top of it.
//!
//! ## Core Concepts
//!
//! - **Seat**: one bookable unit with a static desirability score and a strict
//!   `Available → Held → Reserved` state machine
//! - **`SeatPicker`**: strategy that chooses the best available seats
//! - **Venue**: owns the seats and the reservation table; every mutation runs
//!   under one venue-wide lock
//! - **`SeatHold`**: a time-boxed claim on seats, created by the venue
//! - **`IdGenerator`**: injected source of hold ids and reservation codes
//!
//! ## Example
//!
//! ```
//! use box_office_core::{RandomIdGenerator, SystemClock, Venue, VenueLayout};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> box_office_core::Result<()> {
//! let venue = Venue::new(
//!     VenueLayout::new(3, 3),
//!     Arc::new(RandomIdGenerator::new()),
//!     Arc::new(SystemClock),
//! )?;
//!
//! let hold = venue.hold_seats(2, Duration::from_secs(60))?;
//! assert_eq!(hold.num_seats_held(), 2);
//! assert_eq!(venue.available_seats(), 7);
//!
//! let code = venue.reserve(&hold)?;
//! venue.cancel_reservation(code.as_str())?;
//! assert_eq!(venue.available_seats(), 9);
//! # Ok(())
//! # }
//! ```

pub mod customer;
pub mod environment;
pub mod error;
pub mod hold;
pub mod id;
pub mod picker;
pub mod seat;
pub mod venue;

pub use customer::Customer;
pub use environment::{Clock, SystemClock};
pub use error::{Result, TicketingError};
pub use hold::SeatHold;
pub use id::{HoldId, IdGenerator, RandomIdGenerator, ReservationCode, RESERVATION_CODE_LEN};
pub use picker::{BestAvailablePicker, ScanningPicker, SeatPicker, Selection};
pub use seat::{Goodness, Seat, SeatAction, SeatIndex, SeatState};
pub use venue::{InventorySnapshot, Venue, VenueLayout};
