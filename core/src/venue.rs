//! The venue: fixed seat inventory plus the reservation table.
//!
//! Every mutating operation runs under one venue-wide lock. Selecting seats
//! and marking them held happen inside the same critical section, so two
//! concurrent holds can never be handed the same seat.
//!
//! # Accounting
//!
//! At every quiescent point:
//!
//! ```text
//! available + seats in live holds + seats in reservations == total
//! ```
//!
//! [`Venue::audit`] rescans the seats and checks this.

use crate::environment::Clock;
use crate::error::{Result, TicketingError};
use crate::hold::SeatHold;
use crate::id::{IdGenerator, ReservationCode};
use crate::picker::{BestAvailablePicker, SeatPicker, Selection};
use crate::seat::{Goodness, Seat, SeatAction, SeatIndex, SeatState};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Rectangular venue dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueLayout {
    /// Number of rows, front to back
    pub rows: u32,
    /// Seats in every row
    pub seats_per_row: u32,
}

impl VenueLayout {
    /// Creates a layout
    #[must_use]
    pub const fn new(rows: u32, seats_per_row: u32) -> Self {
        Self {
            rows,
            seats_per_row,
        }
    }

    /// Total number of seats, `rows × seats_per_row`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidArgument`] if either dimension is
    /// zero or the product does not fit in `usize`.
    pub fn total_seats(self) -> Result<usize> {
        if self.rows == 0 || self.seats_per_row == 0 {
            return Err(TicketingError::InvalidArgument(format!(
                "Venue needs at least one row and one seat per row, got {}x{}",
                self.rows, self.seats_per_row
            )));
        }
        usize::try_from(u64::from(self.rows) * u64::from(self.seats_per_row)).map_err(|_| {
            TicketingError::InvalidArgument(format!(
                "Venue of {}x{} seats is too large",
                self.rows, self.seats_per_row
            ))
        })
    }
}

/// Point-in-time seat counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Fixed seat count
    pub total: usize,
    /// Seats that can be held
    pub available: usize,
    /// Seats claimed by live holds
    pub held: usize,
    /// Seats in reservations
    pub reserved: usize,
    /// Number of live reservations
    pub reservations: usize,
}

struct Inventory {
    seats: Vec<Seat>,
    available: usize,
    held: usize,
    reservations: HashMap<ReservationCode, Selection>,
    picker: Box<dyn SeatPicker>,
}

impl Inventory {
    fn seat_mut(&mut self, index: SeatIndex) -> Result<&mut Seat> {
        self.seats.get_mut(index.get()).ok_or_else(|| {
            TicketingError::InvariantViolation(format!("Seat {index} does not belong to this venue"))
        })
    }

    fn reserved(&self) -> usize {
        self.reservations.values().map(|seats| seats.len()).sum()
    }

    /// Put seats that were just taken from the picker back, best effort.
    fn unwind_holds(&mut self, seats: &[SeatIndex]) {
        for &index in seats {
            if let Some(seat) = self.seats.get_mut(index.get()) {
                if seat.cancel_hold().is_err() {
                    tracing::error!(seat = %seat.id(), "Failed to unwind hold on seat");
                }
            }
        }
        let Self { seats: all, picker, .. } = self;
        picker.release(all, seats);
    }
}

/// A rectangular venue with a fixed seat inventory.
pub struct Venue {
    layout: VenueLayout,
    total: usize,
    inventory: Mutex<Inventory>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Venue {
    /// Build a venue with every seat available, using [`BestAvailablePicker`].
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidArgument`] for an empty or oversized
    /// layout.
    pub fn new(layout: VenueLayout, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_picker(layout, Box::new(BestAvailablePicker::new()), ids, clock)
    }

    /// Build a venue with a specific seat picking strategy.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidArgument`] for an empty or oversized
    /// layout.
    pub fn with_picker(
        layout: VenueLayout,
        picker: Box<dyn SeatPicker>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let total = layout.total_seats()?;
        let mut seats = Vec::with_capacity(total);
        for row in 0..layout.rows {
            for column in 0..layout.seats_per_row {
                let goodness = Goodness::for_position(row, column, layout.seats_per_row);
                seats.push(Seat::new(row, column, goodness));
            }
        }

        tracing::debug!(
            rows = layout.rows,
            seats_per_row = layout.seats_per_row,
            total,
            ?picker,
            "Venue created"
        );

        Ok(Self {
            layout,
            total,
            inventory: Mutex::new(Inventory {
                seats,
                available: total,
                held: 0,
                reservations: HashMap::new(),
                picker,
            }),
            ids,
            clock,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inventory>> {
        self.inventory
            .lock()
            .map_err(|_| TicketingError::lock_poisoned("Venue"))
    }

    fn read(&self) -> MutexGuard<'_, Inventory> {
        self.inventory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Venue dimensions
    #[must_use]
    pub const fn layout(&self) -> VenueLayout {
        self.layout
    }

    /// Total number of seats
    #[must_use]
    pub const fn total_seats(&self) -> usize {
        self.total
    }

    /// Number of seats that can currently be held. `O(1)`.
    #[must_use]
    pub fn available_seats(&self) -> usize {
        self.read().available
    }

    /// Seat counts by state
    #[must_use]
    pub fn inventory(&self) -> InventorySnapshot {
        let inventory = self.read();
        InventorySnapshot {
            total: self.total,
            available: inventory.available,
            held: inventory.held,
            reserved: inventory.reserved(),
            reservations: inventory.reservations.len(),
        }
    }

    /// Copy of one seat
    #[must_use]
    pub fn seat(&self, index: SeatIndex) -> Option<Seat> {
        self.read().seats.get(index.get()).cloned()
    }

    /// Copy of every seat in row-major order
    #[must_use]
    pub fn seats(&self) -> Vec<Seat> {
        self.read().seats.clone()
    }

    /// Seats belonging to a reservation, if it exists
    #[must_use]
    pub fn reservation(&self, code: &ReservationCode) -> Option<Vec<SeatIndex>> {
        self.read()
            .reservations
            .get(code)
            .map(|seats| seats.to_vec())
    }

    /// Hold up to `count` of the best available seats for `ttl`.
    ///
    /// Short inventory is not an error: the hold carries whatever could be
    /// found, possibly nothing.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidArgument`] if `ttl` pushes the deadline out
    ///   of range
    /// - [`TicketingError::InvalidTransition`] if the picker handed out a seat
    ///   that was not available (no seat is left held in that case)
    /// - [`TicketingError::InvariantViolation`] if the venue lock is poisoned
    pub fn hold_seats(&self, count: usize, ttl: Duration) -> Result<SeatHold> {
        let created_at = self.clock.now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                TicketingError::InvalidArgument(format!("Hold TTL {ttl:?} is out of range"))
            })?;

        let mut inventory = self.lock()?;
        let picked = {
            let Inventory { seats, picker, .. } = &mut *inventory;
            picker.pick(seats, count)
        };

        for (done, &index) in picked.iter().enumerate() {
            if let Err(e) = inventory.seat_mut(index).and_then(Seat::hold) {
                inventory.unwind_holds(&picked[..done]);
                let Inventory { seats, picker, .. } = &mut *inventory;
                picker.release(seats, &picked[done + 1..]);
                return Err(e);
            }
        }
        inventory.available -= picked.len();
        inventory.held += picked.len();

        let id = self.ids.new_hold_id();
        tracing::debug!(
            hold_id = %id,
            requested = count,
            held = picked.len(),
            available = inventory.available,
            "Seats held"
        );
        drop(inventory);

        Ok(SeatHold::new(
            id,
            picked,
            count,
            created_at,
            expires_at,
            Arc::clone(&self.clock),
            Arc::clone(&self.ids),
        ))
    }

    /// Return a hold's seats to the pool and empty the hold.
    ///
    /// Also settles a hold emptied by a bare [`SeatHold::remove`], whose
    /// seats are still held. Removing a hold the venue already settled, or a
    /// reserved one, is a no-op. Returns the number of seats released.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidTransition`] if a claimed seat was not held;
    ///   every other seat of the hold is still released
    /// - [`TicketingError::InvariantViolation`] if the venue lock is poisoned
    ///   or the hold refers to seats outside this venue
    pub fn remove_hold(&self, hold: &SeatHold) -> Result<usize> {
        let mut inventory = self.lock()?;
        if hold.has_unreturned_seats() {
            tracing::warn!(hold_id = %hold.id(), "Hold was removed without returning its seats");
        }
        let Some(seats) = hold.detach() else {
            return Ok(0);
        };

        let mut released = Selection::new();
        let mut first_error = None;
        for &index in &seats {
            match inventory.seat_mut(index).and_then(Seat::cancel_hold) {
                Ok(()) => released.push(index),
                Err(e) => {
                    tracing::warn!(hold_id = %hold.id(), error = %e, "Seat in hold was not held");
                    first_error.get_or_insert(e);
                }
            }
        }
        inventory.available += released.len();
        inventory.held -= released.len();
        let Inventory { seats: all, picker, .. } = &mut *inventory;
        picker.release(all, &released);

        tracing::debug!(
            hold_id = %hold.id(),
            released = released.len(),
            available = inventory.available,
            "Hold removed"
        );

        first_error.map_or(Ok(released.len()), Err)
    }

    /// Convert a hold into a permanent reservation.
    ///
    /// The caller is responsible for checking [`SeatHold::expired`] first.
    /// On success the hold is released (its id retired) and the seats belong
    /// to the returned reservation code.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::Expired`] if the hold was already removed or
    ///   reserved
    /// - [`TicketingError::InvalidArgument`] if the hold carries no seats;
    ///   the hold stays intact
    /// - [`TicketingError::InvalidTransition`] if a claimed seat is not
    ///   held; nothing changes in that case
    /// - [`TicketingError::InvariantViolation`] if the generator reissued a
    ///   live reservation code
    /// - [`TicketingError::InvariantViolation`] if the venue lock is poisoned
    pub fn reserve(&self, hold: &SeatHold) -> Result<ReservationCode> {
        let mut inventory = self.lock()?;
        if hold.is_released() {
            return Err(TicketingError::Expired(hold.id()));
        }
        let claimed = hold.seats();
        if claimed.is_empty() {
            return Err(TicketingError::InvalidArgument(format!(
                "Seat hold {} carries no seats to reserve",
                hold.id()
            )));
        }
        for &index in &claimed {
            let seat = inventory.seat_mut(index)?;
            if !seat.is_held() {
                tracing::error!(hold_id = %hold.id(), seat = %seat.id(), "Held seat lost its hold");
                return Err(TicketingError::InvalidTransition {
                    seat: seat.id().to_string(),
                    from: seat.state(),
                    action: SeatAction::Reserve,
                });
            }
        }

        let code = self.ids.new_reservation_code();
        if inventory.reservations.contains_key(&code) {
            tracing::error!(code = %code, "Reservation code issued twice");
            return Err(TicketingError::InvariantViolation(format!(
                "Reservation code {code} is already in use"
            )));
        }
        let Some(seats) = hold.detach() else {
            self.ids.retire_reservation_code(&code);
            return Err(TicketingError::Expired(hold.id()));
        };
        for &index in &seats {
            inventory.seat_mut(index).and_then(Seat::reserve)?;
        }
        inventory.held -= seats.len();

        tracing::debug!(
            hold_id = %hold.id(),
            code = %code,
            seats = seats.len(),
            "Seats reserved"
        );
        inventory.reservations.insert(code.clone(), seats);
        Ok(code)
    }

    /// Cancel a reservation and return its seats to the pool.
    ///
    /// Returns the number of seats released.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidArgument`] if `code` does not have the
    ///   generator's shape
    /// - [`TicketingError::NotFound`] if no live reservation has that code
    /// - [`TicketingError::InvalidTransition`] if a seat was not reserved
    /// - [`TicketingError::InvariantViolation`] if the venue lock is poisoned
    pub fn cancel_reservation(&self, code: &str) -> Result<usize> {
        let code = ReservationCode::parse(code, self.ids.reservation_code_len())?;
        let mut inventory = self.lock()?;
        let seats = inventory
            .reservations
            .remove(&code)
            .ok_or_else(|| TicketingError::NotFound(format!("Reservation code [{code}] not found")))?;

        let mut released = Selection::new();
        let mut first_error = None;
        for &index in &seats {
            match inventory.seat_mut(index).and_then(Seat::cancel_reservation) {
                Ok(()) => released.push(index),
                Err(e) => {
                    tracing::warn!(code = %code, error = %e, "Seat in reservation was not reserved");
                    first_error.get_or_insert(e);
                }
            }
        }
        inventory.available += released.len();
        let Inventory { seats: all, picker, .. } = &mut *inventory;
        picker.release(all, &released);
        self.ids.retire_reservation_code(&code);

        tracing::debug!(
            code = %code,
            released = released.len(),
            available = inventory.available,
            "Reservation cancelled"
        );

        first_error.map_or(Ok(released.len()), Err)
    }

    /// Rescan every seat and check the cached counts against it.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvariantViolation`] describing the first
    /// mismatch found.
    pub fn audit(&self) -> Result<InventorySnapshot> {
        let inventory = self.lock()?;
        let mut counts: HashMap<SeatState, usize> = HashMap::new();
        for seat in &inventory.seats {
            *counts.entry(seat.state()).or_default() += 1;
        }
        let count = |state: SeatState| counts.get(&state).copied().unwrap_or_default();
        let violation = |what: String| -> Result<InventorySnapshot> {
            Err(TicketingError::InvariantViolation(what))
        };
        if count(SeatState::Available) != inventory.available {
            return violation(format!(
                "{} seats are available but the venue counts {}",
                count(SeatState::Available),
                inventory.available
            ));
        }
        if count(SeatState::Held) != inventory.held {
            return violation(format!(
                "{} seats are held but the venue counts {}",
                count(SeatState::Held),
                inventory.held
            ));
        }

        let mut seen = HashSet::new();
        for (code, seats) in &inventory.reservations {
            for &index in seats {
                if !seen.insert(index) {
                    return violation(format!("Seat {index} appears in two reservations ({code})"));
                }
                let reserved = inventory.seats.get(index.get()).is_some_and(Seat::is_reserved);
                if !reserved {
                    return violation(format!("Seat {index} in reservation {code} is not reserved"));
                }
            }
        }
        if seen.len() != count(SeatState::Reserved) {
            return violation(format!(
                "{} seats are reserved but reservations cover {}",
                count(SeatState::Reserved),
                seen.len()
            ));
        }

        Ok(InventorySnapshot {
            total: self.total,
            available: inventory.available,
            held: inventory.held,
            reserved: seen.len(),
            reservations: inventory.reservations.len(),
        })
    }
}

impl std::fmt::Debug for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Venue")
            .field("layout", &self.layout)
            .field("inventory", &self.inventory())
            .finish_non_exhaustive()
    }
}
