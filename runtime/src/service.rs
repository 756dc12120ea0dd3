//! The ticket service: customer-facing holds and reservations on one venue.
//!
//! Two locks are involved and they never nest. The venue lock covers seat
//! state; the hold table lock covers which holds are still live. Reserving
//! and sweeping both take a hold out of the table before touching the venue,
//! so a hold can be reserved or reclaimed, never both.

use crate::config::{ServiceConfig, SweepPolicy};
use crate::error::ServiceError;
use crate::hold_table::{HoldTable, TrackedHold};
use crate::metrics::ServiceMetrics;
use crate::sweeper::SweeperHandle;
use box_office_core::{
    Customer, HoldId, InventorySnapshot, ReservationCode, Result, SeatHold, TicketingError, Venue,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of one expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Table entries looked at
    pub examined: usize,
    /// Holds taken out of the table because they expired
    pub expired: usize,
    /// Seats returned to the venue
    pub seats_released: usize,
    /// Expired holds whose seats could not all be released
    pub failures: usize,
}

/// State shared between the service handle and its sweeper task.
#[derive(Debug)]
pub(crate) struct ServiceCore {
    venue: Arc<Venue>,
    holds: Mutex<HoldTable>,
    hold_ttl: Duration,
    sweep_policy: SweepPolicy,
}

impl ServiceCore {
    fn table(&self) -> Result<MutexGuard<'_, HoldTable>> {
        self.holds.lock().map_err(|_| {
            TicketingError::InvariantViolation("Hold table lock poisoned".to_string())
        })
    }

    fn read_table(&self) -> MutexGuard<'_, HoldTable> {
        self.holds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_holds(&self) -> usize {
        self.read_table().len()
    }

    /// Give an already untracked hold's seats back to the venue.
    fn reclaim(&self, hold: &SeatHold) -> Result<usize> {
        self.venue.remove_hold(hold).inspect_err(|e| {
            tracing::warn!(hold_id = %hold.id(), error = %e, "Failed to release expired hold");
        })
    }

    /// Reclaim every expired hold.
    pub(crate) fn sweep_expired(&self) -> Result<SweepReport> {
        let started = Instant::now();
        let (examined, expired) = self.table()?.take_expired(self.sweep_policy);

        let mut report = SweepReport {
            examined,
            expired: expired.len(),
            ..SweepReport::default()
        };
        for tracked in &expired {
            match self.reclaim(&tracked.hold) {
                Ok(released) => report.seats_released += released,
                Err(_) => report.failures += 1,
            }
        }

        ServiceMetrics::record_sweep(report.expired, report.failures, started.elapsed());
        ServiceMetrics::record_levels(self.venue.available_seats(), self.active_holds());
        if report.expired > 0 {
            tracing::info!(
                examined = report.examined,
                expired = report.expired,
                seats_released = report.seats_released,
                failures = report.failures,
                "Expired holds reclaimed"
            );
        }
        Ok(report)
    }
}

/// Customer-facing ticketing on top of a [`Venue`].
///
/// Holds are tracked by id until they are reserved or expire. Expired holds
/// are reclaimed by a background sweeper (see [`TicketService::start`]) or on
/// demand through [`TicketService::sweep_expired`].
///
/// # Example
///
/// ```
/// use box_office_core::{RandomIdGenerator, SystemClock};
/// use box_office_runtime::{ServiceConfig, TicketService};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ServiceConfig::default();
/// let venue = config.build_venue(Arc::new(RandomIdGenerator::new()), Arc::new(SystemClock))?;
/// let service = TicketService::without_sweeper(Arc::new(venue), &config)?;
///
/// let hold = service.find_and_hold_seats(4, "fan@example.com")?;
/// let code = service.reserve_seats(hold.id(), "fan@example.com")?;
/// assert_eq!(service.num_seats_available(), 196);
///
/// service.cancel_reservation(code.as_str())?;
/// assert_eq!(service.num_seats_available(), 200);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TicketService {
    core: Arc<ServiceCore>,
    sweeper: Option<SweeperHandle>,
}

impl TicketService {
    /// Build a service and spawn its sweeper on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Config`] if `config` does not validate
    /// - [`ServiceError::NoRuntime`] outside of a tokio runtime
    pub fn start(venue: Arc<Venue>, config: &ServiceConfig) -> std::result::Result<Self, ServiceError> {
        let mut service = Self::without_sweeper(venue, config)?;
        service.sweeper = Some(SweeperHandle::spawn(
            Arc::clone(&service.core),
            config.sweep_interval,
        )?);
        tracing::info!(
            hold_ttl_ms = config.hold_ttl.as_millis(),
            sweep_interval_ms = config.sweep_interval.as_millis(),
            sweep_policy = %config.sweep_policy,
            "Ticket service started"
        );
        Ok(service)
    }

    /// Build a service whose expired holds are only reclaimed by calling
    /// [`sweep_expired`](Self::sweep_expired).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if `config` does not validate.
    pub fn without_sweeper(
        venue: Arc<Venue>,
        config: &ServiceConfig,
    ) -> std::result::Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            core: Arc::new(ServiceCore {
                venue,
                holds: Mutex::new(HoldTable::default()),
                hold_ttl: config.hold_ttl,
                sweep_policy: config.sweep_policy,
            }),
            sweeper: None,
        })
    }

    /// Stop the sweeper and wait for it to finish its current pass.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SweeperJoin`] if the sweeper task panicked.
    pub async fn shutdown(mut self) -> std::result::Result<(), ServiceError> {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown().await?;
        }
        tracing::info!(active_holds = self.core.active_holds(), "Ticket service stopped");
        Ok(())
    }

    /// The venue this service sells
    #[must_use]
    pub fn venue(&self) -> &Arc<Venue> {
        &self.core.venue
    }

    /// Whether a background sweeper is attached
    #[must_use]
    pub const fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Seats that can currently be held
    #[must_use]
    pub fn num_seats_available(&self) -> usize {
        self.core.venue.available_seats()
    }

    /// Seats claimed by holds that have not been reserved or reclaimed yet
    #[must_use]
    pub fn num_seats_held(&self) -> usize {
        self.core.venue.inventory().held
    }

    /// Holds currently tracked
    #[must_use]
    pub fn num_active_holds(&self) -> usize {
        self.core.active_holds()
    }

    /// Seat counts by state
    #[must_use]
    pub fn inventory(&self) -> InventorySnapshot {
        self.core.venue.inventory()
    }

    /// A tracked hold by id
    #[must_use]
    pub fn hold(&self, id: HoldId) -> Option<Arc<SeatHold>> {
        self.core
            .read_table()
            .get(id)
            .map(|tracked| Arc::clone(&tracked.hold))
    }

    /// Hold up to `count` of the best available seats for `customer`.
    ///
    /// Short inventory is not an error: the hold may carry fewer seats than
    /// asked for, or none.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidArgument`] if `count` is zero or `customer`
    ///   is not an email address
    /// - [`TicketingError::InvariantViolation`] if the id generator reissued a
    ///   live hold id
    pub fn find_and_hold_seats(&self, count: usize, customer: &str) -> Result<Arc<SeatHold>> {
        if count == 0 {
            return Err(TicketingError::InvalidArgument(
                "Number of seats to hold must be positive".to_string(),
            ));
        }
        let customer = Customer::parse(customer)?;
        let hold = Arc::new(self.core.venue.hold_seats(count, self.core.hold_ttl)?);

        let active = {
            let mut table = self.core.table()?;
            table
                .insert(TrackedHold {
                    hold: Arc::clone(&hold),
                    customer,
                })
                .inspect_err(|e| {
                    tracing::error!(hold_id = %hold.id(), error = %e, "Hold id collision");
                })?;
            table.len()
        };

        ServiceMetrics::record_hold(self.core.venue.available_seats(), active);
        tracing::debug!(
            hold_id = %hold.id(),
            requested = count,
            held = hold.num_seats_held(),
            "Hold placed"
        );
        Ok(hold)
    }

    /// Reserve the seats of a live hold placed by `customer`.
    ///
    /// An expired hold that the sweeper has not reached yet is reclaimed on
    /// the spot.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidArgument`] for hold id 0, a malformed
    ///   `customer`, or a hold that carries no seats
    /// - [`TicketingError::NotFound`] if no live hold has this id and customer
    /// - [`TicketingError::Expired`] if the hold's deadline has passed
    pub fn reserve_seats(&self, hold_id: HoldId, customer: &str) -> Result<ReservationCode> {
        if hold_id.get() == 0 {
            return Err(TicketingError::InvalidArgument(
                "Seat hold id must be positive".to_string(),
            ));
        }
        let customer = Customer::parse(customer)?;
        let not_found =
            || TicketingError::NotFound(format!("Seat hold {hold_id} not found for {customer}"));

        let (tracked, active) = {
            let mut table = self.core.table()?;
            let Some(found) = table.get(hold_id) else {
                return Err(not_found());
            };
            if found.customer != customer {
                return Err(not_found());
            }
            if !found.hold.expired() && found.hold.num_seats_held() == 0 {
                return Err(TicketingError::InvalidArgument(format!(
                    "Seat hold {hold_id} carries no seats to reserve"
                )));
            }
            let tracked = table.take(hold_id).ok_or_else(not_found)?;
            (tracked, table.len())
        };

        if tracked.hold.expired() {
            let _ = self.core.reclaim(&tracked.hold);
            ServiceMetrics::record_expired(1);
            ServiceMetrics::record_levels(self.core.venue.available_seats(), active);
            tracing::debug!(hold_id = %hold_id, "Hold expired before reservation");
            return Err(TicketingError::Expired(hold_id));
        }

        match self.core.venue.reserve(&tracked.hold) {
            Ok(code) => {
                ServiceMetrics::record_reservation(self.core.venue.available_seats(), active);
                tracing::debug!(hold_id = %hold_id, code = %code, "Hold reserved");
                Ok(code)
            }
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!(hold_id = %hold_id, error = %e, "Reservation failed");
                }
                // The hold is no longer tracked, so nothing else would return its seats
                let _ = self.core.reclaim(&tracked.hold);
                Err(e)
            }
        }
    }

    /// Cancel a reservation and return its seats to the pool.
    ///
    /// Returns the number of seats released.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidArgument`] for a malformed code
    /// - [`TicketingError::NotFound`] if no live reservation has this code
    pub fn cancel_reservation(&self, code: &str) -> Result<usize> {
        let released = self.core.venue.cancel_reservation(code)?;
        ServiceMetrics::record_cancellation(self.core.venue.available_seats());
        Ok(released)
    }

    /// Reclaim every expired hold now.
    ///
    /// Failures to release individual holds are counted in the report and
    /// logged; they never abort the sweep.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvariantViolation`] if the hold table lock
    /// is poisoned.
    pub fn sweep_expired(&self) -> Result<SweepReport> {
        self.core.sweep_expired()
    }

    /// Snapshot of the tracked holds, oldest first
    #[must_use]
    pub fn active_holds(&self) -> Vec<Arc<SeatHold>> {
        self.core.read_table().holds().cloned().collect()
    }
}
