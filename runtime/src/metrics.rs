//! Metrics for the ticket service.
//!
//! Recorded through the [`metrics`] facade. Nothing is exported unless the
//! embedding application installs a recorder.
//!
//! - `box_office.holds.created` / `box_office.holds.expired`
//! - `box_office.reservations.created` / `box_office.reservations.cancelled`
//! - `box_office.sweep.failures`
//! - `box_office.seats.available` and `box_office.holds.active` gauges
//! - `box_office.sweep.duration_seconds` histogram

use metrics::{describe_counter, describe_gauge, describe_histogram};
use std::time::Duration;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Register all metric descriptions.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!("box_office.holds.created", "Total number of seat holds placed");
    describe_counter!(
        "box_office.holds.expired",
        "Total number of holds reclaimed after their deadline"
    );
    describe_counter!(
        "box_office.reservations.created",
        "Total number of holds converted into reservations"
    );
    describe_counter!(
        "box_office.reservations.cancelled",
        "Total number of reservations cancelled"
    );
    describe_counter!(
        "box_office.sweep.failures",
        "Expired holds whose seats could not be released cleanly"
    );
    describe_gauge!("box_office.seats.available", "Seats that can currently be held");
    describe_gauge!("box_office.holds.active", "Holds tracked by the service");
    describe_histogram!(
        "box_office.sweep.duration_seconds",
        "Time taken by one expiration sweep"
    );
}

/// Service metrics recorder.
pub struct ServiceMetrics;

impl ServiceMetrics {
    /// Record a hold placed.
    pub fn record_hold(available: usize, active: usize) {
        counter!("box_office.holds.created").increment(1);
        Self::record_levels(available, active);
    }

    /// Record a reservation made.
    pub fn record_reservation(available: usize, active: usize) {
        counter!("box_office.reservations.created").increment(1);
        Self::record_levels(available, active);
    }

    /// Record a reservation cancelled.
    pub fn record_cancellation(available: usize) {
        counter!("box_office.reservations.cancelled").increment(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!("box_office.seats.available").set(available as f64);
    }

    /// Record holds reclaimed outside of a sweep.
    pub fn record_expired(count: usize) {
        counter!("box_office.holds.expired").increment(count as u64);
    }

    /// Record one completed sweep.
    pub fn record_sweep(expired: usize, failures: usize, duration: Duration) {
        counter!("box_office.holds.expired").increment(expired as u64);
        counter!("box_office.sweep.failures").increment(failures as u64);
        histogram!("box_office.sweep.duration_seconds").record(duration.as_secs_f64());
    }

    /// Record the current inventory levels.
    #[allow(clippy::cast_precision_loss)] // Seat counts are far below 2^52
    pub fn record_levels(available: usize, active: usize) {
        gauge!("box_office.seats.available").set(available as f64);
        gauge!("box_office.holds.active").set(active as f64);
    }
}
