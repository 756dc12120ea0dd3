//! # Box Office Testing
//!
//! Testing utilities and helpers for the box office crates.
//!
//! This crate provides:
//! - Deterministic doubles for the injected [`Clock`] and [`IdGenerator`]
//! - Inventory invariant assertions
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use box_office_testing::{helpers::test_venue, assert_accounting};
//! use std::time::Duration;
//!
//! let (venue, clock) = test_venue(3, 3);
//! let hold = venue.hold_seats(2, Duration::from_secs(30)).unwrap();
//! assert_accounting(&venue, &[&hold]);
//!
//! clock.advance(Duration::from_secs(30));
//! assert!(hold.expired());
//! ```

use box_office_core::environment::Clock;
use box_office_core::id::IdGenerator;
use chrono::{DateTime, Utc};

pub mod helpers;
pub mod properties;

/// Mock implementations of the injected dependencies.
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use box_office_core::id::{HoldId, ReservationCode};
    use chrono::TimeDelta;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use box_office_testing::mocks::FixedClock;
    /// use box_office_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Share it through an `Arc` with the venue, then step it forward to
    /// expire holds without sleeping.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start the clock at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let by = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time = time.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC);
        }

        /// Jump to an arbitrary time, including backwards
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// Create a manual clock starting at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn manual_clock() -> ManualClock {
        ManualClock::new(epoch())
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Predictable ids: holds count up from 1, codes are `R00001`, `R00002`, ...
    ///
    /// Tracks the values in use like a real generator so tests can assert that
    /// ids get retired.
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        next_hold: AtomicU32,
        next_code: AtomicU64,
        holds: Mutex<HashSet<HoldId>>,
        codes: Mutex<HashSet<ReservationCode>>,
    }

    impl SequentialIdGenerator {
        /// Creates a generator whose first hold id is 1
        #[must_use]
        pub fn new() -> Self {
            Self {
                next_hold: AtomicU32::new(1),
                next_code: AtomicU64::new(1),
                holds: Mutex::new(HashSet::new()),
                codes: Mutex::new(HashSet::new()),
            }
        }

        /// Hold ids issued and not yet retired
        #[must_use]
        pub fn hold_ids_in_use(&self) -> usize {
            self.holds.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Reservation codes issued and not yet retired
        #[must_use]
        pub fn reservation_codes_in_use(&self) -> usize {
            self.codes.lock().unwrap_or_else(PoisonError::into_inner).len()
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn new_hold_id(&self) -> HoldId {
            let id = HoldId::new(self.next_hold.fetch_add(1, Ordering::Relaxed));
            self.holds
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id);
            id
        }

        fn new_reservation_code(&self) -> ReservationCode {
            let n = self.next_code.fetch_add(1, Ordering::Relaxed);
            let code = ReservationCode::new(format!("R{n:05}"));
            self.codes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(code.clone());
            code
        }

        fn retire_hold_id(&self, id: HoldId) -> bool {
            self.holds
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id)
        }

        fn retire_reservation_code(&self, code: &ReservationCode) -> bool {
            self.codes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(code)
        }
    }

    /// Broken generator that hands out the same hold id and code every time.
    ///
    /// For exercising the collision paths.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct CollidingIdGenerator;

    impl IdGenerator for CollidingIdGenerator {
        fn new_hold_id(&self) -> HoldId {
            HoldId::new(42)
        }

        fn new_reservation_code(&self) -> ReservationCode {
            ReservationCode::new("AAAAAA")
        }

        fn retire_hold_id(&self, _id: HoldId) -> bool {
            true
        }

        fn retire_reservation_code(&self, _code: &ReservationCode) -> bool {
            true
        }
    }
}

// Re-export commonly used items
pub use helpers::{assert_accounting, init_test_tracing};
pub use mocks::{
    CollidingIdGenerator, FixedClock, ManualClock, SequentialIdGenerator, manual_clock, test_clock,
};
