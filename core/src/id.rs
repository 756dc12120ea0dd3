//! Hold ids and reservation codes.
//!
//! Uniqueness lives in an injected [`IdGenerator`] with its own state rather
//! than in process-wide globals. Values are unique among the ones currently in
//! use; retiring a value makes it eligible for reuse.

use crate::error::{Result, TicketingError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Length of every reservation code issued by [`RandomIdGenerator`].
///
/// 36^6 is a little over two billion codes.
pub const RESERVATION_CODE_LEN: usize = 6;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Largest hold id handed out by [`RandomIdGenerator`].
pub const MAX_HOLD_ID: u32 = i32::MAX.unsigned_abs();

/// Identifier of a seat hold. Always greater than zero when generator-issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldId(u32);

impl HoldId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token for a permanent seat assignment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationCode(String);

impl ReservationCode {
    /// Wrap a generator-issued code without validation.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Validate caller input against the generator's code shape.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidArgument`] unless `code` is exactly
    /// `len` ASCII alphanumeric characters.
    pub fn parse(code: &str, len: usize) -> Result<Self> {
        if code.len() != len {
            return Err(TicketingError::InvalidArgument(format!(
                "Reservation code [{code}] must be {len} characters long"
            )));
        }
        if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(TicketingError::InvalidArgument(format!(
                "Reservation code [{code}] must be alphanumeric"
            )));
        }
        Ok(Self(code.to_string()))
    }

    /// Borrow the code text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of unique hold ids and reservation codes.
pub trait IdGenerator: Send + Sync {
    /// Issue a hold id not currently in use.
    fn new_hold_id(&self) -> HoldId;

    /// Issue a reservation code not currently in use.
    fn new_reservation_code(&self) -> ReservationCode;

    /// Return a hold id to the pool. `false` if it was not in use.
    fn retire_hold_id(&self, id: HoldId) -> bool;

    /// Return a reservation code to the pool. `false` if it was not in use.
    fn retire_reservation_code(&self, code: &ReservationCode) -> bool;

    /// Fixed length of every code this generator issues.
    fn reservation_code_len(&self) -> usize {
        RESERVATION_CODE_LEN
    }
}

/// Default generator drawing random values and tracking the ones in use.
#[derive(Debug, Default)]
pub struct RandomIdGenerator {
    hold_ids: Mutex<HashSet<HoldId>>,
    codes: Mutex<HashSet<ReservationCode>>,
}

impl RandomIdGenerator {
    /// Creates a generator with no values in use
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the in-use sets for the expected number of live holds and
    /// reservations.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hold_ids: Mutex::new(HashSet::with_capacity(capacity)),
            codes: Mutex::new(HashSet::with_capacity(capacity)),
        }
    }

    /// Number of hold ids currently in use
    #[must_use]
    pub fn hold_ids_in_use(&self) -> usize {
        self.hold_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of reservation codes currently in use
    #[must_use]
    pub fn reservation_codes_in_use(&self) -> usize {
        self.codes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn random_code(rng: &mut impl Rng) -> ReservationCode {
        let code: String = (0..RESERVATION_CODE_LEN)
            .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
            .collect();
        ReservationCode(code)
    }
}

impl IdGenerator for RandomIdGenerator {
    fn new_hold_id(&self) -> HoldId {
        let mut rng = rand::thread_rng();
        let mut in_use = self
            .hold_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            let id = HoldId(rng.gen_range(1..=MAX_HOLD_ID));
            if in_use.insert(id) {
                return id;
            }
        }
    }

    fn new_reservation_code(&self) -> ReservationCode {
        let mut rng = rand::thread_rng();
        let mut in_use = self.codes.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let code = Self::random_code(&mut rng);
            if !in_use.contains(&code) {
                in_use.insert(code.clone());
                return code;
            }
        }
    }

    fn retire_hold_id(&self, id: HoldId) -> bool {
        self.hold_ids
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

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_hold_ids_positive_and_unique() {
        let ids = RandomIdGenerator::new();
        let issued: HashSet<HoldId> = (0..1_000).map(|_| ids.new_hold_id()).collect();
        assert_eq!(issued.len(), 1_000);
        assert!(issued.iter().all(|id| id.get() > 0 && id.get() <= MAX_HOLD_ID));
        assert_eq!(ids.hold_ids_in_use(), 1_000);
    }

    #[test]
    fn test_retire_hold_id() {
        let ids = RandomIdGenerator::new();
        let id = ids.new_hold_id();
        assert!(ids.retire_hold_id(id));
        assert!(!ids.retire_hold_id(id));
        assert_eq!(ids.hold_ids_in_use(), 0);
    }

    #[test]
    fn test_reservation_code_shape() {
        let ids = RandomIdGenerator::new();
        for _ in 0..200 {
            let code = ids.new_reservation_code();
            assert_eq!(code.as_str().len(), RESERVATION_CODE_LEN);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
        assert_eq!(ids.reservation_codes_in_use(), 200);
    }

    #[test]
    fn test_retire_reservation_code() {
        let ids = RandomIdGenerator::with_capacity(4);
        let code = ids.new_reservation_code();
        assert!(ids.retire_reservation_code(&code));
        assert!(!ids.retire_reservation_code(&code));
        assert_eq!(ids.reservation_codes_in_use(), 0);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = ReservationCode::parse("ABC", RESERVATION_CODE_LEN).unwrap_err();
        assert!(matches!(err, TicketingError::InvalidArgument(_)));
        assert!(ReservationCode::parse("ABCDEFG", RESERVATION_CODE_LEN).is_err());
    }

    #[test]
    fn test_parse_rejects_punctuation() {
        assert!(ReservationCode::parse("AB-123", RESERVATION_CODE_LEN).is_err());
    }

    #[test]
    fn test_parse_accepts_issued_shape() {
        let code = ReservationCode::parse("K9Z2QA", RESERVATION_CODE_LEN).unwrap();
        assert_eq!(code.to_string(), "K9Z2QA");
    }

    #[test]
    fn test_concurrent_issue_is_unique() {
        let ids = RandomIdGenerator::new();
        let issued: Vec<HoldId> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..250).map(|_| ids.new_hold_id()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });
        let unique: HashSet<_> = issued.iter().copied().collect();
        assert_eq!(unique.len(), 2_000);
    }
}
