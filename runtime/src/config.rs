//! Service configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::ServiceError;
use box_office_core::{Clock, IdGenerator, Venue, VenueLayout};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// How far each sweep walks the hold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepPolicy {
    /// Walk holds in creation order and stop at the first one still live.
    ///
    /// Correct as long as deadlines never decrease in creation order, which
    /// holds when every hold gets the same TTL from a clock that only moves
    /// forward.
    ///
    /// Concurrent callers read the clock before they enter the table, so two
    /// holds placed at nearly the same moment can be tracked out of deadline
    /// order. An expired hold stuck behind a live one is reclaimed once that
    /// one expires, at most the gap between their deadlines later.
    /// Reservations check expiry themselves and reject it in the meantime.
    #[default]
    StopAtFirstLive,
    /// Check every tracked hold on every sweep.
    FullScan,
}

impl fmt::Display for SweepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StopAtFirstLive => f.write_str("stop-at-first-live"),
            Self::FullScan => f.write_str("full-scan"),
        }
    }
}

impl FromStr for SweepPolicy {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop-at-first-live" => Ok(Self::StopAtFirstLive),
            "full-scan" => Ok(Self::FullScan),
            other => Err(ServiceError::Config(format!("Unknown sweep policy [{other}]"))),
        }
    }
}

/// Ticket service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Venue dimensions
    pub venue: VenueLayout,
    /// Lifetime of every hold issued by the service
    pub hold_ttl: Duration,
    /// Pause between expiration sweeps
    pub sweep_interval: Duration,
    /// How much of the hold table each sweep examines
    pub sweep_policy: SweepPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            venue: VenueLayout::new(10, 20),
            hold_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(1),
            sweep_policy: SweepPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            venue: VenueLayout::new(
                lookup("BOX_OFFICE_ROWS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.venue.rows),
                lookup("BOX_OFFICE_SEATS_PER_ROW")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.venue.seats_per_row),
            ),
            hold_ttl: lookup("BOX_OFFICE_HOLD_TTL_MS")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.hold_ttl, Duration::from_millis),
            sweep_interval: lookup("BOX_OFFICE_SWEEP_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.sweep_interval, Duration::from_millis),
            sweep_policy: lookup("BOX_OFFICE_SWEEP_POLICY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sweep_policy),
        }
    }

    /// Set the hold lifetime.
    #[must_use]
    pub const fn with_hold_ttl(mut self, ttl: Duration) -> Self {
        self.hold_ttl = ttl;
        self
    }

    /// Set the pause between sweeps.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the sweep policy.
    #[must_use]
    pub const fn with_sweep_policy(mut self, policy: SweepPolicy) -> Self {
        self.sweep_policy = policy;
        self
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] for an empty venue or a zero sweep
    /// interval.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.venue
            .total_seats()
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        if self.sweep_interval.is_zero() {
            return Err(ServiceError::Config(
                "Sweep interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build an empty venue with the configured layout.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if validation fails.
    pub fn build_venue(
        &self,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Venue, ServiceError> {
        self.validate()?;
        Ok(Venue::new(self.venue, ids, clock)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(|_| None);
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.venue.total_seats().unwrap(), 200);
        assert_eq!(config.hold_ttl, Duration::from_secs(60));
        assert_eq!(config.sweep_policy, SweepPolicy::StopAtFirstLive);
        config.validate().unwrap();
    }

    #[test]
    fn test_reads_every_variable() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("BOX_OFFICE_ROWS", "3"),
            ("BOX_OFFICE_SEATS_PER_ROW", "4"),
            ("BOX_OFFICE_HOLD_TTL_MS", "0"),
            ("BOX_OFFICE_SWEEP_INTERVAL_MS", "250"),
            ("BOX_OFFICE_SWEEP_POLICY", "Full-Scan"),
        ]));
        assert_eq!(config.venue, VenueLayout::new(3, 4));
        assert_eq!(config.hold_ttl, Duration::ZERO);
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
        assert_eq!(config.sweep_policy, SweepPolicy::FullScan);
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("BOX_OFFICE_ROWS", "many"),
            ("BOX_OFFICE_HOLD_TTL_MS", "-5"),
            ("BOX_OFFICE_SWEEP_POLICY", "sometimes"),
        ]));
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_validate_rejects_empty_venue_and_zero_interval() {
        let empty = ServiceConfig {
            venue: VenueLayout::new(0, 5),
            ..ServiceConfig::default()
        };
        assert!(matches!(empty.validate(), Err(ServiceError::Config(_))));

        let busy = ServiceConfig::default().with_sweep_interval(Duration::ZERO);
        assert!(matches!(busy.validate(), Err(ServiceError::Config(_))));
    }

    proptest::proptest! {
        #[test]
        fn from_lookup_accepts_any_input(value in ".{0,12}") {
            let config = ServiceConfig::from_lookup(|_| Some(value.clone()));
            if config.validate().is_ok() {
                proptest::prop_assert!(config.venue.total_seats().is_ok());
                proptest::prop_assert!(!config.sweep_interval.is_zero());
            }
        }
    }

    #[test]
    fn test_policy_round_trips_through_text() {
        for policy in [SweepPolicy::StopAtFirstLive, SweepPolicy::FullScan] {
            assert_eq!(policy.to_string().parse::<SweepPolicy>().unwrap(), policy);
        }
        let json = serde_json::to_string(&SweepPolicy::FullScan).unwrap();
        assert_eq!(json, "\"full-scan\"");
    }
}
