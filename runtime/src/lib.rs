//! # Box Office Runtime
//!
//! The customer-facing ticket service for a [`Venue`](box_office_core::Venue).
//!
//! This crate tracks holds per customer, converts them into reservations and
//! runs the background sweeper that returns expired holds to the pool.
//!
//! ## Core Components
//!
//! - **`TicketService`**: hold, reserve and cancel on behalf of customers
//! - **Sweeper**: tokio task reclaiming expired holds every `sweep_interval`
//! - **`ServiceConfig`**: venue layout, hold TTL and sweep settings, loadable
//!   from the environment
//!
//! ## Example
//!
//! ```no_run
//! use box_office_core::{RandomIdGenerator, SystemClock};
//! use box_office_runtime::{ServiceConfig, TicketService};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::from_env();
//! let venue = config.build_venue(Arc::new(RandomIdGenerator::new()), Arc::new(SystemClock))?;
//! let service = TicketService::start(Arc::new(venue), &config)?;
//!
//! let hold = service.find_and_hold_seats(2, "fan@example.com")?;
//! let code = service.reserve_seats(hold.id(), "fan@example.com")?;
//! println!("Reserved as {code}");
//!
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

/// Service configuration loaded from the environment
pub mod config;

/// Error types for the service lifecycle
pub mod error;

mod hold_table;

/// Metrics recorded through the `metrics` facade
pub mod metrics;

/// The ticket service facade
pub mod service;

/// Background expiration sweeper
pub mod sweeper;

pub use config::{ServiceConfig, SweepPolicy};
pub use error::ServiceError;
pub use service::{SweepReport, TicketService};
pub use sweeper::SweeperHandle;
