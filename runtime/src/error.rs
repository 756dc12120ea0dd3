//! Service lifecycle errors.

use box_office_core::TicketingError;
use thiserror::Error;

/// Errors from building, starting or stopping a [`TicketService`](crate::TicketService).
///
/// Inventory operations report [`TicketingError`] directly; this type only
/// adds the failures that come from configuration and the background sweeper.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// An inventory operation failed while setting up the service
    #[error(transparent)]
    Ticketing(#[from] TicketingError),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The sweeper must be spawned from inside a tokio runtime
    #[error("No tokio runtime available to run the expiration sweeper: {0}")]
    NoRuntime(String),

    /// The sweeper task panicked or was aborted
    #[error("Expiration sweeper failed to stop cleanly: {0}")]
    SweeperJoin(String),
}
