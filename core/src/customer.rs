//! Customer identity attached to holds.

use crate::error::{Result, TicketingError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A minimally well-formed customer email address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Customer(String);

impl Customer {
    /// Parse an email address.
    ///
    /// Only the shape is checked: one `@`, a non-empty local part, and a
    /// dotted domain. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::InvalidArgument`] for anything else.
    pub fn parse(email: &str) -> Result<Self> {
        let email = email.trim();
        let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        });
        if !well_formed {
            return Err(TicketingError::InvalidArgument(format!(
                "[{email}] is not an email address"
            )));
        }
        Ok(Self(email.to_string()))
    }

    /// Borrow the address
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
