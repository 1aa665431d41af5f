//! External services for the case aggregate.
//!
//! Services provide external dependencies (like time) to the aggregate
//! without coupling it to specific implementations.

use crate::domain::types::TimestampUtc;

/// Services injected into the case aggregate for command handling.
#[derive(Debug, Clone, Default)]
pub struct CaseServices {
    pub clock: CaseClock,
}

/// Clock service for timestamp generation.
#[derive(Debug, Clone, Default)]
pub struct CaseClock;

impl CaseClock {
    /// Returns the current UTC timestamp.
    pub fn now(&self) -> TimestampUtc {
        TimestampUtc::now()
    }
}
