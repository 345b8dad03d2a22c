//! Result of one estimator tick.

use crate::output::Estimate;

/// Why a tick produced no output. Skipped ticks mutate nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No pack voltage, or a zero/negative/non-finite one.
    MissingVoltage,
    MissingThrottle,
    /// Arrived before the governed period elapsed.
    RateLimited,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    Skipped(SkipReason),
    Estimated(Estimate),
}

impl TickStatus {
    pub fn estimate(&self) -> Option<&Estimate> {
        match self {
            Self::Estimated(e) => Some(e),
            Self::Skipped(_) => None,
        }
    }
}
