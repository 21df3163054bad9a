//! Absolute deadlines handed to every blocking operation.

use std::time::{Duration, Instant};

/// Fallback horizon used when `now + timeout` overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Point in time after which a poll must give up.
///
/// A deadline is re-applied before every transport poll, so one value can
/// bound a whole command round trip across many batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline at a fixed instant.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let instant = now
            .checked_add(timeout)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self(instant)
    }

    /// A deadline that has already passed.
    #[must_use]
    pub fn elapsed() -> Self {
        Self(Instant::now())
    }

    /// Underlying instant.
    #[must_use]
    pub const fn instant(self) -> Instant {
        self.0
    }

    /// Time left, zero once the deadline has passed.
    #[must_use]
    pub fn remaining(self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Whether no time is left.
    #[must_use]
    pub fn has_elapsed(self) -> bool {
        self.remaining().is_zero()
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Self::at(instant)
    }
}
