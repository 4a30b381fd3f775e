use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Clock abstraction so services and tests can agree on "now".
///
/// Session expiry and practice timestamps all flow through a `Clock`,
/// which makes time-dependent behavior reproducible under test. A fixed
/// clock shares its timestamp across clones, so a test can hold one
/// handle and advance time for every service built from it.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(Arc<Mutex<DateTime<Utc>>>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(Arc::new(Mutex::new(at)))
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Advance a fixed clock by the given duration. No effect on `Default`.
    pub fn advance(&self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t.lock().unwrap_or_else(PoisonError::into_inner) += delta;
        }
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = fixed_clock();
        let start = clock.now();
        clock.advance(Duration::minutes(10));
        assert_eq!(clock.now(), start + Duration::minutes(10));
    }

    #[test]
    fn fixed_clock_shares_time_across_clones() {
        let clock = fixed_clock();
        let other = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), other.now());
    }

    #[test]
    fn default_clock_ignores_advance() {
        let clock = Clock::default();
        clock.advance(Duration::days(1));
        assert!(matches!(clock, Clock::Default));
    }
}
