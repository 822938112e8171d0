//! # Labdesk Testing
//!
//! Testing utilities shared by the labdesk crates.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - A Given-When-Then harness for reducers (`ReducerTest`)
//!
//! ## Example
//!
//! ```ignore
//! use labdesk_testing::{test_clock, ManualClock};
//!
//! #[tokio::test]
//! async fn pending_request_expires() {
//!     let clock = Arc::new(ManualClock::new(test_clock().now()));
//!     let service = request_service(clock.clone());
//!
//!     let id = service.create(user, lines).await?;
//!     clock.advance(chrono::Duration::days(8));
//!
//!     let request = service.get(id).await?;
//!     assert_eq!(request.status, RequestStatus::Rejected);
//! }
//! ```


use chrono::{DateTime, Utc};
use labdesk_core::environment::Clock;

pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use labdesk_testing::mocks::FixedClock;
    /// use labdesk_core::environment::Clock;
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

    /// Clock that only moves when a test tells it to.
    ///
    /// Shared behind an `Arc` between the test and the service under test, so
    /// the test can push time past a request's TTL between two calls.
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Move the clock forward (or backward, with a negative duration).
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            let mut time = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// 2025-01-01 00:00:00 UTC, the reference instant used across the test suites.
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }
}

// Re-export commonly used items
pub use mocks::{epoch, test_clock, FixedClock, ManualClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(epoch());
        clock.advance(chrono::Duration::days(3));
        assert_eq!(clock.now() - epoch(), chrono::Duration::days(3));

        clock.set(epoch());
        assert_eq!(clock.now(), epoch());
    }
}
