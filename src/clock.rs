//! Time source used for key expiry.
//!
//! Expiry deadlines are absolute [`Instant`]s computed when a `SET ... PX` is
//! decoded and compared against the clock again when the key is read. Going
//! through a trait lets tests pin time to a known instant instead of sleeping.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// # Example
///
/// ```
/// use emberkv::clock::{Clock, FixedClock};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = FixedClock::new(start);
/// clock.advance(Duration::from_millis(101));
/// assert_eq!(clock.now(), start + Duration::from_millis(101));
/// ```
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<Instant>,
}

impl FixedClock {
    pub fn new(at: Instant) -> Self {
        Self {
            current: Mutex::new(at),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }

    /// Pins the clock to `at`.
    pub fn set(&self, at: Instant) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_fixed_clock_holds_still() {
        let start = Instant::now();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_fixed_clock_advance_and_set() {
        let start = Instant::now();
        let clock = FixedClock::new(start);

        clock.advance(Duration::from_millis(50));
        clock.advance(Duration::from_millis(51));
        assert_eq!(clock.now(), start + Duration::from_millis(101));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
