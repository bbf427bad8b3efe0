use std::{sync::Arc, time::Instant};

/// A trait for monotonic millisecond time sources.
///
/// Segment expiry is computed and checked against this clock, which lets
/// tests substitute a mocked time source.
///
/// # Example
///
/// ```
/// use segid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since an arbitrary, fixed
    /// origin. Must never go backwards.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// A monotonic time source measuring milliseconds elapsed since it was
/// created.
///
/// Built on [`Instant`], so wall-clock adjustments (NTP, manual changes)
/// cannot shorten or extend a segment's lifetime. Clones share the same
/// origin.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn monotonic_clock_advances() {
        let clock = MonotonicClock::default();
        let copy = clock;
        let before = clock.current_millis();
        std::thread::sleep(Duration::from_millis(5));
        let after = copy.current_millis();
        assert!(after >= before + 5, "{before} -> {after}");
    }
}
