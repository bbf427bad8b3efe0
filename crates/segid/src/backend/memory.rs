use std::collections::HashMap;

use thiserror::Error;

use crate::{
    CounterBackend,
    mutex::{Mutex, lock_recover},
};

/// Errors from [`MemoryCounter`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MemoryCounterError {
    /// Adding `delta` to the counter for `key` would overflow an `i64`.
    #[error("counter `{key}` at {value} cannot be incremented by {delta}")]
    Overflow { key: String, value: i64, delta: i64 },
}

/// An in-process [`CounterBackend`] backed by a mutex-guarded map.
///
/// Counters start at `0`. Every update is a single map write, so a poisoned
/// lock is recovered rather than reported. Only allocators sharing the same instance (for
/// example through an `Arc`) get non-overlapping segments, so this backend
/// suits tests and single-process deployments.
///
/// # Example
///
/// ```
/// use segid::{CounterBackend, MemoryCounter};
///
/// let counter = MemoryCounter::new().with_value("orders", 1_000);
/// assert_eq!(counter.increment_by("orders", 10), Ok(1_010));
/// assert_eq!(counter.increment_by("users", 5), Ok(5));
/// ```
#[derive(Debug, Default)]
pub struct MemoryCounter {
    counters: Mutex<HashMap<String, i64>>,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the counter for `key` with `value`.
    #[must_use]
    pub fn with_value(self, key: impl Into<String>, value: i64) -> Self {
        lock_recover(&self.counters).insert(key.into(), value);
        self
    }

    /// Reads the current total for `key`, if it was ever touched.
    pub fn value(&self, key: &str) -> Option<i64> {
        lock_recover(&self.counters).get(key).copied()
    }

    fn add(&self, key: &str, delta: i64) -> Result<i64, MemoryCounterError> {
        let mut counters = lock_recover(&self.counters);
        let value = counters.entry(key.to_owned()).or_insert(0);
        let current = *value;
        let total = current
            .checked_add(delta)
            .ok_or_else(|| MemoryCounterError::Overflow {
                key: key.to_owned(),
                value: current,
                delta,
            })?;
        *value = total;
        Ok(total)
    }
}

impl CounterBackend for MemoryCounter {
    type Err = MemoryCounterError;

    fn increment_by(&self, key: &str, delta: i64) -> Result<i64, Self::Err> {
        self.add(key, delta)
    }
}

#[cfg(feature = "futures")]
impl crate::AsyncCounterBackend for MemoryCounter {
    type Err = MemoryCounterError;

    fn increment_by(
        &self,
        key: &str,
        delta: i64,
    ) -> impl Future<Output = Result<i64, Self::Err>> + Send {
        core::future::ready(self.add(key, delta))
    }
}
