use std::sync::Arc;

/// The durable counter that segments are reserved from.
///
/// Implementations typically wrap a remote store with an atomic
/// increment-and-get operation (for example Redis `INCRBY`).
///
/// # Contract
///
/// [`CounterBackend::increment_by`] must add `delta` to the counter stored
/// under `key` and return the new total as one atomic step. Concurrent calls,
/// from this process or any other allocator sharing the store, must never
/// observe the same total twice. A counter that has never been incremented
/// starts at `0`.
pub trait CounterBackend {
    /// The error returned when the backend cannot complete an increment.
    type Err: core::error::Error + Send + Sync + 'static;

    /// Atomically adds `delta` to the counter for `key` and returns the new
    /// total.
    ///
    /// # Errors
    ///
    /// Returns a backend-specific error if the increment could not be
    /// applied. The allocator treats it as opaque and hands it back to the
    /// caller.
    fn increment_by(&self, key: &str, delta: i64) -> Result<i64, Self::Err>;
}

impl<B: CounterBackend + ?Sized> CounterBackend for &B {
    type Err = B::Err;

    fn increment_by(&self, key: &str, delta: i64) -> Result<i64, Self::Err> {
        (**self).increment_by(key, delta)
    }
}

impl<B: CounterBackend + ?Sized> CounterBackend for Arc<B> {
    type Err = B::Err;

    fn increment_by(&self, key: &str, delta: i64) -> Result<i64, Self::Err> {
        (**self).increment_by(key, delta)
    }
}

/// The async counterpart of [`CounterBackend`], with the same contract.
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
#[cfg(feature = "futures")]
pub trait AsyncCounterBackend {
    /// The error returned when the backend cannot complete an increment.
    type Err: core::error::Error + Send + Sync + 'static;

    /// Atomically adds `delta` to the counter for `key` and resolves to the
    /// new total.
    ///
    /// # Errors
    ///
    /// Resolves to a backend-specific error if the increment could not be
    /// applied.
    fn increment_by(
        &self,
        key: &str,
        delta: i64,
    ) -> impl Future<Output = Result<i64, Self::Err>> + Send;
}

#[cfg(feature = "futures")]
impl<B: AsyncCounterBackend + ?Sized> AsyncCounterBackend for Arc<B> {
    type Err = B::Err;

    fn increment_by(
        &self,
        key: &str,
        delta: i64,
    ) -> impl Future<Output = Result<i64, Self::Err>> + Send {
        (**self).increment_by(key, delta)
    }
}
