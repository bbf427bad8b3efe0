use std::sync::Arc;

use futures::lock::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    AsyncCounterBackend, Error, MonotonicClock, Result, Segment, SegmentOptions, TakeStatus,
    TimeSource,
    buffer::SegmentState,
    cache::Registry,
    mutex::{RwLock, read, write},
};

/// Per-key state for the async allocator. The lock is held across the
/// awaited backend call.
#[derive(Debug)]
struct AsyncSegmentBuffer {
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<SegmentState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<SegmentState>,
}

impl AsyncSegmentBuffer {
    fn new(options: SegmentOptions) -> Self {
        let state = Mutex::new(SegmentState::new(options));
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
        }
    }

    fn mutex(&self) -> &Mutex<SegmentState> {
        &self.state
    }
}

/// The async counterpart of [`SegmentCache`] for an [`AsyncCounterBackend`].
///
/// Runtime agnostic: each key's buffer is guarded by an async mutex, so a
/// task waiting for another task's refill yields instead of blocking its
/// thread. The key registry is a short synchronous critical section and is
/// never held across an `.await`.
///
/// The returned futures are `Send` whenever the backend and time source are
/// `Sync`.
///
/// # Example
///
/// ```
/// # futures::executor::block_on(async {
/// use segid::{AsyncSegmentCache, MemoryCounter, SegmentOptions};
///
/// let cache = AsyncSegmentCache::with_options(MemoryCounter::new(), SegmentOptions::new(2, 0))?;
///
/// assert_eq!(cache.get_id("orders").await?, 1);
/// assert_eq!(cache.get_id("orders").await?, 2);
/// assert_eq!(cache.get_id("orders").await?, 3);
/// assert_eq!(cache.backend().value("orders"), Some(4));
/// # Ok::<(), segid::Error>(())
/// # }).unwrap();
/// ```
///
/// [`SegmentCache`]: crate::SegmentCache
#[derive(Debug)]
pub struct AsyncSegmentCache<B, T = MonotonicClock> {
    backend: B,
    time: T,
    global: RwLock<SegmentOptions>,
    buffers: Registry<AsyncSegmentBuffer>,
}

impl<B> AsyncSegmentCache<B, MonotonicClock>
where
    B: AsyncCounterBackend,
{
    /// Creates an allocator with [`SegmentOptions::default`] as the global
    /// option.
    pub fn new(backend: B) -> Self {
        Self::from_parts(backend, SegmentOptions::default(), MonotonicClock::new())
    }

    /// Creates an allocator with `options` as the global option.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if `options` fails validation.
    pub fn with_options(backend: B, options: SegmentOptions) -> Result<Self> {
        Self::with_time(backend, options, MonotonicClock::new())
    }
}

impl<B, T> AsyncSegmentCache<B, T>
where
    B: AsyncCounterBackend,
    T: TimeSource,
{
    /// Creates an allocator that checks segment expiry against `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if `options` fails validation.
    pub fn with_time(backend: B, options: SegmentOptions, time: T) -> Result<Self> {
        options.validate()?;
        Ok(Self::from_parts(backend, options, time))
    }

    fn from_parts(backend: B, options: SegmentOptions, time: T) -> Self {
        Self {
            backend,
            time,
            global: RwLock::new(options),
            buffers: Registry::new(),
        }
    }

    /// Resolves to the next ID for `key`.
    ///
    /// See [`SegmentCache::get_id`](crate::SegmentCache::get_id); the key's
    /// lock is held across the awaited backend call.
    ///
    /// # Errors
    ///
    /// - [`Error::Backend`] if the backend increment fails.
    /// - [`Error::AllocationFault`] if the reserved segment is unusable.
    /// - [`Error::LockPoisoned`] if the registry lock was poisoned.
    ///
    /// The buffer keeps its previous state on every error.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), err))]
    pub async fn get_id(&self, key: &str) -> Result<i64> {
        let buffer = self.buffer_for(key)?;
        let mut state = buffer.mutex().lock().await;

        let status = state.try_take(self.time.current_millis());
        if let TakeStatus::Ready { id } = status {
            return Ok(id);
        }

        let increment = state.options().increment_size;
        #[cfg(feature = "tracing")]
        tracing::debug!(key, ?status, increment, "refilling segment");

        let total = self
            .backend
            .increment_by(key, increment)
            .await
            .map_err(|err| Error::backend(key, err))?;
        state.install(key, total, self.time.current_millis())
    }

    /// Replaces the global option. Existing buffers keep theirs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if `options` fails validation.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn set_global_option(&self, options: SegmentOptions) -> Result<()> {
        options.validate()?;
        *write(&self.global)? = options;
        Ok(())
    }

    /// Sets the option for `key`, registering the key if it is new.
    ///
    /// Waits for an in-flight refill of `key` to finish before replacing the
    /// option in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if `options` fails validation; the
    /// key is left untouched.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub async fn set_option(&self, key: &str, options: SegmentOptions) -> Result<()> {
        options.validate()?;
        let (buffer, created) = self
            .buffers
            .get_or_insert_with(key, || AsyncSegmentBuffer::new(options))?;
        if !created {
            buffer.mutex().lock().await.set_options(options);
        }
        Ok(())
    }

    /// The current global option.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock was poisoned.
    pub fn global_option(&self) -> Result<SegmentOptions> {
        Ok(*read(&self.global)?)
    }

    /// The option in effect for `key`, or `None` if `key` has no buffer yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the registry lock was poisoned.
    pub async fn option(&self, key: &str) -> Result<Option<SegmentOptions>> {
        match self.buffers.get(key)? {
            Some(buffer) => Ok(Some(buffer.mutex().lock().await.options())),
            None => Ok(None),
        }
    }

    /// The segment currently installed for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the registry lock was poisoned.
    pub async fn segment(&self, key: &str) -> Result<Option<Segment>> {
        match self.buffers.get(key)? {
            Some(buffer) => Ok(buffer.mutex().lock().await.segment()),
            None => Ok(None),
        }
    }

    /// Number of registered keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock was poisoned.
    pub fn len(&self) -> Result<usize> {
        self.buffers.len()
    }

    /// Returns `true` if no key has been registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock was poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn buffer_for(&self, key: &str) -> Result<Arc<AsyncSegmentBuffer>> {
        if let Some(buffer) = self.buffers.get(key)? {
            return Ok(buffer);
        }
        let options = self.global_option()?;
        let (buffer, _created) = self
            .buffers
            .get_or_insert_with(key, || AsyncSegmentBuffer::new(options))?;

        #[cfg(feature = "tracing")]
        if _created {
            tracing::debug!(key, ?options, "registered key");
        }

        Ok(buffer)
    }
}
