use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::Registry;
use crate::{
    CounterBackend, Error, MonotonicClock, Result, Segment, SegmentBuffer, SegmentOptions,
    TakeStatus, TimeSource,
    mutex::{RwLock, read, write},
};

/// A segment-caching ID allocator over a shared [`CounterBackend`].
///
/// Each ID key gets its own [`SegmentBuffer`], created on first use. IDs are
/// served from the buffer's reserved segment; when it is unfilled, used up,
/// or expired, one caller reserves the next segment from the backend while
/// holding that key's lock, so concurrent callers never install competing
/// segments. Keys never block each other.
///
/// IDs for a key are unique across every allocator sharing the backend, and
/// ascending within a segment. They are not gap-free: an expired segment's
/// unserved IDs, and the tail of the last segment when the process exits,
/// are abandoned.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ One backend round trip per `increment_size` IDs
///
/// ## See Also
/// - [`AsyncSegmentCache`] for async backends (`futures` feature)
///
/// # Example
///
/// ```
/// use segid::{MemoryCounter, SegmentCache, SegmentOptions};
///
/// let cache = SegmentCache::with_options(MemoryCounter::new(), SegmentOptions::new(5, 0))?;
///
/// let ids: Vec<i64> = (0..6).map(|_| cache.get_id("orders")).collect::<Result<_, _>>()?;
/// assert_eq!(ids, [1, 2, 3, 4, 5, 6]);
/// assert_eq!(cache.backend().value("orders"), Some(10));
/// # Ok::<(), segid::Error>(())
/// ```
///
/// [`AsyncSegmentCache`]: crate::AsyncSegmentCache
#[derive(Debug)]
pub struct SegmentCache<B, T = MonotonicClock> {
    backend: B,
    time: T,
    global: RwLock<SegmentOptions>,
    buffers: Registry<SegmentBuffer>,
}

impl<B> SegmentCache<B, MonotonicClock>
where
    B: CounterBackend,
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

impl<B, T> SegmentCache<B, T>
where
    B: CounterBackend,
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

    /// Returns the next ID for `key`.
    ///
    /// Takes an ID from the key's buffer. If the buffer cannot serve, reserves
    /// `increment_size` IDs from the backend, installs them, and serves the
    /// first. The key's lock is held throughout, so callers on the same key
    /// wait for the refill and then share the new segment.
    ///
    /// # Errors
    ///
    /// - [`Error::Backend`] if the backend increment fails. The buffer keeps
    ///   its previous state.
    /// - [`Error::AllocationFault`] if the reserved segment is unusable (see
    ///   [`Fault`](crate::Fault)). The buffer keeps its previous state.
    /// - [`Error::LockPoisoned`] if the key registry lock was poisoned.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), err))]
    pub fn get_id(&self, key: &str) -> Result<i64> {
        let buffer = self.buffer_for(key)?;
        let mut state = buffer.lock();

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
            .map_err(|err| Error::backend(key, err))?;
        state.install(key, total, self.time.current_millis())
    }

    /// Replaces the global option.
    ///
    /// Keys registered later start with this option. Existing buffers keep
    /// the option they were created with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if `options` fails validation; the
    /// previous global option stays in place.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn set_global_option(&self, options: SegmentOptions) -> Result<()> {
        options.validate()?;
        *write(&self.global)? = options;
        Ok(())
    }

    /// Sets the option for `key`.
    ///
    /// If `key` has no buffer yet, one is registered with `options`.
    /// Otherwise the buffer's option is replaced in place and applies from
    /// its next refill.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if `options` fails validation; the
    /// key's buffer and option are left untouched.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn set_option(&self, key: &str, options: SegmentOptions) -> Result<()> {
        options.validate()?;
        let (buffer, created) = self
            .buffers
            .get_or_insert_with(key, || SegmentBuffer::new(key, options))?;
        if !created {
            buffer.set_options(options);
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
    /// Returns [`Error::LockPoisoned`] if the key registry lock was poisoned.
    pub fn option(&self, key: &str) -> Result<Option<SegmentOptions>> {
        Ok(self.buffers.get(key)?.map(|buffer| buffer.options()))
    }

    /// The segment currently installed for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the key registry lock was poisoned.
    pub fn segment(&self, key: &str) -> Result<Option<Segment>> {
        Ok(self.buffers.get(key)?.and_then(|buffer| buffer.segment()))
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

    fn buffer_for(&self, key: &str) -> Result<Arc<SegmentBuffer>> {
        if let Some(buffer) = self.buffers.get(key)? {
            return Ok(buffer);
        }
        let options = self.global_option()?;
        let (buffer, _created) = self
            .buffers
            .get_or_insert_with(key, || SegmentBuffer::new(key, options))?;

        #[cfg(feature = "tracing")]
        if _created {
            tracing::debug!(key, ?options, "registered key");
        }

        Ok(buffer)
    }
}
