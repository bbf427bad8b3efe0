use super::segment::SegmentState;
use crate::{
    Error, Result, Segment, SegmentOptions, TakeStatus,
    mutex::{Mutex, MutexGuard, lock_recover},
};

/// The per-key buffer of reserved IDs, guarded by its own lock.
///
/// A buffer starts unfilled, becomes active on its first [`refill`], and
/// serves IDs in ascending order until the segment is used up or expires.
/// Every ID of a segment is served exactly once; abandoned IDs of an expired
/// segment are never served.
///
/// [`SegmentCache`] holds the lock across the whole observe, reserve,
/// install, and serve sequence. The methods here each take the lock for a
/// single step and are meant for driving a buffer by hand.
///
/// The lock is held while the backend runs, so a panicking backend poisons
/// it. The state is only mutated after the backend returns, so the lock is
/// recovered rather than reported: a key stays usable after a panic.
///
/// ## Features
/// - `cache-padded`: pads the lock to a cache line to avoid false sharing
///   between buffers allocated next to each other.
///
/// [`refill`]: SegmentBuffer::refill
/// [`SegmentCache`]: crate::SegmentCache
#[derive(Debug)]
pub struct SegmentBuffer {
    key: String,
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<SegmentState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<SegmentState>,
}

impl SegmentBuffer {
    /// Creates an unfilled buffer for `key` using `options` for its refills.
    ///
    /// `options` is not validated here; [`SegmentCache`] only installs
    /// validated options.
    ///
    /// [`SegmentCache`]: crate::SegmentCache
    pub fn new(key: impl Into<String>, options: SegmentOptions) -> Self {
        let state = Mutex::new(SegmentState::new(options));
        Self {
            key: key.into(),
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
        }
    }

    /// The ID key this buffer serves.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Takes the next ID if the current segment is active and unexpired.
    ///
    /// `now` is a reading of the [`TimeSource`](crate::TimeSource) that
    /// expiry deadlines were computed with.
    pub fn try_take(&self, now: u64) -> TakeStatus {
        self.lock().try_take(now)
    }

    /// Replaces the current segment with `segment`, whatever state the
    /// buffer was in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFault`] with [`Fault::Regressed`] if
    /// `segment` starts at or below the high end of the segment it replaces,
    /// which would reissue IDs. The buffer is left unchanged in that case.
    ///
    /// [`Fault::Regressed`]: crate::Fault::Regressed
    pub fn refill(&self, segment: Segment) -> Result<()> {
        self.lock()
            .refill(segment)
            .map_err(|fault| Error::fault(&self.key, fault))
    }

    /// The options used for the next refill.
    pub fn options(&self) -> SegmentOptions {
        self.lock().options()
    }

    /// Replaces the options in place. The current segment, and its deadline,
    /// are kept; the new options apply from the next refill.
    pub fn set_options(&self, options: SegmentOptions) {
        self.lock().set_options(options);
    }

    /// The segment currently installed, if the buffer was ever filled.
    pub fn segment(&self) -> Option<Segment> {
        self.lock().segment()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SegmentState> {
        lock_recover(self.mutex())
    }

    fn mutex(&self) -> &Mutex<SegmentState> {
        &self.state
    }
}
