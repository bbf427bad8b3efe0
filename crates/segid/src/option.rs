use core::time::Duration;

use crate::OptionError;

/// The only allocation mode currently defined: contiguous segments served in
/// ascending order.
pub const MODE_SEGMENT: i32 = 1;

/// Allocation policy for an ID key.
///
/// A [`SegmentCache`] holds one global default and any number of per-key
/// overrides. Every buffer keeps its own copy, taken when the buffer is
/// created or when [`SegmentCache::set_option`] replaces it.
///
/// Values are checked by [`SegmentOptions::validate`] whenever they are
/// installed, never when they are built or deserialized.
///
/// # Example
///
/// ```
/// use segid::SegmentOptions;
///
/// let options = SegmentOptions::new(500, 0);
/// assert!(options.validate().is_ok());
/// assert_eq!(options.ttl(), None);
///
/// let options = SegmentOptions { increment_size: 0, ..options };
/// assert!(options.validate().is_err());
/// ```
///
/// [`SegmentCache`]: crate::SegmentCache
/// [`SegmentCache::set_option`]: crate::SegmentCache::set_option
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct SegmentOptions {
    /// Number of IDs reserved from the backend per refill. Must be `>= 1`.
    pub increment_size: i64,
    /// Lifetime of a reserved segment in seconds. `0` disables expiry. Must
    /// be `>= 0`.
    pub ttl_seconds: i64,
    /// Allocation strategy. Must be [`MODE_SEGMENT`].
    pub mode: i32,
}

impl SegmentOptions {
    /// Default number of IDs reserved per refill.
    pub const DEFAULT_INCREMENT_SIZE: i64 = 100;
    /// Default segment lifetime in seconds.
    pub const DEFAULT_TTL_SECONDS: i64 = 10;

    /// Creates segment-mode options with the given increment size and ttl.
    pub const fn new(increment_size: i64, ttl_seconds: i64) -> Self {
        Self {
            increment_size,
            ttl_seconds,
            mode: MODE_SEGMENT,
        }
    }

    /// Checks the option invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint, checked in the order increment
    /// size, mode, ttl.
    pub const fn validate(&self) -> Result<(), OptionError> {
        if self.increment_size < 1 {
            return Err(OptionError::IncrementSize(self.increment_size));
        }
        if self.mode != MODE_SEGMENT {
            return Err(OptionError::Mode(self.mode));
        }
        if self.ttl_seconds < 0 {
            return Err(OptionError::Ttl(self.ttl_seconds));
        }
        Ok(())
    }

    /// The segment lifetime, or `None` if segments never expire.
    pub fn ttl(&self) -> Option<Duration> {
        u64::try_from(self.ttl_seconds)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// The absolute expiry deadline for a segment reserved at `now`, in the
    /// millisecond unit of the [`TimeSource`](crate::TimeSource).
    pub(crate) fn deadline_from(&self, now: u64) -> Option<u64> {
        self.ttl()
            .map(|ttl| now.saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)))
    }
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INCREMENT_SIZE, Self::DEFAULT_TTL_SECONDS)
    }
}
