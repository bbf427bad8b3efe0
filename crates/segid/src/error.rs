use thiserror::Error;

use crate::TakeStatus;

/// A result type defaulting to the crate [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// A type-erased counter backend error.
pub type BackendError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// All error variants that `segid` can emit.
///
/// Exhausted, expired, or never-filled buffers are not errors. They drive
/// the single refill-and-retry inside [`SegmentCache::get_id`] and are only
/// surfaced (as [`Fault::Unallocatable`]) when that retry fails too.
///
/// [`SegmentCache::get_id`]: crate::SegmentCache::get_id
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A [`SegmentOptions`] value was rejected. Nothing was stored.
    ///
    /// [`SegmentOptions`]: crate::SegmentOptions
    #[error("invalid segment option: {0}")]
    InvalidOption(#[from] OptionError),

    /// The counter backend failed while reserving a segment for `key`.
    ///
    /// The backend's own error is preserved unchanged as the
    /// [`source`](core::error::Error::source) of this variant.
    #[error("counter backend failed for key `{key}`")]
    Backend {
        key: String,
        #[source]
        source: BackendError,
    },

    /// A refill did not yield an allocatable range for `key`.
    ///
    /// This is a backend-contract or logic violation, not a transient
    /// condition. The buffer is left as it was before the refill.
    #[error("allocation fault for key `{key}`: {fault}")]
    AllocationFault { key: String, fault: Fault },

    /// A lock was poisoned by a thread that panicked while holding it.
    ///
    /// Never produced with the `parking-lot` feature, whose locks do not
    /// poison.
    #[error("lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn backend<E>(key: &str, source: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            key: key.to_owned(),
            source: Box::new(source),
        }
    }

    pub(crate) fn fault(key: &str, fault: Fault) -> Self {
        Self::AllocationFault {
            key: key.to_owned(),
            fault,
        }
    }
}

#[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
#[cfg(not(feature = "parking-lot"))]
impl<T> From<crate::mutex::PoisonError<T>> for Error {
    fn from(_: crate::mutex::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

/// The option field that failed validation, with the rejected value.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("increment size must be at least 1, got {0}")]
    IncrementSize(i64),
    #[error("mode must be 1, got {0}")]
    Mode(i32),
    #[error("ttl seconds must not be negative, got {0}")]
    Ttl(i64),
}

/// Why a refill could not be turned into an allocatable segment.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Fault {
    /// `total - increment + 1` does not fit in an `i64`.
    #[error("segment below backend total {total} with increment {increment} overflows")]
    Overflow { total: i64, increment: i64 },

    /// The backend total went backwards: the new segment would reissue ids
    /// at or below `previous_high`.
    #[error("backend total {total} overlaps ids already issued up to {previous_high}")]
    Regressed { previous_high: i64, total: i64 },

    /// The retry after a successful refill still produced no id.
    #[error("refilled buffer still reports {0:?}")]
    Unallocatable(TakeStatus),
}
