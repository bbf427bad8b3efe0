use crate::{Error, Fault, Result, SegmentOptions, TakeStatus};

/// A contiguous range `[low, high]` of IDs reserved from the backend in one
/// increment, with an optional expiry deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    low: i64,
    high: i64,
    expires_at: Option<u64>,
}

impl Segment {
    /// Creates a segment covering `low..=high`, expiring once the
    /// [`TimeSource`](crate::TimeSource) reaches `expires_at`.
    ///
    /// Returns `None` if the range is empty.
    pub const fn new(low: i64, high: i64, expires_at: Option<u64>) -> Option<Self> {
        if low > high {
            return None;
        }
        Some(Self {
            low,
            high,
            expires_at,
        })
    }

    /// Computes the segment reserved by a backend increment that returned
    /// `total`: the last `options.increment_size` IDs up to and including
    /// `total`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Overflow`] if the lower bound is not representable.
    pub fn from_total(total: i64, options: &SegmentOptions, now: u64) -> Result<Self, Fault> {
        let increment = options.increment_size;
        let low = match increment {
            1.. => total.checked_sub(increment - 1),
            _ => None,
        }
        .ok_or(Fault::Overflow { total, increment })?;
        Ok(Self {
            low,
            high: total,
            expires_at: options.deadline_from(now),
        })
    }

    pub const fn low(&self) -> i64 {
        self.low
    }

    pub const fn high(&self) -> i64 {
        self.high
    }

    pub const fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Where a buffer stands in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor {
    /// Never filled.
    Unfilled,
    /// `next` is the next ID to hand out, `next <= segment.high`.
    Active { next: i64, segment: Segment },
    /// Every ID of `segment` was handed out.
    Drained { segment: Segment },
}

impl Cursor {
    fn segment(&self) -> Option<&Segment> {
        match self {
            Self::Unfilled => None,
            Self::Active { segment, .. } | Self::Drained { segment } => Some(segment),
        }
    }
}

/// The unsynchronized state behind a buffer lock.
#[derive(Clone, Debug)]
pub(crate) struct SegmentState {
    options: SegmentOptions,
    cursor: Cursor,
}

impl SegmentState {
    pub(crate) const fn new(options: SegmentOptions) -> Self {
        Self {
            options,
            cursor: Cursor::Unfilled,
        }
    }

    pub(crate) const fn options(&self) -> SegmentOptions {
        self.options
    }

    pub(crate) fn set_options(&mut self, options: SegmentOptions) {
        self.options = options;
    }

    pub(crate) fn segment(&self) -> Option<Segment> {
        self.cursor.segment().copied()
    }

    pub(crate) fn try_take(&mut self, now: u64) -> TakeStatus {
        let (id, segment) = match &mut self.cursor {
            Cursor::Unfilled => return TakeStatus::NotInitialized,
            Cursor::Active { segment, .. } | Cursor::Drained { segment }
                if segment.is_expired(now) =>
            {
                return TakeStatus::Expired;
            }
            Cursor::Drained { .. } => return TakeStatus::UsedUp,
            Cursor::Active { next, segment } => {
                let id = *next;
                if id < segment.high {
                    *next = id + 1;
                    return TakeStatus::Ready { id };
                }
                (id, *segment)
            }
        };
        // `id == high`: the last ID of the segment. Incrementing past it
        // could overflow at `i64::MAX`, so the drained state is explicit.
        self.cursor = Cursor::Drained { segment };
        TakeStatus::Ready { id }
    }

    pub(crate) fn refill(&mut self, segment: Segment) -> Result<(), Fault> {
        if let Some(previous) = self.cursor.segment() {
            if segment.low <= previous.high {
                return Err(Fault::Regressed {
                    previous_high: previous.high,
                    total: segment.high,
                });
            }
        }
        self.cursor = Cursor::Active {
            next: segment.low,
            segment,
        };
        Ok(())
    }

    /// Installs the segment reserved by a backend increment that returned
    /// `total` and takes the first ID from it.
    ///
    /// An overflowing or overlapping segment is rejected before anything is
    /// replaced.
    pub(crate) fn install(&mut self, key: &str, total: i64, now: u64) -> Result<i64> {
        let segment = Segment::from_total(total, &self.options, now)
            .map_err(|fault| Error::fault(key, fault))?;
        self.refill(segment).map_err(|fault| Error::fault(key, fault))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            key,
            low = segment.low,
            high = segment.high,
            expires_at = segment.expires_at,
            "installed segment"
        );

        match self.try_take(now) {
            TakeStatus::Ready { id } => Ok(id),
            status => Err(Error::fault(key, Fault::Unallocatable(status))),
        }
    }
}
