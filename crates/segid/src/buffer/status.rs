/// The outcome of taking one ID from a segment buffer.
///
/// Only [`TakeStatus::Ready`] carries an ID. The other variants tell the
/// caller that a refill is needed, and why.
///
/// # Example
///
/// ```
/// use segid::{Segment, SegmentBuffer, SegmentOptions, TakeStatus};
///
/// let buffer = SegmentBuffer::new("orders", SegmentOptions::new(2, 0));
/// assert_eq!(buffer.try_take(0), TakeStatus::NotInitialized);
///
/// buffer.refill(Segment::new(7, 8, None).unwrap()).unwrap();
/// assert_eq!(buffer.try_take(0), TakeStatus::Ready { id: 7 });
/// assert_eq!(buffer.try_take(0), TakeStatus::Ready { id: 8 });
/// assert_eq!(buffer.try_take(0), TakeStatus::UsedUp);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TakeStatus {
    /// An ID was taken from the current segment.
    Ready {
        /// The allocated ID.
        id: i64,
    },
    /// The buffer has never been filled.
    NotInitialized,
    /// Every ID of the current segment has been handed out.
    UsedUp,
    /// The current segment outlived its ttl. Its remaining IDs are abandoned.
    Expired,
}

impl TakeStatus {
    /// Returns the ID if one was taken.
    pub const fn id(self) -> Option<i64> {
        match self {
            Self::Ready { id } => Some(id),
            _ => None,
        }
    }

    /// Returns `true` if the buffer needs a refill before it can serve again.
    pub const fn needs_refill(self) -> bool {
        !matches!(self, Self::Ready { .. })
    }
}
