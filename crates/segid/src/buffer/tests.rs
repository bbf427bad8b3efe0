use super::segment::SegmentState;
use crate::{Error, Fault, Segment, SegmentBuffer, SegmentOptions, TakeStatus};

trait TakeStatusExt {
    fn unwrap_ready(self) -> i64;
}

impl TakeStatusExt for TakeStatus {
    fn unwrap_ready(self) -> i64 {
        match self {
            Self::Ready { id } => id,
            status => panic!("unexpected {status:?}"),
        }
    }
}

fn segment(low: i64, high: i64) -> Segment {
    Segment::new(low, high, None).unwrap()
}

fn drain(state: &mut SegmentState, now: u64) -> Vec<i64> {
    core::iter::from_fn(|| state.try_take(now).id()).collect()
}

#[test]
fn unfilled_buffer_reports_not_initialized() {
    let mut state = SegmentState::new(SegmentOptions::default());
    assert_eq!(state.try_take(0), TakeStatus::NotInitialized);
    assert_eq!(state.try_take(u64::MAX), TakeStatus::NotInitialized);
    assert_eq!(state.segment(), None);
}

#[test]
fn serves_every_id_of_a_segment_exactly_once() {
    let mut state = SegmentState::new(SegmentOptions::new(5, 0));
    state.refill(segment(1, 5)).unwrap();

    assert_eq!(drain(&mut state, 0), [1, 2, 3, 4, 5]);
    assert_eq!(state.try_take(0), TakeStatus::UsedUp);
    assert_eq!(state.try_take(0), TakeStatus::UsedUp);
}

#[test]
fn single_id_segment_is_served_once() {
    let mut state = SegmentState::new(SegmentOptions::new(1, 0));
    state.refill(segment(42, 42)).unwrap();

    assert_eq!(state.try_take(0).unwrap_ready(), 42);
    assert_eq!(state.try_take(0), TakeStatus::UsedUp);
}

#[test]
fn segments_may_start_at_zero_or_below() {
    let mut state = SegmentState::new(SegmentOptions::new(3, 0));
    state.refill(segment(0, 2)).unwrap();
    assert_eq!(drain(&mut state, 0), [0, 1, 2]);

    let mut state = SegmentState::new(SegmentOptions::new(3, 0));
    state.refill(segment(-1, 1)).unwrap();
    assert_eq!(drain(&mut state, 0), [-1, 0, 1]);
}

#[test]
fn drains_a_segment_ending_at_i64_max() {
    let mut state = SegmentState::new(SegmentOptions::new(3, 0));
    state.refill(segment(i64::MAX - 2, i64::MAX)).unwrap();

    assert_eq!(drain(&mut state, 0), [i64::MAX - 2, i64::MAX - 1, i64::MAX]);
    assert_eq!(state.try_take(0), TakeStatus::UsedUp);
}

#[test]
fn expires_at_the_deadline_with_ids_left() {
    let mut state = SegmentState::new(SegmentOptions::new(10, 1));
    state
        .refill(Segment::new(1, 10, Some(1_000)).unwrap())
        .unwrap();

    assert_eq!(state.try_take(0).unwrap_ready(), 1);
    assert_eq!(state.try_take(999).unwrap_ready(), 2);
    assert_eq!(state.try_take(1_000), TakeStatus::Expired);
    assert_eq!(state.try_take(5_000), TakeStatus::Expired);
}

#[test]
fn expiry_takes_precedence_over_used_up() {
    let mut state = SegmentState::new(SegmentOptions::new(1, 1));
    state.refill(Segment::new(7, 7, Some(10)).unwrap()).unwrap();

    assert_eq!(state.try_take(0).unwrap_ready(), 7);
    assert_eq!(state.try_take(9), TakeStatus::UsedUp);
    assert_eq!(state.try_take(10), TakeStatus::Expired);
}

#[test]
fn refill_replaces_an_expired_segment() {
    let mut state = SegmentState::new(SegmentOptions::new(10, 1));
    state.refill(Segment::new(1, 10, Some(1_000)).unwrap()).unwrap();
    assert_eq!(state.try_take(0).unwrap_ready(), 1);
    assert_eq!(state.try_take(1_000), TakeStatus::Expired);

    state.refill(Segment::new(11, 20, Some(2_000)).unwrap()).unwrap();
    assert_eq!(state.try_take(1_000).unwrap_ready(), 11);
}

#[test]
fn refill_rejects_overlapping_segments() {
    let mut state = SegmentState::new(SegmentOptions::new(5, 0));
    state.refill(segment(6, 10)).unwrap();
    assert_eq!(state.try_take(0).unwrap_ready(), 6);

    assert_eq!(
        state.refill(segment(10, 14)),
        Err(Fault::Regressed {
            previous_high: 10,
            total: 14,
        })
    );
    assert_eq!(
        state.refill(segment(1, 5)),
        Err(Fault::Regressed {
            previous_high: 10,
            total: 5,
        })
    );

    // Rejected refills leave the active segment in place.
    assert_eq!(state.try_take(0).unwrap_ready(), 7);
    assert_eq!(state.segment(), Some(segment(6, 10)));
}

#[test]
fn empty_segments_cannot_be_built() {
    assert_eq!(Segment::new(2, 1, None), None);
    let one = Segment::new(2, 2, Some(5)).unwrap();
    assert_eq!((one.low(), one.high(), one.expires_at()), (2, 2, Some(5)));
}

#[test]
fn segment_from_total_spans_the_increment() {
    let options = SegmentOptions::new(5, 0);
    assert_eq!(Segment::from_total(5, &options, 0), Ok(segment(1, 5)));
    assert_eq!(Segment::from_total(10, &options, 0), Ok(segment(6, 10)));
    assert_eq!(Segment::from_total(4, &options, 0), Ok(segment(0, 4)));

    let options = SegmentOptions::new(1, 2);
    assert_eq!(
        Segment::from_total(9, &options, 500),
        Ok(Segment::new(9, 9, Some(2_500)).unwrap())
    );
}

#[test]
fn segment_from_total_reports_overflow() {
    let options = SegmentOptions::new(5, 0);
    assert_eq!(
        Segment::from_total(i64::MIN + 1, &options, 0),
        Err(Fault::Overflow {
            total: i64::MIN + 1,
            increment: 5,
        })
    );

    let unchecked = SegmentOptions::new(0, 0);
    assert_eq!(
        Segment::from_total(10, &unchecked, 0),
        Err(Fault::Overflow {
            total: 10,
            increment: 0,
        })
    );
}

#[test]
fn install_serves_the_first_id_of_the_new_segment() {
    let mut state = SegmentState::new(SegmentOptions::new(4, 0));
    assert_eq!(state.install("k", 4, 0).unwrap(), 1);
    assert_eq!(drain(&mut state, 0), [2, 3, 4]);
    assert_eq!(state.install("k", 8, 0).unwrap(), 5);
}

#[test]
fn install_fault_leaves_state_untouched() {
    let mut state = SegmentState::new(SegmentOptions::new(4, 0));
    assert_eq!(state.install("k", 8, 0).unwrap(), 5);

    let err = state.install("k", 6, 0).unwrap_err();
    assert!(matches!(
        err,
        Error::AllocationFault {
            ref key,
            fault: Fault::Regressed {
                previous_high: 8,
                total: 6,
            },
        } if key == "k"
    ));
    assert_eq!(drain(&mut state, 0), [6, 7, 8]);
}

#[test]
fn new_options_apply_from_the_next_refill() {
    let mut state = SegmentState::new(SegmentOptions::new(2, 0));
    assert_eq!(state.install("k", 2, 0).unwrap(), 1);

    state.set_options(SegmentOptions::new(10, 0));
    assert_eq!(state.options(), SegmentOptions::new(10, 0));
    assert_eq!(state.try_take(0).unwrap_ready(), 2);
    assert_eq!(state.try_take(0), TakeStatus::UsedUp);
    assert_eq!(state.install("k", 12, 0).unwrap(), 3);
    assert_eq!(state.segment(), Some(segment(3, 12)));
}

#[test]
fn buffer_wraps_the_state_machine() {
    let buffer = SegmentBuffer::new("orders", SegmentOptions::new(2, 0));
    assert_eq!(buffer.key(), "orders");
    assert_eq!(buffer.try_take(0), TakeStatus::NotInitialized);

    buffer.refill(segment(3, 4)).unwrap();
    assert_eq!(buffer.try_take(0), TakeStatus::Ready { id: 3 });
    assert_eq!(buffer.try_take(0), TakeStatus::Ready { id: 4 });
    assert_eq!(buffer.try_take(0), TakeStatus::UsedUp);

    let err = buffer.refill(segment(4, 5)).unwrap_err();
    assert!(matches!(err, Error::AllocationFault { ref key, .. } if key == "orders"));

    buffer.set_options(SegmentOptions::new(7, 3));
    assert_eq!(buffer.options(), SegmentOptions::new(7, 3));
    assert_eq!(buffer.segment(), Some(segment(3, 4)));
}

#[test]
fn buffer_survives_a_panic_while_locked() {
    let buffer = SegmentBuffer::new("orders", SegmentOptions::new(2, 0));
    buffer.refill(segment(1, 2)).unwrap();

    let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = buffer.lock();
        panic!("backend blew up");
    }));
    assert!(panicked.is_err());

    assert_eq!(buffer.try_take(0), TakeStatus::Ready { id: 1 });
    assert_eq!(buffer.segment(), Some(segment(1, 2)));
}

#[test]
fn status_helpers() {
    assert_eq!(TakeStatus::Ready { id: 3 }.id(), Some(3));
    assert!(!TakeStatus::Ready { id: 3 }.needs_refill());
    for status in [
        TakeStatus::NotInitialized,
        TakeStatus::UsedUp,
        TakeStatus::Expired,
    ] {
        assert_eq!(status.id(), None);
        assert!(status.needs_refill());
    }
}
