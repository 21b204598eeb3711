use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rstest::rstest;

use venue_reservation_api::{
    models::TimeSlot,
    services::availability::{conflicts_with, first_conflict, is_available},
};

fn t(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}

fn booked() -> Vec<TimeSlot> {
    vec![TimeSlot::new(t(10, 0), t(11, 0)).unwrap()]
}

#[rstest]
#[case::overlaps_start(t(9, 30), t(10, 30), false)]
#[case::overlaps_end(t(10, 30), t(11, 30), false)]
#[case::contained(t(10, 15), t(10, 45), false)]
#[case::contains(t(9, 0), t(12, 0), false)]
#[case::identical(t(10, 0), t(11, 0), false)]
#[case::touches_end(t(11, 0), t(12, 0), false)]
#[case::touches_start(t(9, 0), t(10, 0), false)]
#[case::strictly_after(t(11, 1), t(12, 0), true)]
#[case::strictly_before(t(8, 0), t(9, 59), true)]
fn candidate_against_ten_to_eleven(
    #[case] start: DateTime<Utc>,
    #[case] end: DateTime<Utc>,
    #[case] expected: bool,
) {
    let candidate = TimeSlot::new(start, end).unwrap();
    assert_eq!(is_available(&booked(), &candidate), expected);
}

#[test]
fn empty_schedule_is_always_available() {
    let candidate = TimeSlot::new(t(0, 0), t(23, 59)).unwrap();
    assert!(is_available(&[], &candidate));
}

#[test]
fn reports_the_first_blocking_interval() {
    let schedule = vec![
        TimeSlot::new(t(8, 0), t(9, 0)).unwrap(),
        TimeSlot::new(t(13, 0), t(14, 0)).unwrap(),
        TimeSlot::new(t(15, 0), t(16, 0)).unwrap(),
    ];
    let candidate = TimeSlot::new(t(12, 0), t(15, 30)).unwrap();

    let blocking = first_conflict(&schedule, &candidate).expect("should conflict");
    assert_eq!(blocking.start, t(13, 0));
}

fn arb_slot() -> impl Strategy<Value = TimeSlot> {
    // Minutes within one week, at least one minute long.
    (0i64..10_080, 1i64..600).prop_map(|(offset, length)| {
        let base = t(0, 0);
        TimeSlot::new(
            base + Duration::minutes(offset),
            base + Duration::minutes(offset + length),
        )
        .unwrap()
    })
}

proptest! {
    #[test]
    fn conflict_is_symmetric(a in arb_slot(), b in arb_slot()) {
        prop_assert_eq!(conflicts_with(&a, &b), conflicts_with(&b, &a));
    }

    #[test]
    fn a_slot_always_conflicts_with_itself(a in arb_slot()) {
        prop_assert!(!is_available(&[a], &a));
    }

    #[test]
    fn strictly_after_every_booking_is_free(
        schedule in prop::collection::vec(arb_slot(), 0..8),
        gap in 1i64..120,
        length in 1i64..120,
    ) {
        let latest_end = schedule.iter().map(|s| s.end).max().unwrap_or_else(|| t(0, 0));
        let start = latest_end + Duration::minutes(gap);
        let candidate = TimeSlot::new(start, start + Duration::minutes(length)).unwrap();
        prop_assert!(is_available(&schedule, &candidate));
    }

    #[test]
    fn checking_twice_gives_the_same_answer(
        schedule in prop::collection::vec(arb_slot(), 0..8),
        candidate in arb_slot(),
    ) {
        let first = is_available(&schedule, &candidate);
        let second = is_available(&schedule, &candidate);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first, first_conflict(&schedule, &candidate).is_none());
    }
}
