/// Property tests for record histories
/// Any interleaving of pushes and acknowledgments keeps a non-empty,
/// strictly increasing history whose baseline never regresses

use proptest::prelude::*;

use voxsync_shared::{Lod, Record, RecordHistory, SendRecord};

#[derive(Clone, Debug)]
enum Step {
    Push,
    Acknowledge(u32),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Push),
        1 => (0u32..8).prop_map(Step::Acknowledge),
    ]
}

fn record(packet_number: u32) -> SendRecord {
    SendRecord {
        packet_number,
        lod: Lod::new([0.0; 3], 0.01),
    }
}

proptest! {
    #[test]
    fn history_stays_ordered_and_non_empty(steps in prop::collection::vec(step(), 0..64)) {
        let mut history = RecordHistory::new(SendRecord::sentinel());
        let mut next = 1u32;
        let mut baseline = 0u32;

        for step in steps {
            match step {
                Step::Push => {
                    history.push(record(next)).unwrap();
                    next += 1;
                }
                Step::Acknowledge(back) => {
                    // acknowledge something already sent, possibly again
                    let target = next.saturating_sub(1 + back);
                    history.acknowledge_through(target);
                    prop_assert!(history.oldest().packet_number() <= target.max(baseline));
                }
            }

            prop_assert!(!history.is_empty());
            prop_assert!(history.len() >= 1);
            prop_assert!(history.oldest().packet_number() >= baseline);
            baseline = history.oldest().packet_number();

            let numbers: Vec<u32> = history.iter().map(|r| r.packet_number()).collect();
            prop_assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(history.newest().packet_number(), next - 1);
        }
    }

    #[test]
    fn acknowledged_baseline_is_newest_released(sent in 1u32..40, acked in 1u32..40) {
        prop_assume!(acked <= sent);
        let mut history = RecordHistory::new(SendRecord::sentinel());
        for packet_number in 1..=sent {
            history.push(record(packet_number)).unwrap();
        }

        history.acknowledge_through(acked);

        prop_assert_eq!(history.oldest().packet_number(), acked);
        let in_flight: Vec<u32> = history.in_flight().map(|r| r.packet_number()).collect();
        let expected: Vec<u32> = (acked + 1..=sent).collect();
        prop_assert_eq!(in_flight, expected);
    }
}

#[test]
fn stale_push_is_rejected_without_change() {
    let mut history = RecordHistory::new(SendRecord::sentinel());
    history.push(record(1)).unwrap();
    history.push(record(2)).unwrap();

    assert!(history.push(record(2)).is_err());
    assert!(history.push(record(1)).is_err());
    assert_eq!(history.len(), 3);
    assert_eq!(history.newest().packet_number(), 2);
}
