/// Delta encoding tests against the voxel test world
/// A delta applied to its baseline must yield exactly what the viewer at
/// the target lod can see

use proptest::prelude::*;

use voxsync_shared::{Lod, MetavoxelState, StateError};
use voxsync_test::TestMirror;

fn world() -> TestMirror {
    TestMirror::with_voxels((0..20u16).map(|x| ([x * 10, 0, 0], u32::from(x) + 1)))
}

fn near(threshold: f32) -> Lod {
    Lod::new([0.0; 3], threshold)
}

#[test]
fn delta_from_empty_baseline() {
    let data = world();
    let lod = near(0.01);

    let bytes = data
        .encode_delta(&TestMirror::new(), &Lod::default(), &lod)
        .unwrap();
    let mut mirror = TestMirror::new();
    mirror.apply_delta(&bytes, &Lod::default(), &lod).unwrap();

    assert_eq!(mirror, data.visible_at(&lod));
    assert!(!mirror.is_empty());
    assert!(mirror.len() < data.len(), "distant voxels stay hidden");
}

#[test]
fn unchanged_state_encodes_empty_delta() {
    let data = world();
    let lod = near(0.01);
    let baseline = data.visible_at(&lod);

    let bytes = data.encode_delta(&baseline, &lod, &lod).unwrap();
    let mut mirror = baseline.clone();
    mirror.apply_delta(&bytes, &lod, &lod).unwrap();

    assert_eq!(mirror, baseline);
    assert_eq!(bytes.len(), 1);
}

#[test]
fn moving_viewer_drops_and_adds_voxels() {
    let data = world();
    let before = near(0.01);
    let after = Lod::new([190.0, 0.0, 0.0], 0.01);
    let baseline = data.visible_at(&before);

    let bytes = data.encode_delta(&baseline, &before, &after).unwrap();
    let mut mirror = baseline.clone();
    mirror.apply_delta(&bytes, &before, &after).unwrap();

    assert_eq!(mirror, data.visible_at(&after));
    assert!(mirror.get(&[0, 0, 0]).is_none());
    assert!(mirror.get(&[190, 0, 0]).is_some());
}

#[test]
fn truncated_delta_leaves_mirror_untouched() {
    let data = world();
    let lod = near(0.01);
    let bytes = data
        .encode_delta(&TestMirror::new(), &Lod::default(), &lod)
        .unwrap();

    let mut mirror = TestMirror::with_voxels([([1, 1, 1], 7)]);
    let result = mirror.apply_delta(&bytes[..bytes.len() / 2], &Lod::default(), &lod);

    assert!(matches!(result, Err(StateError::MalformedDelta { .. })));
    assert_eq!(mirror, TestMirror::with_voxels([([1, 1, 1], 7)]));
}

#[test]
fn oversized_delta_is_rejected() {
    let data = TestMirror::with_voxels(
        (0..40u16).flat_map(|x| (0..40u16).map(move |y| ([x, y, 0], 1))),
    );
    let lod = near(0.0001);

    let result = data.encode_delta(&TestMirror::new(), &Lod::default(), &lod);

    assert!(matches!(result, Err(StateError::DeltaTooLarge { .. })));
}

fn lod_strategy() -> impl Strategy<Value = Lod> {
    (0.0f32..200.0, 0.0f32..50.0, 0.005f32..0.05)
        .prop_map(|(x, y, threshold)| Lod::new([x, y, 0.0], threshold))
}

proptest! {
    #[test]
    fn delta_reaches_target_from_any_baseline(
        base_lod in lod_strategy(),
        lod in lod_strategy(),
        edits in prop::collection::vec((0..20u16, 0u32..4), 0..6),
    ) {
        let base = world();
        let mut data = base.clone();
        for (slot, color) in edits {
            if color == 0 {
                data.remove(&[slot * 10, 0, 0]);
            } else {
                data.set([slot * 10, 0, 0], color);
            }
        }

        let baseline = base.visible_at(&base_lod);
        let bytes = data.encode_delta(&baseline, &base_lod, &lod).unwrap();
        let mut mirror = baseline;
        mirror.apply_delta(&bytes, &base_lod, &lod).unwrap();

        prop_assert_eq!(mirror, data.visible_at(&lod));
    }
}
