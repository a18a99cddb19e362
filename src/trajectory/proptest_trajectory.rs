//! Property-based tests for trajectory construction.

use proptest::prelude::*;

use super::Trajectory;
use crate::test_utils::fixtures;
use crate::types::SpatialReference;

/// Distinct whole-second offsets plus positions, in arbitrary order.
fn shuffled_records() -> impl Strategy<Value = Vec<(u32, f64, f64)>> {
    prop::collection::hash_set(0u32..100_000, 2..40).prop_flat_map(|times| {
        let n = times.len();
        let times: Vec<u32> = times.into_iter().collect();
        (
            Just(times),
            prop::collection::vec((-1e4f64..1e4, -1e4f64..1e4), n),
        )
            .prop_map(|(times, coords)| {
                times
                    .into_iter()
                    .zip(coords)
                    .map(|(t, (x, y))| (t, x, y))
                    .collect::<Vec<_>>()
            })
            .prop_shuffle()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Fixes come out in non-decreasing timestamp order whatever the input order.
    #[test]
    fn prop_fixes_sorted(raw in shuffled_records()) {
        let t0 = fixtures::epoch();
        let records = raw
            .iter()
            .enumerate()
            .map(|(i, &(t, x, y))| fixtures::record(i as i64, x, y, t0, f64::from(t)))
            .collect();
        let traj = Trajectory::from_records(records, SpatialReference::Unknown).unwrap();
        prop_assert!(traj.fixes().windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        prop_assert_eq!(traj.count(), raw.len());
    }

    /// The terminal fix is zeroed and all others carry positive elapsed time.
    #[test]
    fn prop_terminal_zero_and_others_positive(raw in shuffled_records()) {
        let t0 = fixtures::epoch();
        let records = raw
            .iter()
            .enumerate()
            .map(|(i, &(t, x, y))| fixtures::record(i as i64, x, y, t0, f64::from(t)))
            .collect();
        let traj = Trajectory::from_records(records, SpatialReference::Unknown).unwrap();
        let (last, rest) = traj.fixes().split_last().unwrap();
        prop_assert_eq!(last.distance, 0.0);
        prop_assert_eq!(last.elapsed_time, 0.0);
        prop_assert_eq!(last.velocity, 0.0);
        for fix in rest {
            prop_assert!(fix.elapsed_time > 0.0);
            prop_assert!((fix.velocity * fix.elapsed_time - fix.distance).abs() < 1e-6);
        }
    }

    /// `minimum_disk_interval` is the true minimum gap between sorted timestamps.
    #[test]
    fn prop_minimum_interval_is_min_gap(raw in shuffled_records()) {
        let t0 = fixtures::epoch();
        let mut times: Vec<u32> = raw.iter().map(|r| r.0).collect();
        times.sort_unstable();
        let expected = times.windows(2).map(|w| w[1] - w[0]).min().unwrap();

        let records = raw
            .iter()
            .enumerate()
            .map(|(i, &(t, x, y))| fixtures::record(i as i64, x, y, t0, f64::from(t)))
            .collect();
        let traj = Trajectory::from_records(records, SpatialReference::Unknown).unwrap();
        prop_assert_eq!(traj.minimum_disk_interval(), f64::from(expected));
        prop_assert_eq!(
            traj.duration(),
            f64::from(times[times.len() - 1] - times[0])
        );
    }
}
