//! Property-based tests for disk generation.
//!
//! Grids are kept small (a few thousand cells) so each case stays cheap.

use std::f64::consts::FRAC_1_SQRT_2;

use proptest::prelude::*;

use super::{PrismConfig, PrismMode, disk_count, generate};
use crate::grid::{DenseEngine, GridEngine};
use crate::test_utils::{assertions, fixtures};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Each segment contributes exactly round(T / dt) classical disks.
    #[test]
    fn prop_disk_count_per_segment(
        gaps in prop::collection::vec(30u32..400, 1..4),
        dt in 10u32..30,
    ) {
        let mut times = vec![0.0];
        for g in &gaps {
            let last = *times.last().unwrap();
            times.push(last + f64::from(*g));
        }
        let traj = fixtures::straight_line(&times, 100.0);
        let config = PrismConfig::new(f64::from(dt), 20.0).with_expand_edges_factor(0.25);
        let disks = generate(&traj, &config, PrismMode::Classical, &DenseEngine).unwrap();

        for (i, g) in gaps.iter().enumerate() {
            let expected = disk_count(f64::from(*g), f64::from(dt));
            let got = disks.iter().filter(|d| d.segment == i).count();
            prop_assert_eq!(got, expected);
        }
        prop_assert!(disks.windows(2).all(|w| w[0].z_min < w[1].z_min));
    }

    /// Classical disk cells lie within both accessibility radii, and every
    /// cell within both radii is in the disk. Against the unsnapped fixes the
    /// radii hold to within half a cell diagonal.
    #[test]
    fn prop_classical_cells_within_both_cones(
        dx in -150.0f64..150.0,
        dy in -150.0f64..150.0,
        elapsed in 60u32..180,
        multiplier in 1.0f64..2.0,
    ) {
        let traj = fixtures::two_fix(dx, dy, f64::from(elapsed));
        let config = PrismConfig::new(30.0, 10.0)
            .with_expand_edges_factor(0.5)
            .with_velocity_multiplier(multiplier);
        let disks = generate(&traj, &config, PrismMode::Classical, &DenseEngine).unwrap();
        let window = *disks[0].accessibility().unwrap().window();

        let fixes = traj.fixes();
        let from_origin = DenseEngine.euclidean_distance(&window, fixes[0].point).unwrap();
        let from_destination = DenseEngine.euclidean_distance(&window, fixes[1].point).unwrap();
        let speed = fixes[0].velocity * multiplier;

        for disk in &disks {
            let t = (disk.index + 1) as f64 * 30.0;
            let r_i = t * speed;
            let r_j = (f64::from(elapsed) - t) * speed;
            let mask = disk.accessibility().unwrap();
            for (idx, &inside) in mask.cells().iter().enumerate() {
                let ok = from_origin.cells()[idx] <= r_i && from_destination.cells()[idx] <= r_j;
                prop_assert_eq!(inside, ok);
            }

            // Fixes snap to their cell center, so an accepted cell may sit up
            // to half a cell diagonal beyond the radius from the raw fix.
            let slack = window.cell_size() * FRAC_1_SQRT_2 + 1e-9;
            for row in 0..window.rows() {
                for col in 0..window.cols() {
                    if mask.get(row, col) != Some(true) {
                        continue;
                    }
                    let center = window.cell_center(row, col);
                    prop_assert!(center.distance(fixes[0].point) <= r_i + slack);
                    prop_assert!(center.distance(fixes[1].point) <= r_j + slack);
                }
            }
        }
    }

    /// Emitted probabilistic disks carry unit mass inside their support only.
    #[test]
    fn prop_probabilistic_unit_mass_on_support(
        dx in -150.0f64..150.0,
        dy in -150.0f64..150.0,
        elapsed in 60u32..180,
        multiplier in 1.0f64..2.0,
    ) {
        let traj = fixtures::two_fix(dx, dy, f64::from(elapsed));
        let config = PrismConfig::new(30.0, 10.0)
            .with_expand_edges_factor(0.5)
            .with_velocity_multiplier(multiplier);
        let classical = generate(&traj, &config, PrismMode::Classical, &DenseEngine).unwrap();
        let probabilistic =
            generate(&traj, &config, PrismMode::Probabilistic, &DenseEngine).unwrap();
        prop_assert!(probabilistic.len() <= classical.len());

        for disk in &probabilistic {
            let support = classical
                .iter()
                .find(|c| c.task() == disk.task())
                .and_then(|c| c.accessibility())
                .unwrap();
            prop_assert!(!support.is_empty());
            let field = disk.probability().unwrap();
            assertions::assert_unit_mass(field, 1e-6);
            assertions::assert_zero_outside(field, support);
        }
    }
}
