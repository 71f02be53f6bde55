use perigrid_core::grid::{GridGeometry, GridRegion};
use perigrid_core::spatial::{Direction, Point, Spacing};
use perigrid_multires::{GridError, GridUpsampler};

const D: usize = 2;

fn periodic_grid(origin: [f64; D], spacing: [f64; D], size: [usize; D]) -> GridGeometry<D> {
    GridGeometry::axis_aligned(Point::new(origin), Spacing::new(spacing), size)
}

fn pseudo_coefficients(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 31 + 7) % 23) as f64 / 4.0 - 2.0).collect()
}

#[test]
fn equal_geometry_upsampling_is_identity() {
    let grid = periodic_grid([0.0, 0.0], [4.0, 3.0], [6, 8]);
    let coeffs = pseudo_coefficients(grid.num_points() * D);

    let upsampler = GridUpsampler::new().with_periodic_axes([false, true]);
    let refined = upsampler.upsample(&grid, &coeffs, &grid).unwrap();

    assert_eq!(refined.len(), coeffs.len());
    for (a, b) in coeffs.iter().zip(refined.iter()) {
        assert!((a - b).abs() < 1e-9, "{a} vs {b}");
    }
}

#[test]
fn dyadic_periodic_refinement_matches_subdivision_masks() {
    // Coefficients vary only along the periodic axis, so each line refines
    // independently and the result must equal the cubic subdivision masks:
    // even nodes (c[k-1] + 6 c[k] + c[k+1]) / 8, odd nodes (c[k] + c[k+1]) / 2.
    let n = 7usize;
    let coarse = periodic_grid([0.0, 0.0], [5.0, 2.0], [4, n]);
    let fine = periodic_grid([0.0, 0.0], [5.0, 1.0], [4, 2 * n]);

    let line = pseudo_coefficients(n);
    let coarse_n = coarse.num_points();
    let mut coeffs = vec![0.0; coarse_n * D];
    for block in 0..D {
        for idx in coarse.region().iter_indices() {
            coeffs[block * coarse_n + coarse.region().offset_of(idx)] = line[idx[1]];
        }
    }

    let upsampler = GridUpsampler::new().with_periodic_axes([false, true]);
    let refined = upsampler.upsample(&coarse, &coeffs, &fine).unwrap();

    let fine_n = fine.num_points();
    assert_eq!(refined.len(), fine_n * D);
    for block in 0..D {
        for idx in fine.region().iter_indices() {
            let j = idx[1];
            let k = j / 2;
            let expected = if j % 2 == 0 {
                (line[(k + n - 1) % n] + 6.0 * line[k] + line[(k + 1) % n]) / 8.0
            } else {
                (line[k] + line[(k + 1) % n]) / 2.0
            };
            let actual = refined[block * fine_n + fine.region().offset_of(idx)];
            assert!(
                (actual - expected).abs() < 1e-9,
                "block {block}, node {idx:?}: {actual} vs {expected}"
            );
        }
    }
}

#[test]
fn constant_field_survives_refinement() {
    let coarse = periodic_grid([0.0, 0.0], [4.0, 4.0], [6, 5]);
    let fine = periodic_grid([-2.0, 0.0], [2.0, 2.0], [13, 10]);
    let coeffs = vec![0.75; coarse.num_points() * D];

    let upsampler = GridUpsampler::new().with_periodic_axes([false, true]);
    let refined = upsampler.upsample(&coarse, &coeffs, &fine).unwrap();

    assert_eq!(refined.len(), fine.num_points() * D);
    for v in refined {
        assert!((v - 0.75).abs() < 1e-9);
    }
}

#[test]
fn mismatched_frames_are_rejected() {
    let coarse = periodic_grid([0.0, 0.0], [4.0, 4.0], [6, 5]);
    let mut rotated = Direction::<D>::identity();
    rotated[(0, 0)] = 0.0;
    rotated[(0, 1)] = -1.0;
    rotated[(1, 0)] = 1.0;
    rotated[(1, 1)] = 0.0;
    let fine = GridGeometry::new(
        Point::new([0.0, 0.0]),
        Spacing::new([2.0, 2.0]),
        rotated,
        GridRegion::from_size([12, 10]),
    );
    let coeffs = vec![0.0; coarse.num_points() * D];

    let err = GridUpsampler::new()
        .upsample(&coarse, &coeffs, &fine)
        .unwrap_err();
    assert!(matches!(err, GridError::IncompatibleGrids(_)));
}

#[test]
fn wrong_coefficient_length_is_rejected() {
    let coarse = periodic_grid([0.0, 0.0], [4.0, 4.0], [6, 5]);
    let fine = periodic_grid([0.0, 0.0], [2.0, 2.0], [12, 10]);
    let coeffs = vec![0.0; coarse.num_points() * D - 1];

    let err = GridUpsampler::new()
        .upsample(&coarse, &coeffs, &fine)
        .unwrap_err();
    assert!(matches!(err, GridError::CoefficientLength { .. }));
}
