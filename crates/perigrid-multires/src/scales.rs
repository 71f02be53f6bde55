// Optimizer scales that freeze the passive boundary band of the grid.
// Edge coefficients of the periodic basis pick up boundary artifacts, so a
// configurable number of outer control-point layers is excluded from
// optimization by giving those parameters a prohibitively large scale.

use crate::error::{GridError, Result};
use perigrid_core::grid::GridGeometry;

/// Scale assigned to passive coefficients; large enough that the optimizer
/// leaves them untouched.
pub const PASSIVE_SCALE: f64 = 1.0e4;

/// Build the per-parameter optimizer scales for `grid`.
///
/// Returns a vector of length `grid.num_points() * D`: 1.0 everywhere, with
/// the sentinel [`PASSIVE_SCALE`] for every coefficient whose control point
/// lies within `edge_width` layers of the grid boundary along any axis, in
/// all D dimension blocks.
pub fn build_scales<const D: usize>(
    grid: &GridGeometry<D>,
    edge_width: usize,
) -> Result<Vec<f64>> {
    let num_points = grid.num_points();
    let num_parameters = num_points * D;
    let mut scales = vec![1.0; num_parameters];

    if edge_width == 0 {
        return Ok(scales);
    }

    let size = grid.region().size();
    for (axis, &s) in size.iter().enumerate() {
        if s as i64 - 2 * edge_width as i64 <= 0 {
            return Err(GridError::invalid_configuration(format!(
                "passive edge width {edge_width} does not fit: the grid size \
                 along axis {axis} is only {s}"
            )));
        }
    }

    for idx in grid.region().iter_indices() {
        let passive = (0..D).any(|d| idx[d] < edge_width || idx[d] >= size[d] - edge_width);
        if passive {
            let offset = grid.region().offset_of(idx);
            for block in 0..D {
                scales[block * num_points + offset] = PASSIVE_SCALE;
            }
        }
    }
    Ok(scales)
}

#[cfg(test)]
mod tests {
    use super::*;
    use perigrid_core::spatial::{Point, Spacing};

    fn grid(size: [usize; 3]) -> GridGeometry<3> {
        GridGeometry::axis_aligned(Point::origin(), Spacing::uniform(1.0), size)
    }

    #[test]
    fn test_zero_width_is_all_ones() {
        let scales = build_scales(&grid([5, 6, 7]), 0).unwrap();
        assert_eq!(scales.len(), 5 * 6 * 7 * 3);
        assert!(scales.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_frozen_count_matches_shell_volume() {
        let size = [10, 10, 10];
        let w = 2usize;
        let scales = build_scales(&grid(size), w).unwrap();

        let total: usize = size.iter().product();
        let inset: usize = size.iter().map(|&s| s - 2 * w).product();
        let frozen = scales.iter().filter(|&&s| s == PASSIVE_SCALE).count();
        assert_eq!(frozen, (total - inset) * 3);
    }

    #[test]
    fn test_matches_brute_force_membership() {
        let size = [6, 5, 7];
        let w = 1usize;
        let g = grid(size);
        let scales = build_scales(&g, w).unwrap();
        let num_points = g.num_points();

        for idx in g.region().iter_indices() {
            let inset = (0..3).all(|d| idx[d] >= w && idx[d] < size[d] - w);
            let offset = g.region().offset_of(idx);
            for block in 0..3 {
                let expected = if inset { 1.0 } else { PASSIVE_SCALE };
                assert_eq!(scales[block * num_points + offset], expected, "at {idx:?}");
            }
        }
    }

    #[test]
    fn test_width_exceeding_half_extent_is_rejected() {
        let err = build_scales(&grid([10, 10, 10]), 6).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("10"), "message should name the grid size: {msg}");

        // size - 2w == 0 leaves no active interior either
        assert!(build_scales(&grid([10, 10, 10]), 5).is_err());
        assert!(build_scales(&grid([11, 10, 10]), 5).is_err());
    }
}
