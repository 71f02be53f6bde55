//! Coefficient refinement between control grids.
//!
//! Upsampling treats the coarse coefficients as a periodic B-spline field,
//! samples that field at every fine control-point position, and converts the
//! samples back into coefficients on the fine lattice. The conversion solves
//! the knot interpolation system along each axis line with the same boundary
//! handling as the sampler, so upsampling onto an identical geometry
//! reproduces the input coefficients exactly.

use crate::error::{GridError, Result};
use perigrid_core::grid::{GridGeometry, GridRegion};

/// Per-entry tolerance for the direction-frame compatibility check.
const FRAME_TOLERANCE: f64 = 1e-9;

/// Cubic B-spline kernel.
///
/// - (2/3) - |x|^2 + (1/2)|x|^3    for |x| < 1
/// - (1/6)(2 - |x|)^3              for 1 <= |x| < 2
/// - 0                             otherwise
fn cubic_bspline(x: f64) -> f64 {
    let abs_x = x.abs();
    if abs_x < 1.0 {
        (2.0 / 3.0) - abs_x.powi(2) + 0.5 * abs_x.powi(3)
    } else if abs_x < 2.0 {
        let two_minus_x = 2.0 - abs_x;
        (1.0 / 6.0) * two_minus_x.powi(3)
    } else {
        0.0
    }
}

/// Refines coefficient vectors from a coarse periodic grid onto a finer one.
#[derive(Debug, Clone)]
pub struct GridUpsampler<const D: usize> {
    periodic: [bool; D],
}

impl<const D: usize> Default for GridUpsampler<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> GridUpsampler<D> {
    /// Create an upsampler with no periodic axes.
    pub fn new() -> Self {
        Self { periodic: [false; D] }
    }

    /// Mark the axes along which index arithmetic wraps.
    pub fn with_periodic_axes(mut self, periodic: [bool; D]) -> Self {
        self.periodic = periodic;
        self
    }

    /// Refine `coarse_coeffs` (one block of `coarse.num_points()` scalars per
    /// spatial dimension) onto `fine`, returning a newly allocated vector of
    /// length `fine.num_points() * D`.
    pub fn upsample(
        &self,
        coarse: &GridGeometry<D>,
        coarse_coeffs: &[f64],
        fine: &GridGeometry<D>,
    ) -> Result<Vec<f64>> {
        let coarse_n = coarse.num_points();
        let fine_n = fine.num_points();

        let expected = coarse_n * D;
        if coarse_coeffs.len() != expected {
            return Err(GridError::CoefficientLength {
                expected,
                actual: coarse_coeffs.len(),
            });
        }
        if !coarse.same_frame(fine, FRAME_TOLERANCE) {
            return Err(GridError::incompatible_grids(
                "coarse and fine grids are not in the same coordinate frame",
            ));
        }
        if !coarse.direction().is_orthonormal(1e-6) {
            return Err(GridError::incompatible_grids(
                "grid direction matrix is not orthonormal",
            ));
        }

        // Continuous coarse indices of every fine control point, relative to
        // the coarse region start. Shared across dimension blocks.
        let coarse_index = coarse.region().index();
        let fine_index = fine.region().index();
        let positions: Vec<[f64; D]> = fine
            .region()
            .iter_indices()
            .map(|idx| {
                let mut absolute = [0.0; D];
                for d in 0..D {
                    absolute[d] = (fine_index[d] + idx[d] as i64) as f64;
                }
                let p = fine.continuous_index_to_point(absolute);
                let u = coarse.point_to_continuous_index(&p);
                let mut relative = [0.0; D];
                for d in 0..D {
                    relative[d] = u[d] - coarse_index[d] as f64;
                }
                relative
            })
            .collect();

        let mut out = vec![0.0; fine_n * D];
        for block in 0..D {
            let src = &coarse_coeffs[block * coarse_n..(block + 1) * coarse_n];
            let mut sampled: Vec<f64> = positions
                .iter()
                .map(|u| self.evaluate(coarse.region(), src, *u))
                .collect();
            for axis in 0..D {
                self.decompose_axis(&mut sampled, fine.region(), axis);
            }
            out[block * fine_n..(block + 1) * fine_n].copy_from_slice(&sampled);
        }
        Ok(out)
    }

    /// Evaluate the coefficient field at a continuous (region-relative)
    /// lattice index: separable cubic weights over the 4^D neighborhood,
    /// wrapping along periodic axes and clamping along the rest.
    fn evaluate(&self, region: &GridRegion<D>, coeffs: &[f64], u: [f64; D]) -> f64 {
        let size = region.size();
        let mut weights = [[0.0; 4]; D];
        let mut neighbors = [[0usize; 4]; D];

        for d in 0..D {
            let n = size[d];
            let ud = if self.periodic[d] {
                u[d].rem_euclid(n as f64)
            } else {
                u[d]
            };
            let base = ud.floor() as i64 - 1;
            for j in 0..4 {
                let k = base + j as i64;
                weights[d][j] = cubic_bspline(ud - k as f64);
                neighbors[d][j] = if self.periodic[d] {
                    k.rem_euclid(n as i64) as usize
                } else {
                    k.clamp(0, n as i64 - 1) as usize
                };
            }
        }

        let mut value = 0.0;
        let mut offs = [0usize; D];
        loop {
            let mut w = 1.0;
            let mut idx = [0usize; D];
            for d in 0..D {
                w *= weights[d][offs[d]];
                idx[d] = neighbors[d][offs[d]];
            }
            if w != 0.0 {
                value += w * coeffs[region.offset_of(idx)];
            }

            let mut d = 0;
            loop {
                offs[d] += 1;
                if offs[d] < 4 {
                    break;
                }
                offs[d] = 0;
                d += 1;
                if d == D {
                    return value;
                }
            }
        }
    }

    /// Convert sampled field values into coefficients along every line of
    /// `axis`, solving the knot interpolation system
    /// `(c[i-1] + 4 c[i] + c[i+1]) / 6 = s[i]`.
    fn decompose_axis(&self, data: &mut [f64], region: &GridRegion<D>, axis: usize) {
        let size = region.size();
        let n = size[axis];
        if n <= 1 {
            // A single knot interpolates itself under both boundary rules.
            return;
        }
        let stride = region.strides()[axis];

        let mut line = vec![0.0; n];
        let mut scratch = Vec::with_capacity(n);
        let mut rank_one = Vec::with_capacity(n);

        let mut base_size = size;
        base_size[axis] = 1;
        for base_idx in GridRegion::from_size(base_size).iter_indices() {
            let base_off = region.offset_of(base_idx);
            for (i, v) in line.iter_mut().enumerate() {
                *v = data[base_off + i * stride];
            }
            if self.periodic[axis] {
                solve_cyclic(&mut line, &mut scratch, &mut rank_one);
            } else {
                solve_clamped(&mut line, &mut scratch);
            }
            for (i, v) in line.iter().enumerate() {
                data[base_off + i * stride] = *v;
            }
        }
    }
}

/// Thomas solve of a tridiagonal system with unit off-diagonals and the
/// given first/interior/last diagonal entries. `line` holds the right-hand
/// side on entry and the solution on return.
fn solve_tridiagonal(
    diag_first: f64,
    diag_mid: f64,
    diag_last: f64,
    line: &mut [f64],
    scratch: &mut Vec<f64>,
) {
    let n = line.len();
    scratch.clear();
    scratch.resize(n, 0.0);

    scratch[0] = 1.0 / diag_first;
    line[0] /= diag_first;
    for i in 1..n {
        let diag = if i == n - 1 { diag_last } else { diag_mid };
        let denom = diag - scratch[i - 1];
        scratch[i] = 1.0 / denom;
        line[i] = (line[i] - line[i - 1]) / denom;
    }
    for i in (0..n - 1).rev() {
        line[i] -= scratch[i] * line[i + 1];
    }
}

/// Clamped-boundary knot interpolation: the out-of-range neighbors fold onto
/// the boundary knot, giving first/last rows `(5 c + c_next) / 6`.
fn solve_clamped(line: &mut [f64], scratch: &mut Vec<f64>) {
    for v in line.iter_mut() {
        *v *= 6.0;
    }
    solve_tridiagonal(5.0, 4.0, 5.0, line, scratch);
}

/// Cyclic knot interpolation via Sherman-Morrison on the wrap-around
/// corner entries.
fn solve_cyclic(line: &mut [f64], scratch: &mut Vec<f64>, rank_one: &mut Vec<f64>) {
    let n = line.len();
    if n == 1 {
        return;
    }
    if n == 2 {
        // Both wrap neighbors are the other knot: s_i = (4 c_i + 2 c_j) / 6.
        let (s0, s1) = (line[0], line[1]);
        line[0] = 2.0 * s0 - s1;
        line[1] = 2.0 * s1 - s0;
        return;
    }

    for v in line.iter_mut() {
        *v *= 6.0;
    }

    let gamma = -4.0;
    let diag_first = 4.0 - gamma;
    let diag_last = 4.0 - 1.0 / gamma;
    solve_tridiagonal(diag_first, 4.0, diag_last, line, scratch);

    rank_one.clear();
    rank_one.resize(n, 0.0);
    rank_one[0] = gamma;
    rank_one[n - 1] = 1.0;
    solve_tridiagonal(diag_first, 4.0, diag_last, rank_one, scratch);

    let vx = line[0] + line[n - 1] / gamma;
    let vz = rank_one[0] + rank_one[n - 1] / gamma;
    let factor = vx / (1.0 + vz);
    for (c, z) in line.iter_mut().zip(rank_one.iter()) {
        *c -= factor * z;
    }
}
