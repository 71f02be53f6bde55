//! Direction type for representing grid and image orientation.
//!
//! Direction matrices are D×D orthonormal matrices; column i is the direction
//! of the i-th lattice axis in physical space.

use super::Vector;
use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};

/// Direction matrix representing lattice orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Create an identity direction matrix (no rotation).
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Check if the matrix is orthonormal within `tol` per entry of `M Mᵀ - I`.
    pub fn is_orthonormal(&self, tol: f64) -> bool {
        let product = self.0 * self.0.transpose();
        let identity = SMatrix::<f64, D, D>::identity();
        (0..D).all(|i| (0..D).all(|j| (product[(i, j)] - identity[(i, j)]).abs() < tol))
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Entry-wise comparison within `tol`.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        (0..D).all(|i| (0..D).all(|j| (self.0[(i, j)] - other.0[(i, j)]).abs() <= tol))
    }

    /// Flatten to a column-major vector: entry (j, i) lands at `i * D + j`.
    ///
    /// This is the layout of the `GridDirection` line in transform-parameter
    /// files.
    pub fn to_column_major(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(D * D);
        for i in 0..D {
            for j in 0..D {
                flat.push(self.0[(j, i)]);
            }
        }
        flat
    }

    /// Rebuild from a column-major flattening, the inverse of
    /// [`to_column_major`](Self::to_column_major).
    pub fn from_column_major(flat: &[f64]) -> Self {
        assert!(flat.len() == D * D, "Flattened direction length must be D*D");
        let mut m = SMatrix::<f64, D, D>::zeros();
        for i in 0..D {
            for j in 0..D {
                m[(j, i)] = flat[i * D + j];
            }
        }
        Self(m)
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<(usize, usize)> for Direction<D> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}
