// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Code for 2x2 Jones matrix math.

It's not ideal to use LAPACK for matrix multiplies or inverses, because it is
not possible to optimise only for 2x2 matrices. Here, we supply the math for
these special cases.

The elements are ordered `[xx, xy, yx, yy]`, i.e. row-major.
 */


use crate::c64;

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Jones([c64; 4]);

const JONES_ZERO: Jones = Jones([c64::new(0.0, 0.0); 4]);

const JONES_IDENTITY: Jones = Jones([
    c64::new(1.0, 0.0),
    c64::new(0.0, 0.0),
    c64::new(0.0, 0.0),
    c64::new(1.0, 0.0),
]);

impl Jones {
    pub fn identity() -> Self {
        JONES_IDENTITY
    }

    pub fn zero() -> Self {
        JONES_ZERO
    }

    /// Is every element of this matrix exactly zero?
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|e| e.re == 0.0 && e.im == 0.0)
    }

    /// The determinant of the matrix.
    #[inline(always)]
    pub fn det(&self) -> c64 {
        self[0] * self[3] - self[1] * self[2]
    }

    /// Get the inverse of the Jones matrix (J^I).
    ///
    /// Ideally, J^I . J = I. However it's possible that J is singular, in which
    /// case the contents of J^I are all NaN. Use [`Jones::try_inv`] when a
    /// singular matrix must be detected.
    #[inline(always)]
    pub fn inv(&self) -> Self {
        let mut inv = JONES_ZERO;
        let a = self;
        let inv_det = 1.0 / a.det();
        inv[0] = inv_det * a[3];
        inv[1] = -inv_det * a[1];
        inv[2] = -inv_det * a[2];
        inv[3] = inv_det * a[0];
        inv
    }

    /// Get the inverse of the Jones matrix, unless it is singular.
    ///
    /// The matrix is considered singular if its determinant is not finite, or
    /// if the magnitude of the determinant is not larger than `tolerance`
    /// multiplied by the square of the largest element magnitude. An all-zero
    /// matrix is always singular.
    pub fn try_inv(&self, tolerance: f64) -> Option<Self> {
        let det = self.det();
        if !det.re.is_finite() || !det.im.is_finite() {
            return None;
        }

        let scale = self.0.iter().map(|e| e.norm()).fold(0.0, f64::max);
        if det.norm() <= tolerance * scale * scale {
            return None;
        }

        Some(self.inv())
    }

    /// Multiply this matrix by a two-element (X, Y) column vector.
    #[inline(always)]
    pub fn mul_vec(&self, v: [c64; 2]) -> [c64; 2] {
        [
            self[0] * v[0] + self[1] * v[1],
            self[2] * v[0] + self[3] * v[1],
        ]
    }
}

impl std::ops::Deref for Jones {
    type Target = [c64; 4];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for Jones {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<[c64; 4]> for Jones {
    fn from(arr: [c64; 4]) -> Self {
        Self(arr)
    }
}

impl std::ops::Mul<Jones> for Jones {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: Jones) -> Self {
        let a = self.0;
        let b = rhs.0;
        Jones([
            a[0] * b[0] + a[1] * b[2],
            a[0] * b[1] + a[1] * b[3],
            a[2] * b[0] + a[3] * b[2],
            a[2] * b[1] + a[3] * b[3],
        ])
    }
}

impl std::ops::Mul<f64> for Jones {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: f64) -> Self {
        let mut a = self.0;
        a[0] *= rhs;
        a[1] *= rhs;
        a[2] *= rhs;
        a[3] *= rhs;
        Jones(a)
    }
}

#[cfg(test)]
impl approx::AbsDiffEq for Jones {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::EPSILON
    }

    #[inline]
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self[0] - other[0]).norm() <= epsilon
            && (self[1] - other[1]).norm() <= epsilon
            && (self[2] - other[2]).norm() <= epsilon
            && (self[3] - other[3]).norm() <= epsilon
    }
}
