// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the column-major [`Mat4`] type and the six-plane rotation
//! constructors.
//!
//! In 4D, rotations happen in planes rather than around axes; there are
//! six of them (XY, XZ, YZ, XW, YW, ZW). Each single-plane matrix has a
//! fixed sparse pattern, and [`Mat4::rotation_from_six_angles`] composes
//! all six in a fixed, normative order so it stays interchangeable with
//! the rotor path in [`super::rotor`].

use super::vector::Vec4;
use std::ops::Mul;

/// A 4x4 column-major matrix over `f32`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

/// The two axes spanning a rotation plane, as column indices.
///
/// For a positive angle, axis `i` rotates toward axis `j`; the sparse
/// pattern below is shared by all six planes.
const PLANE_AXES: [(usize, usize); 6] = [(0, 1), (0, 2), (1, 2), (0, 3), (1, 3), (2, 3)];

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// A 4x4 matrix with all elements set to 0.
    pub const ZERO: Self = Self {
        cols: [Vec4::ZERO; 4],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub const fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Applies the matrix to a vector (`M · v`).
    #[inline]
    pub fn mul_vec4(&self, v: Vec4) -> Vec4 {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z + self.cols[3] * v.w
    }

    /// Builds the single-plane rotation for plane axes `(i, j)`.
    ///
    /// The sparse pattern is `m[i][i] = c`, `m[j][i] = -s`, `m[i][j] = s`,
    /// `m[j][j] = c` (column-major indexing), identity elsewhere.
    fn from_plane_axes(i: usize, j: usize, angle_radians: f32) -> Self {
        let (s, c) = angle_radians.sin_cos();
        let mut m = Self::IDENTITY;
        set(&mut m.cols[i], i, c);
        set(&mut m.cols[i], j, s);
        set(&mut m.cols[j], i, -s);
        set(&mut m.cols[j], j, c);
        m
    }

    /// Creates a rotation in the XY plane.
    #[inline]
    pub fn from_rotation_xy(angle_radians: f32) -> Self {
        Self::from_plane_axes(0, 1, angle_radians)
    }

    /// Creates a rotation in the XZ plane.
    #[inline]
    pub fn from_rotation_xz(angle_radians: f32) -> Self {
        Self::from_plane_axes(0, 2, angle_radians)
    }

    /// Creates a rotation in the YZ plane.
    #[inline]
    pub fn from_rotation_yz(angle_radians: f32) -> Self {
        Self::from_plane_axes(1, 2, angle_radians)
    }

    /// Creates a rotation in the XW plane.
    #[inline]
    pub fn from_rotation_xw(angle_radians: f32) -> Self {
        Self::from_plane_axes(0, 3, angle_radians)
    }

    /// Creates a rotation in the YW plane.
    #[inline]
    pub fn from_rotation_yw(angle_radians: f32) -> Self {
        Self::from_plane_axes(1, 3, angle_radians)
    }

    /// Creates a rotation in the ZW plane.
    #[inline]
    pub fn from_rotation_zw(angle_radians: f32) -> Self {
        Self::from_plane_axes(2, 3, angle_radians)
    }

    /// Composes the six single-plane rotations in the order
    /// `Rxy · Rxz · Ryz · Rxw · Ryw · Rzw`.
    ///
    /// The order is load-bearing: plane rotations in 4D do not commute,
    /// and the rotor path in [`super::rotor::Rotor4::from_euler6`] composes
    /// in the same order so both representations agree.
    pub fn rotation_from_six_angles(xy: f32, xz: f32, yz: f32, xw: f32, yw: f32, zw: f32) -> Self {
        let angles = [xy, xz, yz, xw, yw, zw];
        let mut m = Self::IDENTITY;
        for (&(i, j), &angle) in PLANE_AXES.iter().zip(angles.iter()) {
            m = m * Self::from_plane_axes(i, j, angle);
        }
        m
    }
}

#[inline]
fn set(col: &mut Vec4, row: usize, value: f32) {
    match row {
        0 => col.x = value,
        1 => col.y = value,
        2 => col.z = value,
        _ => col.w = value,
    }
}

impl Mul for Mat4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            cols: [
                self.mul_vec4(rhs.cols[0]),
                self.mul_vec4(rhs.cols[1]),
                self.mul_vec4(rhs.cols[2]),
                self.mul_vec4(rhs.cols[3]),
            ],
        }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    #[inline]
    fn mul(self, rhs: Vec4) -> Vec4 {
        self.mul_vec4(rhs)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl approx::AbsDiffEq for Mat4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.cols
            .iter()
            .zip(other.cols.iter())
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::FRAC_PI_2;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_is_neutral() {
        let v = Vec4::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(Mat4::IDENTITY.mul_vec4(v), v);
        assert_eq!(Mat4::IDENTITY * Mat4::IDENTITY, Mat4::IDENTITY);
    }

    #[test]
    fn xy_quarter_turn_maps_x_to_y() {
        let m = Mat4::from_rotation_xy(FRAC_PI_2);
        assert_abs_diff_eq!(m.mul_vec4(Vec4::X), Vec4::Y, epsilon = 1e-6);
        assert_abs_diff_eq!(m.mul_vec4(Vec4::Y), -Vec4::X, epsilon = 1e-6);
    }

    #[test]
    fn zw_quarter_turn_maps_z_to_w() {
        let m = Mat4::from_rotation_zw(FRAC_PI_2);
        assert_abs_diff_eq!(m.mul_vec4(Vec4::Z), Vec4::W, epsilon = 1e-6);
        assert_abs_diff_eq!(m.mul_vec4(Vec4::W), -Vec4::Z, epsilon = 1e-6);
    }

    #[test]
    fn rotation_preserves_length() {
        let m = Mat4::rotation_from_six_angles(0.3, -1.1, 0.7, 2.0, -0.4, 1.9);
        let v = Vec4::new(1.0, -2.0, 3.0, -4.0);
        assert_abs_diff_eq!(m.mul_vec4(v).length(), v.length(), epsilon = 1e-4);
    }

    #[test]
    fn six_angle_order_matches_explicit_product() {
        let m = Mat4::rotation_from_six_angles(0.2, 0.3, 0.4, 0.5, 0.6, 0.7);
        let explicit = Mat4::from_rotation_xy(0.2)
            * Mat4::from_rotation_xz(0.3)
            * Mat4::from_rotation_yz(0.4)
            * Mat4::from_rotation_xw(0.5)
            * Mat4::from_rotation_yw(0.6)
            * Mat4::from_rotation_zw(0.7);
        assert_abs_diff_eq!(m, explicit, epsilon = 1e-6);
    }
}
