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

//! Defines the Cl(4,0) rotor type [`Rotor4`].
//!
//! A rotor is an element of the even subalgebra of 4D Euclidean geometric
//! algebra: one scalar, six bivectors (one per rotation plane) and one
//! pseudoscalar. It encodes a rotation and applies it through the sandwich
//! product `R v R̃`. Unlike a quaternion it composes *double* rotations —
//! simultaneous turning in two orthogonal planes — which is exactly what
//! the six independent rotation angles of the visualization need.
//!
//! Basis ordering is fixed as `{1, e12, e13, e23, e14, e24, e34, e1234}`
//! with metric (+,+,+,+); every formula below is written against that
//! ordering and the matrix path in [`super::matrix`] is sign-compatible
//! with it.

use super::matrix::Mat4;
use super::vector::Vec4;
use bytemuck::{Pod, Zeroable};

/// The six rotation planes in 4D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationPlane {
    /// XY plane (e₁e₂) — the familiar 3D yaw.
    XY,
    /// XZ plane (e₁e₃).
    XZ,
    /// YZ plane (e₂e₃).
    YZ,
    /// XW plane (e₁e₄) — rotation into the fourth axis.
    XW,
    /// YW plane (e₂e₄).
    YW,
    /// ZW plane (e₃e₄).
    ZW,
}

impl RotationPlane {
    /// All six planes in the normative composition order.
    pub const ALL: [Self; 6] = [
        Self::XY,
        Self::XZ,
        Self::YZ,
        Self::XW,
        Self::YW,
        Self::ZW,
    ];
}

/// A rotor over Cl(4,0): `R = s + bxy·e12 + bxz·e13 + byz·e23 + bxw·e14 +
/// byw·e24 + bzw·e34 + p·e1234`.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Rotor4 {
    /// Scalar component.
    pub s: f32,
    /// Bivector component on the XY plane (e12).
    pub bxy: f32,
    /// Bivector component on the XZ plane (e13).
    pub bxz: f32,
    /// Bivector component on the YZ plane (e23).
    pub byz: f32,
    /// Bivector component on the XW plane (e14).
    pub bxw: f32,
    /// Bivector component on the YW plane (e24).
    pub byw: f32,
    /// Bivector component on the ZW plane (e34).
    pub bzw: f32,
    /// Pseudoscalar component (e1234).
    pub p: f32,
}

impl Rotor4 {
    /// The identity rotor (no rotation).
    pub const IDENTITY: Self = Self {
        s: 1.0,
        bxy: 0.0,
        bxz: 0.0,
        byz: 0.0,
        bxw: 0.0,
        byw: 0.0,
        bzw: 0.0,
        p: 0.0,
    };

    /// Creates a rotor rotating by `angle` in a single plane.
    ///
    /// The half-angle construction: `R = cos(θ/2) − sin(θ/2)·B` where `B`
    /// is the unit bivector of the plane.
    pub fn from_plane_angle(plane: RotationPlane, angle: f32) -> Self {
        let half = angle * 0.5;
        let cos_h = half.cos();
        let sin_h = half.sin();

        let mut r = Self::IDENTITY;
        r.s = cos_h;
        match plane {
            RotationPlane::XY => r.bxy = -sin_h,
            RotationPlane::XZ => r.bxz = -sin_h,
            RotationPlane::YZ => r.byz = -sin_h,
            RotationPlane::XW => r.bxw = -sin_h,
            RotationPlane::YW => r.byw = -sin_h,
            RotationPlane::ZW => r.bzw = -sin_h,
        }
        r
    }

    /// Creates a rotor from six plane angles, composing in the normative
    /// order `Rxy · Rxz · Ryz · Rxw · Ryw · Rzw`.
    ///
    /// Matches [`Mat4::rotation_from_six_angles`] to within 1e-5 for the
    /// same angle tuple.
    pub fn from_euler6(xy: f32, xz: f32, yz: f32, xw: f32, yw: f32, zw: f32) -> Self {
        let angles = [xy, xz, yz, xw, yw, zw];
        let mut r = Self::IDENTITY;
        for (plane, &angle) in RotationPlane::ALL.iter().zip(angles.iter()) {
            r = r.compose(&Self::from_plane_angle(*plane, angle));
        }
        r
    }

    /// Returns the squared magnitude of the rotor.
    #[inline]
    pub fn magnitude_squared(&self) -> f32 {
        self.s * self.s
            + self.bxy * self.bxy
            + self.bxz * self.bxz
            + self.byz * self.byz
            + self.bxw * self.bxw
            + self.byw * self.byw
            + self.bzw * self.bzw
            + self.p * self.p
    }

    /// Returns the magnitude of the rotor.
    #[inline]
    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    /// Normalizes the rotor to unit magnitude.
    ///
    /// A degenerate (zero) rotor normalizes to the identity.
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > f32::EPSILON {
            let inv = 1.0 / mag;
            Self {
                s: self.s * inv,
                bxy: self.bxy * inv,
                bxz: self.bxz * inv,
                byz: self.byz * inv,
                bxw: self.bxw * inv,
                byw: self.byw * inv,
                bzw: self.bzw * inv,
                p: self.p * inv,
            }
        } else {
            Self::IDENTITY
        }
    }

    /// Returns the reverse `R̃` (all bivector signs flipped).
    ///
    /// For a unit rotor the reverse is the inverse rotation. The scalar
    /// and pseudoscalar are even under reversal.
    pub fn reverse(&self) -> Self {
        Self {
            s: self.s,
            bxy: -self.bxy,
            bxz: -self.bxz,
            byz: -self.byz,
            bxw: -self.bxw,
            byw: -self.byw,
            bzw: -self.bzw,
            p: self.p,
        }
    }

    /// Composes two rotors: `self · other` as a geometric product, then
    /// renormalizes to bound floating-point drift.
    ///
    /// In sandwich application the composed rotor applies `other` first,
    /// then `self` — the same convention as matrix products.
    pub fn compose(&self, other: &Self) -> Self {
        self.geometric_product(other).normalize()
    }

    /// The raw 64-term geometric product over the even subalgebra.
    fn geometric_product(&self, other: &Self) -> Self {
        // Local bindings in index notation keep the sign table readable:
        // b12 = XY, b13 = XZ, b23 = YZ, b14 = XW, b24 = YW, b34 = ZW.
        let (a_s, a12, a13, a23, a14, a24, a34, a_p) = (
            self.s, self.bxy, self.bxz, self.byz, self.bxw, self.byw, self.bzw, self.p,
        );
        let (b_s, b12, b13, b23, b14, b24, b34, b_p) = (
            other.s, other.bxy, other.bxz, other.byz, other.bxw, other.byw, other.bzw, other.p,
        );

        let s = a_s * b_s - a12 * b12 - a13 * b13 - a23 * b23 - a14 * b14 - a24 * b24 - a34 * b34
            + a_p * b_p;

        let bxy = a_s * b12 + a12 * b_s - a13 * b23 + a23 * b13 - a14 * b24 + a24 * b14
            - a34 * b_p
            - a_p * b34;

        let bxz =
            a_s * b13 + a13 * b_s + a12 * b23 - a23 * b12 - a14 * b34 + a34 * b14 + a24 * b_p
                + a_p * b24;

        let byz = a_s * b23 + a23 * b_s - a12 * b13 + a13 * b12 - a24 * b34 + a34 * b24
            - a14 * b_p
            - a_p * b14;

        let bxw =
            a_s * b14 + a14 * b_s + a12 * b24 - a24 * b12 + a13 * b34 - a34 * b13 - a23 * b_p
                - a_p * b23;

        let byw = a_s * b24 + a24 * b_s - a12 * b14 + a14 * b12 + a23 * b34 - a34 * b23
            + a13 * b_p
            + a_p * b13;

        let bzw = a_s * b34 + a34 * b_s - a13 * b14 + a14 * b13 - a23 * b24 + a24 * b23
            - a12 * b_p
            - a_p * b12;

        let p = a_s * b_p + a_p * b_s + a12 * b34 + a34 * b12 - a13 * b24 - a24 * b13
            + a14 * b23
            + a23 * b14;

        Self {
            s,
            bxy,
            bxz,
            byz,
            bxw,
            byw,
            bzw,
            p,
        }
    }

    /// Applies the rotor to a vector through the sandwich product
    /// `R v R̃`, expanded to closed form.
    pub fn apply_to_vec(&self, v: Vec4) -> Vec4 {
        let (s, b12, b13, b23, b14, b24, b34, ps) = (
            self.s, self.bxy, self.bxz, self.byz, self.bxw, self.byw, self.bzw, self.p,
        );
        let (x, y, z, w) = (v.x, v.y, v.z, v.w);

        let s2 = s * s;
        let b12_2 = b12 * b12;
        let b13_2 = b13 * b13;
        let b23_2 = b23 * b23;
        let b14_2 = b14 * b14;
        let b24_2 = b24 * b24;
        let b34_2 = b34 * b34;
        let ps2 = ps * ps;

        let new_x = x * (s2 - b12_2 - b13_2 - b14_2 + b23_2 + b24_2 + b34_2 - ps2)
            + 2.0 * y * (s * b12 + b13 * b23 + b14 * b24 + b34 * ps)
            + 2.0 * z * (s * b13 - b12 * b23 + b14 * b34 - b24 * ps)
            + 2.0 * w * (s * b14 - b12 * b24 - b13 * b34 + b23 * ps);

        let new_y = 2.0 * x * (-s * b12 + b13 * b23 + b14 * b24 - b34 * ps)
            + y * (s2 - b12_2 + b13_2 + b14_2 - b23_2 - b24_2 + b34_2 - ps2)
            + 2.0 * z * (s * b23 + b12 * b13 - b24 * b34 + b14 * ps)
            + 2.0 * w * (s * b24 + b12 * b14 + b23 * b34 - b13 * ps);

        let new_z = 2.0 * x * (-s * b13 - b12 * b23 + b14 * b34 + b24 * ps)
            + 2.0 * y * (-s * b23 + b12 * b13 - b24 * b34 - b14 * ps)
            + z * (s2 + b12_2 - b13_2 + b14_2 - b23_2 + b24_2 - b34_2 - ps2)
            + 2.0 * w * (s * b34 + b13 * b14 + b23 * b24 + b12 * ps);

        let new_w = 2.0 * x * (-s * b14 - b12 * b24 - b13 * b34 - b23 * ps)
            + 2.0 * y * (-s * b24 + b12 * b14 + b23 * b34 + b13 * ps)
            + 2.0 * z * (-s * b34 + b13 * b14 + b23 * b24 - b12 * ps)
            + w * (s2 + b12_2 + b13_2 - b14_2 + b23_2 - b24_2 - b34_2 - ps2);

        Vec4::new(new_x, new_y, new_z, new_w)
    }

    /// Converts the rotor into a column-major rotation matrix by rotating
    /// each basis vector.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_cols(
            self.apply_to_vec(Vec4::X),
            self.apply_to_vec(Vec4::Y),
            self.apply_to_vec(Vec4::Z),
            self.apply_to_vec(Vec4::W),
        )
    }
}

impl Default for Rotor4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl approx::AbsDiffEq for Rotor4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        f32::abs_diff_eq(&self.s, &other.s, epsilon)
            && f32::abs_diff_eq(&self.bxy, &other.bxy, epsilon)
            && f32::abs_diff_eq(&self.bxz, &other.bxz, epsilon)
            && f32::abs_diff_eq(&self.byz, &other.byz, epsilon)
            && f32::abs_diff_eq(&self.bxw, &other.bxw, epsilon)
            && f32::abs_diff_eq(&self.byw, &other.byw, epsilon)
            && f32::abs_diff_eq(&self.bzw, &other.bzw, epsilon)
            && f32::abs_diff_eq(&self.p, &other.p, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FRAC_PI_2, PI, TAU};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn identity_leaves_vectors_alone() {
        let v = Vec4::new(1.0, 2.0, 3.0, 4.0);
        assert_abs_diff_eq!(Rotor4::IDENTITY.apply_to_vec(v), v, epsilon = 1e-6);
    }

    #[test]
    fn unit_magnitude_after_construction() {
        let r = Rotor4::from_plane_angle(RotationPlane::YW, 1.23);
        assert_abs_diff_eq!(r.magnitude(), 1.0, epsilon = 1e-5);

        let r6 = Rotor4::from_euler6(0.1, -0.2, 0.3, -0.4, 0.5, -0.6);
        assert_abs_diff_eq!(r6.magnitude(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn quarter_turns_map_basis_vectors() {
        let r = Rotor4::from_plane_angle(RotationPlane::XY, FRAC_PI_2);
        assert_abs_diff_eq!(r.apply_to_vec(Vec4::X), Vec4::Y, epsilon = 1e-5);
        assert_abs_diff_eq!(r.apply_to_vec(Vec4::Y), -Vec4::X, epsilon = 1e-5);

        let r = Rotor4::from_plane_angle(RotationPlane::ZW, FRAC_PI_2);
        assert_abs_diff_eq!(r.apply_to_vec(Vec4::Z), Vec4::W, epsilon = 1e-5);

        let r = Rotor4::from_plane_angle(RotationPlane::XW, FRAC_PI_2);
        assert_abs_diff_eq!(r.apply_to_vec(Vec4::X), Vec4::W, epsilon = 1e-5);
    }

    #[test]
    fn reverse_undoes_rotation() {
        let r = Rotor4::from_plane_angle(RotationPlane::XZ, PI / 3.0);
        let round_trip = r.compose(&r.reverse());
        assert_abs_diff_eq!(round_trip.s.abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn rotation_preserves_length() {
        let r = Rotor4::from_euler6(0.9, -1.4, 2.2, -0.3, 1.7, -2.8);
        let v = Vec4::new(1.0, -2.0, 3.0, -4.0);
        assert_abs_diff_eq!(r.apply_to_vec(v).length(), v.length(), epsilon = 1e-4);
    }

    /// Rotor and six-angle matrix paths must stay interchangeable over the
    /// whole angle domain.
    #[test]
    fn rotor_matrix_agreement_randomized() {
        let mut rng = StdRng::seed_from_u64(0x4d41_5448);
        for _ in 0..200 {
            let angles: [f32; 6] = std::array::from_fn(|_| rng.random_range(-TAU..TAU));
            let r = Rotor4::from_euler6(
                angles[0], angles[1], angles[2], angles[3], angles[4], angles[5],
            );
            let m = Mat4::rotation_from_six_angles(
                angles[0], angles[1], angles[2], angles[3], angles[4], angles[5],
            );
            let v = Vec4::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            );
            let tolerance = 1e-4 * v.length().max(1.0);
            let diff = r.apply_to_vec(v) - m.mul_vec4(v);
            assert!(
                diff.max_abs_component() < tolerance,
                "rotor/matrix disagreement for angles {angles:?}: {diff:?}"
            );
        }
    }

    /// `to_matrix` must agree with the direct matrix construction.
    #[test]
    fn to_matrix_matches_six_angle_matrix() {
        let r = Rotor4::from_euler6(0.4, 1.1, -0.6, 0.9, -1.8, 0.2);
        let m = Mat4::rotation_from_six_angles(0.4, 1.1, -0.6, 0.9, -1.8, 0.2);
        assert_abs_diff_eq!(r.to_matrix(), m, epsilon = 1e-5);
    }

    /// Long composition chains must not drift with per-step normalization.
    #[test]
    fn magnitude_bounded_over_long_chains() {
        let mut rng = StdRng::seed_from_u64(0x524f_544f);
        let mut r = Rotor4::IDENTITY;
        for _ in 0..1000 {
            let plane = RotationPlane::ALL[rng.random_range(0..6)];
            let step = Rotor4::from_plane_angle(plane, rng.random_range(-TAU..TAU));
            r = r.compose(&step);
        }
        assert!((r.magnitude() - 1.0).abs() < 1e-3);
    }
}
