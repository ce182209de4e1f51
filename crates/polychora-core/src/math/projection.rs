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

//! 4D→3D projection modes.
//!
//! The CPU-side reference implementation of the projections the assembled
//! shaders perform per-fragment. Keeping both in one repo (and testing
//! them against each other's constants) is what lets the uniform contract
//! promise bit-compatible math across backends.

/// The denominator clamp shared by perspective and stereographic modes.
pub const PROJECTION_EPSILON: f32 = 1e-6;

/// How a 4D point is collapsed to 3D before lattice evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    /// `xyz · d/(d−w)`, the 4D analogue of a pinhole camera at distance `d`.
    Perspective(f32),
    /// `xyz / (1−w)`, projection from the unit 3-sphere's north pole.
    Stereographic,
    /// Drops `w` entirely.
    Orthographic,
}

/// The result of projecting a 4D point: the 3D image plus an advisory flag
/// set when the denominator had to be clamped.
///
/// The flag is never gating — a saturated projection still yields a
/// finite, bounded point — but consumers may use it to fade or annotate
/// regions near the projection singularity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    /// Projected X.
    pub x: f32,
    /// Projected Y.
    pub y: f32,
    /// Projected Z.
    pub z: f32,
    /// True when `|denominator|` was clamped to [`PROJECTION_EPSILON`].
    pub saturated: bool,
}

impl ProjectionMode {
    /// Projects a 4D point to 3D. Never faults; near-singular
    /// denominators are clamped, preserving sign.
    pub fn project(&self, x: f32, y: f32, z: f32, w: f32) -> Projected {
        match *self {
            ProjectionMode::Perspective(distance) => scaled(x, y, z, distance, distance - w),
            ProjectionMode::Stereographic => scaled(x, y, z, 1.0, 1.0 - w),
            ProjectionMode::Orthographic => Projected {
                x,
                y,
                z,
                saturated: false,
            },
        }
    }
}

fn scaled(x: f32, y: f32, z: f32, numerator: f32, denominator: f32) -> Projected {
    let saturated = denominator.abs() < PROJECTION_EPSILON;
    let denominator = if saturated {
        PROJECTION_EPSILON.copysign(if denominator == 0.0 { 1.0 } else { denominator })
    } else {
        denominator
    };
    let factor = numerator / denominator;
    Projected {
        x: x * factor,
        y: y * factor,
        z: z * factor,
        saturated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn orthographic_drops_w() {
        let p = ProjectionMode::Orthographic.project(1.0, 2.0, 3.0, 9.0);
        assert_eq!((p.x, p.y, p.z), (1.0, 2.0, 3.0));
        assert!(!p.saturated);
    }

    #[test]
    fn perspective_scales_by_depth() {
        let p = ProjectionMode::Perspective(2.0).project(1.0, 1.0, 1.0, 1.0);
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-6);
        assert!(!p.saturated);
    }

    #[test]
    fn singular_denominator_is_clamped_not_infinite() {
        let p = ProjectionMode::Perspective(1.0).project(1.0, 0.0, 0.0, 1.0);
        assert!(p.saturated);
        assert!(p.x.is_finite());

        let p = ProjectionMode::Stereographic.project(0.5, 0.5, 0.5, 1.0);
        assert!(p.saturated);
        assert!(p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
    }

    #[test]
    fn clamp_preserves_denominator_sign() {
        // w slightly above the pole: denominator is a tiny negative number
        // and the projected point must stay on that side.
        let p = ProjectionMode::Stereographic.project(1.0, 0.0, 0.0, 1.0 + 5e-7);
        assert!(p.saturated);
        assert!(p.x < 0.0);
    }
}
