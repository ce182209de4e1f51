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

//! The six relationship kinds that derive a follower's parameters from
//! the keystone's.

use crate::params::{ParamKey, ParameterSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Hue step of the harmonic relationship, in degrees (the golden angle).
pub const GOLDEN_ANGLE_DEG: f32 = 137.508;

/// A follower's inbound derivation rule.
///
/// Echo, Mirror, Complement and Harmonic are pure functions of the
/// keystone set. Reactive additionally reads the previous keystone
/// snapshot (it amplifies change), Chase the follower's own previous
/// output (it lags behind). All derived values pass back through the
/// parameter domains, so a follower can never leave its ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "lowercase")]
pub enum RelationshipEdge {
    /// Attenuated copy: intensity and grid density scale by `attenuation`
    /// (density rounded to a whole cell count).
    Echo {
        /// The attenuation factor α.
        attenuation: f32,
    },
    /// Rotation-plane signs negated, hue pushed to the complement.
    Mirror,
    /// Complementary hue; grid density reflected around `pivot`.
    Complement {
        /// The density reflection pivot.
        pivot: f32,
    },
    /// Density multiplied by `multiple`; hue stepped by that many golden
    /// angles.
    Harmonic {
        /// The harmonic multiple n.
        multiple: f32,
    },
    /// Tracks the keystone and amplifies whatever changed this tick.
    Reactive {
        /// The change amplification gain.
        gain: f32,
    },
    /// First-order low-pass of the keystone with time constant `lag`.
    Chase {
        /// The lag time constant in seconds.
        lag: f32,
    },
}

impl RelationshipEdge {
    /// Derives the follower set for this edge.
    ///
    /// * `keystone` — the keystone set after this tick's writes.
    /// * `prev_keystone` — the keystone set as of the previous tick
    ///   (Reactive only).
    /// * `prev_follower` — this follower's previous output (Chase only).
    /// * `dirty` — the keys written this tick (Reactive only).
    /// * `dt` — seconds since the previous derivation (Chase only).
    pub fn derive(
        &self,
        keystone: &ParameterSet,
        prev_keystone: &ParameterSet,
        prev_follower: &ParameterSet,
        dirty: &BTreeSet<ParamKey>,
        dt: f32,
    ) -> ParameterSet {
        match *self {
            RelationshipEdge::Echo { attenuation } => {
                let mut p = *keystone;
                p.set(ParamKey::Intensity, attenuation * keystone.intensity);
                p.set(
                    ParamKey::GridDensity,
                    (attenuation * keystone.grid_density).round(),
                );
                p
            }
            RelationshipEdge::Mirror => {
                let mut p = *keystone;
                for (i, key) in ParamKey::ROTATIONS.into_iter().enumerate() {
                    p.set(key, -keystone.rotation[i]);
                }
                p.set(ParamKey::Hue, keystone.hue + 180.0);
                p
            }
            RelationshipEdge::Complement { pivot } => {
                let mut p = *keystone;
                p.set(ParamKey::Hue, keystone.hue + 180.0);
                p.set(ParamKey::GridDensity, 2.0 * pivot - keystone.grid_density);
                p
            }
            RelationshipEdge::Harmonic { multiple } => {
                let mut p = *keystone;
                p.set(ParamKey::GridDensity, multiple * keystone.grid_density);
                p.set(ParamKey::Hue, keystone.hue + multiple * GOLDEN_ANGLE_DEG);
                p
            }
            RelationshipEdge::Reactive { gain } => {
                let mut p = *keystone;
                for &key in dirty {
                    let now = keystone.get(key);
                    let before = prev_keystone.get(key);
                    p.set(key, now + gain * (now - before));
                }
                p
            }
            RelationshipEdge::Chase { lag } => {
                // Below a millisecond of lag the filter is a passthrough.
                let lag = lag.max(1e-3);
                let alpha = (dt / lag).clamp(0.0, 1.0);
                let mut p = *prev_follower;
                for key in ParamKey::ALL {
                    let target = keystone.get(key);
                    let current = prev_follower.get(key);
                    p.set(key, current + alpha * (target - current));
                }
                p
            }
        }
    }

    /// True when the edge carries state across ticks (and therefore needs
    /// resetting on profile switches).
    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            RelationshipEdge::Reactive { .. } | RelationshipEdge::Chase { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn keystone() -> ParameterSet {
        let mut k = ParameterSet::default();
        k.set(ParamKey::GridDensity, 40.0);
        k.set(ParamKey::Hue, 200.0);
        k.set(ParamKey::Intensity, 0.5);
        k.set(ParamKey::Rot4dXW, 1.0);
        k
    }

    fn derive_pure(edge: RelationshipEdge, k: &ParameterSet) -> ParameterSet {
        edge.derive(k, k, k, &BTreeSet::new(), 1.0 / 60.0)
    }

    #[test]
    fn echo_attenuates_and_rounds() {
        let p = derive_pure(RelationshipEdge::Echo { attenuation: 0.4 }, &keystone());
        assert_eq!(p.grid_density, 16.0);
        assert_abs_diff_eq!(p.intensity, 0.2, epsilon = 1e-6);
        // everything else passes through
        assert_eq!(p.hue, 200.0);
    }

    #[test]
    fn mirror_negates_rotations_and_flips_hue() {
        let p = derive_pure(RelationshipEdge::Mirror, &keystone());
        assert_eq!(p.rotation[3], -1.0);
        assert_abs_diff_eq!(p.hue, 20.0, epsilon = 1e-4);
    }

    #[test]
    fn complement_reflects_density_around_pivot() {
        let p = derive_pure(RelationshipEdge::Complement { pivot: 50.0 }, &keystone());
        assert_eq!(p.grid_density, 60.0);
        assert_abs_diff_eq!(p.hue, 20.0, epsilon = 1e-4);
        // reflection out of range clamps
        let mut k = keystone();
        k.set(ParamKey::GridDensity, 5.0);
        let p = derive_pure(RelationshipEdge::Complement { pivot: 60.0 }, &k);
        assert_eq!(p.grid_density, 100.0);
    }

    #[test]
    fn harmonic_scales_density_and_steps_hue() {
        let p = derive_pure(RelationshipEdge::Harmonic { multiple: 3.0 }, &keystone());
        // 3 * 40 = 120, clamped to the density ceiling
        assert_eq!(p.grid_density, 100.0);
        let expected = crate::math::wrap(200.0 + 3.0 * GOLDEN_ANGLE_DEG, 360.0);
        assert_abs_diff_eq!(p.hue, expected, epsilon = 1e-3);
    }

    #[test]
    fn reactive_amplifies_only_dirty_fields() {
        let mut prev = keystone();
        prev.set(ParamKey::GridDensity, 30.0);
        let k = keystone(); // density 40 now
        let mut dirty = BTreeSet::new();
        dirty.insert(ParamKey::GridDensity);
        let p = RelationshipEdge::Reactive { gain: 1.2 }.derive(
            &k,
            &prev,
            &k,
            &dirty,
            1.0 / 60.0,
        );
        // 40 + 1.2 * (40 - 30) = 52
        assert_eq!(p.grid_density, 52.0);
        // hue was not dirty: tracks the keystone exactly
        assert_eq!(p.hue, k.hue);
    }

    #[test]
    fn chase_lags_toward_the_keystone() {
        let k = keystone();
        let mut follower = k;
        follower.set(ParamKey::GridDensity, 10.0);
        let edge = RelationshipEdge::Chase { lag: 0.5 };
        let p = edge.derive(&k, &k, &follower, &BTreeSet::new(), 0.1);
        // one fifth of the way there
        assert_abs_diff_eq!(p.grid_density, 16.0, epsilon = 1e-3);
        // a dt longer than the lag snaps without overshoot
        let p = edge.derive(&k, &k, &follower, &BTreeSet::new(), 2.0);
        assert_abs_diff_eq!(p.grid_density, 40.0, epsilon = 1e-3);
    }

    #[test]
    fn derived_sets_stay_valid() {
        let mut k = ParameterSet::default();
        k.set(ParamKey::GridDensity, 99.0);
        k.set(ParamKey::Hue, 359.0);
        k.set(ParamKey::Intensity, 1.0);
        for edge in [
            RelationshipEdge::Echo { attenuation: 0.4 },
            RelationshipEdge::Mirror,
            RelationshipEdge::Complement { pivot: 50.0 },
            RelationshipEdge::Harmonic { multiple: 5.0 },
            RelationshipEdge::Reactive { gain: 2.0 },
            RelationshipEdge::Chase { lag: 0.1 },
        ] {
            let p = derive_pure(edge, &k);
            assert!(p.is_valid(), "{edge:?} produced an invalid set");
        }
    }
}
