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

//! The plain-data parameter record.

use super::ParamKey;
use crate::geometry::GeometryVariant;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A complete, always-valid snapshot of the keystone parameters.
///
/// Plain data: cloning one is how snapshots, layer derivation and
/// crossfades move parameter state around. Field values are only ever
/// produced by folding through [`ParamKey::domain`], so a `ParameterSet`
/// obtained from the store never holds out-of-domain or non-finite
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Packed geometry variant index (0..=23).
    pub geometry: u32,
    /// The six rotation angles in plane order XY, XZ, YZ, XW, YW, ZW.
    pub rotation: [f32; 6],
    /// Lattice cell frequency.
    pub grid_density: f32,
    /// Warp interpolation factor.
    pub morph_factor: f32,
    /// Stochastic displacement amount.
    pub chaos: f32,
    /// Animation time multiplier.
    pub speed: f32,
    /// Base hue in degrees.
    pub hue: f32,
    /// Color saturation.
    pub saturation: f32,
    /// Output intensity.
    pub intensity: f32,
    /// Projection dimension blend.
    pub dimension: f32,
}

impl ParameterSet {
    /// Reads a field by key, integers widened to `f32`.
    pub fn get(&self, key: ParamKey) -> f32 {
        match key {
            ParamKey::Geometry => self.geometry as f32,
            ParamKey::Rot4dXY => self.rotation[0],
            ParamKey::Rot4dXZ => self.rotation[1],
            ParamKey::Rot4dYZ => self.rotation[2],
            ParamKey::Rot4dXW => self.rotation[3],
            ParamKey::Rot4dYW => self.rotation[4],
            ParamKey::Rot4dZW => self.rotation[5],
            ParamKey::GridDensity => self.grid_density,
            ParamKey::MorphFactor => self.morph_factor,
            ParamKey::Chaos => self.chaos,
            ParamKey::Speed => self.speed,
            ParamKey::Hue => self.hue,
            ParamKey::Saturation => self.saturation,
            ParamKey::Intensity => self.intensity,
            ParamKey::Dimension => self.dimension,
        }
    }

    /// Writes a field by key, folding the value into the key's domain.
    ///
    /// The caller is responsible for rejecting non-finite values first
    /// (the store does); folding a finite value always succeeds.
    pub fn set(&mut self, key: ParamKey, value: f32) {
        let folded = key.domain().fold(value);
        match key {
            ParamKey::Geometry => self.geometry = folded as u32,
            ParamKey::Rot4dXY => self.rotation[0] = folded,
            ParamKey::Rot4dXZ => self.rotation[1] = folded,
            ParamKey::Rot4dYZ => self.rotation[2] = folded,
            ParamKey::Rot4dXW => self.rotation[3] = folded,
            ParamKey::Rot4dYW => self.rotation[4] = folded,
            ParamKey::Rot4dZW => self.rotation[5] = folded,
            ParamKey::GridDensity => self.grid_density = folded,
            ParamKey::MorphFactor => self.morph_factor = folded,
            ParamKey::Chaos => self.chaos = folded,
            ParamKey::Speed => self.speed = folded,
            ParamKey::Hue => self.hue = folded,
            ParamKey::Saturation => self.saturation = folded,
            ParamKey::Intensity => self.intensity = folded,
            ParamKey::Dimension => self.dimension = folded,
        }
    }

    /// The geometry variant this set selects.
    #[inline]
    pub fn variant(&self) -> GeometryVariant {
        GeometryVariant::decode(self.geometry)
    }

    /// Re-folds every field through its domain.
    ///
    /// Used when a whole set arrives from outside (restore, profile load)
    /// rather than through the per-field setters.
    pub fn sanitize(&mut self) {
        for key in ParamKey::ALL {
            let value = self.get(key);
            let value = if value.is_finite() {
                value
            } else {
                key.domain().default
            };
            self.set(key, value);
        }
    }

    /// Draws every field uniformly from its domain.
    ///
    /// The result is valid by construction — no post-hoc clamping is
    /// needed.
    pub fn randomize_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for key in ParamKey::ALL {
            let d = key.domain();
            self.set(key, rng.random_range(d.min..d.max));
        }
    }

    /// True when every field is finite and inside its domain.
    pub fn is_valid(&self) -> bool {
        ParamKey::ALL.iter().all(|&key| {
            let value = self.get(key);
            value.is_finite() && key.domain().fold(value) == value
        })
    }
}

impl Default for ParameterSet {
    /// The engine defaults: geometry 0, no rotation, density 15, morph 1,
    /// chaos 0.2, speed 1, hue 200, saturation 0.8, intensity 0.5,
    /// dimension 3.8.
    fn default() -> Self {
        let mut set = Self {
            geometry: 0,
            rotation: [0.0; 6],
            grid_density: 0.0,
            morph_factor: 0.0,
            chaos: 0.0,
            speed: 0.0,
            hue: 0.0,
            saturation: 0.0,
            intensity: 0.0,
            dimension: 0.0,
        };
        for key in ParamKey::ALL {
            set.set(key, key.domain().default);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_matches_declared_defaults() {
        let set = ParameterSet::default();
        for key in ParamKey::ALL {
            assert_eq!(set.get(key), key.domain().default, "{key}");
        }
        assert!(set.is_valid());
    }

    #[test]
    fn set_folds_into_domain() {
        let mut set = ParameterSet::default();
        set.set(ParamKey::GridDensity, 400.0);
        assert_eq!(set.grid_density, 100.0);
        set.set(ParamKey::Hue, 365.0);
        assert!((set.hue - 5.0).abs() < 1e-4);
        set.set(ParamKey::Geometry, 10.4);
        assert_eq!(set.geometry, 10);
    }

    #[test]
    fn randomize_is_valid_by_construction() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut set = ParameterSet::default();
        for _ in 0..100 {
            set.randomize_with(&mut rng);
            assert!(set.is_valid());
        }
    }

    #[test]
    fn sanitize_repairs_non_finite_fields() {
        let mut set = ParameterSet::default();
        set.chaos = f32::NAN;
        set.grid_density = f32::INFINITY;
        set.sanitize();
        assert!(set.is_valid());
        assert_eq!(set.chaos, ParamKey::Chaos.domain().default);
    }
}
