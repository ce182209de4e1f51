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

//! The typed, clamped parameter layer.
//!
//! Every externally-settable knob of the engine lives here under a
//! canonical name. Setters clamp to the declared domain (integers round,
//! hue wraps, NaN/Inf are rejected as no-ops) so that everything
//! downstream — derivation, uniform packing, shaders — can assume a valid
//! set without re-checking.

mod set;
mod store;

pub use set::ParameterSet;
pub use store::ParameterStore;

use std::fmt;

/// Canonical keys of the keystone parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// Packed geometry variant index, integer 0..=23.
    Geometry,
    /// Rotation angle in the XY plane, radians in [-2π, 2π].
    Rot4dXY,
    /// Rotation angle in the XZ plane.
    Rot4dXZ,
    /// Rotation angle in the YZ plane.
    Rot4dYZ,
    /// Rotation angle in the XW plane.
    Rot4dXW,
    /// Rotation angle in the YW plane.
    Rot4dYW,
    /// Rotation angle in the ZW plane.
    Rot4dZW,
    /// Lattice cell frequency, [4, 100].
    GridDensity,
    /// Warp interpolation factor, [0, 2].
    MorphFactor,
    /// Stochastic displacement amount, [0, 1].
    Chaos,
    /// Animation time multiplier, [0.1, 3].
    Speed,
    /// Base hue in degrees, wrapping in [0, 360).
    Hue,
    /// Color saturation, [0, 1].
    Saturation,
    /// Output intensity, [0, 1].
    Intensity,
    /// Projection dimension blend, [3.0, 4.5].
    Dimension,
}

/// How out-of-domain values are folded back into the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    /// Clamp to `[min, max]`.
    Float,
    /// Round to the nearest integer, then clamp.
    Integer,
    /// Wrap modulo `max` into `[min, max)`.
    Wrapping,
}

/// The declared domain of one parameter: bounds, folding rule, step
/// hint and default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDomain {
    /// Inclusive lower bound.
    pub min: f32,
    /// Upper bound (inclusive for clamping domains, exclusive for wrapping).
    pub max: f32,
    /// The folding rule.
    pub kind: DomainKind,
    /// The increment UIs should step the value by.
    pub step: f32,
    /// The default value.
    pub default: f32,
}

impl ParamDomain {
    /// Folds a (finite) value into the domain.
    pub fn fold(&self, value: f32) -> f32 {
        match self.kind {
            DomainKind::Float => value.clamp(self.min, self.max),
            DomainKind::Integer => value.round().clamp(self.min, self.max),
            DomainKind::Wrapping => crate::math::wrap(value, self.max),
        }
    }
}

const ROTATION_DOMAIN: ParamDomain = ParamDomain {
    min: -crate::math::TAU,
    max: crate::math::TAU,
    kind: DomainKind::Float,
    step: 0.01,
    default: 0.0,
};

impl ParamKey {
    /// All keys in canonical (uniform-layout) order.
    pub const ALL: [Self; 15] = [
        Self::Geometry,
        Self::Rot4dXY,
        Self::Rot4dXZ,
        Self::Rot4dYZ,
        Self::Rot4dXW,
        Self::Rot4dYW,
        Self::Rot4dZW,
        Self::GridDensity,
        Self::MorphFactor,
        Self::Chaos,
        Self::Speed,
        Self::Hue,
        Self::Saturation,
        Self::Intensity,
        Self::Dimension,
    ];

    /// The six rotation-angle keys in plane order.
    pub const ROTATIONS: [Self; 6] = [
        Self::Rot4dXY,
        Self::Rot4dXZ,
        Self::Rot4dYZ,
        Self::Rot4dXW,
        Self::Rot4dYW,
        Self::Rot4dZW,
    ];

    /// The canonical (wire/API) name of the key.
    pub fn name(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Rot4dXY => "rot4dXY",
            Self::Rot4dXZ => "rot4dXZ",
            Self::Rot4dYZ => "rot4dYZ",
            Self::Rot4dXW => "rot4dXW",
            Self::Rot4dYW => "rot4dYW",
            Self::Rot4dZW => "rot4dZW",
            Self::GridDensity => "gridDensity",
            Self::MorphFactor => "morphFactor",
            Self::Chaos => "chaos",
            Self::Speed => "speed",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Intensity => "intensity",
            Self::Dimension => "dimension",
        }
    }

    /// Looks a key up by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The key's declared domain.
    pub fn domain(self) -> ParamDomain {
        match self {
            Self::Geometry => ParamDomain {
                min: 0.0,
                max: (crate::geometry::VARIANT_COUNT - 1) as f32,
                kind: DomainKind::Integer,
                step: 1.0,
                default: 0.0,
            },
            Self::Rot4dXY
            | Self::Rot4dXZ
            | Self::Rot4dYZ
            | Self::Rot4dXW
            | Self::Rot4dYW
            | Self::Rot4dZW => ROTATION_DOMAIN,
            Self::GridDensity => ParamDomain {
                min: 4.0,
                max: 100.0,
                kind: DomainKind::Float,
                step: 0.5,
                default: 15.0,
            },
            Self::MorphFactor => ParamDomain {
                min: 0.0,
                max: 2.0,
                kind: DomainKind::Float,
                step: 0.01,
                default: 1.0,
            },
            Self::Chaos => ParamDomain {
                min: 0.0,
                max: 1.0,
                kind: DomainKind::Float,
                step: 0.01,
                default: 0.2,
            },
            Self::Speed => ParamDomain {
                min: 0.1,
                max: 3.0,
                kind: DomainKind::Float,
                step: 0.01,
                default: 1.0,
            },
            Self::Hue => ParamDomain {
                min: 0.0,
                max: 360.0,
                kind: DomainKind::Wrapping,
                step: 1.0,
                default: 200.0,
            },
            Self::Saturation => ParamDomain {
                min: 0.0,
                max: 1.0,
                kind: DomainKind::Float,
                step: 0.01,
                default: 0.8,
            },
            Self::Intensity => ParamDomain {
                min: 0.0,
                max: 1.0,
                kind: DomainKind::Float,
                step: 0.01,
                default: 0.5,
            },
            Self::Dimension => ParamDomain {
                min: 3.0,
                max: 4.5,
                kind: DomainKind::Float,
                step: 0.01,
                default: 3.8,
            },
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error from the parameter layer.
///
/// Both variants leave the store untouched: the version counter is not
/// bumped and no dirty flag is raised.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// The parameter name is not part of the canonical set.
    UnknownName(String),
    /// The value was NaN or infinite and was rejected.
    NonFinite {
        /// The key the write was aimed at.
        key: ParamKey,
    },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::UnknownName(name) => write!(f, "Unknown parameter name '{name}'"),
            ParamError::NonFinite { key } => {
                write!(f, "Rejected non-finite value for parameter '{key}'")
            }
        }
    }
}

impl std::error::Error for ParamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for key in ParamKey::ALL {
            assert_eq!(ParamKey::from_name(key.name()), Some(key));
        }
        assert_eq!(ParamKey::from_name("density"), None);
    }

    #[test]
    fn defaults_are_inside_domains() {
        for key in ParamKey::ALL {
            let d = key.domain();
            assert_eq!(d.fold(d.default), d.default, "default out of domain: {key}");
        }
    }

    #[test]
    fn integer_domain_rounds() {
        let d = ParamKey::Geometry.domain();
        assert_eq!(d.fold(9.7), 10.0);
        assert_eq!(d.fold(40.0), 23.0);
        assert_eq!(d.fold(-3.0), 0.0);
    }
}
