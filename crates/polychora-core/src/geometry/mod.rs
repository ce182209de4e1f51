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

//! The 24-variant geometry catalog.
//!
//! A geometry variant is a `(warp core, base lattice)` pair packed into a
//! single index: `index = core·8 + base`. The lattices themselves are
//! procedural density functions evaluated per-fragment on the GPU — the
//! catalog owns their shader identities and the index arithmetic, never a
//! CPU evaluation.

use std::fmt;

/// Number of base lattices.
pub const BASE_COUNT: u32 = 8;
/// Number of warp cores.
pub const CORE_COUNT: u32 = 3;
/// Total number of `(core, base)` variants.
pub const VARIANT_COUNT: u32 = BASE_COUNT * CORE_COUNT;

/// One of the eight base lattice density functions on R³.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseLattice {
    /// Minimum distance to the four cell centers of a unit-cube lattice.
    Tetrahedron,
    /// Axis-aligned cell edges: `max(|fract(p·k)−0.5|)`.
    Hypercube,
    /// Soft spherical shells in each cell.
    Sphere,
    /// Implicit torus density in the fract cell.
    Torus,
    /// Parametric Klein-bottle isosurface.
    Klein,
    /// Four-iteration fold-based inverse IFS.
    Fractal,
    /// `sin(x)·sin(y)·sin(z+t)` interference field.
    Wave,
    /// Octahedral `max(|qx|,|qy|,|qz|)` facets.
    Crystal,
}

impl BaseLattice {
    /// All base lattices in index order.
    pub const ALL: [Self; 8] = [
        Self::Tetrahedron,
        Self::Hypercube,
        Self::Sphere,
        Self::Torus,
        Self::Klein,
        Self::Fractal,
        Self::Wave,
        Self::Crystal,
    ];

    /// The lattice's index in `0..8`.
    #[inline]
    pub fn index(self) -> u32 {
        Self::ALL.iter().position(|&b| b == self).unwrap_or(0) as u32
    }

    /// Looks a lattice up by index; out-of-range indices wrap.
    #[inline]
    pub fn from_index(index: u32) -> Self {
        Self::ALL[(index % BASE_COUNT) as usize]
    }

    /// The shader function implementing this lattice, shared verbatim by
    /// every assembled program.
    pub fn shader_fn(self) -> &'static str {
        match self {
            Self::Tetrahedron => "lattice_tetrahedron",
            Self::Hypercube => "lattice_hypercube",
            Self::Sphere => "lattice_sphere",
            Self::Torus => "lattice_torus",
            Self::Klein => "lattice_klein",
            Self::Fractal => "lattice_fractal",
            Self::Wave => "lattice_wave",
            Self::Crystal => "lattice_crystal",
        }
    }
}

/// A 3D-point transformation applied before lattice evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarpCore {
    /// The point is used unchanged.
    Identity,
    /// 3-sphere inverse-stereographic embedding and back, with six extra
    /// rotations parameterized by `morphFactor`.
    HypersphereWarp,
    /// Pentatope barycentric skew.
    HypertetraWarp,
}

impl WarpCore {
    /// All warp cores in index order.
    pub const ALL: [Self; 3] = [Self::Identity, Self::HypersphereWarp, Self::HypertetraWarp];

    /// The core's index in `0..3`.
    #[inline]
    pub fn index(self) -> u32 {
        Self::ALL.iter().position(|&c| c == self).unwrap_or(0) as u32
    }

    /// Looks a core up by index; out-of-range indices wrap.
    #[inline]
    pub fn from_index(index: u32) -> Self {
        Self::ALL[(index % CORE_COUNT) as usize]
    }

    /// The shader function implementing this warp.
    pub fn shader_fn(self) -> &'static str {
        match self {
            Self::Identity => "warp_identity",
            Self::HypersphereWarp => "warp_hypersphere",
            Self::HypertetraWarp => "warp_hypertetra",
        }
    }
}

/// A `(core, base)` pair and its packed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryVariant {
    /// The warp applied to the projected 3D point.
    pub core: WarpCore,
    /// The lattice evaluated after warping.
    pub base: BaseLattice,
}

impl GeometryVariant {
    /// Packs the pair into its catalog index: `core·8 + base`.
    #[inline]
    pub fn encode(self) -> u32 {
        self.core.index() * BASE_COUNT + self.base.index()
    }

    /// Decodes a catalog index in `0..24` back into its pair.
    ///
    /// Total over the whole `u32` range: indices ≥ 24 wrap modulo 24, so
    /// decode never fails and `decode(encode(v)) == v` for every variant.
    #[inline]
    pub fn decode(index: u32) -> Self {
        let index = index % VARIANT_COUNT;
        Self {
            core: WarpCore::from_index(index / BASE_COUNT),
            base: BaseLattice::from_index(index % BASE_COUNT),
        }
    }

    /// Iterates all 24 variants in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..VARIANT_COUNT).map(Self::decode)
    }
}

impl fmt::Display for GeometryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.core {
            WarpCore::Identity => write!(f, "{:?}", self.base),
            core => write!(f, "{core:?}({:?})", self.base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_is_a_bijection() {
        let mut seen = [false; VARIANT_COUNT as usize];
        for core in WarpCore::ALL {
            for base in BaseLattice::ALL {
                let v = GeometryVariant { core, base };
                let index = v.encode();
                assert!(index < VARIANT_COUNT);
                assert!(!seen[index as usize], "duplicate index {index}");
                seen[index as usize] = true;
                assert_eq!(GeometryVariant::decode(index), v);
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn out_of_range_indices_wrap() {
        assert_eq!(GeometryVariant::decode(24), GeometryVariant::decode(0));
        assert_eq!(GeometryVariant::decode(31), GeometryVariant::decode(7));
    }

    #[test]
    fn index_ten_is_warped_sphere() {
        // 10 = 1·8 + 2 → hypersphere warp over the sphere lattice.
        let v = GeometryVariant::decode(10);
        assert_eq!(v.core, WarpCore::HypersphereWarp);
        assert_eq!(v.base, BaseLattice::Sphere);
    }

    #[test]
    fn shader_fn_names_are_distinct() {
        let mut names: Vec<&str> = BaseLattice::ALL.iter().map(|b| b.shader_fn()).collect();
        names.extend(WarpCore::ALL.iter().map(|c| c.shader_fn()));
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}
