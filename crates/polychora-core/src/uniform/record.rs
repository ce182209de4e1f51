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

//! The packed uniform record and its construction from parameter state.

use crate::params::ParameterSet;
use bytemuck::{Pod, Zeroable};

/// The canonical uniform buffer contents, bit-exact.
///
/// Field order *is* the wire layout (`#[repr(C)]`, all 4-byte scalars, the
/// vec2 8-aligned by construction). Offsets 0..96 are normative and
/// identical for both backends; the trailing block carries the per-layer
/// fields and the integer-encoded layer role tag.
///
/// `layerColor` crosses the boundary as three scalars because a `vec3` at
/// byte offset 108 is unrepresentable in either shader language's uniform
/// layout rules.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CanonicalUniforms {
    /// Animation clock in seconds, pre-multiplied by the speed parameter.
    pub time: f32,
    /// Layout padding; always zero.
    pub _pad0: f32,
    /// Viewport size in pixels.
    pub resolution: [f32; 2],
    /// Packed geometry variant index as a float (shaders truncate).
    pub geometry: f32,
    /// Rotation angle, XY plane.
    pub rot4d_xy: f32,
    /// Rotation angle, XZ plane.
    pub rot4d_xz: f32,
    /// Rotation angle, YZ plane.
    pub rot4d_yz: f32,
    /// Rotation angle, XW plane.
    pub rot4d_xw: f32,
    /// Rotation angle, YW plane.
    pub rot4d_yw: f32,
    /// Rotation angle, ZW plane.
    pub rot4d_zw: f32,
    /// Projection dimension blend.
    pub dimension: f32,
    /// Lattice cell frequency.
    pub grid_density: f32,
    /// Warp interpolation factor.
    pub morph_factor: f32,
    /// Stochastic displacement amount.
    pub chaos: f32,
    /// Animation time multiplier.
    pub speed: f32,
    /// Base hue in degrees (0..360; adapters rescale where their shader
    /// family expects normalized hue).
    pub hue: f32,
    /// Output intensity.
    pub intensity: f32,
    /// Color saturation.
    pub saturation: f32,
    /// Smoothed pointer movement energy.
    pub mouse_intensity: f32,
    /// Decaying click/tap impulse.
    pub click_intensity: f32,
    /// Low audio band level.
    pub bass: f32,
    /// Mid audio band level.
    pub mid: f32,
    /// High audio band level.
    pub high: f32,
    /// Per-layer geometry scale.
    pub layer_scale: f32,
    /// Per-layer composite opacity.
    pub layer_opacity: f32,
    /// Layout padding; always zero.
    pub _pad1: f32,
    /// Per-layer tint as three scalars (R, G, B).
    pub layer_color: [f32; 3],
    /// Per-layer density multiplier.
    pub density_mult: f32,
    /// Per-layer speed multiplier.
    pub speed_mult: f32,
    /// Integer-encoded layer role (0..=4); shaders compare by equality
    /// after truncation.
    pub role_intensity: f32,
    /// Trailing padding to the next 16-byte boundary.
    pub _pad2: [f32; 3],
}

/// The size of the canonical record in bytes.
pub const UNIFORM_RECORD_SIZE: usize = std::mem::size_of::<CanonicalUniforms>();

/// Everything a uniform record needs beyond the parameter set itself:
/// frame clock, viewport, reactivity inputs and the per-layer fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformInputs {
    /// Animation clock in seconds (already speed-scaled by the caller).
    pub time: f32,
    /// Viewport size in pixels.
    pub resolution: (f32, f32),
    /// Smoothed pointer movement energy, [0, 1].
    pub mouse_intensity: f32,
    /// Decaying click impulse, [0, 1].
    pub click_intensity: f32,
    /// Audio band levels, [0, 1] each.
    pub audio: (f32, f32, f32),
    /// Per-layer geometry scale.
    pub layer_scale: f32,
    /// Per-layer composite opacity.
    pub layer_opacity: f32,
    /// Per-layer tint.
    pub layer_color: [f32; 3],
    /// Per-layer density multiplier.
    pub density_mult: f32,
    /// Per-layer speed multiplier.
    pub speed_mult: f32,
    /// Integer-encoded layer role (0..=4).
    pub role: u32,
}

impl Default for UniformInputs {
    fn default() -> Self {
        Self {
            time: 0.0,
            resolution: (1.0, 1.0),
            mouse_intensity: 0.0,
            click_intensity: 0.0,
            audio: (0.0, 0.0, 0.0),
            layer_scale: 1.0,
            layer_opacity: 1.0,
            layer_color: [1.0, 1.0, 1.0],
            density_mult: 1.0,
            speed_mult: 1.0,
            role: 2, // Content
        }
    }
}

impl CanonicalUniforms {
    /// Builds the record from a (valid) parameter set and frame inputs.
    ///
    /// This is the single mapping from parameter names to uniform slots;
    /// system adapters apply their per-shader tweaks *after* this, never
    /// instead of it.
    pub fn pack(params: &ParameterSet, inputs: &UniformInputs) -> Self {
        Self {
            time: inputs.time,
            _pad0: 0.0,
            resolution: [inputs.resolution.0, inputs.resolution.1],
            geometry: params.geometry as f32,
            rot4d_xy: params.rotation[0],
            rot4d_xz: params.rotation[1],
            rot4d_yz: params.rotation[2],
            rot4d_xw: params.rotation[3],
            rot4d_yw: params.rotation[4],
            rot4d_zw: params.rotation[5],
            dimension: params.dimension,
            grid_density: params.grid_density,
            morph_factor: params.morph_factor,
            chaos: params.chaos,
            speed: params.speed,
            hue: params.hue,
            intensity: params.intensity,
            saturation: params.saturation,
            mouse_intensity: inputs.mouse_intensity,
            click_intensity: inputs.click_intensity,
            bass: inputs.audio.0,
            mid: inputs.audio.1,
            high: inputs.audio.2,
            layer_scale: inputs.layer_scale,
            layer_opacity: inputs.layer_opacity,
            _pad1: 0.0,
            layer_color: inputs.layer_color,
            density_mult: inputs.density_mult,
            speed_mult: inputs.speed_mult,
            role_intensity: inputs.role as f32,
            _pad2: [0.0; 3],
        }
    }

    /// The record as the exact bytes both backends upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    /// The §6 layout table, locked by offset. These are the normative
    /// positions; moving any field is a wire-format break.
    #[test]
    fn canonical_offsets() {
        assert_eq!(offset_of!(CanonicalUniforms, time), 0);
        assert_eq!(offset_of!(CanonicalUniforms, resolution), 8);
        assert_eq!(offset_of!(CanonicalUniforms, geometry), 16);
        assert_eq!(offset_of!(CanonicalUniforms, rot4d_xy), 20);
        assert_eq!(offset_of!(CanonicalUniforms, rot4d_zw), 40);
        assert_eq!(offset_of!(CanonicalUniforms, dimension), 44);
        assert_eq!(offset_of!(CanonicalUniforms, grid_density), 48);
        assert_eq!(offset_of!(CanonicalUniforms, speed), 60);
        assert_eq!(offset_of!(CanonicalUniforms, hue), 64);
        assert_eq!(offset_of!(CanonicalUniforms, intensity), 68);
        assert_eq!(offset_of!(CanonicalUniforms, saturation), 72);
        assert_eq!(offset_of!(CanonicalUniforms, click_intensity), 80);
        assert_eq!(offset_of!(CanonicalUniforms, high), 92);
        assert_eq!(offset_of!(CanonicalUniforms, layer_scale), 96);
        assert_eq!(offset_of!(CanonicalUniforms, layer_color), 108);
        assert_eq!(offset_of!(CanonicalUniforms, density_mult), 120);
        assert_eq!(offset_of!(CanonicalUniforms, speed_mult), 124);
    }

    #[test]
    fn record_is_a_16_byte_multiple() {
        assert_eq!(UNIFORM_RECORD_SIZE % 16, 0);
        assert_eq!(UNIFORM_RECORD_SIZE, 144);
    }

    #[test]
    fn pack_reflects_parameters() {
        let mut params = ParameterSet::default();
        params.set(crate::params::ParamKey::Hue, 200.0);
        params.set(crate::params::ParamKey::Geometry, 10.0);
        let u = CanonicalUniforms::pack(&params, &UniformInputs::default());
        assert_eq!(u.hue, 200.0);
        assert_eq!(u.geometry, 10.0);
        assert_eq!(u.role_intensity, 2.0);
        assert_eq!(u.as_bytes().len(), UNIFORM_RECORD_SIZE);
    }
}
