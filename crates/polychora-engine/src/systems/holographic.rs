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

//! The Holographic system adapter: role-aware layered rendering.

use super::{hue_to_rgb, impl_system_renderer, AdapterCore};
use polychora_core::params::ParameterSet;
use polychora_core::renderer::{
    GraphicsBackend, RenderError, SystemRenderer, TextureId, VisualSystem,
};
use polychora_core::uniform::{CanonicalUniforms, UniformInputs};

/// Renders the Holographic system for one layer role.
///
/// The only adapter that populates the per-layer tint from parameter
/// state: when the compositor passes a plain white tint, the layer color
/// is derived from the hue so the glow stays in palette.
#[derive(Debug)]
pub struct HolographicRenderer {
    core: AdapterCore,
}

impl_system_renderer!(HolographicRenderer, VisualSystem::Holographic, |record| {
    if record.layer_color == [1.0, 1.0, 1.0] {
        record.layer_color = hue_to_rgb(record.hue, record.saturation, 1.0);
    }
});
