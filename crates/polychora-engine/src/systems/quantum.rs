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

//! The Quantum system adapter: interference-dense rendering.

use super::{impl_system_renderer, AdapterCore};
use polychora_core::params::ParameterSet;
use polychora_core::renderer::{
    GraphicsBackend, RenderError, SystemRenderer, TextureId, VisualSystem,
};
use polychora_core::uniform::{CanonicalUniforms, UniformInputs};

/// Renders the Quantum system for one layer role.
///
/// The Quantum shader family historically consumes hue in [0, 1); the
/// rescale from the canonical 0..360 lives here, in the uniform-mapping
/// step, and nowhere else.
#[derive(Debug)]
pub struct QuantumRenderer {
    core: AdapterCore,
}

impl_system_renderer!(QuantumRenderer, VisualSystem::Quantum, |record| {
    record.hue /= 360.0;
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullBackend;
    use polychora_core::layer::LayerRole;
    use polychora_core::uniform::UniformInputs;

    #[test]
    fn quantum_rescales_hue_in_uniforms() {
        let mut backend = NullBackend::new();
        let mut renderer =
            crate::systems::create_renderer(VisualSystem::Quantum, &mut backend, LayerRole::Content)
                .unwrap();
        let target = backend.create_texture_raw(64, 64);
        let mut params = ParameterSet::default();
        params.set(polychora_core::params::ParamKey::Hue, 180.0);
        backend.begin_frame().unwrap();
        renderer
            .render(&mut backend, target, &params, &UniformInputs::default())
            .unwrap();
        backend.end_frame().unwrap();

        let record = backend.last_uniforms_record().expect("uniforms uploaded");
        assert!((record.hue - 0.5).abs() < 1e-6);
    }
}
