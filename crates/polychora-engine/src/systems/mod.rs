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

//! The three system render adapters.
//!
//! Every adapter shares the same plumbing — compile the assembled
//! program for the backend family, own a uniform buffer, pack the
//! canonical record, draw — and differs only in its uniform-mapping
//! tweak, mirroring how the shader families differ only in their
//! `system_color` body.

mod faceted;
mod holographic;
mod quantum;

pub use faceted::FacetedRenderer;
pub use holographic::HolographicRenderer;
pub use quantum::QuantumRenderer;

use polychora_core::layer::LayerRole;
use polychora_core::params::ParameterSet;
use polychora_core::renderer::{
    BackendKind, GraphicsBackend, ProgramDescriptor, ProgramId, ProgramSource, RenderError,
    ResourceError, SystemRenderer, TextureId, UniformBufferId, VisualSystem,
};
use polychora_core::shader::{
    assemble_compute, assemble_fragment, vertex_source, ShaderLanguage, COMPUTE_ENTRY,
};
use polychora_core::uniform::{CanonicalUniforms, UniformInputs, UNIFORM_RECORD_SIZE};

/// Creates the adapter for `system` serving one layer role.
pub fn create_renderer(
    system: VisualSystem,
    backend: &mut dyn GraphicsBackend,
    role: LayerRole,
) -> Result<Box<dyn SystemRenderer>, RenderError> {
    let core = AdapterCore::new(system, role, backend)?;
    Ok(match system {
        VisualSystem::Faceted => Box::new(FacetedRenderer::from_core(core)),
        VisualSystem::Quantum => Box::new(QuantumRenderer::from_core(core)),
        VisualSystem::Holographic => Box::new(HolographicRenderer::from_core(core)),
    })
}

/// Converts HSV (hue in degrees) to linear RGB; used to populate the
/// per-layer tint uniform.
pub fn hue_to_rgb(hue_degrees: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = polychora_core::math::wrap(hue_degrees, 360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// The plumbing shared by all three adapters: one program and one
/// uniform buffer on the backend, plus the viewport.
#[derive(Debug)]
pub(crate) struct AdapterCore {
    system: VisualSystem,
    role: LayerRole,
    program: Option<ProgramId>,
    uniforms: Option<UniformBufferId>,
    width: u32,
    height: u32,
    active: bool,
}

impl AdapterCore {
    fn new(
        system: VisualSystem,
        role: LayerRole,
        backend: &mut dyn GraphicsBackend,
    ) -> Result<Self, RenderError> {
        let mut core = Self {
            system,
            role,
            program: None,
            uniforms: None,
            width: 1,
            height: 1,
            active: true,
        };
        core.create_resources(backend)?;
        Ok(core)
    }

    /// Compiles the assembled program that fits the backend family and
    /// allocates the uniform buffer.
    fn create_resources(&mut self, backend: &mut dyn GraphicsBackend) -> Result<(), RenderError> {
        let label = format!("{}/{}", self.system, self.role);
        let program = match backend.kind() {
            BackendKind::Compute => {
                let source = assemble_compute(self.system);
                backend.create_program(&ProgramDescriptor {
                    label: &label,
                    source: ProgramSource::Compute {
                        source: &source,
                        entry: COMPUTE_ENTRY,
                    },
                })?
            }
            _ => {
                let fragment = assemble_fragment(self.system, ShaderLanguage::Glsl);
                backend.create_program(&ProgramDescriptor {
                    label: &label,
                    source: ProgramSource::Raster {
                        vertex: vertex_source(ShaderLanguage::Glsl),
                        fragment: &fragment,
                        language: ShaderLanguage::Glsl,
                    },
                })?
            }
        };
        let uniforms = match backend.create_uniform_buffer(UNIFORM_RECORD_SIZE as u64) {
            Ok(id) => id,
            Err(e) => {
                // Do not leak the program when the second allocation
                // fails.
                let _ = backend.destroy_program(program);
                return Err(e.into());
            }
        };
        self.program = Some(program);
        self.uniforms = Some(uniforms);
        Ok(())
    }

    fn render_with(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        target: TextureId,
        params: &ParameterSet,
        inputs: &UniformInputs,
        tweak: impl FnOnce(&mut CanonicalUniforms),
    ) -> Result<(), RenderError> {
        if !self.active {
            return Ok(());
        }
        let (program, uniforms) = match (self.program, self.uniforms) {
            (Some(p), Some(u)) => (p, u),
            _ => return Err(ResourceError::ContextLost.into()),
        };
        let mut record = CanonicalUniforms::pack(params, inputs);
        record.role_intensity = self.role.tag() as f32;
        tweak(&mut record);
        backend.write_uniforms(uniforms, record.as_bytes())?;
        backend.draw(program, uniforms, target)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn rebuild(&mut self, backend: &mut dyn GraphicsBackend) -> Result<(), RenderError> {
        self.program = None;
        self.uniforms = None;
        self.create_resources(backend)
    }

    fn dispose(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some(program) = self.program.take() {
            if let Err(e) = backend.destroy_program(program) {
                log::debug!("{}/{}: program already gone: {e}", self.system, self.role);
            }
        }
        if let Some(uniforms) = self.uniforms.take() {
            if let Err(e) = backend.destroy_uniform_buffer(uniforms) {
                log::debug!("{}/{}: uniforms already gone: {e}", self.system, self.role);
            }
        }
    }
}

/// Implements the [`SystemRenderer`] boilerplate shared by the three
/// adapter types; each supplies only its uniform tweak.
macro_rules! impl_system_renderer {
    ($adapter:ty, $system:expr, $tweak:expr) => {
        impl $adapter {
            pub(crate) fn from_core(core: AdapterCore) -> Self {
                Self { core }
            }
        }

        impl SystemRenderer for $adapter {
            fn system(&self) -> VisualSystem {
                $system
            }

            fn resize(&mut self, width: u32, height: u32) {
                self.core.resize(width, height);
            }

            fn render(
                &mut self,
                backend: &mut dyn GraphicsBackend,
                target: TextureId,
                params: &ParameterSet,
                inputs: &UniformInputs,
            ) -> Result<(), RenderError> {
                let tweak: fn(&mut CanonicalUniforms) = $tweak;
                self.core.render_with(backend, target, params, inputs, tweak)
            }

            fn set_active(&mut self, active: bool) {
                self.core.active = active;
            }

            fn is_active(&self) -> bool {
                self.core.active
            }

            fn rebuild(&mut self, backend: &mut dyn GraphicsBackend) -> Result<(), RenderError> {
                self.core.rebuild(backend)
            }

            fn dispose(&mut self, backend: &mut dyn GraphicsBackend) {
                self.core.dispose(backend);
            }
        }
    };
}

pub(crate) use impl_system_renderer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_to_rgb_primaries() {
        let red = hue_to_rgb(0.0, 1.0, 1.0);
        assert!(red[0] > 0.99 && red[1] < 0.01 && red[2] < 0.01);
        let green = hue_to_rgb(120.0, 1.0, 1.0);
        assert!(green[1] > 0.99);
        let blue = hue_to_rgb(240.0, 1.0, 1.0);
        assert!(blue[2] > 0.99);
    }

    #[test]
    fn hue_to_rgb_desaturated_is_gray() {
        let gray = hue_to_rgb(200.0, 0.0, 0.5);
        assert!((gray[0] - 0.5).abs() < 1e-6);
        assert!((gray[1] - 0.5).abs() < 1e-6);
        assert!((gray[2] - 0.5).abs() < 1e-6);
    }
}
