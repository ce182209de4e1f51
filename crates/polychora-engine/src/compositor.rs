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

//! The five-layer compositor.
//!
//! Owns one [`LayerSlot`] per role (and a second, parallel set during a
//! crossfade), renders each role's derived parameters to its offscreen
//! target, and blends the stack back-to-front into the composite target.
//! Slots exclusively own their GPU resources: target texture via the
//! slot, program and uniform buffer via the slot's renderer.

use crate::systems::create_renderer;
use polychora_core::config::CompositorConfig;
use polychora_core::layer::LayerRole;
use polychora_core::params::ParameterSet;
use polychora_core::renderer::{
    CompositeLayer, GraphicsBackend, RenderError, SystemRenderer, TextureFormat, TextureId,
    VisualSystem,
};
use polychora_core::uniform::UniformInputs;
use std::collections::BTreeMap;

/// Reactivity values shared by every layer of a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInputs {
    /// Speed-scaled animation clock in seconds.
    pub time: f32,
    /// Smoothed pointer movement energy.
    pub mouse_intensity: f32,
    /// Decaying click impulse.
    pub click_intensity: f32,
    /// Audio band levels (bass, mid, high).
    pub audio: (f32, f32, f32),
}

/// One layer of the stack: a role, its offscreen target, its renderer
/// and its current derived parameters.
#[derive(Debug)]
pub struct LayerSlot {
    /// The compositing role.
    pub role: LayerRole,
    /// The slot's offscreen color target.
    pub target: TextureId,
    /// The adapter rendering this slot.
    pub renderer: Box<dyn SystemRenderer>,
    /// The derived parameter set rendered last.
    pub params: ParameterSet,
    /// Steady-state composite opacity (crossfade scales it further).
    pub opacity: f32,
}

/// The per-role geometry scale each slot feeds the `layerScale` uniform.
fn role_scale(role: LayerRole) -> f32 {
    match role {
        LayerRole::Background => 1.25,
        LayerRole::Shadow => 1.05,
        LayerRole::Content => 1.0,
        LayerRole::Highlight => 0.95,
        LayerRole::Accent => 0.85,
    }
}

/// The steady-state opacity each role composites at.
fn role_opacity(role: LayerRole) -> f32 {
    match role {
        LayerRole::Background => 1.0,
        LayerRole::Shadow => 0.65,
        LayerRole::Content => 1.0,
        LayerRole::Highlight => 0.75,
        LayerRole::Accent => 0.6,
    }
}

/// A full set of five slots rendering one system.
#[derive(Debug)]
pub struct AdapterSet {
    /// The system all five slots render.
    pub system: VisualSystem,
    slots: Vec<LayerSlot>,
}

impl AdapterSet {
    fn create(
        system: VisualSystem,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let mut slots = Vec::with_capacity(LayerRole::ALL.len());
        for role in LayerRole::ALL {
            let target = match backend.create_texture(width, height, TextureFormat::Rgba8Unorm) {
                Ok(id) => id,
                Err(e) => {
                    Self::dispose_slots(&mut slots, backend);
                    return Err(e.into());
                }
            };
            let mut renderer = match create_renderer(system, backend, role) {
                Ok(r) => r,
                Err(e) => {
                    let _ = backend.destroy_texture(target);
                    Self::dispose_slots(&mut slots, backend);
                    return Err(e);
                }
            };
            renderer.resize(width, height);
            slots.push(LayerSlot {
                role,
                target,
                renderer,
                params: ParameterSet::default(),
                opacity: role_opacity(role),
            });
        }
        Ok(Self { system, slots })
    }

    fn dispose_slots(slots: &mut Vec<LayerSlot>, backend: &mut dyn GraphicsBackend) {
        for mut slot in slots.drain(..) {
            slot.renderer.dispose(backend);
            if let Err(e) = backend.destroy_texture(slot.target) {
                log::debug!("layer target already gone: {e}");
            }
        }
    }

    fn render(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        derived: &BTreeMap<LayerRole, ParameterSet>,
        inputs: &FrameInputs,
        resolution: (f32, f32),
    ) -> Result<u32, RenderError> {
        let mut draws = 0;
        for slot in &mut self.slots {
            if let Some(params) = derived.get(&slot.role) {
                slot.params = *params;
            }
            let layer_inputs = UniformInputs {
                time: inputs.time,
                resolution,
                mouse_intensity: inputs.mouse_intensity,
                click_intensity: inputs.click_intensity,
                audio: inputs.audio,
                layer_scale: role_scale(slot.role),
                layer_opacity: slot.opacity,
                layer_color: [1.0, 1.0, 1.0],
                density_mult: 1.0,
                speed_mult: 1.0,
                role: slot.role.tag(),
            };
            slot.renderer
                .render(backend, slot.target, &slot.params, &layer_inputs)?;
            draws += 1;
        }
        Ok(draws)
    }

    fn composite_layers(&self, config: &CompositorConfig, fade: f32) -> Vec<CompositeLayer> {
        self.slots
            .iter()
            .map(|slot| CompositeLayer {
                texture: slot.target,
                opacity: slot.opacity * fade,
                blend: config.blend_for(slot.role),
            })
            .collect()
    }

    fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        for slot in &mut self.slots {
            let new_target = backend.create_texture(width, height, TextureFormat::Rgba8Unorm)?;
            if let Err(e) = backend.destroy_texture(slot.target) {
                log::debug!("stale layer target: {e}");
            }
            slot.target = new_target;
            slot.renderer.resize(width, height);
        }
        Ok(())
    }

    fn rebuild(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        for slot in &mut self.slots {
            slot.target = backend.create_texture(width, height, TextureFormat::Rgba8Unorm)?;
            slot.renderer.rebuild(backend)?;
            slot.renderer.resize(width, height);
        }
        Ok(())
    }

    /// The slot serving a role, for inspection.
    pub fn slot(&self, role: LayerRole) -> Option<&LayerSlot> {
        self.slots.iter().find(|s| s.role == role)
    }

    fn slot_mut(&mut self, role: LayerRole) -> Option<&mut LayerSlot> {
        self.slots.iter_mut().find(|s| s.role == role)
    }
}

/// The five-layer compositor and final composite target.
#[derive(Debug)]
pub struct MultiCanvasCompositor {
    config: CompositorConfig,
    width: u32,
    height: u32,
    active: AdapterSet,
    incoming: Option<AdapterSet>,
    composite_target: TextureId,
}

impl MultiCanvasCompositor {
    /// Creates the compositor with one adapter set for `system`.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        system: VisualSystem,
        config: CompositorConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let active = AdapterSet::create(system, backend, width, height)?;
        let composite_target =
            match backend.create_texture(width, height, TextureFormat::Rgba8Unorm) {
                Ok(id) => id,
                Err(e) => {
                    let mut active = active;
                    AdapterSet::dispose_slots(&mut active.slots, backend);
                    return Err(e.into());
                }
            };
        Ok(Self {
            config,
            width,
            height,
            active,
            incoming: None,
            composite_target,
        })
    }

    /// The system the active set renders.
    pub fn active_system(&self) -> VisualSystem {
        self.active.system
    }

    /// The incoming system during a crossfade.
    pub fn incoming_system(&self) -> Option<VisualSystem> {
        self.incoming.as_ref().map(|set| set.system)
    }

    /// The final composite texture.
    pub fn composite_target(&self) -> TextureId {
        self.composite_target
    }

    /// The active adapter set, for inspection.
    pub fn active_set(&self) -> &AdapterSet {
        &self.active
    }

    /// Spins up the parallel adapter set for a crossfade.
    pub fn begin_switch(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        to: VisualSystem,
    ) -> Result<(), RenderError> {
        let incoming = AdapterSet::create(to, backend, self.width, self.height)?;
        self.incoming = Some(incoming);
        Ok(())
    }

    /// Completes the crossfade: the previous set is disposed, the
    /// incoming set becomes active.
    pub fn finish_switch(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some(incoming) = self.incoming.take() {
            let mut old = std::mem::replace(&mut self.active, incoming);
            AdapterSet::dispose_slots(&mut old.slots, backend);
        }
    }

    /// Renders every slot (both sets during a fade) and composites.
    ///
    /// `fade` is the crossfade progress in [0, 1]; `None` outside a
    /// switch. Returns the number of layer draws issued.
    pub fn render_frame(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        derived: &BTreeMap<LayerRole, ParameterSet>,
        inputs: &FrameInputs,
        fade: Option<f32>,
    ) -> Result<u32, RenderError> {
        let resolution = (self.width as f32, self.height as f32);
        let mut draws = self
            .active
            .render(backend, derived, inputs, resolution)?;

        let mut layers = self
            .active
            .composite_layers(&self.config, 1.0 - fade.unwrap_or(0.0));
        if let Some(incoming) = &mut self.incoming {
            draws += incoming.render(backend, derived, inputs, resolution)?;
            layers.extend(incoming.composite_layers(&self.config, fade.unwrap_or(0.0)));
        }
        backend.composite(&layers, self.composite_target)?;
        Ok(draws)
    }

    /// Reassigns one role to a different system renderer.
    ///
    /// The uniform contract makes the slots interchangeable, so a role
    /// may run a different system than its siblings. The old renderer's
    /// resources are released before the swap is visible.
    pub fn set_layer_system(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        role: LayerRole,
        system: VisualSystem,
    ) -> Result<(), RenderError> {
        let (width, height) = (self.width, self.height);
        let slot = self
            .active
            .slot_mut(role)
            .ok_or_else(|| RenderError::Internal(format!("no slot for role '{role}'")))?;
        if slot.renderer.system() == system {
            return Ok(());
        }
        let mut renderer = create_renderer(system, backend, role)?;
        renderer.resize(width, height);
        let mut old = std::mem::replace(&mut slot.renderer, renderer);
        old.dispose(backend);
        Ok(())
    }

    /// Resizes every target (both sets during a fade).
    pub fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        self.width = width.max(1);
        self.height = height.max(1);
        self.active.resize(backend, self.width, self.height)?;
        if let Some(incoming) = &mut self.incoming {
            incoming.resize(backend, self.width, self.height)?;
        }
        let new_target = backend.create_texture(self.width, self.height, TextureFormat::Rgba8Unorm)?;
        if let Err(e) = backend.destroy_texture(self.composite_target) {
            log::debug!("stale composite target: {e}");
        }
        self.composite_target = new_target;
        Ok(())
    }

    /// Re-creates every GPU resource after a context restore.
    pub fn rebuild(&mut self, backend: &mut dyn GraphicsBackend) -> Result<(), RenderError> {
        self.active.rebuild(backend, self.width, self.height)?;
        if let Some(incoming) = &mut self.incoming {
            incoming.rebuild(backend, self.width, self.height)?;
        }
        self.composite_target =
            backend.create_texture(self.width, self.height, TextureFormat::Rgba8Unorm)?;
        Ok(())
    }

    /// Releases every slot and the composite target. Idempotent at the
    /// backend level (handles already gone just log).
    pub fn dispose(&mut self, backend: &mut dyn GraphicsBackend) {
        AdapterSet::dispose_slots(&mut self.active.slots, backend);
        if let Some(mut incoming) = self.incoming.take() {
            AdapterSet::dispose_slots(&mut incoming.slots, backend);
        }
        if let Err(e) = backend.destroy_texture(self.composite_target) {
            log::debug!("composite target already gone: {e}");
        }
    }

}
