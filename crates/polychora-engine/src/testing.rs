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

//! Test support: a recording backend.
//!
//! [`NullBackend`] fulfils the full [`GraphicsBackend`] contract without
//! a GPU: it validates handles, enforces the frame lifecycle, keeps the
//! bytes of every uniform upload, and records every operation so tests
//! can assert ordering, leak-freedom and uniform contents.

use polychora_core::renderer::{
    BackendKind, CompositeLayer, GraphicsBackend, ProgramDescriptor, ProgramId, ProgramSource,
    RenderError, ResourceError, ShaderError, TextureFormat, TextureId, UniformBufferId,
};
use polychora_core::uniform::{CanonicalUniforms, UNIFORM_RECORD_SIZE};
use std::collections::{BTreeMap, BTreeSet};

/// One recorded backend operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    /// A program was compiled.
    CreateProgram(ProgramId, String),
    /// A program was destroyed.
    DestroyProgram(ProgramId),
    /// A uniform buffer was created.
    CreateBuffer(UniformBufferId),
    /// A uniform buffer was destroyed.
    DestroyBuffer(UniformBufferId),
    /// A texture was created.
    CreateTexture(TextureId, u32, u32),
    /// A texture was destroyed.
    DestroyTexture(TextureId),
    /// Uniform bytes were uploaded.
    WriteUniforms(UniformBufferId, usize),
    /// A frame opened.
    BeginFrame,
    /// A layer draw.
    Draw {
        /// The program drawn with.
        program: ProgramId,
        /// The uniform buffer bound.
        uniforms: UniformBufferId,
        /// The target drawn into.
        target: TextureId,
    },
    /// A composite pass.
    Composite {
        /// The composite target.
        target: TextureId,
        /// The composited layers, in submission order.
        layers: Vec<CompositeLayer>,
    },
    /// A frame closed.
    EndFrame,
    /// Context loss was signalled.
    ContextLoss,
    /// The context was restored.
    Restore,
    /// The backend was disposed.
    Dispose,
}

/// The recording [`GraphicsBackend`] test double.
#[derive(Debug, Default)]
pub struct NullBackend {
    /// Every operation, in submission order.
    pub ops: Vec<BackendOp>,
    /// Program labels (substring match) that should fail to compile.
    pub fail_program_labels: Vec<String>,
    /// When set, every draw fails (dropped-frame testing).
    pub fail_draws: bool,
    programs: BTreeMap<ProgramId, String>,
    buffers: BTreeMap<UniformBufferId, Vec<u8>>,
    textures: BTreeSet<TextureId>,
    next_program: usize,
    next_buffer: usize,
    next_texture: usize,
    last_written: Option<UniformBufferId>,
    lost: bool,
    frame_open: bool,
}

impl NullBackend {
    /// Creates an empty recording backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a texture outside the trait, for test scaffolding.
    pub fn create_texture_raw(&mut self, width: u32, height: u32) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id);
        self.ops.push(BackendOp::CreateTexture(id, width, height));
        id
    }

    /// Live (created, not destroyed) resource counts:
    /// `(programs, buffers, textures)`.
    pub fn live_counts(&self) -> (usize, usize, usize) {
        (self.programs.len(), self.buffers.len(), self.textures.len())
    }

    /// The labels of all live programs.
    pub fn live_program_labels(&self) -> Vec<String> {
        self.programs.values().cloned().collect()
    }

    /// Decodes the most recently written uniform buffer as the
    /// canonical record.
    pub fn last_uniforms_record(&self) -> Option<CanonicalUniforms> {
        self.uniforms_record(self.last_written?)
    }

    /// Decodes a specific uniform buffer as the canonical record.
    pub fn uniforms_record(&self, id: UniformBufferId) -> Option<CanonicalUniforms> {
        let bytes = self.buffers.get(&id)?;
        if bytes.len() < UNIFORM_RECORD_SIZE {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&bytes[..UNIFORM_RECORD_SIZE]))
    }

    /// Every composite op recorded so far.
    pub fn composites(&self) -> Vec<&BackendOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, BackendOp::Composite { .. }))
            .collect()
    }

    fn guard_lost(&self) -> Result<(), ResourceError> {
        if self.lost {
            Err(ResourceError::ContextLost)
        } else {
            Ok(())
        }
    }
}

impl GraphicsBackend for NullBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Null
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor<'_>,
    ) -> Result<ProgramId, ResourceError> {
        self.guard_lost()?;
        if self
            .fail_program_labels
            .iter()
            .any(|needle| descriptor.label.contains(needle.as_str()))
        {
            return Err(ShaderError::CompilationFailed {
                label: descriptor.label.to_string(),
                details: "forced failure (test)".to_string(),
            }
            .into());
        }
        // Exercise both descriptor shapes so adapters can't hand the
        // wrong family to a backend unnoticed.
        match descriptor.source {
            ProgramSource::Raster { vertex, fragment, .. } => {
                debug_assert!(!vertex.is_empty() && !fragment.is_empty());
            }
            ProgramSource::Compute { source, entry } => {
                debug_assert!(!source.is_empty() && !entry.is_empty());
            }
        }
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(id, descriptor.label.to_string());
        self.ops
            .push(BackendOp::CreateProgram(id, descriptor.label.to_string()));
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        if self.programs.remove(&id).is_none() {
            return Err(ResourceError::InvalidHandle);
        }
        self.ops.push(BackendOp::DestroyProgram(id));
        Ok(())
    }

    fn create_uniform_buffer(&mut self, size: u64) -> Result<UniformBufferId, ResourceError> {
        self.guard_lost()?;
        let id = UniformBufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, vec![0; size as usize]);
        self.ops.push(BackendOp::CreateBuffer(id));
        Ok(id)
    }

    fn write_uniforms(&mut self, id: UniformBufferId, data: &[u8]) -> Result<(), ResourceError> {
        self.guard_lost()?;
        let buffer = self.buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle)?;
        if data.len() > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer[..data.len()].copy_from_slice(data);
        self.last_written = Some(id);
        self.ops.push(BackendOp::WriteUniforms(id, data.len()));
        Ok(())
    }

    fn destroy_uniform_buffer(&mut self, id: UniformBufferId) -> Result<(), ResourceError> {
        if self.buffers.remove(&id).is_none() {
            return Err(ResourceError::InvalidHandle);
        }
        self.ops.push(BackendOp::DestroyBuffer(id));
        Ok(())
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        _format: TextureFormat,
    ) -> Result<TextureId, ResourceError> {
        self.guard_lost()?;
        Ok(self.create_texture_raw(width, height))
    }

    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        if !self.textures.remove(&id) {
            return Err(ResourceError::InvalidHandle);
        }
        self.ops.push(BackendOp::DestroyTexture(id));
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        if self.frame_open {
            return Err(RenderError::RenderingFailed("frame already open".into()));
        }
        self.frame_open = true;
        self.ops.push(BackendOp::BeginFrame);
        Ok(())
    }

    fn draw(
        &mut self,
        program: ProgramId,
        uniforms: UniformBufferId,
        target: TextureId,
    ) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        if !self.frame_open {
            return Err(RenderError::RenderingFailed("draw outside a frame".into()));
        }
        if self.fail_draws {
            return Err(RenderError::RenderingFailed("forced draw failure (test)".into()));
        }
        if !self.programs.contains_key(&program)
            || !self.buffers.contains_key(&uniforms)
            || !self.textures.contains(&target)
        {
            return Err(ResourceError::InvalidHandle.into());
        }
        self.ops.push(BackendOp::Draw {
            program,
            uniforms,
            target,
        });
        Ok(())
    }

    fn composite(
        &mut self,
        layers: &[CompositeLayer],
        target: TextureId,
    ) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        if !self.frame_open {
            return Err(RenderError::RenderingFailed(
                "composite outside a frame".into(),
            ));
        }
        for layer in layers {
            if !self.textures.contains(&layer.texture) {
                return Err(ResourceError::InvalidHandle.into());
            }
        }
        if !self.textures.contains(&target) {
            return Err(ResourceError::InvalidHandle.into());
        }
        self.ops.push(BackendOp::Composite {
            target,
            layers: layers.to_vec(),
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        if !self.frame_open {
            return Err(RenderError::RenderingFailed(
                "end_frame without begin_frame".into(),
            ));
        }
        self.frame_open = false;
        self.ops.push(BackendOp::EndFrame);
        Ok(())
    }

    fn handle_context_loss(&mut self) {
        self.lost = true;
        self.frame_open = false;
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
        self.last_written = None;
        self.ops.push(BackendOp::ContextLoss);
    }

    fn restore(&mut self) -> Result<(), RenderError> {
        self.lost = false;
        self.ops.push(BackendOp::Restore);
        Ok(())
    }

    fn context_lost(&self) -> bool {
        self.lost
    }

    fn supports_feature(&self, feature: &str) -> bool {
        feature == "recording"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn dispose(&mut self) {
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
        self.ops.push(BackendOp::Dispose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_enforced() {
        let mut backend = NullBackend::new();
        let target = backend.create_texture_raw(8, 8);
        let program = backend
            .create_program(&ProgramDescriptor {
                label: "test",
                source: ProgramSource::Compute {
                    source: "fn x() {}",
                    entry: "x",
                },
            })
            .unwrap();
        let buffer = backend.create_uniform_buffer(16).unwrap();

        // Draw before begin_frame fails.
        assert!(backend.draw(program, buffer, target).is_err());
        backend.begin_frame().unwrap();
        backend.draw(program, buffer, target).unwrap();
        backend.end_frame().unwrap();
        assert!(backend.end_frame().is_err());
    }

    #[test]
    fn destroyed_handles_are_invalid() {
        let mut backend = NullBackend::new();
        let buffer = backend.create_uniform_buffer(16).unwrap();
        backend.destroy_uniform_buffer(buffer).unwrap();
        assert!(backend.destroy_uniform_buffer(buffer).is_err());
        assert!(backend.write_uniforms(buffer, &[0; 4]).is_err());
    }

    #[test]
    fn context_loss_invalidates_everything() {
        let mut backend = NullBackend::new();
        let buffer = backend.create_uniform_buffer(16).unwrap();
        backend.handle_context_loss();
        assert!(backend.context_lost());
        assert!(backend.write_uniforms(buffer, &[0; 4]).is_err());
        assert!(backend.create_uniform_buffer(16).is_err());
        backend.restore().unwrap();
        assert!(backend.create_uniform_buffer(16).is_ok());
    }
}
