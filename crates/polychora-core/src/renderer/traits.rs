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

//! The backend and system-renderer trait contracts.

use super::api::{
    BackendKind, CompositeLayer, ProgramDescriptor, ProgramId, TextureFormat, TextureId,
    UniformBufferId,
};
use super::error::{RenderError, ResourceError};
use super::VisualSystem;
use crate::params::ParameterSet;
use crate::uniform::UniformInputs;
use std::fmt::Debug;

/// Defines the abstract interface for a graphics backend.
///
/// This trait is the single point of interaction with the underlying GPU
/// API. Both concrete backends (rasterization and compute) implement it;
/// system renderers and the compositor consume it exclusively.
///
/// Ownership and threading contract: a backend instance is owned by the
/// render thread and is not `Send` by requirement — cross-thread callers
/// post commands through the engine's command queue, which is drained at
/// frame boundaries on the owning thread. Within one frame, operations
/// submitted for the same layer execute in submission order.
pub trait GraphicsBackend: Debug {
    /// Which backend family this is.
    fn kind(&self) -> BackendKind;

    // --- Resource Management ---

    /// Compiles a program from a descriptor.
    ///
    /// # Errors
    /// Returns a [`ResourceError`] if the source is invalid, fails to
    /// compile, or does not fit this backend family.
    fn create_program(&mut self, descriptor: &ProgramDescriptor<'_>)
        -> Result<ProgramId, ResourceError>;

    /// Destroys a program, releasing its GPU resources.
    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError>;

    /// Creates a uniform buffer of `size` bytes.
    fn create_uniform_buffer(&mut self, size: u64) -> Result<UniformBufferId, ResourceError>;

    /// Uploads `data` into a uniform buffer, starting at offset zero.
    fn write_uniforms(&mut self, id: UniformBufferId, data: &[u8]) -> Result<(), ResourceError>;

    /// Destroys a uniform buffer.
    fn destroy_uniform_buffer(&mut self, id: UniformBufferId) -> Result<(), ResourceError>;

    /// Creates an offscreen texture usable as a render target and a
    /// composite source.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError>;

    // --- Frame Lifecycle ---

    /// Opens a frame. Draw and composite calls are only valid between
    /// `begin_frame` and `end_frame`.
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Runs `program` with `uniforms` over every pixel of `target`.
    fn draw(
        &mut self,
        program: ProgramId,
        uniforms: UniformBufferId,
        target: TextureId,
    ) -> Result<(), RenderError>;

    /// Blends `layers` back-to-front into `target`.
    fn composite(&mut self, layers: &[CompositeLayer], target: TextureId)
        -> Result<(), RenderError>;

    /// Closes the frame and submits the recorded work.
    fn end_frame(&mut self) -> Result<(), RenderError>;

    // --- Context Loss ---

    /// Marks every program, buffer and texture invalid. Subsequent
    /// resource operations fail with [`ResourceError::ContextLost`] until
    /// [`GraphicsBackend::restore`] succeeds.
    fn handle_context_loss(&mut self);

    /// Re-creates the backend's internal context after a loss. Resource
    /// *contents* are re-created by the owners (renderers re-compile
    /// programs, the frame loop re-uploads uniforms).
    fn restore(&mut self) -> Result<(), RenderError>;

    /// True while the context is lost and not yet restored.
    fn context_lost(&self) -> bool;

    // --- Introspection & Teardown ---

    /// Checks if a named optional capability is supported.
    fn supports_feature(&self, feature: &str) -> bool;

    /// Releases every resource this backend still holds. Idempotent, and
    /// guaranteed to run the release path even after context loss.
    fn dispose(&mut self);

    /// Downcast to `Any` for backend-specific access.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// The per-system render adapter contract.
///
/// One adapter instance exists per (system, layer role); it owns its
/// program and uniform buffer on the backend and maps parameter state to
/// uniform bytes per the canonical contract. All three systems implement
/// this identically except for their shader `main` and the optional
/// uniforms they populate.
pub trait SystemRenderer: Debug {
    /// The system this adapter renders.
    fn system(&self) -> VisualSystem;

    /// Updates the adapter's notion of the viewport.
    fn resize(&mut self, width: u32, height: u32);

    /// Renders one layer into `target` for the given parameter state.
    fn render(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        target: TextureId,
        params: &ParameterSet,
        inputs: &UniformInputs,
    ) -> Result<(), RenderError>;

    /// Toggles whether this adapter participates in frames (inactive
    /// adapters keep their resources but skip rendering).
    fn set_active(&mut self, active: bool);

    /// Whether the adapter currently participates in frames.
    fn is_active(&self) -> bool;

    /// Re-creates the adapter's GPU resources after a context loss, from
    /// canonical shader/parameter state.
    fn rebuild(&mut self, backend: &mut dyn GraphicsBackend) -> Result<(), RenderError>;

    /// Releases the adapter's GPU resources. Idempotent.
    fn dispose(&mut self, backend: &mut dyn GraphicsBackend);
}
