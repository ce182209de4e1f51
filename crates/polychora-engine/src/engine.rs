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

//! The public engine handle.
//!
//! A thin facade over the orchestrator: hosts construct it from an
//! [`EngineConfig`], drive [`Engine::frame`] from their refresh
//! callback, and talk to it through canonical parameter names. There is
//! no global engine; whoever owns the handle owns the engine.

use crate::input::InputSample;
use crate::orchestrator::{
    EngineCommand, EngineState, FrameStats, InitError, Orchestrator, SwitchError,
};
use polychora_core::config::EngineConfig;
use polychora_core::event::EngineEvent;
use polychora_core::layer::{LayerRole, ProfileError, ProfileRecord, RelationshipEdge};
use polychora_core::params::{ParamError, ParamKey};
use polychora_core::renderer::{GraphicsBackend, VisualSystem};

/// Callback invoked after frames in which parameters changed.
pub type ParameterCallback = Box<dyn FnMut(&[ParamKey], u64)>;
/// Callback invoked when a system switch completes.
pub type SystemCallback = Box<dyn FnMut(VisualSystem)>;

/// The engine handle hosts own and drive.
pub struct Engine {
    orchestrator: Orchestrator,
    parameter_callbacks: Vec<ParameterCallback>,
    system_callbacks: Vec<SystemCallback>,
    pending_events: Vec<EngineEvent>,
}

impl Engine {
    /// Creates the engine: selects a backend per the config preference,
    /// verifies the shader contract, builds the configured profile and
    /// the initial system's adapters.
    pub fn initialize(config: EngineConfig) -> Result<Self, InitError> {
        let selection = polychora_infra::select_backend(config.backend_preference)
            .map_err(InitError::Backend)?;
        log::info!(
            "Engine: selected {:?} backend (attempted {:?}, {} ms)",
            selection.kind,
            selection.attempted,
            selection.selection_time_ms
        );
        Self::with_backend(config, selection.backend)
    }

    /// Creates the engine on a caller-provided backend.
    ///
    /// This is the embedding seam: tests drive the whole engine against
    /// the recording backend in [`crate::testing`], and unusual hosts
    /// can bring their own [`GraphicsBackend`].
    pub fn with_backend(
        config: EngineConfig,
        backend: Box<dyn GraphicsBackend>,
    ) -> Result<Self, InitError> {
        let orchestrator = Orchestrator::with_backend(&config, backend)?;
        Ok(Self {
            orchestrator,
            parameter_callbacks: Vec::new(),
            system_callbacks: Vec::new(),
            pending_events: Vec::new(),
        })
    }

    /// Runs one frame and dispatches callbacks for whatever it emitted.
    pub fn frame(&mut self, dt_seconds: f32) -> FrameStats {
        let stats = self.orchestrator.frame(dt_seconds);
        self.pump_events();
        stats
    }

    fn pump_events(&mut self) {
        for event in self.orchestrator.events().drain() {
            match &event {
                EngineEvent::ParameterChanged { keys, version } => {
                    for callback in &mut self.parameter_callbacks {
                        callback(keys, *version);
                    }
                }
                EngineEvent::SystemChanged { system } => {
                    for callback in &mut self.system_callbacks {
                        callback(*system);
                    }
                }
                _ => {}
            }
            self.pending_events.push(event);
        }
    }

    // --- Parameters ---

    /// Sets one parameter by canonical name (clamped/wrapped per its
    /// domain).
    pub fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), ParamError> {
        self.orchestrator.set_parameter(name, value)
    }

    /// Sets several parameters atomically under one version bump.
    pub fn batch_set(&mut self, entries: &[(&str, f32)]) -> Result<(), ParamError> {
        let owned: Vec<(String, f32)> = entries
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        // Validate names up front so the whole batch rejects cleanly.
        for (name, _) in &owned {
            if ParamKey::from_name(name).is_none() {
                return Err(ParamError::UnknownName(name.clone()));
            }
        }
        self.command_sender()
            .send(EngineCommand::BatchSet(owned))
            .ok();
        Ok(())
    }

    /// Reads one parameter by canonical name.
    pub fn get_parameter(&self, name: &str) -> Result<f32, ParamError> {
        self.orchestrator.store().get_by_name(name)
    }

    /// Redraws every parameter uniformly from its domain.
    pub fn randomize(&mut self) {
        self.command_sender().send(EngineCommand::Randomize).ok();
    }

    /// Restores every parameter default.
    pub fn reset(&mut self) {
        self.command_sender().send(EngineCommand::Reset).ok();
    }

    // --- Systems & profiles ---

    /// Requests a switch to the named system (crossfade at the next
    /// frame boundary).
    pub fn switch_system(&mut self, name: &str) -> Result<(), SwitchError> {
        let system = VisualSystem::from_name(name)
            .ok_or_else(|| SwitchError::UnknownSystem(name.to_string()))?;
        self.orchestrator.switch_system(system)
    }

    /// Reassigns one layer role to a different system renderer than its
    /// siblings (the uniform contract keeps them interchangeable).
    pub fn set_layer_system(&mut self, role: LayerRole, name: &str) -> Result<(), SwitchError> {
        let system = VisualSystem::from_name(name)
            .ok_or_else(|| SwitchError::UnknownSystem(name.to_string()))?;
        self.orchestrator.set_layer_system(role, system)
    }

    /// Replaces the relationship graph with a named profile at the next
    /// frame boundary.
    pub fn set_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        self.orchestrator.set_profile(name)
    }

    /// Replaces the relationship graph from a stored record at the next
    /// frame boundary.
    pub fn set_profile_record(&mut self, record: ProfileRecord) -> Result<(), ProfileError> {
        self.orchestrator.set_profile_record(record)
    }

    /// Replaces one follower's inbound relationship edge.
    pub fn set_relationship(
        &mut self,
        role: LayerRole,
        edge: RelationshipEdge,
    ) -> Result<(), ProfileError> {
        self.orchestrator.set_relationship(role, edge)
    }

    /// Moves the keystone role.
    pub fn set_keystone(&mut self, role: LayerRole) {
        self.orchestrator.set_keystone(role);
    }

    /// The current graph as a serializable profile record.
    pub fn get_layer_config(&self) -> ProfileRecord {
        self.orchestrator.layer_config()
    }

    // --- Inputs & lifecycle ---

    /// Posts a reactivity input sample (120 Hz aggregate clamp applies).
    pub fn push_input(&mut self, sample: InputSample) {
        self.command_sender()
            .send(EngineCommand::Input(sample))
            .ok();
    }

    /// Resizes the viewport at the next frame boundary.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.command_sender()
            .send(EngineCommand::Resize(width, height))
            .ok();
    }

    /// Simulates a GPU context loss (diagnostics and tests).
    pub fn simulate_context_loss(&mut self) {
        self.command_sender()
            .send(EngineCommand::SimulateContextLoss)
            .ok();
    }

    /// A clonable command sender for other threads; commands drain at
    /// frame boundaries on the render thread.
    pub fn command_sender(&self) -> flume::Sender<EngineCommand> {
        self.orchestrator.command_sender()
    }

    /// Registers a callback for parameter-change notifications.
    pub fn on_parameter_change(&mut self, callback: ParameterCallback) {
        self.parameter_callbacks.push(callback);
    }

    /// Registers a callback for completed system switches.
    pub fn on_system_change(&mut self, callback: SystemCallback) {
        self.system_callbacks.push(callback);
    }

    /// Drains every engine event emitted since the last drain (the
    /// callback surface sees them too).
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// The current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.orchestrator.state()
    }

    /// Statistics of the last completed frame.
    pub fn last_stats(&self) -> &FrameStats {
        self.orchestrator.last_stats()
    }

    /// Render-thread access to the orchestrator, for embedders that
    /// need more than the facade.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Releases every GPU resource. Idempotent; dropping the engine
    /// does the same.
    pub fn dispose(&mut self) {
        self.orchestrator.dispose();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.orchestrator.state())
            .finish_non_exhaustive()
    }
}
