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

//! The engine orchestrator: state machine, frame loop and fan-in.
//!
//! Single-threaded and cooperative. Everything externally visible is a
//! command posted to the queue; the queue is drained once per frame, in
//! order, before derivation, so within a frame: parameter updates apply
//! before derivation, derivation before render, render before composite.

use crate::compositor::{FrameInputs, MultiCanvasCompositor};
use crate::input::{InputRateLimiter, InputSample, ReactivityState};
use polychora_core::config::{CompositorConfig, EngineConfig};
use polychora_core::event::{EngineEvent, EventBus};
use polychora_core::layer::{LayerRelationshipGraph, LayerRole, ProfileError, RelationshipEdge};
use polychora_core::layer::{DerivationState, ProfileRecord};
use polychora_core::params::{ParamError, ParamKey, ParameterStore};
use polychora_core::renderer::{GraphicsBackend, RenderError, VisualSystem};
use polychora_infra::VerifierError;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

/// States of the orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineState {
    /// No backend yet.
    Uninitialized,
    /// Backend created and shaders verified; no system active yet.
    ///
    /// [`Orchestrator::ready`] lands here; [`Orchestrator::activate`]
    /// leaves it. A failed activation falls back to this state with the
    /// failed system disabled, so another system can be brought up.
    Ready,
    /// One system rendering.
    Active(VisualSystem),
    /// Two adapter sets rendering while composite opacity interpolates.
    Crossfade {
        /// The system fading out.
        from: VisualSystem,
        /// The system fading in.
        to: VisualSystem,
        /// Elapsed fade time in milliseconds.
        elapsed_ms: f32,
    },
}

/// Per-frame statistics, in the shape hosts chart.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    /// A sequential counter for rendered frames.
    pub frame_number: u64,
    /// CPU time spent draining commands and deriving parameters.
    pub cpu_preparation_time_ms: f32,
    /// CPU time spent recording and submitting the frame.
    pub cpu_render_submission_time_ms: f32,
    /// The number of layer draws encoded for the frame.
    pub draw_calls: u32,
    /// True when the frame was dropped by a render failure.
    pub dropped: bool,
    /// The parameter store version the frame rendered.
    pub store_version: u64,
}

/// A failed `initialize`.
#[derive(Debug)]
pub enum InitError {
    /// The shader-sync verifier rejected the assembled programs.
    Verifier(VerifierError),
    /// No backend could be created.
    Backend(RenderError),
    /// The configured profile name is unknown.
    Profile(ProfileError),
    /// The initial system could not create its resources.
    System {
        /// The system that failed.
        system: VisualSystem,
        /// The underlying failure.
        source: RenderError,
    },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Verifier(e) => write!(f, "Shader verification failed: {e}"),
            InitError::Backend(e) => write!(f, "Backend initialization failed: {e}"),
            InitError::Profile(e) => write!(f, "Profile configuration failed: {e}"),
            InitError::System { system, source } => {
                write!(f, "The initial system '{system}' failed to initialize: {source}")
            }
        }
    }
}

impl std::error::Error for InitError {}

/// A rejected `switch_system`.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchError {
    /// The name does not match a system.
    UnknownSystem(String),
    /// The target system failed earlier and is disabled.
    SystemDisabled(VisualSystem),
    /// A crossfade is already running; it always completes first.
    SwitchInProgress,
    /// The target is already active.
    AlreadyActive(VisualSystem),
    /// No system is active (the orchestrator is still `Ready` or was
    /// disposed).
    NotActive,
}

impl fmt::Display for SwitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchError::UnknownSystem(name) => write!(f, "Unknown system '{name}'"),
            SwitchError::SystemDisabled(system) => {
                write!(f, "System '{system}' is disabled after an earlier failure")
            }
            SwitchError::SwitchInProgress => {
                write!(f, "A system switch is already in progress")
            }
            SwitchError::AlreadyActive(system) => {
                write!(f, "System '{system}' is already active")
            }
            SwitchError::NotActive => {
                write!(f, "No system is active yet")
            }
        }
    }
}

impl std::error::Error for SwitchError {}

/// Commands posted to the orchestrator from any thread and drained at
/// frame boundaries on the render thread.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Set one parameter by canonical name.
    SetParameter(String, f32),
    /// Set several parameters under one version bump.
    BatchSet(Vec<(String, f32)>),
    /// Redraw every parameter from its domain.
    Randomize,
    /// Restore parameter defaults.
    Reset,
    /// Replace the relationship graph with a named profile.
    SetProfile(String),
    /// Replace the relationship graph from a record.
    SetProfileRecord(ProfileRecord),
    /// Replace one follower's inbound edge.
    SetRelationship(LayerRole, RelationshipEdge),
    /// Move the keystone.
    SetKeystone(LayerRole),
    /// A reactivity input sample.
    Input(InputSample),
    /// Resize the viewport.
    Resize(u32, u32),
    /// Simulate a GPU context loss (testing and diagnostics).
    SimulateContextLoss,
}

/// Owns every core subsystem and drives the frame loop.
pub struct Orchestrator {
    backend: Box<dyn GraphicsBackend>,
    store: ParameterStore,
    graph: LayerRelationshipGraph,
    derivation: DerivationState,
    /// `None` exactly while the state is `Ready`/`Uninitialized`.
    compositor: Option<MultiCanvasCompositor>,
    compositor_config: CompositorConfig,
    viewport: (u32, u32),
    state: EngineState,
    events: EventBus<EngineEvent>,
    commands_tx: flume::Sender<EngineCommand>,
    commands_rx: flume::Receiver<EngineCommand>,
    reactivity: ReactivityState,
    input_limiter: InputRateLimiter,
    pending_profile: Option<LayerRelationshipGraph>,
    pending_switch: Option<VisualSystem>,
    disabled_systems: BTreeSet<VisualSystem>,
    clock_seconds: f32,
    frame_number: u64,
    last_stats: FrameStats,
    restore_pending: bool,
    /// Set on the frame the loss lands; that frame shows the previous
    /// blit (dropped) and restore runs the frame after.
    just_lost: bool,
    disposed: bool,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("frame_number", &self.frame_number)
            .field("store_version", &self.store.version())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Builds the orchestrator and activates the configured initial
    /// system: [`Orchestrator::ready`] then [`Orchestrator::activate`]
    /// back to back, so the `Ready` state is passed through rather than
    /// returned.
    pub fn with_backend(
        config: &EngineConfig,
        backend: Box<dyn GraphicsBackend>,
    ) -> Result<Self, InitError> {
        // On an activation error the orchestrator (and its backend) drop
        // here, which runs the dispose path.
        let mut orchestrator = Self::ready(config, backend)?;
        orchestrator.activate(config.initial_system)?;
        Ok(orchestrator)
    }

    /// Brings the orchestrator up in the `Ready` state: backend owned,
    /// shader contract verified, profile built, no adapter sets yet.
    ///
    /// Runs the shader-sync verifier first; a failing contract never
    /// reaches the GPU.
    pub fn ready(
        config: &EngineConfig,
        backend: Box<dyn GraphicsBackend>,
    ) -> Result<Self, InitError> {
        let matrix = polychora_infra::verify_shader_sync().map_err(InitError::Verifier)?;
        log::debug!(
            "Shader sync verified over {} programs",
            matrix.rows().len()
        );

        let graph =
            LayerRelationshipGraph::profile(&config.profile_name).map_err(InitError::Profile)?;

        let store = ParameterStore::new();
        let derivation = DerivationState::snapped_to(store.current());
        let (commands_tx, commands_rx) = flume::unbounded();
        log::info!(
            "Orchestrator ready: profile '{}', {}x{}",
            config.profile_name,
            config.viewport.0,
            config.viewport.1
        );
        Ok(Self {
            backend,
            store,
            graph,
            derivation,
            compositor: None,
            compositor_config: config.compositor.clone(),
            viewport: (config.viewport.0.max(1), config.viewport.1.max(1)),
            state: EngineState::Ready,
            events: EventBus::new(),
            commands_tx,
            commands_rx,
            reactivity: ReactivityState::default(),
            input_limiter: InputRateLimiter::new(),
            pending_profile: None,
            pending_switch: None,
            disabled_systems: BTreeSet::new(),
            clock_seconds: 0.0,
            frame_number: 0,
            last_stats: FrameStats::default(),
            restore_pending: false,
            just_lost: false,
            disposed: false,
        })
    }

    /// Transitions `Ready` → `Active(system)` by creating the system's
    /// adapter sets.
    ///
    /// A failure disables the system and leaves the orchestrator in
    /// `Ready`, so a different system can still be activated on the same
    /// backend.
    pub fn activate(&mut self, system: VisualSystem) -> Result<(), InitError> {
        if !matches!(self.state, EngineState::Ready) {
            log::debug!("activate({system}) ignored: state is {:?}", self.state);
            return Ok(());
        }
        if self.disabled_systems.contains(&system) {
            return Err(InitError::System {
                system,
                source: RenderError::InitializationFailed(
                    "system disabled after an earlier failure".into(),
                ),
            });
        }
        let (width, height) = self.viewport;
        match MultiCanvasCompositor::new(
            &mut *self.backend,
            system,
            self.compositor_config.clone(),
            width,
            height,
        ) {
            Ok(compositor) => {
                self.compositor = Some(compositor);
                self.derivation.reset(&self.store.snapshot());
                self.state = EngineState::Active(system);
                log::info!("Orchestrator active: system {system}, {width}x{height}");
                Ok(())
            }
            Err(source) => {
                log::error!("System '{system}' failed to initialize: {source}");
                self.disabled_systems.insert(system);
                self.events.publish(EngineEvent::SystemFailed {
                    system,
                    reason: source.to_string(),
                });
                Err(InitError::System { system, source })
            }
        }
    }

    /// A clonable sender for posting commands from any thread.
    pub fn command_sender(&self) -> flume::Sender<EngineCommand> {
        self.commands_tx.clone()
    }

    /// The event bus carrying engine notifications.
    pub fn events(&self) -> &EventBus<EngineEvent> {
        &self.events
    }

    /// The current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The parameter store (render-thread access).
    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// The relationship graph (render-thread access).
    pub fn graph(&self) -> &LayerRelationshipGraph {
        &self.graph
    }

    /// The compositor (render-thread access, mainly for inspection);
    /// `None` until a system has been activated.
    pub fn compositor(&self) -> Option<&MultiCanvasCompositor> {
        self.compositor.as_ref()
    }

    /// The backend (render-thread access, mainly for inspection).
    pub fn backend(&self) -> &dyn GraphicsBackend {
        &*self.backend
    }

    /// Statistics of the last completed frame.
    pub fn last_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    // --- Direct control (render thread) ---

    /// Sets one parameter immediately (render-thread path; hosts on
    /// other threads post [`EngineCommand::SetParameter`]).
    pub fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), ParamError> {
        let result = self.store.set_by_name(name, value);
        if let Err(e) = &result {
            log::debug!("set_parameter rejected: {e}");
        }
        result
    }

    /// Requests a system switch; the crossfade starts at the next frame
    /// boundary and is cancellable until then.
    pub fn switch_system(&mut self, target: VisualSystem) -> Result<(), SwitchError> {
        if self.disabled_systems.contains(&target) {
            return Err(SwitchError::SystemDisabled(target));
        }
        match self.state {
            EngineState::Crossfade { .. } => Err(SwitchError::SwitchInProgress),
            EngineState::Active(current) if current == target => {
                Err(SwitchError::AlreadyActive(target))
            }
            EngineState::Active(_) => {
                self.pending_switch = Some(target);
                Ok(())
            }
            EngineState::Ready | EngineState::Uninitialized => Err(SwitchError::NotActive),
        }
    }

    /// Reassigns one layer role to a different system renderer while the
    /// rest of the stack keeps its current system.
    pub fn set_layer_system(
        &mut self,
        role: LayerRole,
        system: VisualSystem,
    ) -> Result<(), SwitchError> {
        if self.disabled_systems.contains(&system) {
            return Err(SwitchError::SystemDisabled(system));
        }
        if matches!(self.state, EngineState::Crossfade { .. }) {
            return Err(SwitchError::SwitchInProgress);
        }
        let Some(compositor) = self.compositor.as_mut() else {
            return Err(SwitchError::NotActive);
        };
        let result = compositor.set_layer_system(&mut *self.backend, role, system);
        if let Err(e) = result {
            log::error!("per-layer system '{system}' failed on '{role}': {e}");
            self.disabled_systems.insert(system);
            self.events.publish(EngineEvent::SystemFailed {
                system,
                reason: e.to_string(),
            });
            return Err(SwitchError::SystemDisabled(system));
        }
        Ok(())
    }

    /// Cancels a requested switch if its crossfade has not started.
    ///
    /// Returns `true` when something was cancelled; a running crossfade
    /// always completes (disposal determinism).
    pub fn cancel_pending_switch(&mut self) -> bool {
        self.pending_switch.take().is_some()
    }

    /// Queues a named profile; applied at the next frame boundary.
    pub fn set_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        let graph = LayerRelationshipGraph::profile(name)?;
        self.pending_profile = Some(graph);
        Ok(())
    }

    /// Queues a profile from a record; applied at the next frame
    /// boundary.
    pub fn set_profile_record(&mut self, record: ProfileRecord) -> Result<(), ProfileError> {
        let graph = LayerRelationshipGraph::from_record(record)?;
        self.pending_profile = Some(graph);
        Ok(())
    }

    /// Replaces one follower's inbound edge immediately.
    pub fn set_relationship(
        &mut self,
        role: LayerRole,
        edge: RelationshipEdge,
    ) -> Result<(), ProfileError> {
        self.graph.set_relationship(role, edge)
    }

    /// Moves the keystone immediately.
    pub fn set_keystone(&mut self, role: LayerRole) {
        self.graph.set_keystone(role);
        self.derivation.reset(&self.store.snapshot());
    }

    /// The current graph as a profile record.
    pub fn layer_config(&self) -> ProfileRecord {
        self.graph.to_record()
    }

    // --- Frame loop ---

    /// Runs one frame: drain, derive (exactly once), render, composite.
    ///
    /// `dt_seconds` is the wall time since the previous frame; the host
    /// calls this from its display-refresh callback or a manual loop.
    pub fn frame(&mut self, dt_seconds: f32) -> FrameStats {
        let prep_started = Instant::now();
        let dt_seconds = dt_seconds.clamp(0.0, 1.0);
        self.input_limiter.refill(dt_seconds);
        self.reactivity.decay(dt_seconds);

        self.drain_commands();
        self.apply_pending_profile();
        self.start_pending_switch();

        // Exactly one derivation pass per frame, however many inputs
        // fired.
        let dirty = self.store.take_dirty();
        if !dirty.is_empty() {
            self.events.publish(EngineEvent::ParameterChanged {
                keys: dirty.iter().copied().collect(),
                version: self.store.version(),
            });
        }
        let keystone = self.store.snapshot();
        self.clock_seconds += dt_seconds * keystone.speed;
        let derived =
            self.graph
                .derive_all(&keystone, &mut self.derivation, &dirty, dt_seconds);

        let fade = self.advance_crossfade(dt_seconds);
        let inputs = FrameInputs {
            time: self.clock_seconds,
            mouse_intensity: self.reactivity.mouse_intensity,
            click_intensity: self.reactivity.click_intensity,
            audio: (
                self.reactivity.audio.bass,
                self.reactivity.audio.mid,
                self.reactivity.audio.high,
            ),
        };
        let cpu_preparation_time_ms = prep_started.elapsed().as_secs_f32() * 1000.0;

        let submit_started = Instant::now();
        let render_result = self.render_once(&derived, &inputs, fade);
        let cpu_render_submission_time_ms = submit_started.elapsed().as_secs_f32() * 1000.0;

        let (draw_calls, dropped) = match render_result {
            Ok(draws) => (draws, false),
            Err(e) => {
                log::error!("Frame {} dropped: {e}", self.frame_number);
                self.events.publish(EngineEvent::FrameDropped {
                    frame: self.frame_number,
                    reason: e.to_string(),
                });
                (0, true)
            }
        };

        self.finish_crossfade_if_due();

        let stats = FrameStats {
            frame_number: self.frame_number,
            cpu_preparation_time_ms,
            cpu_render_submission_time_ms,
            draw_calls,
            dropped,
            store_version: self.store.version(),
        };
        self.frame_number += 1;
        self.last_stats = stats.clone();
        stats
    }

    fn render_once(
        &mut self,
        derived: &std::collections::BTreeMap<LayerRole, polychora_core::params::ParameterSet>,
        inputs: &FrameInputs,
        fade: Option<f32>,
    ) -> Result<u32, RenderError> {
        if self.backend.context_lost() {
            if self.just_lost || !self.restore_pending {
                // The loss frame shows the last successful blit (or the
                // solid background); restore runs on the next frame.
                self.just_lost = false;
                return Err(RenderError::ContextLost);
            }
            self.backend.restore()?;
            if let Some(compositor) = self.compositor.as_mut() {
                compositor.rebuild(&mut *self.backend)?;
            }
            self.restore_pending = false;
            self.events.publish(EngineEvent::ContextRestored);
        }
        // Ready: the loop runs but there is nothing to render yet.
        let Some(compositor) = self.compositor.as_mut() else {
            return Ok(0);
        };
        self.backend.begin_frame()?;
        let result = compositor.render_frame(&mut *self.backend, derived, inputs, fade);
        // end_frame must run on all paths or the next begin_frame jams.
        let end = self.backend.end_frame();
        let draws = result?;
        end?;
        Ok(draws)
    }

    fn drain_commands(&mut self) {
        let commands: Vec<EngineCommand> = self.commands_rx.try_iter().collect();
        for command in commands {
            match command {
                EngineCommand::SetParameter(name, value) => {
                    let _ = self.set_parameter(&name, value);
                }
                EngineCommand::BatchSet(entries) => {
                    let keyed: Result<Vec<(ParamKey, f32)>, ParamError> = entries
                        .iter()
                        .map(|(name, value)| {
                            ParamKey::from_name(name)
                                .map(|k| (k, *value))
                                .ok_or_else(|| ParamError::UnknownName(name.clone()))
                        })
                        .collect();
                    match keyed {
                        Ok(entries) => {
                            if let Err(e) = self.store.set_many(&entries) {
                                log::debug!("batch_set rejected: {e}");
                            }
                        }
                        Err(e) => log::debug!("batch_set rejected: {e}"),
                    }
                }
                EngineCommand::Randomize => self.store.randomize(),
                EngineCommand::Reset => self.store.reset(),
                EngineCommand::SetProfile(name) => {
                    if let Err(e) = self.set_profile(&name) {
                        log::warn!("set_profile('{name}') rejected: {e}");
                    }
                }
                EngineCommand::SetProfileRecord(record) => {
                    if let Err(e) = self.set_profile_record(record) {
                        log::warn!("set_profile_record rejected: {e}");
                    }
                }
                EngineCommand::SetRelationship(role, edge) => {
                    if let Err(e) = self.set_relationship(role, edge) {
                        log::warn!("set_relationship({role}) rejected: {e}");
                    }
                }
                EngineCommand::SetKeystone(role) => self.set_keystone(role),
                EngineCommand::Input(sample) => {
                    if self.input_limiter.admit() {
                        self.apply_input(sample);
                    }
                }
                EngineCommand::Resize(width, height) => {
                    self.viewport = (width.max(1), height.max(1));
                    if let Some(compositor) = self.compositor.as_mut() {
                        if let Err(e) = compositor.resize(&mut *self.backend, width, height) {
                            log::error!("resize failed: {e}");
                        }
                    }
                }
                EngineCommand::SimulateContextLoss => {
                    self.backend.handle_context_loss();
                    self.restore_pending = true;
                    self.just_lost = true;
                    self.events.publish(EngineEvent::ContextLost);
                }
            }
        }
    }

    fn apply_input(&mut self, sample: InputSample) {
        self.reactivity.apply(sample);
        // Tilt nudges two rotation planes; the store clamps as always.
        if let InputSample::Tilt(tilt) = sample {
            let _ = self.store.set(ParamKey::Rot4dXW, tilt.beta * 0.5);
            let _ = self.store.set(ParamKey::Rot4dYW, tilt.alpha * 0.5);
        }
    }

    fn apply_pending_profile(&mut self) {
        if let Some(graph) = self.pending_profile.take() {
            self.graph = graph;
            // Stateful followers restart from the keystone snapshot so
            // the first post-switch frame has no phantom deltas.
            self.derivation.reset(&self.store.snapshot());
            self.events.publish(EngineEvent::ProfileChanged {
                keystone: self.graph.keystone(),
            });
        }
    }

    fn start_pending_switch(&mut self) {
        let Some(target) = self.pending_switch.take() else {
            return;
        };
        let EngineState::Active(from) = self.state else {
            return;
        };
        let Some(compositor) = self.compositor.as_mut() else {
            return;
        };
        match compositor.begin_switch(&mut *self.backend, target) {
            Ok(()) => {
                self.state = EngineState::Crossfade {
                    from,
                    to: target,
                    elapsed_ms: 0.0,
                };
            }
            Err(e) => {
                log::error!("System '{target}' failed to initialize: {e}");
                self.disabled_systems.insert(target);
                self.events.publish(EngineEvent::SystemFailed {
                    system: target,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn advance_crossfade(&mut self, dt_seconds: f32) -> Option<f32> {
        if let EngineState::Crossfade { elapsed_ms, .. } = &mut self.state {
            *elapsed_ms += dt_seconds * 1000.0;
            let duration = self.compositor_config.crossfade_ms.max(1) as f32;
            Some((*elapsed_ms / duration).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    fn finish_crossfade_if_due(&mut self) {
        if let EngineState::Crossfade {
            to, elapsed_ms, ..
        } = self.state
        {
            if elapsed_ms >= self.compositor_config.crossfade_ms as f32 {
                if let Some(compositor) = self.compositor.as_mut() {
                    compositor.finish_switch(&mut *self.backend);
                }
                self.state = EngineState::Active(to);
                self.events.publish(EngineEvent::SystemChanged { system: to });
            }
        }
    }

    /// Releases everything. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(mut compositor) = self.compositor.take() {
            compositor.dispose(&mut *self.backend);
        }
        self.backend.dispose();
        self.state = EngineState::Uninitialized;
        log::info!("Orchestrator disposed");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.dispose();
    }
}
