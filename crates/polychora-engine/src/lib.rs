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

//! # Polychora Engine
//!
//! The runtime layer: the three visual-system render adapters, the
//! five-layer compositor, the orchestrator state machine and the public
//! [`Engine`] handle hosts drive.

#![warn(missing_docs)]

pub mod compositor;
pub mod engine;
pub mod input;
pub mod orchestrator;
pub mod systems;
pub mod testing;

pub use engine::Engine;
pub use orchestrator::{EngineState, FrameStats, InitError, SwitchError};

// Re-export the contract types hosts need alongside the engine handle.
pub use polychora_core::config::{BackendPreference, CompositorConfig, EngineConfig};
pub use polychora_core::layer::{LayerRole, ProfileRecord, RelationshipEdge};
pub use polychora_core::params::{ParamError, ParamKey};
pub use polychora_core::renderer::VisualSystem;
