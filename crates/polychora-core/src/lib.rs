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

//! # Polychora Core
//!
//! Foundational crate of the polychora visualization engine: the Cl(4,0)
//! rotor math substrate, the 24-variant geometry catalog, the clamped
//! parameter store, the canonical uniform contract, shader assembly from
//! shared modules, the layer relationship graph, and the backend/renderer
//! trait contracts the infra and engine crates implement.
//!
//! This crate has no GPU dependencies; everything here is pure data and
//! pure functions plus the channel-based event bus.

#![warn(missing_docs)]

pub mod config;
pub mod event;
pub mod geometry;
pub mod layer;
pub mod math;
pub mod params;
pub mod renderer;
pub mod shader;
pub mod uniform;

pub use config::{BackendPreference, CompositorConfig, EngineConfig};
pub use event::{EngineEvent, EventBus};
pub use geometry::GeometryVariant;
pub use layer::{LayerRelationshipGraph, LayerRole, RelationshipEdge};
pub use math::{Mat4, ProjectionMode, Rotor4, Vec4};
pub use params::{ParamKey, ParameterSet, ParameterStore};
pub use renderer::{GraphicsBackend, SystemRenderer, VisualSystem};
pub use uniform::{CanonicalUniforms, UniformInputs};
