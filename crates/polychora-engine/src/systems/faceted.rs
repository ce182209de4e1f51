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

//! The Faceted system adapter: clean geometric line work.

use super::{impl_system_renderer, AdapterCore};
use polychora_core::params::ParameterSet;
use polychora_core::renderer::{
    GraphicsBackend, RenderError, SystemRenderer, TextureId, VisualSystem,
};
use polychora_core::uniform::{CanonicalUniforms, UniformInputs};

/// Renders the Faceted system for one layer role.
///
/// Faceted consumes the canonical uniforms as-is; it reads none of the
/// role-specific optional uniforms.
#[derive(Debug)]
pub struct FacetedRenderer {
    core: AdapterCore,
}

impl_system_renderer!(FacetedRenderer, VisualSystem::Faceted, |_record| {});
