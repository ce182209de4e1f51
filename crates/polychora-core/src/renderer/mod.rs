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

//! Rendering abstraction: the backend trait both GPU implementations
//! fulfill, the per-system renderer trait, resource handles, and the
//! renderer error hierarchy.

pub mod api;
pub mod error;
pub mod traits;

pub use api::{
    BackendKind, BlendMode, CompositeLayer, ProgramDescriptor, ProgramId, ProgramSource,
    TextureFormat, TextureId, UniformBufferId,
};
pub use error::{RenderError, ResourceError, ShaderError};
pub use traits::{GraphicsBackend, SystemRenderer};

use serde::{Deserialize, Serialize};

/// One of the three coexisting visualization systems.
///
/// The systems share the math modules, the uniform contract and the
/// backend abstraction; they differ only in their shader `main` body and
/// in which optional uniforms they read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VisualSystem {
    /// Minimal geometric rendering: clean lattice line work.
    Faceted,
    /// Dense interference rendering with audio-driven shimmer.
    Quantum,
    /// Role-aware layered rendering with per-layer tint and glow.
    Holographic,
}

impl VisualSystem {
    /// All systems, in switch-cycling order.
    pub const ALL: [Self; 3] = [Self::Faceted, Self::Quantum, Self::Holographic];

    /// The system's wire/API name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Faceted => "faceted",
            Self::Quantum => "quantum",
            Self::Holographic => "holographic",
        }
    }

    /// Looks a system up by its wire/API name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for VisualSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_names_round_trip() {
        for system in VisualSystem::ALL {
            assert_eq!(VisualSystem::from_name(system.name()), Some(system));
        }
        assert_eq!(VisualSystem::from_name("Quantum"), Some(VisualSystem::Quantum));
        assert_eq!(VisualSystem::from_name("plasma"), None);
    }
}
