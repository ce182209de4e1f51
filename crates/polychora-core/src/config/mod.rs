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

//! Engine configuration types.
//!
//! Plain serde structs with engine defaults; hosts deserialize these from
//! whatever configuration source they use and hand them to
//! `Engine::initialize`.

use crate::layer::LayerRole;
use crate::renderer::{BlendMode, VisualSystem};
use serde::{Deserialize, Serialize};

/// Which GPU backend the host prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// The rasterization backend.
    Primary,
    /// The compute backend.
    Secondary,
    /// Try the primary, fall back to the secondary.
    #[default]
    Auto,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The system to activate after initialization.
    pub initial_system: VisualSystem,
    /// The relationship profile to start with.
    pub profile_name: String,
    /// Initial viewport size in pixels.
    pub viewport: (u32, u32),
    /// Backend selection preference.
    pub backend_preference: BackendPreference,
    /// Compositor behaviour knobs.
    pub compositor: CompositorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_system: VisualSystem::Faceted,
            profile_name: "holographic".to_string(),
            viewport: (1280, 720),
            backend_preference: BackendPreference::Auto,
            compositor: CompositorConfig::default(),
        }
    }
}

/// Compositor knobs surfaced as configuration, with the contract
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// System crossfade duration in milliseconds.
    pub crossfade_ms: u64,
    /// Per-role blend modes in back-to-front role order.
    pub blend_modes: [BlendMode; 5],
}

impl CompositorConfig {
    /// The blend mode for a role.
    #[inline]
    pub fn blend_for(&self, role: LayerRole) -> BlendMode {
        self.blend_modes[role.tag() as usize]
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            crossfade_ms: 600,
            blend_modes: [
                BlendMode::Normal,   // background
                BlendMode::Multiply, // shadow
                BlendMode::Normal,   // content
                BlendMode::Screen,   // highlight
                BlendMode::Additive, // accent
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.initial_system, VisualSystem::Faceted);
        assert_eq!(config.profile_name, "holographic");
        assert_eq!(config.compositor.crossfade_ms, 600);
        assert_eq!(
            config.compositor.blend_for(LayerRole::Accent),
            BlendMode::Additive
        );
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"initial_system": "Quantum", "viewport": [640, 480]}"#)
                .unwrap();
        assert_eq!(config.initial_system, VisualSystem::Quantum);
        assert_eq!(config.viewport, (640, 480));
        assert_eq!(config.profile_name, "holographic");
    }
}
