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

//! Shader assembly from shared source modules.
//!
//! Every program any backend compiles is concatenated here from one set
//! of per-language modules: the uniform block, common helpers, the six
//! plane rotations, the three projections, the warp cores and the eight
//! lattices, followed by a per-system `system_color` body and a stage
//! entry wrapper. The math exists exactly once per language; system
//! `main`s and downstream code are not allowed to re-state it.

use crate::renderer::VisualSystem;
use std::fmt;

/// The shader language of an assembled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderLanguage {
    /// GLSL (Vulkan flavor), consumed by the rasterization backend.
    Glsl,
    /// WGSL, consumed by the compute backend and the sync verifier.
    Wgsl,
}

impl ShaderLanguage {
    /// Both languages, in verifier order.
    pub const ALL: [Self; 2] = [Self::Glsl, Self::Wgsl];
}

impl fmt::Display for ShaderLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderLanguage::Glsl => f.write_str("GLSL"),
            ShaderLanguage::Wgsl => f.write_str("WGSL"),
        }
    }
}

// GLSL module family.
const GLSL_UNIFORMS: &str = include_str!("sources/uniforms.glsl");
const GLSL_COMMON: &str = include_str!("sources/common.glsl");
const GLSL_ROTATIONS: &str = include_str!("sources/rotations.glsl");
const GLSL_PROJECTION: &str = include_str!("sources/projection.glsl");
const GLSL_WARPS: &str = include_str!("sources/warps.glsl");
const GLSL_LATTICES: &str = include_str!("sources/lattices.glsl");
const GLSL_MAIN_FACETED: &str = include_str!("sources/main_faceted.glsl");
const GLSL_MAIN_QUANTUM: &str = include_str!("sources/main_quantum.glsl");
const GLSL_MAIN_HOLOGRAPHIC: &str = include_str!("sources/main_holographic.glsl");
const GLSL_ENTRY_FRAGMENT: &str = include_str!("sources/entry_fragment.glsl");
const GLSL_FULLSCREEN_VERTEX: &str = include_str!("sources/fullscreen.vert.glsl");

// WGSL module family.
const WGSL_UNIFORMS: &str = include_str!("sources/uniforms.wgsl");
const WGSL_COMMON: &str = include_str!("sources/common.wgsl");
const WGSL_ROTATIONS: &str = include_str!("sources/rotations.wgsl");
const WGSL_PROJECTION: &str = include_str!("sources/projection.wgsl");
const WGSL_WARPS: &str = include_str!("sources/warps.wgsl");
const WGSL_LATTICES: &str = include_str!("sources/lattices.wgsl");
const WGSL_MAIN_FACETED: &str = include_str!("sources/main_faceted.wgsl");
const WGSL_MAIN_QUANTUM: &str = include_str!("sources/main_quantum.wgsl");
const WGSL_MAIN_HOLOGRAPHIC: &str = include_str!("sources/main_holographic.wgsl");
const WGSL_ENTRY_FRAGMENT: &str = include_str!("sources/entry_fragment.wgsl");
const WGSL_ENTRY_COMPUTE: &str = include_str!("sources/entry_compute.wgsl");
const WGSL_FULLSCREEN_VERTEX: &str = include_str!("sources/fullscreen.vert.wgsl");

/// The shared math modules in concatenation order, after the uniform
/// block and before the system body.
pub fn shared_modules(language: ShaderLanguage) -> [&'static str; 5] {
    match language {
        ShaderLanguage::Glsl => [
            GLSL_COMMON,
            GLSL_ROTATIONS,
            GLSL_PROJECTION,
            GLSL_WARPS,
            GLSL_LATTICES,
        ],
        ShaderLanguage::Wgsl => [
            WGSL_COMMON,
            WGSL_ROTATIONS,
            WGSL_PROJECTION,
            WGSL_WARPS,
            WGSL_LATTICES,
        ],
    }
}

/// The uniform block declaration for a language.
pub fn uniform_header(language: ShaderLanguage) -> &'static str {
    match language {
        ShaderLanguage::Glsl => GLSL_UNIFORMS,
        ShaderLanguage::Wgsl => WGSL_UNIFORMS,
    }
}

fn system_body(system: VisualSystem, language: ShaderLanguage) -> &'static str {
    match (system, language) {
        (VisualSystem::Faceted, ShaderLanguage::Glsl) => GLSL_MAIN_FACETED,
        (VisualSystem::Quantum, ShaderLanguage::Glsl) => GLSL_MAIN_QUANTUM,
        (VisualSystem::Holographic, ShaderLanguage::Glsl) => GLSL_MAIN_HOLOGRAPHIC,
        (VisualSystem::Faceted, ShaderLanguage::Wgsl) => WGSL_MAIN_FACETED,
        (VisualSystem::Quantum, ShaderLanguage::Wgsl) => WGSL_MAIN_QUANTUM,
        (VisualSystem::Holographic, ShaderLanguage::Wgsl) => WGSL_MAIN_HOLOGRAPHIC,
    }
}

fn concat(parts: &[&str]) -> String {
    let mut source = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for part in parts {
        source.push_str(part);
        source.push('\n');
    }
    source
}

/// Assembles the complete fragment program for a (system, language) pair.
pub fn assemble_fragment(system: VisualSystem, language: ShaderLanguage) -> String {
    let modules = shared_modules(language);
    match language {
        ShaderLanguage::Glsl => concat(&[
            "#version 450",
            uniform_header(language),
            modules[0],
            modules[1],
            modules[2],
            modules[3],
            modules[4],
            system_body(system, language),
            GLSL_ENTRY_FRAGMENT,
        ]),
        ShaderLanguage::Wgsl => concat(&[
            uniform_header(language),
            modules[0],
            modules[1],
            modules[2],
            modules[3],
            modules[4],
            system_body(system, language),
            WGSL_ENTRY_FRAGMENT,
        ]),
    }
}

/// Assembles the complete WGSL compute program for a system (the compute
/// backend's equivalent of the fragment program).
pub fn assemble_compute(system: VisualSystem) -> String {
    let modules = shared_modules(ShaderLanguage::Wgsl);
    concat(&[
        uniform_header(ShaderLanguage::Wgsl),
        modules[0],
        modules[1],
        modules[2],
        modules[3],
        modules[4],
        system_body(system, ShaderLanguage::Wgsl),
        WGSL_ENTRY_COMPUTE,
    ])
}

/// The fullscreen-triangle vertex stage for the rasterization path.
pub fn vertex_source(language: ShaderLanguage) -> &'static str {
    match language {
        ShaderLanguage::Glsl => GLSL_FULLSCREEN_VERTEX,
        ShaderLanguage::Wgsl => WGSL_FULLSCREEN_VERTEX,
    }
}

/// The compute entry point name.
pub const COMPUTE_ENTRY: &str = "cs_main";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BaseLattice, WarpCore};
    use crate::uniform::{UniformRequirement, CANONICAL_SCHEMA};

    #[test]
    fn every_program_declares_required_uniforms() {
        for system in VisualSystem::ALL {
            for language in ShaderLanguage::ALL {
                let source = assemble_fragment(system, language);
                for entry in CANONICAL_SCHEMA
                    .iter()
                    .filter(|e| e.requirement == UniformRequirement::Required)
                {
                    assert!(
                        source.contains(entry.name),
                        "{system} {language} is missing '{}'",
                        entry.name
                    );
                }
            }
        }
    }

    #[test]
    fn every_lattice_and_warp_function_is_present_once() {
        for language in ShaderLanguage::ALL {
            let source = assemble_fragment(VisualSystem::Faceted, language);
            for name in BaseLattice::ALL
                .iter()
                .map(|b| b.shader_fn())
                .chain(WarpCore::ALL.iter().map(|c| c.shader_fn()))
            {
                let definitions = source
                    .match_indices(&format!("{name}("))
                    .count();
                // one definition plus at least one call site (the dispatch)
                assert!(
                    definitions >= 2,
                    "{language}: '{name}' defined or dispatched fewer than expected"
                );
            }
        }
    }

    #[test]
    fn compute_program_carries_its_entry_point() {
        for system in VisualSystem::ALL {
            let source = assemble_compute(system);
            assert!(source.contains(COMPUTE_ENTRY));
            assert!(source.contains("texture_storage_2d"));
        }
    }

    #[test]
    fn system_bodies_differ() {
        let faceted = assemble_fragment(VisualSystem::Faceted, ShaderLanguage::Wgsl);
        let quantum = assemble_fragment(VisualSystem::Quantum, ShaderLanguage::Wgsl);
        let holo = assemble_fragment(VisualSystem::Holographic, ShaderLanguage::Wgsl);
        assert_ne!(faceted, quantum);
        assert_ne!(quantum, holo);
        // Only the holographic body reads the role tag (the uniform is
        // declared everywhere, read in one place).
        assert!(holo.contains("ubo.roleIntensity"));
        assert!(!faceted.contains("ubo.roleIntensity"));
        assert!(!quantum.contains("ubo.roleIntensity"));
    }
}
