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

//! The uniform schema and the coverage matrix the shader-sync verifier
//! fills in.
//!
//! The schema is pure data; the actual shader parsing lives with the GPU
//! crates (which own a shader front-end). Validation of a filled matrix —
//! "is every required uniform declared everywhere, with one type?" — is
//! here so it stays testable without a parser.

use crate::renderer::VisualSystem;
use crate::shader::ShaderLanguage;
use std::collections::BTreeMap;
use std::fmt;

/// The type of a uniform slot, as far as the contract cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    /// A single 32-bit float.
    F32,
    /// Two 32-bit floats.
    Vec2,
    /// Three 32-bit floats.
    Vec3,
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformType::F32 => f.write_str("f32"),
            UniformType::Vec2 => f.write_str("vec2<f32>"),
            UniformType::Vec3 => f.write_str("vec3<f32>"),
        }
    }
}

/// How strongly the contract requires a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformRequirement {
    /// Must be declared by every system in every language.
    Required,
    /// Expected of a full-featured system; absence is reported, not fatal.
    Recommended,
    /// System-specific; only type agreement is enforced.
    Optional,
}

/// One named slot of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformEntry {
    /// The canonical uniform name as declared in shader source.
    pub name: &'static str,
    /// The slot's type.
    pub ty: UniformType,
    /// The requirement level.
    pub requirement: UniformRequirement,
}

const fn entry(name: &'static str, ty: UniformType, requirement: UniformRequirement) -> UniformEntry {
    UniformEntry {
        name,
        ty,
        requirement,
    }
}

use UniformRequirement::{Optional, Recommended, Required};
use UniformType::{Vec2, F32};

/// The canonical uniform schema, in layout order.
///
/// `layerColor` is carried as three scalar slots (see the record module).
pub const CANONICAL_SCHEMA: &[UniformEntry] = &[
    entry("time", F32, Required),
    entry("resolution", Vec2, Required),
    entry("geometry", F32, Required),
    entry("rot4dXY", F32, Required),
    entry("rot4dXZ", F32, Required),
    entry("rot4dYZ", F32, Required),
    entry("rot4dXW", F32, Required),
    entry("rot4dYW", F32, Required),
    entry("rot4dZW", F32, Required),
    entry("dimension", F32, Required),
    entry("gridDensity", F32, Required),
    entry("morphFactor", F32, Required),
    entry("chaos", F32, Required),
    entry("speed", F32, Required),
    entry("hue", F32, Required),
    entry("intensity", F32, Required),
    entry("saturation", F32, Recommended),
    entry("mouseIntensity", F32, Recommended),
    entry("clickIntensity", F32, Recommended),
    entry("bass", F32, Recommended),
    entry("mid", F32, Recommended),
    entry("high", F32, Recommended),
    entry("layerScale", F32, Optional),
    entry("layerOpacity", F32, Optional),
    entry("layerColorR", F32, Optional),
    entry("layerColorG", F32, Optional),
    entry("layerColorB", F32, Optional),
    entry("densityMult", F32, Optional),
    entry("speedMult", F32, Optional),
    entry("roleIntensity", F32, Optional),
];

/// Looks up a schema entry by name.
pub fn schema_entry(name: &str) -> Option<&'static UniformEntry> {
    CANONICAL_SCHEMA.iter().find(|e| e.name == name)
}

/// A failed shader-sync check.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderSyncError {
    /// A required uniform is missing from one program.
    MissingRequired {
        /// The system whose program is missing the uniform.
        system: VisualSystem,
        /// The shader language of the offending program.
        language: ShaderLanguage,
        /// The missing uniform's name.
        name: &'static str,
    },
    /// Two programs declare the same uniform with different types.
    TypeMismatch {
        /// The uniform's name.
        name: String,
        /// The type declared by the first program encountered.
        expected: UniformType,
        /// The conflicting declaration site.
        system: VisualSystem,
        /// The conflicting declaration's language.
        language: ShaderLanguage,
        /// The conflicting type.
        found: UniformType,
    },
}

impl fmt::Display for ShaderSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderSyncError::MissingRequired {
                system,
                language,
                name,
            } => write!(
                f,
                "Required uniform '{name}' missing from the {system:?} {language} program"
            ),
            ShaderSyncError::TypeMismatch {
                name,
                expected,
                system,
                language,
                found,
            } => write!(
                f,
                "Uniform '{name}' declared as {found} by the {system:?} {language} program, \
                 but as {expected} elsewhere"
            ),
        }
    }
}

impl std::error::Error for ShaderSyncError {}

/// One parsed program's declared uniforms.
#[derive(Debug, Clone)]
pub struct CoverageRow {
    /// The system the program belongs to.
    pub system: VisualSystem,
    /// The program's shader language.
    pub language: ShaderLanguage,
    /// Declared uniform names and their parsed types.
    pub declared: BTreeMap<String, UniformType>,
}

/// The per-(system, language) uniform coverage table.
#[derive(Debug, Clone, Default)]
pub struct CoverageMatrix {
    rows: Vec<CoverageRow>,
}

impl CoverageMatrix {
    /// Adds one parsed program's declarations.
    pub fn add_row(
        &mut self,
        system: VisualSystem,
        language: ShaderLanguage,
        declared: BTreeMap<String, UniformType>,
    ) {
        self.rows.push(CoverageRow {
            system,
            language,
            declared,
        });
    }

    /// The rows collected so far.
    pub fn rows(&self) -> &[CoverageRow] {
        &self.rows
    }

    /// Uniform names that are declared somewhere but are not part of the
    /// canonical schema. Informational; renamed uniforms usually show up
    /// here before they show up as `MissingRequired`.
    pub fn unknown_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rows
            .iter()
            .flat_map(|row| row.declared.keys())
            .filter(|name| schema_entry(name).is_none())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Checks every row against the schema.
    ///
    /// Fails on a missing *required* uniform or on any two rows
    /// disagreeing about a shared uniform's type. Missing recommended /
    /// optional uniforms are fine.
    pub fn validate(&self) -> Result<(), ShaderSyncError> {
        for row in &self.rows {
            for entry in CANONICAL_SCHEMA
                .iter()
                .filter(|e| e.requirement == Required)
            {
                match row.declared.get(entry.name) {
                    Some(ty) if *ty == entry.ty => {}
                    Some(ty) => {
                        return Err(ShaderSyncError::TypeMismatch {
                            name: entry.name.to_string(),
                            expected: entry.ty,
                            system: row.system,
                            language: row.language,
                            found: *ty,
                        })
                    }
                    None => {
                        return Err(ShaderSyncError::MissingRequired {
                            system: row.system,
                            language: row.language,
                            name: entry.name,
                        })
                    }
                }
            }
        }

        // Cross-program agreement for everything declared anywhere.
        let mut first_seen: BTreeMap<String, UniformType> = BTreeMap::new();
        for row in &self.rows {
            for (name, ty) in &row.declared {
                match first_seen.get(name) {
                    Some(expected) if expected != ty => {
                        return Err(ShaderSyncError::TypeMismatch {
                            name: name.clone(),
                            expected: *expected,
                            system: row.system,
                            language: row.language,
                            found: *ty,
                        })
                    }
                    Some(_) => {}
                    None => {
                        first_seen.insert(name.clone(), *ty);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_declarations() -> BTreeMap<String, UniformType> {
        CANONICAL_SCHEMA
            .iter()
            .map(|e| (e.name.to_string(), e.ty))
            .collect()
    }

    #[test]
    fn full_coverage_validates() {
        let mut matrix = CoverageMatrix::default();
        for system in VisualSystem::ALL {
            for language in [ShaderLanguage::Glsl, ShaderLanguage::Wgsl] {
                matrix.add_row(system, language, full_declarations());
            }
        }
        assert!(matrix.validate().is_ok());
        assert!(matrix.unknown_names().is_empty());
    }

    #[test]
    fn missing_required_uniform_fails() {
        let mut declared = full_declarations();
        declared.remove("rot4dXW");
        let mut matrix = CoverageMatrix::default();
        matrix.add_row(VisualSystem::Faceted, ShaderLanguage::Wgsl, declared);
        match matrix.validate() {
            Err(ShaderSyncError::MissingRequired { name, .. }) => assert_eq!(name, "rot4dXW"),
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    #[test]
    fn missing_optional_uniform_is_fine() {
        let mut declared = full_declarations();
        declared.remove("roleIntensity");
        declared.remove("layerColorR");
        let mut matrix = CoverageMatrix::default();
        matrix.add_row(VisualSystem::Quantum, ShaderLanguage::Glsl, declared);
        assert!(matrix.validate().is_ok());
    }

    #[test]
    fn type_disagreement_fails() {
        let mut matrix = CoverageMatrix::default();
        matrix.add_row(VisualSystem::Faceted, ShaderLanguage::Wgsl, full_declarations());
        let mut wrong = full_declarations();
        wrong.insert("resolution".to_string(), UniformType::Vec3);
        matrix.add_row(VisualSystem::Quantum, ShaderLanguage::Wgsl, wrong);
        assert!(matches!(
            matrix.validate(),
            Err(ShaderSyncError::TypeMismatch { .. })
        ));
    }
}
