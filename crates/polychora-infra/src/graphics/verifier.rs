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

//! The shader-sync verifier.
//!
//! Parses every (system, language) fragment program with naga's
//! front-ends, collects the declared uniform-block members into the core
//! coverage matrix, and validates it against the canonical schema. Runs
//! at engine initialization; a failure disables initialization rather
//! than shipping programs that disagree about their inputs.

use polychora_core::renderer::VisualSystem;
use polychora_core::shader::{assemble_fragment, ShaderLanguage};
use polychora_core::uniform::{CoverageMatrix, UniformType};
use std::collections::BTreeMap;
use std::fmt;

/// A failed verification run.
#[derive(Debug)]
pub enum VerifierError {
    /// A program did not parse in its own language — nothing to verify.
    Parse {
        /// The system whose program failed to parse.
        system: VisualSystem,
        /// The program's language.
        language: ShaderLanguage,
        /// Compiler diagnostics.
        details: String,
    },
    /// The programs parsed but disagree with the schema or each other.
    Sync(polychora_core::uniform::ShaderSyncError),
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierError::Parse {
                system,
                language,
                details,
            } => write!(
                f,
                "The {system} {language} program failed to parse: {details}"
            ),
            VerifierError::Sync(err) => write!(f, "Shader sync check failed: {err}"),
        }
    }
}

impl std::error::Error for VerifierError {}

/// Parses all six fragment programs and validates uniform coverage.
///
/// Returns the filled coverage matrix on success so callers can log or
/// surface it.
pub fn verify_shader_sync() -> Result<CoverageMatrix, VerifierError> {
    let mut matrix = CoverageMatrix::default();
    for system in VisualSystem::ALL {
        for language in ShaderLanguage::ALL {
            let source = assemble_fragment(system, language);
            let module = parse(language, &source).map_err(|details| VerifierError::Parse {
                system,
                language,
                details,
            })?;
            matrix.add_row(system, language, collect_uniform_members(&module));
        }
    }
    matrix.validate().map_err(VerifierError::Sync)?;

    let unknown = matrix.unknown_names();
    if !unknown.is_empty() {
        log::warn!("Shader sync: uniforms outside the canonical schema: {unknown:?}");
    }
    Ok(matrix)
}

fn parse(language: ShaderLanguage, source: &str) -> Result<naga::Module, String> {
    match language {
        ShaderLanguage::Wgsl => {
            naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))
        }
        ShaderLanguage::Glsl => {
            let mut frontend = naga::front::glsl::Frontend::default();
            frontend
                .parse(
                    &naga::front::glsl::Options::from(naga::ShaderStage::Fragment),
                    source,
                )
                .map_err(|e| e.emit_to_string(source))
        }
    }
}

/// Collects the members of every uniform-space struct in a module.
///
/// Padding members (leading underscore) are layout plumbing, not part of
/// the contract, and are skipped. Types outside the schema's vocabulary
/// are skipped too — the coverage check will then report them missing,
/// which is the right failure mode for a mistyped uniform.
fn collect_uniform_members(module: &naga::Module) -> BTreeMap<String, UniformType> {
    let mut declared = BTreeMap::new();
    for (_, var) in module.global_variables.iter() {
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        let ty = &module.types[var.ty];
        let naga::TypeInner::Struct { members, .. } = &ty.inner else {
            continue;
        };
        for member in members {
            let Some(name) = &member.name else { continue };
            if name.starts_with('_') {
                continue;
            }
            let mapped = match &module.types[member.ty].inner {
                naga::TypeInner::Scalar(scalar) if scalar.kind == naga::ScalarKind::Float => {
                    Some(UniformType::F32)
                }
                naga::TypeInner::Vector { size, scalar }
                    if scalar.kind == naga::ScalarKind::Float =>
                {
                    match size {
                        naga::VectorSize::Bi => Some(UniformType::Vec2),
                        naga::VectorSize::Tri => Some(UniformType::Vec3),
                        naga::VectorSize::Quad => None,
                    }
                }
                _ => None,
            };
            if let Some(uniform_type) = mapped {
                declared.insert(name.clone(), uniform_type);
            }
        }
    }
    declared
}

#[cfg(test)]
mod tests {
    use super::*;
    use polychora_core::uniform::{UniformRequirement, CANONICAL_SCHEMA};

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn all_assembled_programs_pass_verification() {
        init_logs();
        let matrix = verify_shader_sync().expect("assembled programs must verify");
        // Three systems, two languages.
        assert_eq!(matrix.rows().len(), 6);
    }

    #[test]
    fn every_row_declares_the_full_schema() {
        init_logs();
        let matrix = verify_shader_sync().unwrap();
        for row in matrix.rows() {
            for entry in CANONICAL_SCHEMA {
                if entry.requirement == UniformRequirement::Required {
                    assert!(
                        row.declared.contains_key(entry.name),
                        "{:?} {} missing {}",
                        row.system,
                        row.language,
                        entry.name
                    );
                }
            }
        }
    }

    #[test]
    fn a_missing_uniform_is_detected() {
        init_logs();
        // Reparse the faceted WGSL program with one required uniform
        // renamed, and run the same collection path on it.
        let source = polychora_core::shader::assemble_fragment(
            VisualSystem::Faceted,
            ShaderLanguage::Wgsl,
        )
        .replace("gridDensity", "cellDensity");
        let module = parse(ShaderLanguage::Wgsl, &source).unwrap();
        let declared = collect_uniform_members(&module);
        assert!(!declared.contains_key("gridDensity"));

        let mut matrix = CoverageMatrix::default();
        matrix.add_row(VisualSystem::Faceted, ShaderLanguage::Wgsl, declared);
        assert!(matrix.validate().is_err());
    }

    #[test]
    fn padding_members_are_not_reported() {
        init_logs();
        let matrix = verify_shader_sync().unwrap();
        for row in matrix.rows() {
            assert!(row.declared.keys().all(|name| !name.starts_with('_')));
        }
    }
}
