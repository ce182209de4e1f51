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

//! Defines the hierarchy of error types for the rendering subsystem.

use std::fmt;

/// An error related to the compilation of a shader program.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// The shader source failed to compile into a backend-specific module.
    CompilationFailed {
        /// A descriptive label for the program.
        label: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// Compilation exceeded the soft timeout and the system was declared
    /// failed.
    Timeout {
        /// A descriptive label for the program.
        label: String,
        /// How long compilation ran before being abandoned.
        elapsed_ms: u64,
    },
    /// The program descriptor does not fit the backend (e.g. a compute
    /// source handed to the rasterization backend).
    WrongBackend {
        /// A descriptive label for the program.
        label: String,
        /// What the backend expected.
        expected: &'static str,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationFailed { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ShaderError::Timeout { label, elapsed_ms } => {
                write!(
                    f,
                    "Shader compilation for '{label}' exceeded the soft timeout ({elapsed_ms} ms)"
                )
            }
            ShaderError::WrongBackend { label, expected } => {
                write!(f, "Program '{label}' does not fit this backend (expected {expected})")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// The handle used to reference a resource is unknown to the backend.
    InvalidHandle,
    /// The resource exists but was invalidated by a context loss and has
    /// not been restored yet.
    ContextLost,
    /// A write exceeded the resource's bounds.
    OutOfBounds,
    /// An error originating from the specific graphics backend.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::ContextLost => {
                write!(f, "Resource invalidated by context loss; restore pending.")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error from a render or composite pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An operation was attempted before the backend was initialized.
    NotInitialized,
    /// A failure occurred during backend initialization.
    InitializationFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The context was lost mid-frame; the frame is dropped and restore
    /// is queued.
    ContextLost,
    /// A critical rendering operation failed.
    RenderingFailed(String),
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => write!(f, "The rendering backend is not initialized."),
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::ContextLost => {
                write!(f, "The graphics context was lost; restore is pending.")
            }
            RenderError::RenderingFailed(msg) => {
                write!(f, "A critical rendering operation failed: {msg}")
            }
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(ResourceError::Shader(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationFailed {
            label: "quantum/wgsl".to_string(),
            details: "unknown identifier".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader compilation failed for 'quantum/wgsl': unknown identifier"
        );
    }

    #[test]
    fn errors_chain_through_source() {
        let shader_err = ShaderError::Timeout {
            label: "holographic/glsl".to_string(),
            elapsed_ms: 2150,
        };
        let render_err: RenderError = shader_err.into();
        assert!(render_err.source().is_some());
        assert!(render_err.source().unwrap().source().is_some());
    }
}
