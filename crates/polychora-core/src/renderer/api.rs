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

//! Backend-facing data types: opaque resource handles, program
//! descriptors and composite/blend descriptions.

use crate::shader::ShaderLanguage;
use serde::{Deserialize, Serialize};

/// Which concrete backend family a [`super::GraphicsBackend`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The primary rasterization backend (render pipeline, fullscreen
    /// triangle, GLSL fragment stage).
    Raster,
    /// The secondary compute-capable backend (compute pipeline writing a
    /// storage texture, WGSL).
    Compute,
    /// The recording test double; creates nothing on a GPU.
    Null,
}

/// An opaque handle to a compiled program (render or compute pipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub usize);

/// An opaque handle to a uniform buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformBufferId(pub usize);

/// An opaque handle to a texture usable as an offscreen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// Texture formats the contract needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, linear.
    Rgba8Unorm,
    /// 8-bit BGRA, linear (some surfaces prefer it).
    Bgra8Unorm,
}

/// How a layer is blended into the composite, back-to-front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    /// Source-over alpha blending.
    Normal,
    /// Component-wise multiply; darkens.
    Multiply,
    /// Inverted multiply; lightens.
    Screen,
    /// Plain addition; glow accumulation.
    Additive,
}

/// The source of a program, per backend family.
#[derive(Debug, Clone, Copy)]
pub enum ProgramSource<'a> {
    /// A vertex + fragment pair for the rasterization backend.
    Raster {
        /// Vertex stage source.
        vertex: &'a str,
        /// Fragment stage source.
        fragment: &'a str,
        /// The language both stages are written in.
        language: ShaderLanguage,
    },
    /// A WGSL compute shader for the compute backend.
    Compute {
        /// Compute module source.
        source: &'a str,
        /// The entry point name.
        entry: &'a str,
    },
}

/// Everything a backend needs to compile a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    /// Debug label, surfaced in compile errors and captures.
    pub label: &'a str,
    /// The program source.
    pub source: ProgramSource<'a>,
}

/// One layer of a composite pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeLayer {
    /// The layer's offscreen color texture.
    pub texture: TextureId,
    /// Composite opacity in [0, 1] (crossfade already applied).
    pub opacity: f32,
    /// The layer's blend mode.
    pub blend: BlendMode,
}
