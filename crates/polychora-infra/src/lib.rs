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

//! # Polychora Infra
//!
//! Concrete implementations of the core crate's GPU contracts: the two
//! wgpu execution backends (rasterization and compute), the naga-based
//! shader-sync verifier, and backend selection.

pub mod graphics;

pub use graphics::selection::{select_backend, BackendSelection};
pub use graphics::verifier::{verify_shader_sync, VerifierError};
pub use graphics::wgpu::{ComputeBackend, RasterBackend};
