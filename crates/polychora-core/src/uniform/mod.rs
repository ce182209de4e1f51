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

//! The canonical uniform contract.
//!
//! One schema is the source of truth for every uniform any system shader
//! reads, in either shader language. The byte layout of
//! [`CanonicalUniforms`] is normative within its first 96 bytes; both GPU
//! backends upload these exact bytes (padded to a 16-byte multiple, which
//! the record already is).

mod record;
mod schema;

pub use record::{CanonicalUniforms, UniformInputs, UNIFORM_RECORD_SIZE};
pub use schema::{
    schema_entry, CoverageMatrix, CoverageRow, ShaderSyncError, UniformEntry, UniformRequirement,
    UniformType, CANONICAL_SCHEMA,
};
