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

//! Backend selection.
//!
//! Maps the host's [`BackendPreference`] onto a concrete backend,
//! recording what was attempted so initialization failures are
//! diagnosable from the selection report alone.

use super::wgpu::{ComputeBackend, RasterBackend};
use polychora_core::config::BackendPreference;
use polychora_core::renderer::{BackendKind, GraphicsBackend, RenderError};
use std::time::Instant;

/// The successful result of a backend selection.
#[derive(Debug)]
pub struct BackendSelection {
    /// The selected, initialized backend.
    pub backend: Box<dyn GraphicsBackend>,
    /// The selected backend's family.
    pub kind: BackendKind,
    /// Every family that was attempted, in order.
    pub attempted: Vec<BackendKind>,
    /// Total selection time in milliseconds.
    pub selection_time_ms: u64,
}

/// Creates a backend per the host's preference.
///
/// `Auto` tries the rasterization backend first and falls back to the
/// compute backend; the explicit preferences try exactly one family.
pub fn select_backend(preference: BackendPreference) -> Result<BackendSelection, RenderError> {
    let started = Instant::now();
    let mut attempted = Vec::new();
    let mut last_error = None;

    let families: &[BackendKind] = match preference {
        BackendPreference::Primary => &[BackendKind::Raster],
        BackendPreference::Secondary => &[BackendKind::Compute],
        BackendPreference::Auto => &[BackendKind::Raster, BackendKind::Compute],
    };

    for &kind in families {
        attempted.push(kind);
        let result: Result<Box<dyn GraphicsBackend>, RenderError> = match kind {
            BackendKind::Raster => RasterBackend::new().map(|b| Box::new(b) as _),
            BackendKind::Compute => ComputeBackend::new().map(|b| Box::new(b) as _),
            BackendKind::Null => unreachable!("never selected"),
        };
        match result {
            Ok(backend) => {
                let selection_time_ms = started.elapsed().as_millis() as u64;
                log::info!(
                    "Selected the {kind:?} backend in {selection_time_ms} ms (attempted {attempted:?})"
                );
                return Ok(BackendSelection {
                    backend,
                    kind,
                    attempted,
                    selection_time_ms,
                });
            }
            Err(e) => {
                log::warn!("Backend {kind:?} unavailable: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        RenderError::InitializationFailed("no backend families to attempt".into())
    }))
}
