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

//! Event definitions and the decoupled publish/subscribe bus.

mod bus;

pub use bus::EventBus;

use crate::layer::LayerRole;
use crate::params::ParamKey;
use crate::renderer::VisualSystem;

/// Engine-level events surfaced to hosts through the event bus.
///
/// These are notifications, not commands: hosts read them off the
/// receiver, they never mutate engine state.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// One or more parameters were accepted this tick.
    ParameterChanged {
        /// The keys written.
        keys: Vec<ParamKey>,
        /// The store version after the writes.
        version: u64,
    },
    /// A system switch completed (crossfade finished).
    SystemChanged {
        /// The system now active.
        system: VisualSystem,
    },
    /// The relationship profile changed at a frame boundary.
    ProfileChanged {
        /// The new keystone role.
        keystone: LayerRole,
    },
    /// The GPU context was lost; resources are invalid until restore.
    ContextLost,
    /// The GPU context was restored and resources rebuilt.
    ContextRestored,
    /// A render tick failed and its frame was dropped.
    FrameDropped {
        /// The frame number that was dropped.
        frame: u64,
        /// The failure, formatted.
        reason: String,
    },
    /// A system failed (shader compile or resource creation) and was
    /// disabled; the rest of the engine continues.
    SystemFailed {
        /// The disabled system.
        system: VisualSystem,
        /// The failure, formatted.
        reason: String,
    },
}
