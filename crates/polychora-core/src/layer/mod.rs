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

//! Layer roles and the keystone→follower relationship graph.
//!
//! Five layers are composited per frame. One of them — the keystone,
//! Content by default — carries the externally-set parameter set; the
//! other four derive theirs from it through named relationship functions,
//! so a single knob movement re-coordinates the whole stack.

mod graph;
mod relationship;

pub use graph::{DerivationState, LayerRelationshipGraph, ProfileRecord, PROFILE_SCHEMA_VERSION};
pub use relationship::RelationshipEdge;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five compositing roles, in back-to-front order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    /// Bottom of the stack; dim, slow context.
    Background,
    /// Darkening echo under the content.
    Shadow,
    /// The primary layer; default keystone.
    Content,
    /// Brightening echo over the content.
    Highlight,
    /// Sparse additive accents on top.
    Accent,
}

impl LayerRole {
    /// All roles in composite (back-to-front) order.
    pub const ALL: [Self; 5] = [
        Self::Background,
        Self::Shadow,
        Self::Content,
        Self::Highlight,
        Self::Accent,
    ];

    /// The integer tag crossing the uniform boundary (0..=4).
    #[inline]
    pub fn tag(self) -> u32 {
        match self {
            Self::Background => 0,
            Self::Shadow => 1,
            Self::Content => 2,
            Self::Highlight => 3,
            Self::Accent => 4,
        }
    }

    /// The role's wire/API name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Shadow => "shadow",
            Self::Content => "content",
            Self::Highlight => "highlight",
            Self::Accent => "accent",
        }
    }

    /// Looks a role up by its wire/API name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error from profile or relationship configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// The named profile does not exist.
    UnknownProfile(String),
    /// The named role does not exist.
    UnknownRole(String),
    /// An edge was aimed at the keystone role, which has no inbound edge.
    KeystoneEdge {
        /// The keystone role the edge was aimed at.
        role: LayerRole,
    },
    /// A loaded record leaves a non-keystone role without an inbound edge.
    OrphanRole {
        /// The role missing its edge.
        role: LayerRole,
    },
    /// A loaded record carries a schema version this build cannot read.
    UnsupportedSchema {
        /// The record's schema version.
        found: u32,
    },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::UnknownProfile(name) => write!(f, "Unknown profile '{name}'"),
            ProfileError::UnknownRole(name) => write!(f, "Unknown layer role '{name}'"),
            ProfileError::KeystoneEdge { role } => {
                write!(f, "Role '{role}' is the keystone and cannot have an inbound edge")
            }
            ProfileError::OrphanRole { role } => {
                write!(f, "Role '{role}' has no inbound relationship edge")
            }
            ProfileError::UnsupportedSchema { found } => {
                write!(f, "Unsupported profile schema version {found}")
            }
        }
    }
}

impl std::error::Error for ProfileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tags_are_composite_order() {
        for (i, role) in LayerRole::ALL.iter().enumerate() {
            assert_eq!(role.tag() as usize, i);
        }
    }

    #[test]
    fn role_names_round_trip() {
        for role in LayerRole::ALL {
            assert_eq!(LayerRole::from_name(role.name()), Some(role));
        }
        assert_eq!(LayerRole::from_name("Highlight"), Some(LayerRole::Highlight));
        assert_eq!(LayerRole::from_name("overlay"), None);
    }
}
