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

//! The keystone→follower graph, its named profiles and its serialized
//! record form.

use super::relationship::RelationshipEdge;
use super::{LayerRole, ProfileError};
use crate::params::{ParamKey, ParameterSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The profile record schema version this build reads and writes.
pub const PROFILE_SCHEMA_VERSION: u32 = 1;

/// The relationship graph: one keystone, one inbound edge per follower.
///
/// The invariant — exactly one keystone, every non-keystone role has
/// exactly one inbound edge — holds by construction: edges live in a
/// per-role map, the keystone has no entry, and every mutation that
/// could orphan a role inserts a passthrough edge instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRelationshipGraph {
    keystone: LayerRole,
    edges: BTreeMap<LayerRole, RelationshipEdge>,
}

impl LayerRelationshipGraph {
    /// A passthrough edge for roles nothing more specific was asked of.
    const PASSTHROUGH: RelationshipEdge = RelationshipEdge::Echo { attenuation: 1.0 };

    /// Creates a graph with the given keystone and passthrough followers.
    pub fn new(keystone: LayerRole) -> Self {
        let mut graph = Self {
            keystone,
            edges: BTreeMap::new(),
        };
        for role in LayerRole::ALL {
            if role != keystone {
                graph.edges.insert(role, Self::PASSTHROUGH);
            }
        }
        graph
    }

    /// Builds one of the named profiles.
    pub fn profile(name: &str) -> Result<Self, ProfileError> {
        use RelationshipEdge::{Chase, Complement, Echo, Harmonic, Mirror, Reactive};
        let mut graph = Self::new(LayerRole::Content);
        let edges: [(LayerRole, RelationshipEdge); 4] = match name {
            "holographic" => [
                (LayerRole::Background, Echo { attenuation: 0.4 }),
                (LayerRole::Shadow, Echo { attenuation: 0.6 }),
                (LayerRole::Highlight, Harmonic { multiple: 2.0 }),
                (LayerRole::Accent, Harmonic { multiple: 3.0 }),
            ],
            "symmetry" => [
                (LayerRole::Background, Echo { attenuation: 0.5 }),
                (LayerRole::Shadow, Mirror),
                (LayerRole::Highlight, Mirror),
                (LayerRole::Accent, Complement { pivot: 50.0 }),
            ],
            "chord" => [
                (LayerRole::Background, Harmonic { multiple: 1.5 }),
                (LayerRole::Shadow, Harmonic { multiple: 2.0 }),
                (LayerRole::Highlight, Harmonic { multiple: 3.0 }),
                (LayerRole::Accent, Harmonic { multiple: 5.0 }),
            ],
            "storm" => [
                (LayerRole::Background, Chase { lag: 0.5 }),
                (LayerRole::Shadow, Reactive { gain: 1.2 }),
                (LayerRole::Highlight, Reactive { gain: 0.8 }),
                (LayerRole::Accent, Chase { lag: 0.1 }),
            ],
            // The historical static-multiplier behaviour.
            "legacy" => [
                (LayerRole::Background, Echo { attenuation: 0.4 }),
                (LayerRole::Shadow, Echo { attenuation: 0.6 }),
                (LayerRole::Highlight, Echo { attenuation: 1.2 }),
                (LayerRole::Accent, Echo { attenuation: 1.5 }),
            ],
            other => return Err(ProfileError::UnknownProfile(other.to_string())),
        };
        for (role, edge) in edges {
            graph.edges.insert(role, edge);
        }
        Ok(graph)
    }

    /// The names [`LayerRelationshipGraph::profile`] accepts.
    pub const PROFILE_NAMES: [&'static str; 5] =
        ["holographic", "symmetry", "chord", "storm", "legacy"];

    /// The keystone role.
    #[inline]
    pub fn keystone(&self) -> LayerRole {
        self.keystone
    }

    /// The inbound edge of a follower role; `None` for the keystone.
    pub fn edge(&self, role: LayerRole) -> Option<&RelationshipEdge> {
        self.edges.get(&role)
    }

    /// Replaces a follower's inbound edge.
    pub fn set_relationship(
        &mut self,
        role: LayerRole,
        edge: RelationshipEdge,
    ) -> Result<(), ProfileError> {
        if role == self.keystone {
            return Err(ProfileError::KeystoneEdge { role });
        }
        self.edges.insert(role, edge);
        Ok(())
    }

    /// Moves the keystone to another role.
    ///
    /// The old keystone becomes a passthrough follower; the new keystone
    /// loses its inbound edge.
    pub fn set_keystone(&mut self, role: LayerRole) {
        if role == self.keystone {
            return;
        }
        self.edges.insert(self.keystone, Self::PASSTHROUGH);
        self.edges.remove(&role);
        self.keystone = role;
    }

    /// Derives all five per-role sets for this tick.
    ///
    /// Exactly one call per frame: the stateful edges read and update
    /// `state`, so a second call within a tick would double-integrate.
    pub fn derive_all(
        &self,
        keystone_params: &ParameterSet,
        state: &mut DerivationState,
        dirty: &BTreeSet<ParamKey>,
        dt: f32,
    ) -> BTreeMap<LayerRole, ParameterSet> {
        let mut derived = BTreeMap::new();
        for role in LayerRole::ALL {
            let params = if role == self.keystone {
                *keystone_params
            } else {
                // Roles always carry an edge; fall back to passthrough
                // defensively rather than panic if one ever goes missing.
                let edge = self.edges.get(&role).unwrap_or(&Self::PASSTHROUGH);
                let prev_follower = state
                    .followers
                    .get(&role)
                    .copied()
                    .unwrap_or(*keystone_params);
                edge.derive(
                    keystone_params,
                    &state.prev_keystone,
                    &prev_follower,
                    dirty,
                    dt,
                )
            };
            derived.insert(role, params);
        }
        state.prev_keystone = *keystone_params;
        state.followers = derived.clone();
        derived
    }

    /// Serializes the graph to its record form.
    pub fn to_record(&self) -> ProfileRecord {
        ProfileRecord {
            schema_version: PROFILE_SCHEMA_VERSION,
            keystone: self.keystone,
            edges: self.edges.clone(),
        }
    }

    /// Rebuilds a graph from a record, validating the graph invariant.
    pub fn from_record(record: ProfileRecord) -> Result<Self, ProfileError> {
        if record.schema_version > PROFILE_SCHEMA_VERSION {
            return Err(ProfileError::UnsupportedSchema {
                found: record.schema_version,
            });
        }
        if record.edges.contains_key(&record.keystone) {
            return Err(ProfileError::KeystoneEdge {
                role: record.keystone,
            });
        }
        for role in LayerRole::ALL {
            if role != record.keystone && !record.edges.contains_key(&role) {
                return Err(ProfileError::OrphanRole { role });
            }
        }
        Ok(Self {
            keystone: record.keystone,
            edges: record.edges,
        })
    }
}

impl Default for LayerRelationshipGraph {
    fn default() -> Self {
        // The engine's default profile.
        Self::profile("holographic").expect("built-in profile")
    }
}

/// The serialized graph: keystone, ordered role→edge map, version tag.
///
/// Forward-compatible: unknown fields in a stored record are ignored on
/// load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// The record's schema version.
    pub schema_version: u32,
    /// The keystone role.
    pub keystone: LayerRole,
    /// Follower role → inbound edge.
    pub edges: BTreeMap<LayerRole, RelationshipEdge>,
}

/// Cross-tick state of the stateful relationship kinds.
///
/// Reset on profile switches so Reactive sees no phantom delta and Chase
/// starts from the keystone instead of lagging in from stale values.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivationState {
    prev_keystone: ParameterSet,
    followers: BTreeMap<LayerRole, ParameterSet>,
}

impl DerivationState {
    /// Creates state snapped to the given keystone set.
    pub fn snapped_to(keystone: &ParameterSet) -> Self {
        Self {
            prev_keystone: *keystone,
            followers: LayerRole::ALL
                .into_iter()
                .map(|role| (role, *keystone))
                .collect(),
        }
    }

    /// Re-snaps every follower to the keystone (profile switch).
    pub fn reset(&mut self, keystone: &ParameterSet) {
        *self = Self::snapped_to(keystone);
    }

    /// The last derived set for a role, if any.
    pub fn follower(&self, role: LayerRole) -> Option<&ParameterSet> {
        self.followers.get(&role)
    }
}

impl Default for DerivationState {
    fn default() -> Self {
        Self::snapped_to(&ParameterSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn profiles_build_and_cover_all_roles() {
        for name in LayerRelationshipGraph::PROFILE_NAMES {
            let graph = LayerRelationshipGraph::profile(name).unwrap();
            assert_eq!(graph.keystone(), LayerRole::Content);
            for role in LayerRole::ALL {
                if role != LayerRole::Content {
                    assert!(graph.edge(role).is_some(), "{name}: {role} orphaned");
                }
            }
        }
        assert!(LayerRelationshipGraph::profile("vaporwave").is_err());
    }

    /// Keystone density 40 under `holographic`: followers land on 16,
    /// 24, 80 and the clamped ceiling.
    #[test]
    fn holographic_density_derivation() {
        let graph = LayerRelationshipGraph::profile("holographic").unwrap();
        let mut k = ParameterSet::default();
        k.set(ParamKey::GridDensity, 40.0);
        let mut state = DerivationState::snapped_to(&k);
        let derived = graph.derive_all(&k, &mut state, &BTreeSet::new(), 1.0 / 60.0);

        assert_eq!(derived[&LayerRole::Background].grid_density, 16.0);
        assert_eq!(derived[&LayerRole::Shadow].grid_density, 24.0);
        assert_eq!(derived[&LayerRole::Content].grid_density, 40.0);
        assert_eq!(derived[&LayerRole::Highlight].grid_density, 80.0);
        // 3 * 40 = 120 exceeds the domain and clamps.
        assert_eq!(derived[&LayerRole::Accent].grid_density, 100.0);
    }

    #[test]
    fn keystone_cannot_take_an_edge() {
        let mut graph = LayerRelationshipGraph::default();
        let err = graph
            .set_relationship(LayerRole::Content, RelationshipEdge::Mirror)
            .unwrap_err();
        assert!(matches!(err, ProfileError::KeystoneEdge { .. }));
    }

    #[test]
    fn moving_the_keystone_keeps_the_graph_total() {
        let mut graph = LayerRelationshipGraph::default();
        graph.set_keystone(LayerRole::Accent);
        assert_eq!(graph.keystone(), LayerRole::Accent);
        assert!(graph.edge(LayerRole::Accent).is_none());
        assert!(graph.edge(LayerRole::Content).is_some());
        // Round-trip through the record still validates.
        let record = graph.to_record();
        assert_eq!(LayerRelationshipGraph::from_record(record).unwrap(), graph);
    }

    #[test]
    fn record_round_trips_through_json() {
        let graph = LayerRelationshipGraph::profile("storm").unwrap();
        let json = serde_json::to_string(&graph.to_record()).unwrap();
        let restored =
            LayerRelationshipGraph::from_record(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, graph);
    }

    #[test]
    fn record_with_orphan_is_rejected() {
        let mut record = LayerRelationshipGraph::default().to_record();
        record.edges.remove(&LayerRole::Shadow);
        assert!(matches!(
            LayerRelationshipGraph::from_record(record),
            Err(ProfileError::OrphanRole {
                role: LayerRole::Shadow
            })
        ));
    }

    #[test]
    fn unknown_record_fields_are_ignored() {
        let json = r#"{
            "schema_version": 1,
            "keystone": "content",
            "edges": {
                "background": {"kind": "echo", "config": {"attenuation": 0.4}},
                "shadow": {"kind": "mirror"},
                "highlight": {"kind": "harmonic", "config": {"multiple": 2.0}},
                "accent": {"kind": "chase", "config": {"lag": 0.25}}
            },
            "gallery_hint": "ignored-by-this-build"
        }"#;
        let record: ProfileRecord = serde_json::from_str(json).unwrap();
        assert!(LayerRelationshipGraph::from_record(record).is_ok());
    }

    #[test]
    fn derivation_is_stable_when_nothing_changes() {
        let graph = LayerRelationshipGraph::profile("storm").unwrap();
        let k = ParameterSet::default();
        let mut state = DerivationState::snapped_to(&k);
        let first = graph.derive_all(&k, &mut state, &BTreeSet::new(), 1.0 / 60.0);
        let second = graph.derive_all(&k, &mut state, &BTreeSet::new(), 1.0 / 60.0);
        for role in LayerRole::ALL {
            assert_abs_diff_eq!(
                first[&role].grid_density,
                second[&role].grid_density,
                epsilon = 1e-5
            );
        }
    }
}
