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

//! The versioned, dirty-tracking parameter store.

use super::{ParamError, ParamKey, ParameterSet};
use std::collections::BTreeSet;

/// Owns the keystone [`ParameterSet`] and tracks change visibility.
///
/// Every accepted write bumps a monotonic version counter and marks the
/// written keys dirty; the frame loop drains the dirty set once per tick
/// to decide whether a derivation pass is due and which fields the
/// Reactive relationship should respond to. Rejected writes (NaN/Inf,
/// unknown names) leave both untouched.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    current: ParameterSet,
    version: u64,
    dirty: BTreeSet<ParamKey>,
}

impl ParameterStore {
    /// Creates a store holding the default parameter set.
    pub fn new() -> Self {
        Self {
            current: ParameterSet::default(),
            version: 0,
            dirty: BTreeSet::new(),
        }
    }

    /// The current parameter values.
    #[inline]
    pub fn current(&self) -> &ParameterSet {
        &self.current
    }

    /// The monotonic version counter. Strictly increases with every
    /// accepted write; downstream caches compare against it to detect
    /// staleness.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Reads one field by key.
    #[inline]
    pub fn get(&self, key: ParamKey) -> f32 {
        self.current.get(key)
    }

    /// Reads one field by canonical name.
    pub fn get_by_name(&self, name: &str) -> Result<f32, ParamError> {
        let key = ParamKey::from_name(name).ok_or_else(|| ParamError::UnknownName(name.into()))?;
        Ok(self.get(key))
    }

    /// Writes one field, folding the value into the key's domain.
    pub fn set(&mut self, key: ParamKey, value: f32) -> Result<(), ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NonFinite { key });
        }
        self.current.set(key, value);
        self.dirty.insert(key);
        self.version += 1;
        Ok(())
    }

    /// Writes one field by canonical name.
    pub fn set_by_name(&mut self, name: &str, value: f32) -> Result<(), ParamError> {
        let key = ParamKey::from_name(name).ok_or_else(|| ParamError::UnknownName(name.into()))?;
        self.set(key, value)
    }

    /// Writes several fields atomically under a single version bump.
    ///
    /// Either every entry is accepted or none is: a non-finite value or
    /// unknown name anywhere in the batch rejects the whole batch so a
    /// partially-applied update can never render.
    pub fn set_many(&mut self, entries: &[(ParamKey, f32)]) -> Result<(), ParamError> {
        for &(key, value) in entries {
            if !value.is_finite() {
                return Err(ParamError::NonFinite { key });
            }
        }
        for &(key, value) in entries {
            self.current.set(key, value);
            self.dirty.insert(key);
        }
        if !entries.is_empty() {
            self.version += 1;
        }
        Ok(())
    }

    /// Returns a copy of the current set.
    #[inline]
    pub fn snapshot(&self) -> ParameterSet {
        self.current
    }

    /// Replaces the whole set (sanitized), marking every field dirty.
    pub fn restore(&mut self, mut set: ParameterSet) {
        set.sanitize();
        self.current = set;
        self.dirty.extend(ParamKey::ALL);
        self.version += 1;
    }

    /// Restores the default parameter set.
    pub fn reset(&mut self) {
        self.restore(ParameterSet::default());
    }

    /// Redraws every field uniformly from its domain.
    pub fn randomize(&mut self) {
        let mut set = self.current;
        set.randomize_with(&mut rand::rng());
        self.restore(set);
    }

    /// Drains and returns the keys written since the last drain.
    pub fn take_dirty(&mut self) -> BTreeSet<ParamKey> {
        std::mem::take(&mut self.dirty)
    }

    /// True when writes have accumulated since the last drain.
    #[inline]
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_and_bumps_version() {
        let mut store = ParameterStore::new();
        let v0 = store.version();
        store.set(ParamKey::GridDensity, 250.0).unwrap();
        assert_eq!(store.get(ParamKey::GridDensity), 100.0);
        assert_eq!(store.version(), v0 + 1);
    }

    #[test]
    fn non_finite_is_a_no_op() {
        let mut store = ParameterStore::new();
        let v0 = store.version();
        let before = store.snapshot();
        assert!(store.set(ParamKey::Chaos, f32::NAN).is_err());
        assert!(store.set(ParamKey::Hue, f32::INFINITY).is_err());
        assert!(store.set(ParamKey::Speed, f32::NEG_INFINITY).is_err());
        assert_eq!(store.version(), v0);
        assert_eq!(store.snapshot(), before);
        assert!(!store.has_dirty());
    }

    #[test]
    fn hue_wraps_modulo_360() {
        let mut store = ParameterStore::new();
        store.set(ParamKey::Hue, 355.0).unwrap();
        store.set(ParamKey::Hue, 380.0).unwrap();
        assert!((store.get(ParamKey::Hue) - 20.0).abs() < 1e-4);
        store.set(ParamKey::Hue, -90.0).unwrap();
        assert!((store.get(ParamKey::Hue) - 270.0).abs() < 1e-4);
    }

    #[test]
    fn batch_set_is_one_version_bump() {
        let mut store = ParameterStore::new();
        let v0 = store.version();
        store
            .set_many(&[
                (ParamKey::Geometry, 10.0),
                (ParamKey::Rot4dXW, crate::math::FRAC_PI_2),
                (ParamKey::Hue, 200.0),
            ])
            .unwrap();
        assert_eq!(store.version(), v0 + 1);
        assert_eq!(store.take_dirty().len(), 3);
    }

    #[test]
    fn batch_set_rejects_atomically() {
        let mut store = ParameterStore::new();
        let before = store.snapshot();
        let v0 = store.version();
        let result = store.set_many(&[(ParamKey::Geometry, 5.0), (ParamKey::Chaos, f32::NAN)]);
        assert!(result.is_err());
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.version(), v0);
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let mut store = ParameterStore::new();
        store.set(ParamKey::MorphFactor, 1.7).unwrap();
        let snap = store.snapshot();
        store.reset();
        assert_ne!(store.snapshot(), snap);
        store.restore(snap);
        assert_eq!(store.snapshot(), snap);
    }

    #[test]
    fn dirty_drains_once() {
        let mut store = ParameterStore::new();
        store.set(ParamKey::Hue, 10.0).unwrap();
        assert!(store.has_dirty());
        let dirty = store.take_dirty();
        assert!(dirty.contains(&ParamKey::Hue));
        assert!(!store.has_dirty());
    }
}
