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

//! End-to-end scenarios over the full engine, driven against the
//! recording backend.

use polychora_core::math::{wrap, FRAC_PI_2};
use polychora_engine::testing::{BackendOp, NullBackend};
use polychora_engine::{
    Engine, EngineConfig, EngineState, LayerRole, RelationshipEdge, VisualSystem,
};

const DT: f32 = 1.0 / 60.0;

fn config(system: VisualSystem, profile: &str) -> EngineConfig {
    EngineConfig {
        initial_system: system,
        profile_name: profile.to_string(),
        viewport: (320, 240),
        ..Default::default()
    }
}

fn engine_with(system: VisualSystem, profile: &str) -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();
    Engine::with_backend(config(system, profile), Box::new(NullBackend::new()))
        .expect("engine init")
}

fn backend(engine: &Engine) -> &NullBackend {
    engine
        .orchestrator()
        .backend()
        .as_any()
        .downcast_ref::<NullBackend>()
        .expect("recording backend")
}

fn follower_density(engine: &Engine, role: LayerRole) -> f32 {
    engine
        .orchestrator()
        .compositor()
        .expect("active layers")
        .active_set()
        .slot(role)
        .expect("slot")
        .params
        .grid_density
}

/// S1: initialize Faceted + legacy, set a few parameters, render.
#[test]
fn s1_initialize_set_and_render() {
    let mut engine = engine_with(VisualSystem::Faceted, "legacy");
    engine.set_parameter("geometry", 10.0).unwrap();
    engine.set_parameter("rot4dXW", FRAC_PI_2).unwrap();
    engine.set_parameter("hue", 200.0).unwrap();

    let stats = engine.frame(DT);
    assert!(!stats.dropped);
    assert_eq!(stats.draw_calls, 5);
    assert_eq!(engine.state(), EngineState::Active(VisualSystem::Faceted));

    assert_eq!(engine.get_parameter("geometry").unwrap(), 10.0);
    assert!((engine.get_parameter("rot4dXW").unwrap() - FRAC_PI_2).abs() < 1e-6);
    assert_eq!(engine.get_parameter("hue").unwrap(), 200.0);

    // One composite of exactly five layers reached the backend.
    let b = backend(&engine);
    match b.composites().last() {
        Some(BackendOp::Composite { layers, .. }) => assert_eq!(layers.len(), 5),
        other => panic!("expected a composite, got {other:?}"),
    }
}

/// S2: the holographic profile's worked density derivation.
#[test]
fn s2_holographic_density_derivation() {
    let mut engine = engine_with(VisualSystem::Faceted, "holographic");
    engine.set_parameter("gridDensity", 40.0).unwrap();
    engine.frame(DT);

    assert_eq!(follower_density(&engine, LayerRole::Background), 16.0);
    assert_eq!(follower_density(&engine, LayerRole::Shadow), 24.0);
    assert_eq!(follower_density(&engine, LayerRole::Content), 40.0);
    assert_eq!(follower_density(&engine, LayerRole::Highlight), 80.0);
    // 3 x 40 = 120 clamps to the density ceiling.
    assert_eq!(follower_density(&engine, LayerRole::Accent), 100.0);
}

/// S3 / R8: a mid-render system switch crossfades, then disposes
/// exactly the previous system's resources.
#[test]
fn s3_switch_system_crossfade_and_disposal() {
    let mut engine = engine_with(VisualSystem::Faceted, "holographic");
    engine.frame(DT);
    engine.switch_system("quantum").unwrap();

    engine.frame(DT);
    assert!(matches!(engine.state(), EngineState::Crossfade { .. }));
    {
        // Both adapter sets render during the fade: ten layers composite.
        let b = backend(&engine);
        match b.composites().last() {
            Some(BackendOp::Composite { layers, .. }) => assert_eq!(layers.len(), 10),
            other => panic!("expected a composite, got {other:?}"),
        }
        let (programs, buffers, _) = b.live_counts();
        assert_eq!(programs, 10);
        assert_eq!(buffers, 10);
    }

    // 40 more frames ≈ 667 ms, past the 600 ms default fade.
    for _ in 0..40 {
        engine.frame(DT);
    }
    assert_eq!(engine.state(), EngineState::Active(VisualSystem::Quantum));

    let b = backend(&engine);
    let labels = b.live_program_labels();
    assert_eq!(labels.len(), 5, "one adapter per layer");
    assert!(labels.iter().all(|l| l.starts_with("quantum/")), "{labels:?}");
    let (programs, buffers, textures) = b.live_counts();
    assert_eq!((programs, buffers), (5, 5));
    // Five layer targets plus the composite target; nothing leaked.
    assert_eq!(textures, 6);

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        polychora_core::event::EngineEvent::SystemChanged {
            system: VisualSystem::Quantum
        }
    )));
}

/// S4: two writes to one field in the same frame coalesce into one
/// derivation pass; followers see the final value.
#[test]
fn s4_same_frame_writes_coalesce() {
    let mut engine = engine_with(VisualSystem::Faceted, "holographic");
    engine.frame(DT);

    engine.set_parameter("hue", 355.0).unwrap();
    engine.set_parameter("hue", 20.0).unwrap();
    engine.frame(DT);

    assert_eq!(engine.get_parameter("hue").unwrap(), 20.0);
    // Echo followers pass hue through; both saw the final value.
    let compositor = engine.orchestrator().compositor().expect("active layers");
    let background = compositor.active_set().slot(LayerRole::Background).unwrap();
    let shadow = compositor.active_set().slot(LayerRole::Shadow).unwrap();
    assert_eq!(background.params.hue, 20.0);
    assert_eq!(shadow.params.hue, 20.0);
}

/// Batch writes land under a single version bump.
#[test]
fn batch_set_is_atomic() {
    let mut engine = engine_with(VisualSystem::Faceted, "legacy");
    engine.frame(DT);
    let version_before = engine.last_stats().store_version;

    engine
        .batch_set(&[("geometry", 7.0), ("gridDensity", 55.0), ("hue", 10.0)])
        .unwrap();
    let stats = engine.frame(DT);
    assert_eq!(stats.store_version, version_before + 1);
    assert_eq!(engine.get_parameter("geometry").unwrap(), 7.0);
    assert_eq!(engine.get_parameter("gridDensity").unwrap(), 55.0);
}

/// S6: a relationship edge replaced while the keystone animates keeps
/// tracking frame by frame.
#[test]
fn s6_harmonic_highlight_tracks_keystone() {
    let mut engine = engine_with(VisualSystem::Faceted, "legacy");
    engine
        .set_relationship(LayerRole::Highlight, RelationshipEdge::Harmonic { multiple: 3.0 })
        .unwrap();

    for i in 0..60 {
        let density = 10.0 + i as f32;
        let hue = (i as f32 * 6.0) % 360.0;
        engine.set_parameter("gridDensity", density).unwrap();
        engine.set_parameter("hue", hue).unwrap();
        engine.frame(DT);

        let slot = engine
            .orchestrator()
            .compositor()
            .expect("active layers")
            .active_set()
            .slot(LayerRole::Highlight)
            .unwrap();
        let expected_density = (3.0 * density).clamp(4.0, 100.0);
        assert_eq!(slot.params.grid_density, expected_density, "frame {i}");
        let expected_hue = wrap(hue + 3.0 * 137.508, 360.0);
        assert!(
            (slot.params.hue - expected_hue).abs() < 1e-3,
            "frame {i}: {} vs {expected_hue}",
            slot.params.hue
        );
    }
}

/// R6: no profile switch may push any layer out of its domains.
#[test]
fn r6_profile_switches_keep_layers_valid() {
    let mut engine = engine_with(VisualSystem::Faceted, "holographic");
    engine.set_parameter("gridDensity", 97.0).unwrap();
    engine.set_parameter("hue", 359.0).unwrap();
    engine.set_parameter("intensity", 1.0).unwrap();
    engine.frame(DT);

    for profile in ["symmetry", "chord", "storm", "legacy", "holographic"] {
        engine.set_profile(profile).unwrap();
        let stats = engine.frame(DT);
        assert!(!stats.dropped, "{profile}");
        for role in LayerRole::ALL {
            let slot = engine
                .orchestrator()
                .compositor()
                .expect("active layers")
                .active_set()
                .slot(role)
                .unwrap();
            assert!(slot.params.is_valid(), "{profile}/{role} left its domain");
        }
    }
}

/// The keystone can move; the graph stays total and derivation follows
/// the new keystone.
#[test]
fn keystone_can_move_between_roles() {
    let mut engine = engine_with(VisualSystem::Faceted, "holographic");
    engine.set_keystone(LayerRole::Accent);
    engine.set_parameter("gridDensity", 50.0).unwrap();
    engine.frame(DT);

    let record = engine.get_layer_config();
    assert_eq!(record.keystone, LayerRole::Accent);
    assert_eq!(follower_density(&engine, LayerRole::Accent), 50.0);
}

/// The layer configuration survives a JSON round trip and can be loaded
/// back as a profile.
#[test]
fn layer_config_round_trips_through_json() {
    let mut engine = engine_with(VisualSystem::Faceted, "storm");
    let record = engine.get_layer_config();
    let json = serde_json::to_string(&record).unwrap();
    let parsed: polychora_engine::ProfileRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);

    // Load it into an engine running a different profile.
    let mut other = engine_with(VisualSystem::Faceted, "legacy");
    other.set_profile_record(parsed).unwrap();
    other.frame(DT);
    assert_eq!(other.get_layer_config(), record);
    engine.frame(DT);
}

/// A role may run a different system renderer than its siblings.
#[test]
fn per_layer_system_assignment() {
    let mut engine = engine_with(VisualSystem::Quantum, "holographic");
    engine.frame(DT);
    engine
        .set_layer_system(LayerRole::Highlight, "holographic")
        .unwrap();
    let stats = engine.frame(DT);
    assert!(!stats.dropped);

    let b = backend(&engine);
    let mut labels = b.live_program_labels();
    labels.sort();
    let quantum = labels.iter().filter(|l| l.starts_with("quantum/")).count();
    let holo = labels
        .iter()
        .filter(|l| l.starts_with("holographic/"))
        .count();
    assert_eq!((quantum, holo), (4, 1), "{labels:?}");
}

/// Pointer and audio samples flow into uniforms; unknown parameter
/// names are rejected without touching state.
#[test]
fn inputs_and_rejections() {
    let mut engine = engine_with(VisualSystem::Faceted, "legacy");
    engine.push_input(polychora_engine::input::InputSample::Audio(
        polychora_engine::input::AudioBands {
            bass: 0.9,
            mid: 0.4,
            high: 0.2,
        },
    ));
    engine.frame(DT);

    let b = backend(&engine);
    let record = b.last_uniforms_record().expect("uniforms uploaded");
    assert!((record.bass - 0.9).abs() < 1e-6);

    assert!(engine.set_parameter("density", 10.0).is_err());
    assert!(engine.set_parameter("chaos", f32::NAN).is_err());
    assert_eq!(engine.get_parameter("chaos").unwrap(), 0.2);
}

/// Parameter-change and system-change callbacks fire.
#[test]
fn callbacks_fire() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut engine = engine_with(VisualSystem::Faceted, "legacy");
    let param_hits = Rc::new(RefCell::new(0u32));
    let system_hits = Rc::new(RefCell::new(Vec::new()));

    let hits = param_hits.clone();
    engine.on_parameter_change(Box::new(move |keys, _version| {
        *hits.borrow_mut() += keys.len() as u32;
    }));
    let switches = system_hits.clone();
    engine.on_system_change(Box::new(move |system| {
        switches.borrow_mut().push(system);
    }));

    engine.set_parameter("hue", 42.0).unwrap();
    engine.frame(DT);
    assert_eq!(*param_hits.borrow(), 1);

    engine.switch_system("holographic").unwrap();
    for _ in 0..45 {
        engine.frame(DT);
    }
    assert_eq!(system_hits.borrow().as_slice(), &[VisualSystem::Holographic]);
}

/// Dispose is idempotent and releases everything.
#[test]
fn dispose_is_idempotent() {
    let mut engine = engine_with(VisualSystem::Faceted, "legacy");
    engine.frame(DT);
    engine.dispose();
    engine.dispose();
    let b = backend(&engine);
    assert_eq!(b.live_counts(), (0, 0, 0));
}
