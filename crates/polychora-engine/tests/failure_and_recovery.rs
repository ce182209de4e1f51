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

//! The failure model end-to-end: shader compile failures disable one
//! system, context loss recovers, render errors drop single frames.

use polychora_core::event::EngineEvent;
use polychora_core::GraphicsBackend;
use polychora_engine::orchestrator::Orchestrator;
use polychora_engine::testing::{BackendOp, NullBackend};
use polychora_engine::{
    Engine, EngineConfig, EngineState, InitError, SwitchError, VisualSystem,
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

fn backend(engine: &Engine) -> &NullBackend {
    engine
        .orchestrator()
        .backend()
        .as_any()
        .downcast_ref::<NullBackend>()
        .expect("recording backend")
}

/// The orchestrator comes up `Ready` — backend owned, shaders verified,
/// no adapter sets — and only `activate` moves it to `Active`.
#[test]
fn ready_state_precedes_activation() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = config(VisualSystem::Faceted, "legacy");
    let mut orchestrator =
        Orchestrator::ready(&config, Box::new(NullBackend::new())).unwrap();
    assert_eq!(orchestrator.state(), EngineState::Ready);
    assert!(orchestrator.compositor().is_none());

    // The loop runs in Ready; nothing renders and nothing drops.
    let stats = orchestrator.frame(DT);
    assert!(!stats.dropped);
    assert_eq!(stats.draw_calls, 0);

    // Switching needs an active system.
    assert!(matches!(
        orchestrator.switch_system(VisualSystem::Quantum),
        Err(SwitchError::NotActive)
    ));

    orchestrator.activate(VisualSystem::Faceted).unwrap();
    assert_eq!(
        orchestrator.state(),
        EngineState::Active(VisualSystem::Faceted)
    );
    assert_eq!(orchestrator.frame(DT).draw_calls, 5);
}

/// The one-shot constructor runs both phases back to back: hosts first
/// observe `Active`, before any frame has run.
#[test]
fn with_backend_passes_through_ready_to_active() {
    let engine = Engine::with_backend(
        config(VisualSystem::Faceted, "legacy"),
        Box::new(NullBackend::new()),
    )
    .unwrap();
    assert_eq!(engine.state(), EngineState::Active(VisualSystem::Faceted));
}

/// A failed activation disables that system and falls back to `Ready`,
/// leaving the backend usable for another system.
#[test]
fn failed_activation_leaves_ready_for_another_system() {
    let mut failing = NullBackend::new();
    failing.fail_program_labels.push("faceted".to_string());
    let config = config(VisualSystem::Faceted, "legacy");
    let mut orchestrator = Orchestrator::ready(&config, Box::new(failing)).unwrap();

    assert!(matches!(
        orchestrator.activate(VisualSystem::Faceted),
        Err(InitError::System {
            system: VisualSystem::Faceted,
            ..
        })
    ));
    assert_eq!(orchestrator.state(), EngineState::Ready);

    // The failed system stays disabled; a different one activates.
    assert!(orchestrator.activate(VisualSystem::Faceted).is_err());
    orchestrator.activate(VisualSystem::Quantum).unwrap();
    assert_eq!(
        orchestrator.state(),
        EngineState::Active(VisualSystem::Quantum)
    );
    assert_eq!(orchestrator.frame(DT).draw_calls, 5);
}

/// S5 / R9: context loss drops one frame, restore rebuilds every
/// resource and the next frame renders.
#[test]
fn context_loss_recovers_within_two_frames() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = Engine::with_backend(
        config(VisualSystem::Holographic, "holographic"),
        Box::new(NullBackend::new()),
    )
    .unwrap();
    for _ in 0..3 {
        assert!(!engine.frame(DT).dropped);
    }

    engine.simulate_context_loss();
    let loss_frame = engine.frame(DT);
    assert!(loss_frame.dropped, "the loss frame shows the previous blit");

    let restored_frame = engine.frame(DT);
    assert!(!restored_frame.dropped, "the frame after restore renders");

    let b = backend(&engine);
    assert!(!b.context_lost());
    // Resource reconstruction: one adapter per layer again, no leak.
    assert_eq!(b.live_counts(), (5, 5, 6));
    assert!(b.ops.iter().any(|op| matches!(op, BackendOp::Restore)));

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(e, EngineEvent::ContextLost)));
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::ContextRestored)));
}

/// A system whose shader fails to compile is disabled; the engine and
/// the other systems continue.
#[test]
fn failing_system_is_disabled_others_continue() {
    let mut failing = NullBackend::new();
    failing.fail_program_labels.push("holographic".to_string());
    let mut engine = Engine::with_backend(
        config(VisualSystem::Faceted, "legacy"),
        Box::new(failing),
    )
    .unwrap();
    engine.frame(DT);

    engine.switch_system("holographic").unwrap();
    let stats = engine.frame(DT);
    assert!(!stats.dropped, "the active system keeps rendering");
    assert_eq!(engine.state(), EngineState::Active(VisualSystem::Faceted));

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::SystemFailed {
            system: VisualSystem::Holographic,
            ..
        }
    )));

    // Further switches to the failed system are rejected without state
    // change; other systems still switch fine.
    assert!(matches!(
        engine.switch_system("holographic"),
        Err(SwitchError::SystemDisabled(VisualSystem::Holographic))
    ));
    engine.switch_system("quantum").unwrap();
    for _ in 0..45 {
        engine.frame(DT);
    }
    assert_eq!(engine.state(), EngineState::Active(VisualSystem::Quantum));

    // No half-created holographic resources were left behind.
    let b = backend(&engine);
    assert!(b
        .live_program_labels()
        .iter()
        .all(|l| !l.contains("holographic")));
}

/// An initial system that cannot create resources fails initialize with
/// a typed error.
#[test]
fn initialize_fails_when_initial_system_cannot_build() {
    let mut failing = NullBackend::new();
    failing.fail_program_labels.push("faceted".to_string());
    let result = Engine::with_backend(
        config(VisualSystem::Faceted, "legacy"),
        Box::new(failing),
    );
    assert!(matches!(
        result,
        Err(InitError::System {
            system: VisualSystem::Faceted,
            ..
        })
    ));
}

/// An unknown profile name fails initialize with a typed error.
#[test]
fn initialize_fails_on_unknown_profile() {
    let result = Engine::with_backend(
        config(VisualSystem::Faceted, "vaporwave"),
        Box::new(NullBackend::new()),
    );
    assert!(matches!(result, Err(InitError::Profile(_))));
}

/// Render-tick failures drop the frame and emit telemetry; the engine
/// stays alive.
#[test]
fn render_failures_drop_frames_not_the_engine() {
    let mut failing = NullBackend::new();
    failing.fail_draws = true;
    let mut engine = Engine::with_backend(
        config(VisualSystem::Faceted, "legacy"),
        Box::new(failing),
    )
    .unwrap();

    for _ in 0..3 {
        let stats = engine.frame(DT);
        assert!(stats.dropped);
        assert_eq!(stats.draw_calls, 0);
    }
    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::FrameDropped { .. })));
    // Parameter state is untouched by dropped frames.
    assert_eq!(engine.get_parameter("gridDensity").unwrap(), 15.0);
}

/// A pending switch can be cancelled before its first crossfade frame;
/// a running crossfade cannot.
#[test]
fn pending_switch_is_cancellable_until_crossfade_starts() {
    let config = config(VisualSystem::Faceted, "legacy");
    let mut orchestrator =
        Orchestrator::with_backend(&config, Box::new(NullBackend::new())).unwrap();

    orchestrator.switch_system(VisualSystem::Quantum).unwrap();
    assert!(orchestrator.cancel_pending_switch());
    orchestrator.frame(DT);
    assert_eq!(
        orchestrator.state(),
        EngineState::Active(VisualSystem::Faceted)
    );

    // Once the crossfade is running there is nothing pending to cancel,
    // and a second switch is refused until completion.
    orchestrator.switch_system(VisualSystem::Quantum).unwrap();
    orchestrator.frame(DT);
    assert!(!orchestrator.cancel_pending_switch());
    assert!(matches!(
        orchestrator.switch_system(VisualSystem::Holographic),
        Err(SwitchError::SwitchInProgress)
    ));
    for _ in 0..45 {
        orchestrator.frame(DT);
    }
    assert_eq!(
        orchestrator.state(),
        EngineState::Active(VisualSystem::Quantum)
    );
}

/// Switching to the already-active system is a typed error, as is an
/// unknown name.
#[test]
fn switch_rejections() {
    let mut engine = Engine::with_backend(
        config(VisualSystem::Faceted, "legacy"),
        Box::new(NullBackend::new()),
    )
    .unwrap();
    assert!(matches!(
        engine.switch_system("faceted"),
        Err(SwitchError::AlreadyActive(VisualSystem::Faceted))
    ));
    assert!(matches!(
        engine.switch_system("plasma"),
        Err(SwitchError::UnknownSystem(_))
    ));
}
