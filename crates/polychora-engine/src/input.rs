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

//! Reactivity inputs: pointer, tilt and audio-band fan-in.
//!
//! Inputs arrive on the command queue at whatever rate the host fires
//! them; the orchestrator drains them through a 120 Hz aggregate budget
//! and folds the survivors into smoothed per-frame reactivity values.

/// A pointer movement/press sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Normalized x in [0, 1].
    pub x: f32,
    /// Normalized y in [0, 1].
    pub y: f32,
    /// Movement energy of this sample, [0, 1].
    pub intensity: f32,
    /// True when this sample is a press/click.
    pub click: bool,
}

/// A device-orientation sample, radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltInput {
    /// Rotation around the screen normal.
    pub alpha: f32,
    /// Front-back tilt.
    pub beta: f32,
}

/// Audio band levels, [0, 1] each.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioBands {
    /// Low band.
    pub bass: f32,
    /// Mid band.
    pub mid: f32,
    /// High band.
    pub high: f32,
}

/// One fan-in sample of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSample {
    /// Pointer movement or press.
    Pointer(PointerInput),
    /// Device orientation.
    Tilt(TiltInput),
    /// Audio analysis bands.
    Audio(AudioBands),
}

/// Aggregate input-rate limiter: a token bucket refilled at 120 Hz.
#[derive(Debug)]
pub struct InputRateLimiter {
    budget: f32,
    rate_hz: f32,
}

impl InputRateLimiter {
    /// The clamped aggregate input rate.
    pub const AGGREGATE_RATE_HZ: f32 = 120.0;

    /// Creates a limiter at the default aggregate rate.
    pub fn new() -> Self {
        Self {
            budget: 0.0,
            rate_hz: Self::AGGREGATE_RATE_HZ,
        }
    }

    /// Refills the budget for an elapsed frame. The cap keeps a long
    /// stall from authorizing a burst afterwards.
    pub fn refill(&mut self, dt_seconds: f32) {
        self.budget = (self.budget + dt_seconds.max(0.0) * self.rate_hz).min(self.rate_hz);
    }

    /// Tries to consume one token; `false` means the sample is over
    /// budget and should be dropped.
    pub fn admit(&mut self) -> bool {
        if self.budget >= 1.0 {
            self.budget -= 1.0;
            true
        } else {
            false
        }
    }
}

impl Default for InputRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Smoothed per-frame reactivity derived from admitted samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactivityState {
    /// Last pointer position, normalized.
    pub pointer: (f32, f32),
    /// Smoothed pointer movement energy.
    pub mouse_intensity: f32,
    /// Decaying click impulse.
    pub click_intensity: f32,
    /// Last tilt sample.
    pub tilt: (f32, f32),
    /// Last audio bands.
    pub audio: AudioBands,
}

impl ReactivityState {
    /// Folds one admitted sample in.
    pub fn apply(&mut self, sample: InputSample) {
        match sample {
            InputSample::Pointer(p) => {
                self.pointer = (p.x, p.y);
                self.mouse_intensity = (self.mouse_intensity * 0.7 + p.intensity * 0.3).min(1.0);
                if p.click {
                    self.click_intensity = 1.0;
                }
            }
            InputSample::Tilt(t) => {
                self.tilt = (t.alpha, t.beta);
            }
            InputSample::Audio(bands) => {
                self.audio = bands;
            }
        }
    }

    /// Per-frame decay of the impulse values.
    pub fn decay(&mut self, dt_seconds: f32) {
        let falloff = (-3.0 * dt_seconds).exp();
        self.mouse_intensity *= falloff;
        self.click_intensity *= falloff;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_admits_at_most_120_per_second() {
        let mut limiter = InputRateLimiter::new();
        limiter.refill(1.0);
        let mut admitted = 0;
        for _ in 0..1000 {
            if limiter.admit() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 120);
    }

    #[test]
    fn limiter_budget_does_not_accumulate_past_one_second() {
        let mut limiter = InputRateLimiter::new();
        limiter.refill(30.0);
        let mut admitted = 0;
        while limiter.admit() {
            admitted += 1;
        }
        assert_eq!(admitted, 120);
    }

    #[test]
    fn click_sets_and_decays() {
        let mut state = ReactivityState::default();
        state.apply(InputSample::Pointer(PointerInput {
            x: 0.5,
            y: 0.5,
            intensity: 0.4,
            click: true,
        }));
        assert_eq!(state.click_intensity, 1.0);
        state.decay(1.0);
        assert!(state.click_intensity < 0.1);
    }
}
