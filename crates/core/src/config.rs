// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Runtime knobs for dispatch, simulation and tracking.

use fieldops_domain::ARRIVAL_THRESHOLD_KM;
use std::time::Duration;

/// Dispatch and route-building settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Technicians matched when the request does not say.
    pub default_technician_count: usize,
    /// A directions request that takes longer fails its leg.
    pub leg_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_technician_count: 2,
            leg_timeout: Duration::from_secs(10),
        }
    }
}

/// Movement simulation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Base delay between two position updates.
    pub step_interval: Duration,
    /// Relative jitter applied to every delay, `0.25` means ±25 %.
    pub jitter: f64,
    /// Probability of an extra pause after a step.
    pub pause_probability: f64,
    /// Distance covered by one interpolation step.
    pub metres_per_step: f64,
    pub min_steps: u32,
    pub max_steps: u32,
    /// Time spent at a warehouse stop.
    pub stop_pause: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_secs(2),
            jitter: 0.25,
            pause_probability: 0.1,
            metres_per_step: 25.0,
            min_steps: 2,
            max_steps: 60,
            stop_pause: Duration::from_secs(2),
        }
    }
}

impl SimulationConfig {
    /// Number of interpolation steps for a segment of `distance_km`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn steps_for(&self, distance_km: f64) -> u32 {
        let min: u32 = self.min_steps.max(1);
        let max: u32 = self.max_steps.max(min);
        if !distance_km.is_finite() || self.metres_per_step <= 0.0 {
            return min;
        }
        let raw: f64 = (distance_km * 1000.0 / self.metres_per_step).ceil();
        // clamped into u32 range before the cast
        raw.clamp(f64::from(min), f64::from(max)) as u32
    }

    /// Delay before the next step, with jitter and an occasional extra pause.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let spread: f64 = self.jitter.clamp(0.0, 1.0);
        let factor: f64 = spread.mul_add(rand::random::<f64>().mul_add(2.0, -1.0), 1.0);
        let mut delay: Duration = self.step_interval.mul_f64(factor);
        if rand::random::<f64>() < self.pause_probability {
            delay += self.step_interval.mul_f64(rand::random::<f64>());
        }
        delay
    }
}

/// Tracking hub settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// How often snapshots are pushed to subscribers.
    pub push_interval: Duration,
    /// Messages a slow subscriber may lag behind before snapshots are skipped.
    pub subscriber_buffer: usize,
    pub arrival_threshold_km: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            push_interval: Duration::from_secs(1),
            subscriber_buffer: 32,
            arrival_threshold_km: ARRIVAL_THRESHOLD_KM,
        }
    }
}
