//! Decision policies plugged into the fixed driver loop.
//!
//! The loop (waypoints, PIDs, rubber-banding) is the same for every AI; a
//! policy only decides the speed the throttle PID chases.

use serde::{Deserialize, Serialize};

/// What a policy sees each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyObservation {
    pub heading_error_deg: f32,
    pub speed: f32,
    pub dt: f32,
}

pub trait DrivingPolicy: Send {
    fn name(&self) -> &'static str;

    /// Target speed for this tick given the rubber-banded base speed.
    fn target_speed(&mut self, base: f32, obs: &PolicyObservation) -> f32;
}

/// Follows the base speed as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedPolicy;

impl DrivingPolicy for ScriptedPolicy {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn target_speed(&mut self, base: f32, _obs: &PolicyObservation) -> f32 {
        base
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveTuning {
    /// Heading error (deg) the driver tolerates before backing off.
    pub tolerance_deg: f32,
    /// Per-second rate the speed factor moves.
    pub learning_rate: f32,
    /// Lowest factor the policy will settle on.
    pub min_factor: f32,
    /// EMA smoothing time constant, seconds.
    pub smoothing: f32,
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self { tolerance_deg: 12.0, learning_rate: 0.25, min_factor: 0.6, smoothing: 0.5 }
    }
}

/// Learns a speed factor from how well it tracks the path: sustained heading
/// error lowers the factor, clean tracking lets it recover toward 1.0.
#[derive(Debug, Clone, Copy)]
pub struct AdaptivePolicy {
    pub tuning: AdaptiveTuning,
    factor: f32,
    error_ema: f32,
}

impl AdaptivePolicy {
    pub fn new(tuning: AdaptiveTuning) -> Self {
        Self { tuning, factor: 1.0, error_ema: 0.0 }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }
}

impl DrivingPolicy for AdaptivePolicy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn target_speed(&mut self, base: f32, obs: &PolicyObservation) -> f32 {
        if obs.dt > 0.0 && obs.heading_error_deg.is_finite() {
            let alpha = (obs.dt / self.tuning.smoothing.max(obs.dt)).clamp(0.0, 1.0);
            self.error_ema += (obs.heading_error_deg.abs() - self.error_ema) * alpha;

            let step = self.tuning.learning_rate * obs.dt;
            if self.error_ema > self.tuning.tolerance_deg {
                self.factor -= step;
            } else {
                self.factor += step;
            }
            self.factor = self.factor.clamp(self.tuning.min_factor, 1.0);
        }
        base * self.factor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Scripted,
    Adaptive,
}

impl PolicyKind {
    pub fn build(&self) -> Box<dyn DrivingPolicy> {
        match self {
            PolicyKind::Scripted => Box::new(ScriptedPolicy),
            PolicyKind::Adaptive => Box::new(AdaptivePolicy::new(AdaptiveTuning::default())),
        }
    }
}
