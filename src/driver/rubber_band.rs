use serde::{Deserialize, Serialize};

/// Multiplier at zero distance from the leader.
pub const RUBBER_BAND_NEAR: f32 = 0.9;
/// Multiplier at or beyond `range` from the leader.
pub const RUBBER_BAND_FAR: f32 = 1.1;

/// Dynamic difficulty: slows followers that are close to the leader and
/// speeds up those far behind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubberBand {
    pub enabled: bool,
    pub range: f32,
}

impl Default for RubberBand {
    fn default() -> Self {
        Self { enabled: true, range: 60.0 }
    }
}

impl RubberBand {
    pub fn multiplier(&self, distance_to_leader: Option<f32>) -> f32 {
        let Some(distance) = distance_to_leader else { return 1.0 };
        if !self.enabled || !distance.is_finite() {
            return 1.0;
        }
        let t = if self.range > 0.0 {
            (distance / self.range).clamp(0.0, 1.0)
        } else {
            1.0
        };
        RUBBER_BAND_NEAR * (1.0 - t) + RUBBER_BAND_FAR * t
    }
}
