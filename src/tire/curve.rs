// ==============================================================================
// curve.rs — PIECEWISE-LINEAR TUNING CURVE ON [0,1]
// ------------------------------------------------------------------------------
// Used for the engine torque curve (normalized speed -> torque factor) and the
// grip curve (normalized slip -> grip factor).
//
// - Keys are (x, y) pairs, x strictly ascending, both inside [0,1].
// - Input is clamped to [0,1] before lookup; outside the first/last key the
//   end value is held.
// - An empty curve is "absent" and is rejected when the vehicle loads.
// ==============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curve {
    keys: Vec<[f32; 2]>,
}

impl Curve {
    pub fn new(keys: Vec<[f32; 2]>) -> Self {
        Self { keys }
    }

    /// Flat curve, handy for tests and for trivial tunings.
    pub fn constant(y: f32) -> Self {
        Self { keys: vec![[0.0, y], [1.0, y]] }
    }

    pub fn keys(&self) -> &[[f32; 2]] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.keys.is_empty() {
            return Err("no keys".into());
        }
        for (i, [x, y]) in self.keys.iter().copied().enumerate() {
            if !x.is_finite() || !y.is_finite() {
                return Err(format!("key {i} is not finite"));
            }
            if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                return Err(format!("key {i} ({x}, {y}) is outside [0,1]"));
            }
        }
        if self.keys.windows(2).any(|w| w[1][0] <= w[0][0]) {
            return Err("keys are not strictly ascending in x".into());
        }
        Ok(())
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let Some(first) = self.keys.first() else { return 0.0 };
        let x = if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 };

        if x <= first[0] {
            return first[1];
        }
        for w in self.keys.windows(2) {
            let ([x0, y0], [x1, y1]) = (w[0], w[1]);
            if x <= x1 {
                let t = (x - x0) / (x1 - x0);
                return y0 + (y1 - y0) * t;
            }
        }
        self.keys[self.keys.len() - 1][1]
    }
}
