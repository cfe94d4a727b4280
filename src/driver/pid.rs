use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// Textbook PID on a scalar error.
///
/// The integrator is unbounded unless `integral_limit` is set; the default
/// driver tuning leaves it unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidController {
    pub gains: PidGains,
    pub integral_limit: Option<f32>,
    integral: f32,
    last_error: f32,
}

impl PidController {
    pub fn new(gains: PidGains, integral_limit: Option<f32>) -> Self {
        Self { gains, integral_limit, integral: 0.0, last_error: 0.0 }
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }

    /// One controller step. With `dt <= 0` the integral is left alone and the
    /// derivative term is zero.
    pub fn update(&mut self, error: f32, dt: f32) -> f32 {
        let error = if error.is_finite() { error } else { 0.0 };

        let derivative = if dt > 0.0 && dt.is_finite() {
            self.integral += error * dt;
            if let Some(limit) = self.integral_limit {
                self.integral = self.integral.clamp(-limit, limit);
            }
            (error - self.last_error) / dt
        } else {
            0.0
        };
        self.last_error = error;

        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_only() {
        let mut pid = PidController::new(PidGains { kp: 2.0, ki: 0.0, kd: 0.0 }, None);
        assert_eq!(pid.update(3.0, 0.1), 6.0);
    }

    #[test]
    fn integral_accumulates_error_times_dt() {
        let mut pid = PidController::new(PidGains { kp: 0.0, ki: 1.0, kd: 0.0 }, None);
        pid.update(2.0, 0.5);
        let out = pid.update(2.0, 0.5);
        assert!((out - 2.0).abs() < 1e-6);
    }

    #[test]
    fn derivative_uses_last_error() {
        let mut pid = PidController::new(PidGains { kp: 0.0, ki: 0.0, kd: 1.0 }, None);
        pid.update(1.0, 0.5);
        let out = pid.update(2.0, 0.5);
        assert!((out - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unbounded_integral_winds_up_unless_limited() {
        let gains = PidGains { kp: 0.0, ki: 1.0, kd: 0.0 };
        let mut free = PidController::new(gains, None);
        let mut clamped = PidController::new(gains, Some(1.0));
        for _ in 0..100 {
            free.update(1.0, 0.1);
            clamped.update(1.0, 0.1);
        }
        assert!(free.integral() > 9.0);
        assert_eq!(clamped.integral(), 1.0);
    }

    #[test]
    fn zero_dt_skips_integral_and_derivative() {
        let mut pid = PidController::new(PidGains { kp: 1.0, ki: 1.0, kd: 1.0 }, None);
        assert_eq!(pid.update(4.0, 0.0), 4.0);
        assert_eq!(pid.integral(), 0.0);
    }
}
