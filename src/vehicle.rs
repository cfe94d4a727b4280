use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::tire::{Curve, WheelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drivetrain {
    #[default]
    Rear,
    Front,
    All,
}

impl Drivetrain {
    pub fn drives(&self, wheel: WheelId) -> bool {
        match self {
            Drivetrain::Rear => wheel.is_rear(),
            Drivetrain::Front => wheel.is_front(),
            Drivetrain::All => true,
        }
    }
}

/// Tunables for one vehicle class. Loaded once, then shared read-only
/// (`Arc<VehicleConfig>`) by every vehicle of that class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub name: String,
    pub mass: f32,                       // kg
    pub linear_drag: f32,
    pub angular_drag: f32,
    #[serde(default)]
    pub center_of_mass_offset: [f32; 3], // chassis local, m
    pub max_engine_power: f32,           // peak torque per driven wheel, N*m
    pub max_brake_force: f32,            // brake torque per wheel, N*m
    pub max_steer_angle: f32,            // degrees
    #[serde(default)]
    pub engine_curve: Curve,             // normalized speed -> torque factor
    #[serde(default)]
    pub grip_curve: Curve,               // normalized slip -> grip factor
    pub drift_grip_multiplier: f32,
    pub boost_force: f32,                // N
    pub boost_duration: f32,             // s
    pub boost_recharge: f32,             // s
    pub max_speed: f32,                  // m/s

    // --- steering feel ---
    #[serde(default = "default_steer_attenuation_speed")]
    pub steer_attenuation_speed: f32,    // m/s where attenuation starts
    #[serde(default = "default_steer_attenuation_floor")]
    pub steer_attenuation_floor: f32,    // 0..1

    // --- layout (consumed by the integrator) ---
    #[serde(default)]
    pub drivetrain: Drivetrain,
    #[serde(default = "default_wheelbase")]
    pub wheelbase: f32,
    #[serde(default = "default_track_width")]
    pub track_width: f32,
    #[serde(default = "default_wheel_radius")]
    pub wheel_radius: f32,
    #[serde(default = "default_half_extents")]
    pub chassis_half_extents: [f32; 3],
    #[serde(default)]
    pub downforce: f32,                  // N per (m/s)^2
}

fn default_steer_attenuation_speed() -> f32 { 10.0 }
fn default_steer_attenuation_floor() -> f32 { 0.6 }
fn default_wheelbase() -> f32 { 2.5 }
fn default_track_width() -> f32 { 1.5 }
fn default_wheel_radius() -> f32 { 0.34 }
fn default_half_extents() -> [f32; 3] { [0.9, 0.35, 2.0] }

impl VehicleConfig {
    /// Reject anything the dynamics model cannot run with. Called at load
    /// time and again when a vehicle is initialized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vehicle = || self.name.clone();

        for (curve, c) in [("engine", &self.engine_curve), ("grip", &self.grip_curve)] {
            if c.is_empty() {
                return Err(ConfigError::MissingCurve { vehicle: vehicle(), curve });
            }
            c.validate()
                .map_err(|reason| ConfigError::InvalidCurve { vehicle: vehicle(), curve, reason })?;
        }

        let scalars = [
            ("mass", self.mass),
            ("linear_drag", self.linear_drag),
            ("angular_drag", self.angular_drag),
            ("max_engine_power", self.max_engine_power),
            ("max_brake_force", self.max_brake_force),
            ("max_steer_angle", self.max_steer_angle),
            ("drift_grip_multiplier", self.drift_grip_multiplier),
            ("boost_force", self.boost_force),
            ("boost_duration", self.boost_duration),
            ("boost_recharge", self.boost_recharge),
            ("max_speed", self.max_speed),
            ("steer_attenuation_speed", self.steer_attenuation_speed),
            ("steer_attenuation_floor", self.steer_attenuation_floor),
            ("wheelbase", self.wheelbase),
            ("track_width", self.track_width),
            ("wheel_radius", self.wheel_radius),
            ("downforce", self.downforce),
        ];
        for (field, value) in scalars {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { vehicle: vehicle(), field });
            }
        }
        if self.center_of_mass_offset.iter().chain(&self.chassis_half_extents).any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite { vehicle: vehicle(), field: "chassis geometry" });
        }

        for (field, value) in [
            ("mass", self.mass),
            ("max_speed", self.max_speed),
            ("wheelbase", self.wheelbase),
            ("track_width", self.track_width),
            ("wheel_radius", self.wheel_radius),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { vehicle: vehicle(), field, value });
            }
        }

        let ranged = [
            ("steer_attenuation_floor", self.steer_attenuation_floor, 0.0, 1.0),
            ("drift_grip_multiplier", self.drift_grip_multiplier, 0.0, 2.0),
            ("max_steer_angle", self.max_steer_angle, 0.0, 89.0),
        ];
        for (field, value, min, max) in ranged {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::OutOfRange { vehicle: vehicle(), field, value, min, max });
            }
        }

        for (field, value) in [
            ("linear_drag", self.linear_drag),
            ("angular_drag", self.angular_drag),
            ("max_engine_power", self.max_engine_power),
            ("max_brake_force", self.max_brake_force),
            ("boost_force", self.boost_force),
            ("boost_duration", self.boost_duration),
            ("boost_recharge", self.boost_recharge),
            ("steer_attenuation_speed", self.steer_attenuation_speed),
            ("downforce", self.downforce),
        ] {
            if value < 0.0 {
                return Err(ConfigError::OutOfRange { vehicle: vehicle(), field, value, min: 0.0, max: f32::MAX });
            }
        }

        Ok(())
    }
}

// ---------------------------------------------
// PRESETS
// ---------------------------------------------

pub fn gt86() -> VehicleConfig {
    VehicleConfig {
        name: "gt86".into(),
        mass: 1350.0,
        linear_drag: 0.08,
        angular_drag: 0.6,
        center_of_mass_offset: [0.0, -0.15, 0.0], // slightly below visual center
        max_engine_power: 450.0,
        max_brake_force: 3000.0,
        max_steer_angle: 34.0,
        engine_curve: Curve::new(vec![[0.0, 0.3], [0.3, 1.0], [0.8, 0.8], [1.0, 0.4]]),
        grip_curve: Curve::new(vec![[0.0, 1.0], [0.3, 0.95], [0.6, 0.75], [1.0, 0.55]]),
        drift_grip_multiplier: 0.7,
        boost_force: 6000.0,
        boost_duration: 1.5,
        boost_recharge: 6.0,
        max_speed: 50.0,
        steer_attenuation_speed: 10.0,
        steer_attenuation_floor: 0.6,
        drivetrain: Drivetrain::Rear,
        wheelbase: 2.5,
        track_width: 1.5,
        wheel_radius: 0.34,
        chassis_half_extents: [0.9, 0.35, 2.1],
        downforce: 0.8,
    }
}

pub fn kart() -> VehicleConfig {
    VehicleConfig {
        name: "kart".into(),
        mass: 180.0,
        linear_drag: 0.2,
        angular_drag: 1.5,
        center_of_mass_offset: [0.0, -0.05, 0.0],
        max_engine_power: 90.0,
        max_brake_force: 400.0,
        max_steer_angle: 28.0,
        engine_curve: Curve::new(vec![[0.0, 0.6], [0.5, 1.0], [1.0, 0.7]]),
        grip_curve: Curve::new(vec![[0.0, 1.0], [0.5, 0.8], [1.0, 0.6]]),
        drift_grip_multiplier: 0.8,
        boost_force: 900.0,
        boost_duration: 1.0,
        boost_recharge: 4.0,
        max_speed: 30.0,
        steer_attenuation_speed: 8.0,
        steer_attenuation_floor: 0.7,
        drivetrain: Drivetrain::Rear,
        wheelbase: 1.1,
        track_width: 1.0,
        wheel_radius: 0.14,
        chassis_half_extents: [0.6, 0.2, 0.8],
        downforce: 0.0,
    }
}

pub fn presets() -> Vec<Arc<VehicleConfig>> {
    vec![Arc::new(gt86()), Arc::new(kart())]
}

/// Parse a JSON array of vehicle records. Every record is validated; one bad
/// record fails the whole load.
pub fn parse_vehicle_configs(json: &str) -> Result<Vec<Arc<VehicleConfig>>, ConfigError> {
    let configs: Vec<VehicleConfig> = serde_json::from_str(json)?;
    configs
        .into_iter()
        .map(|c| {
            c.validate()?;
            Ok(Arc::new(c))
        })
        .collect()
}

pub fn load_vehicle_configs(path: &Path) -> Result<Vec<Arc<VehicleConfig>>, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    let configs = parse_vehicle_configs(&json)?;
    info!(path = %path.display(), count = configs.len(), "loaded vehicle configurations");
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for c in presets() {
            c.validate().unwrap();
        }
    }

    #[test]
    fn missing_curve_is_a_config_error() {
        let mut c = gt86();
        c.grip_curve = Curve::default();
        assert!(matches!(c.validate(), Err(ConfigError::MissingCurve { curve: "grip", .. })));
    }

    #[test]
    fn non_positive_mass_and_speed_are_rejected() {
        let mut c = gt86();
        c.mass = 0.0;
        assert!(matches!(c.validate(), Err(ConfigError::NonPositive { field: "mass", .. })));

        let mut c = gt86();
        c.max_speed = -1.0;
        assert!(matches!(c.validate(), Err(ConfigError::NonPositive { field: "max_speed", .. })));
    }

    #[test]
    fn parses_asset_with_defaults() {
        let json = r#"[{
            "name": "hatch",
            "mass": 1100, "linear_drag": 0.1, "angular_drag": 0.5,
            "max_engine_power": 300, "max_brake_force": 2500, "max_steer_angle": 30,
            "engine_curve": [[0.0, 0.5], [1.0, 0.5]],
            "grip_curve": [[0.0, 1.0], [1.0, 0.6]],
            "drift_grip_multiplier": 0.75,
            "boost_force": 0, "boost_duration": 0, "boost_recharge": 0,
            "max_speed": 40,
            "drivetrain": "front"
        }]"#;
        let configs = parse_vehicle_configs(json).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].drivetrain, Drivetrain::Front);
        assert_eq!(configs[0].steer_attenuation_floor, 0.6);
        assert!((configs[0].engine_curve.evaluate(0.3) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn asset_without_curve_fails_to_load() {
        let json = r#"[{
            "name": "broken",
            "mass": 1100, "linear_drag": 0.1, "angular_drag": 0.5,
            "max_engine_power": 300, "max_brake_force": 2500, "max_steer_angle": 30,
            "grip_curve": [[0.0, 1.0]],
            "drift_grip_multiplier": 0.75,
            "boost_force": 0, "boost_duration": 0, "boost_recharge": 0,
            "max_speed": 40
        }]"#;
        assert!(matches!(
            parse_vehicle_configs(json),
            Err(ConfigError::MissingCurve { curve: "engine", .. })
        ));
    }
}
