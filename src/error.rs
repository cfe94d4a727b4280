// Library error types. Numeric degeneracies never surface here; they are
// absorbed where they happen.
use thiserror::Error;

/// Raised once, when a vehicle class is loaded or a vehicle is initialized.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("vehicle `{vehicle}`: {curve} curve is missing")]
    MissingCurve { vehicle: String, curve: &'static str },
    #[error("vehicle `{vehicle}`: {curve} curve is invalid: {reason}")]
    InvalidCurve {
        vehicle: String,
        curve: &'static str,
        reason: String,
    },
    #[error("vehicle `{vehicle}`: {field} must be positive (got {value})")]
    NonPositive {
        vehicle: String,
        field: &'static str,
        value: f32,
    },
    #[error("vehicle `{vehicle}`: {field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        vehicle: String,
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("vehicle `{vehicle}`: {field} is not finite")]
    NonFinite { vehicle: String, field: &'static str },
    #[error("failed to read vehicle assets: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse vehicle assets: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A driver was handed a path it cannot follow. The driver goes inert.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path has no waypoints")]
    Empty,
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("no vehicle configurations supplied")]
    NoConfigs,
    #[error(transparent)]
    Config(#[from] ConfigError),
}
