use std::{env, path::PathBuf, str::FromStr, time::Duration};

// Runtime/server settings read from the environment (after dotenvy).
// Gameplay tuning lives in typed structs with Default, not here.

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    parse_value(env::var(key).ok().as_deref(), default)
}

fn parse_value<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub fn server_port() -> u16 {
    parse_or("SERVER_PORT", 9001)
}

pub fn tick_hz() -> u32 {
    match parse_or("TICK_HZ", 60u32) {
        0 => 60,
        hz => hz,
    }
}

pub fn tick_interval() -> Duration {
    Duration::from_secs_f64(1.0 / tick_hz() as f64)
}

/// Fixed step handed to the simulation, seconds.
pub fn tick_dt() -> f32 {
    1.0 / tick_hz() as f32
}

pub fn ai_count() -> usize {
    parse_or("AI_COUNT", 6)
}

/// JSON vehicle asset file; built-in presets are used when unset.
pub fn vehicle_assets() -> Option<PathBuf> {
    env::var_os("VEHICLE_ASSETS").filter(|v| !v.is_empty()).map(PathBuf::from)
}

pub fn rubber_band_range() -> f32 {
    let range = parse_or("RUBBER_BAND_RANGE", 60.0f32);
    if range.is_finite() && range > 0.0 { range } else { 60.0 }
}

/// Seed for spawn skill variance; random when unset.
pub fn spawn_seed() -> Option<u64> {
    env::var("SPAWN_SEED").ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_garbage_values_fall_back() {
        assert_eq!(parse_value(None, 42u16), 42);
        assert_eq!(parse_value(Some("not-a-number"), 7usize), 7);
        assert_eq!(parse_value(Some(" 12 "), 0u32), 12);
        assert_eq!(parse_value(Some("-1"), 60u32), 60);
    }

    #[test]
    fn unset_key_uses_default() {
        assert_eq!(parse_or("RACE_PHYSICS_TEST_UNSET_KEY", 9001u16), 9001);
    }
}
