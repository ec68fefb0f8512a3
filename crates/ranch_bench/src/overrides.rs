use anyhow::{bail, Result};
use ranch_core::Constants;
use std::collections::HashMap;

const VALID_KEYS: &[&str] = &[
    "minimum_session_ticks",
    "ticks_per_fullness_unit",
    "minimum_fullness",
    "station_reservoir_capacity",
    "emptying_duration_ticks",
    "default_auto_empty_threshold",
    "default_empty_cooldown_ticks",
    "station_count",
    "max_stack_size",
];

pub fn apply_overrides(
    constants: &mut Constants,
    overrides: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "minimum_session_ticks" => constants.minimum_session_ticks = as_u64(key, value)?,
            "ticks_per_fullness_unit" => constants.ticks_per_fullness_unit = as_u64(key, value)?,
            "minimum_fullness" => constants.minimum_fullness = as_f32(key, value)?,
            "station_reservoir_capacity" => {
                constants.station_reservoir_capacity = as_u64(key, value)?;
            }
            "emptying_duration_ticks" => constants.emptying_duration_ticks = as_u64(key, value)?,
            "default_auto_empty_threshold" => {
                constants.default_auto_empty_threshold = as_f32(key, value)?;
            }
            "default_empty_cooldown_ticks" => {
                constants.default_empty_cooldown_ticks = as_u64(key, value)?;
            }
            "station_count" => constants.station_count = as_u32(key, value)?,
            "max_stack_size" => constants.max_stack_size = as_u64(key, value)?,
            _ => bail!(
                "unknown override key '{key}'. Valid keys: {}",
                VALID_KEYS.join(", ")
            ),
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)] // JSON f64→f32 is intentional
fn as_f32(key: &str, value: &serde_json::Value) -> Result<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected a number, got {value}"))
}

fn as_u64(key: &str, value: &serde_json::Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        anyhow::anyhow!("override '{key}': expected a non-negative integer, got {value}")
    })
}

fn as_u32(key: &str, value: &serde_json::Value) -> Result<u32> {
    let val = as_u64(key, value)?;
    u32::try_from(val)
        .map_err(|_| anyhow::anyhow!("override '{key}': value {val} exceeds u32 range"))
}
