//! Partial-config helpers over `serde_json::Value`.
//!
//! The configuration store hands generators partial objects ("only the
//! fields the user just edited"). [`merge_patch`] folds such a patch onto a
//! full JSON object and [`apply_patch`] does the round trip through a typed
//! config, so a patch that fails to deserialize never reaches the generator.

use crate::error::RenderError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Merges `patch` into `target` in place (RFC 7386 semantics).
///
/// Objects merge key by key, recursively. `null` values remove the key.
/// Any non-object patch replaces the target wholesale, so arrays are
/// replaced rather than concatenated.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

/// Applies a partial JSON patch to a typed config and returns the result.
///
/// The current value is serialized, merged with `patch`, and deserialized
/// back. A patch that produces an invalid shape (wrong types, bad color
/// strings, unknown enum variants) is reported as `InvalidConfig` and
/// `current` is left untouched.
pub fn apply_patch<T>(current: &T, patch: &Value) -> Result<T, RenderError>
where
    T: Serialize + DeserializeOwned,
{
    if !patch.is_object() {
        return Err(RenderError::invalid_config(
            "<patch>",
            "partial config must be a JSON object",
        ));
    }
    let mut merged = serde_json::to_value(current)
        .map_err(|e| RenderError::invalid_config("<config>", e.to_string()))?;
    merge_patch(&mut merged, patch);
    serde_json::from_value(merged).map_err(|e| RenderError::invalid_config("<patch>", e.to_string()))
}

/// Returns `Err(InvalidConfig)` unless `value` lies in `[min, max]`.
pub fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), RenderError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(RenderError::invalid_config(
            field,
            format!("{value} is outside {min}..={max}"),
        ));
    }
    Ok(())
}
