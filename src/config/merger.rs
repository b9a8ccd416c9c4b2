//! Layering of YAML configuration documents.
//!
//! An operator keeps the shared settings in `account-forge.yml` and puts
//! machine-specific values (bind address, store path, special keys) in
//! `account-forge.local.yml`. The local file is overlaid on the main one
//! before deserialization.
//!
//! # Merge Rules
//!
//! - Mappings merge key by key, recursively
//! - Sequences and scalars in the overlay replace the base value
//! - A `null` in the overlay removes the key, restoring the built-in default

use serde_yaml::Value;

/// Overlay `overlay` on top of `base`.
///
/// Returns a new value; neither input is modified.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    let (Value::Mapping(base_map), Value::Mapping(overlay_map)) = (base, overlay) else {
        return overlay.clone();
    };

    let mut merged = base_map.clone();
    for (key, value) in overlay_map {
        if value.is_null() {
            merged.remove(key);
            continue;
        }
        let next = match base_map.get(key) {
            Some(existing) => deep_merge(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    Value::Mapping(merged)
}

/// Merge layers in order; the last layer has the highest priority.
pub fn merge_layers(layers: &[Value]) -> Value {
    layers
        .iter()
        .fold(Value::Mapping(Default::default()), |acc, layer| {
            deep_merge(&acc, layer)
        })
}
