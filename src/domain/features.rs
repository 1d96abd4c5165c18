//! Feature extraction from raw market snapshots.
//!
//! Market data arrives as untyped JSON from the provider; models want
//! a flat numeric map. Nested objects flatten to dot paths
//! (`player.season_avg`), booleans map to 0/1, and everything else is
//! dropped.

use serde_json::Value;

use crate::domain::prediction::Features;
use crate::errors::{EngineError, Result};

/// Flatten a JSON snapshot into a numeric feature map.
pub fn from_snapshot(data: &Value) -> Features {
    let mut features = Features::new();
    flatten_into(&mut features, data, String::new());
    features
}

/// Verify that every feature a model requires is present.
///
/// # Errors
/// `Inference` naming the model and the first missing feature.
pub fn validate_required(features: &Features, required: &[String], model_id: &str) -> Result<()> {
    for name in required {
        if !features.contains_key(name) {
            return Err(EngineError::Inference {
                model: model_id.to_string(),
                reason: format!("missing required feature '{name}'"),
            });
        }
    }
    Ok(())
}

fn flatten_into(out: &mut Features, value: &Value, prefix: String) {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_f64() {
                out.insert(prefix, v);
            }
        }
        Value::Bool(b) => {
            out.insert(prefix, f64::from(*b));
        }
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(out, child, path);
            }
        }
        // Arrays carry heterogeneous odds ladders we don't model;
        // strings and nulls have no numeric interpretation.
        Value::Array(_) | Value::String(_) | Value::Null => {}
    }
}
