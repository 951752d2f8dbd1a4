//! Variable mappings with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{ConfigError, Result};

/// Variable mapping with deep merge capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load a variable file (YAML or JSON)
    ///
    /// The file must contain a mapping at its top level; an empty file is
    /// treated as an empty mapping.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let values = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if !values.0.is_object() {
            return Err(ConfigError::InvalidVariable {
                message: format!("{} does not contain a mapping", path.display()),
            });
        }

        Ok(values)
    }

    /// Parse values from a YAML (or JSON) string
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(match value {
            JsonValue::Null => Self::new(),
            other => Self(other),
        })
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Merge multiple values in order, later entries winning
    pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a Values>) -> Self {
        let mut result = Values::new();
        for layer in layers {
            result.merge(layer);
        }
        result
    }

    /// Set a value by dotted path (e.g. `image.tag`)
    ///
    /// Intermediate keys become mappings; an existing scalar in the way is
    /// replaced.
    pub fn set(&mut self, path: &str, value: JsonValue) {
        let nested = path.rsplit('.').fold(value, |inner, segment| {
            let mut map = serde_json::Map::new();
            map.insert(segment.to_string(), inner);
            JsonValue::Object(map)
        });
        deep_merge(&mut self.0, &nested);
    }

    /// Look up a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        path.split('.')
            .try_fold(&self.0, |current, segment| current.as_object()?.get(segment))
    }

    /// Top-level variable names
    pub fn keys(&self) -> Vec<String> {
        match &self.0 {
            JsonValue::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// Objects merge key by key; anything else in `overlay` replaces `base`
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    if let (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) = (&mut *base, overlay) {
        for (key, value) in overlay_map {
            if let Some(existing) = base_map.get_mut(key) {
                deep_merge(existing, value);
            } else {
                base_map.insert(key.clone(), value.clone());
            }
        }
        return;
    }
    *base = overlay.clone();
}

/// Parse `--var` arguments (key=value format) into a mapping
///
/// Keys may be dotted paths. Values are kept verbatim as strings, so
/// `TAG=1.10` stays `1.10`.
pub fn parse_var_overrides(var_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in var_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| ConfigError::InvalidVariable {
            message: format!("'{}' is not in key=value format", arg),
        })?;

        let key = key.trim();
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(ConfigError::InvalidVariable {
                message: format!("'{}' has an empty variable name", arg),
            });
        }

        values.set(key, JsonValue::String(val.to_string()));
    }

    Ok(values)
}
