//! Layered configuration resolution for device verification runs.
//!
//! Configuration is assembled from up to three YAML sources merged left to
//! right: a shared `base.yaml`, a per-device overlay (`{device}.yaml`), and
//! caller overrides. Later sources win ties. The result is an
//! [`EffectiveConfig`] handed to exactly one device handler; handlers never
//! share a mutable document.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde_yaml::{Mapping, Value};

use crate::error::VerifyError;

/// The effective parameter set for one verification run.
///
/// A thin wrapper over the merged YAML mapping. Required keys for SSH
/// verification are `ip`, `user` and `password`; any additional keys pass
/// through unmodified and stay visible to handlers.
#[derive(Debug, Clone, Default)]
pub struct EffectiveConfig {
    doc: Mapping,
}

impl EffectiveConfig {
    /// Wraps an already-merged mapping.
    pub fn new(doc: Mapping) -> Self {
        Self { doc }
    }

    /// Converts a merged YAML value into an effective config.
    ///
    /// `null` (an empty document) becomes an empty mapping; any other
    /// non-mapping root is rejected.
    pub fn from_value(value: Value) -> Result<Self, VerifyError> {
        match value {
            Value::Mapping(doc) => Ok(Self { doc }),
            Value::Null => Ok(Self::default()),
            _ => Err(VerifyError::NotAMapping),
        }
    }

    /// Returns the raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// Returns the string value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns the string value for `key` or fails with the key's name.
    pub fn require_str(&self, key: &str) -> Result<&str, VerifyError> {
        self.get_str(key)
            .ok_or_else(|| VerifyError::MissingConfigKey(key.to_string()))
    }

    /// Read-only access to the underlying mapping.
    pub fn mapping(&self) -> &Mapping {
        &self.doc
    }
}

/// Deep-merges `overlay` into `base` in place.
///
/// Recursion happens only while both sides are mappings; in every other case
/// the overlay value replaces the base value outright, including a scalar
/// replacing a mapping or vice versa. Applying this reducer left to right
/// over an ordered sequence of overlays makes later sources win ties.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_mapping() {
                    if let Some(existing @ Value::Mapping(_)) = base_map.get_mut(&key) {
                        deep_merge(existing, value);
                        continue;
                    }
                }
                base_map.insert(key, value);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Loads and merges configuration documents from a directory.
///
/// The resolver is constructed explicitly and passed around; there is no
/// process-wide configuration state. Each call to [`ConfigResolver::resolve`]
/// produces a fresh document.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config_dir: PathBuf,
}

impl ConfigResolver {
    /// Creates a resolver rooted at `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Directory the resolver reads documents from.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Loads the shared base document.
    ///
    /// A missing `base.yaml` yields an empty mapping: lab setups commonly
    /// carry only per-device files.
    pub fn load_base(&self) -> Result<Value, VerifyError> {
        let path = self.config_dir.join("base.yaml");
        if !path.exists() {
            return Ok(Value::Mapping(Mapping::new()));
        }
        read_document(&path)
    }

    /// Merges the overlay for `overlay_name` onto `base` and returns the result.
    ///
    /// Fails with [`VerifyError::ConfigNotFound`] when
    /// `{config_dir}/{overlay_name}.yaml` does not exist.
    pub fn load(&self, mut base: Value, overlay_name: &str) -> Result<Value, VerifyError> {
        let path = self.config_dir.join(format!("{overlay_name}.yaml"));
        if !path.exists() {
            return Err(VerifyError::ConfigNotFound(path.display().to_string()));
        }
        debug!("loading device overlay {}", path.display());
        let overlay = read_document(&path)?;
        deep_merge(&mut base, overlay);
        Ok(base)
    }

    /// Resolves the effective config for one run: base, then the device
    /// overlay (when given), then caller overrides, in that order.
    pub fn resolve(
        &self,
        device: Option<&str>,
        overrides: Mapping,
    ) -> Result<EffectiveConfig, VerifyError> {
        let mut merged = self.load_base()?;
        if let Some(name) = device {
            merged = self.load(merged, name)?;
        }
        deep_merge(&mut merged, Value::Mapping(overrides));
        EffectiveConfig::from_value(merged)
    }
}

fn read_document(path: &Path) -> Result<Value, VerifyError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}
