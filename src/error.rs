//! Error types for configuration resolution and device dispatch.
//!
//! This module defines the errors that are visible to callers. Failures that
//! happen while the automation script is executing are deliberately not part
//! of this taxonomy: the runner downgrades them to outcome data so a batch of
//! device verifications can finish and report partial failure.

use thiserror::Error;

/// Errors that can occur while resolving configuration or selecting a device handler.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The requested device overlay file does not exist.
    ///
    /// The caller is expected to abort the single device's run; other devices
    /// in a batch are unaffected.
    #[error("device configuration file not found: {0}")]
    ConfigNotFound(String),

    /// The device-type identifier is not in the supported set.
    ///
    /// Unknown identifiers are rejected rather than silently defaulted. The
    /// message names the offending identifier.
    #[error("unsupported device type '{0}'")]
    UnsupportedDevice(String),

    /// A key required for verification is missing or not a string.
    #[error("configuration key '{0}' is missing or not a string")]
    MissingConfigKey(String),

    /// The root of a configuration document is not a mapping.
    #[error("configuration document root must be a mapping")]
    NotAMapping,

    /// A configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// An I/O error occurred while reading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
