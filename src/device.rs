//! Device-type registry and protocol capability dispatch.
//!
//! Every supported device family exposes the same capability surface:
//! `test_ssh_login` is the real, end-to-end verification; the HTTP, Telnet
//! and Serial operations answer with an explicit "not implemented" result so
//! no family ever silently drops part of the contract.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::EffectiveConfig;
use crate::error::VerifyError;
use crate::session::{self, ExecEnvironment};

/// Device-type identifiers recognized by [`handler_for`].
pub const SUPPORTED_DEVICE_TYPES: &[&str] = &["device_a", "device_b", "device_c"];

/// The fixed command used to prove that login and command execution work.
pub const SSH_VERIFY_COMMAND: &str = "echo 'SSH Login Success'";

/// A supported device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    DeviceA,
    DeviceB,
    DeviceC,
}

impl DeviceType {
    /// Parses a device-type token; unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<DeviceType> {
        match token {
            "device_a" => Some(DeviceType::DeviceA),
            "device_b" => Some(DeviceType::DeviceB),
            "device_c" => Some(DeviceType::DeviceC),
            _ => None,
        }
    }

    /// The identifier used in configuration documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::DeviceA => "device_a",
            DeviceType::DeviceB => "device_b",
            DeviceType::DeviceC => "device_c",
        }
    }

    /// Human-readable family label used in result messages.
    pub fn family(&self) -> &'static str {
        match self {
            DeviceType::DeviceA => "A-series edge gateway",
            DeviceType::DeviceB => "B-series access switch",
            DeviceType::DeviceC => "C-series CPE router",
        }
    }
}

/// Management-protocol connection types a device may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Ssh,
    Http,
    Telnet,
    Serial,
}

impl ConnectionKind {
    /// Parses a connection token; unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<ConnectionKind> {
        match token {
            "ssh" => Some(ConnectionKind::Ssh),
            "http" => Some(ConnectionKind::Http),
            "telnet" => Some(ConnectionKind::Telnet),
            "serial" => Some(ConnectionKind::Serial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Ssh => "ssh",
            ConnectionKind::Http => "http",
            ConnectionKind::Telnet => "telnet",
            ConnectionKind::Serial => "serial",
        }
    }

    /// Name of the test result produced for this connection type.
    pub fn test_name(&self) -> &'static str {
        match self {
            ConnectionKind::Ssh => "SSH Login Test",
            ConnectionKind::Http => "HTTP Connection Test",
            ConnectionKind::Telnet => "Telnet Connection Test",
            ConnectionKind::Serial => "Serial Connection Test",
        }
    }
}

/// Metadata for a supported device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceMetadata {
    pub name: String,
    pub family: String,
    /// Connection types with a real verification implementation.
    pub connections: Vec<ConnectionKind>,
}

/// Returns metadata for all supported device types.
pub fn device_catalog() -> Vec<DeviceMetadata> {
    SUPPORTED_DEVICE_TYPES
        .iter()
        .filter_map(|token| device_metadata(token).ok())
        .collect()
}

/// Returns metadata for one device type by identifier.
pub fn device_metadata(token: &str) -> Result<DeviceMetadata, VerifyError> {
    let device_type = DeviceType::parse(token)
        .ok_or_else(|| VerifyError::UnsupportedDevice(token.to_string()))?;
    Ok(DeviceMetadata {
        name: device_type.as_str().to_string(),
        family: device_type.family().to_string(),
        connections: vec![ConnectionKind::Ssh],
    })
}

/// The unit of reporting the caller aggregates across devices and
/// connection types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub message: String,
}

impl TestResult {
    pub fn passed(name: impl Into<String>, message: impl Into<String>) -> TestResult {
        TestResult {
            name: name.into(),
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> TestResult {
        TestResult {
            name: name.into(),
            success: false,
            message: message.into(),
        }
    }
}

/// Creates the protocol-capable handler for `device_type`, seeded with the
/// resolved configuration.
///
/// Fails with [`VerifyError::UnsupportedDevice`] naming the offending
/// identifier when the token is not in [`SUPPORTED_DEVICE_TYPES`].
pub fn handler_for(
    device_type: &str,
    config: EffectiveConfig,
) -> Result<DeviceHandler, VerifyError> {
    let parsed = DeviceType::parse(device_type)
        .ok_or_else(|| VerifyError::UnsupportedDevice(device_type.to_string()))?;
    Ok(DeviceHandler::new(parsed, config))
}

/// Protocol-capable handler for one device under test.
///
/// A handler owns its effective configuration, lives for exactly one
/// verification run and is dropped afterwards.
#[derive(Debug, Clone)]
pub struct DeviceHandler {
    device_type: DeviceType,
    config: EffectiveConfig,
}

impl DeviceHandler {
    pub fn new(device_type: DeviceType, config: EffectiveConfig) -> DeviceHandler {
        DeviceHandler {
            device_type,
            config,
        }
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Proves interactive SSH login end to end.
    ///
    /// Delegates to the terminal-automation runner with the fixed
    /// verification command and wraps the outcome into a [`TestResult`].
    /// Never raises: automation failures come back as failure results.
    pub async fn test_ssh_login(&self, env: &impl ExecEnvironment) -> TestResult {
        let outcome = session::run_ssh_command(env, &self.config, SSH_VERIFY_COMMAND).await;
        TestResult {
            name: ConnectionKind::Ssh.test_name().to_string(),
            success: outcome.success,
            message: outcome.output,
        }
    }

    pub fn http_connection(&self) -> TestResult {
        self.unsupported(ConnectionKind::Http)
    }

    pub fn telnet_connection(&self) -> TestResult {
        self.unsupported(ConnectionKind::Telnet)
    }

    pub fn serial_connection(&self) -> TestResult {
        self.unsupported(ConnectionKind::Serial)
    }

    /// Runs the verification for one connection type.
    pub async fn test_connection(
        &self,
        kind: ConnectionKind,
        env: &impl ExecEnvironment,
    ) -> TestResult {
        match kind {
            ConnectionKind::Ssh => self.test_ssh_login(env).await,
            ConnectionKind::Http => self.http_connection(),
            ConnectionKind::Telnet => self.telnet_connection(),
            ConnectionKind::Serial => self.serial_connection(),
        }
    }

    fn unsupported(&self, kind: ConnectionKind) -> TestResult {
        TestResult::failed(
            kind.test_name(),
            format!(
                "{} connection test is not implemented for the {} family",
                kind.as_str(),
                self.device_type.family()
            ),
        )
    }
}
