//! Per-device verification orchestration.
//!
//! Runs the requested connection tests for one resolved configuration and
//! aggregates the results. Dispatch failures become synthetic failure
//! results so a batch over many devices completes and reports partial
//! failure instead of aborting.

use log::{info, warn};

use crate::config::EffectiveConfig;
use crate::device::{self, ConnectionKind, TestResult};
use crate::error::VerifyError;
use crate::session::ExecEnvironment;

/// Runs the requested connection tests for one device.
///
/// The device type is read from the `device` key of the effective config.
/// An unknown or missing device type yields one synthetic failure result
/// per requested connection kind; configuration was already resolved by the
/// caller, so nothing here raises.
pub async fn verify_device(
    env: &impl ExecEnvironment,
    config: &EffectiveConfig,
    kinds: &[ConnectionKind],
) -> Vec<TestResult> {
    let ip = config.get_str("ip").unwrap_or("<unknown>");
    let device = config.get_str("device");
    info!(
        "verifying device {ip} ({})",
        device.unwrap_or("no device type")
    );

    let handler = match device {
        Some(token) => device::handler_for(token, config.clone()),
        None => Err(VerifyError::MissingConfigKey("device".to_string())),
    };

    match handler {
        Ok(handler) => {
            let mut results = Vec::with_capacity(kinds.len());
            for kind in kinds {
                results.push(handler.test_connection(*kind, env).await);
            }
            results
        }
        Err(err) => {
            warn!("cannot build a device handler for {ip}: {err}");
            kinds
                .iter()
                .map(|kind| {
                    TestResult::failed(
                        format!("{} for {ip}", kind.test_name()),
                        format!("cannot run the {} test: {err}", kind.as_str()),
                    )
                })
                .collect()
        }
    }
}
