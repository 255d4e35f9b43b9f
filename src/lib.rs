//! # edgeprobe - Device Connectivity Verification Harness
//!
//! `edgeprobe` proves that a management protocol works end to end against a
//! lab network device and reports a structured pass/fail result. The
//! concrete verification is interactive SSH login: a generated expect
//! script logs in with the device's credentials, runs one command inside a
//! disposable container, and the captured transcript is parsed into an
//! outcome.
//!
//! ## Features
//!
//! - **Layered Configuration**: base document, per-device overlay and
//!   caller overrides deep-merged into one effective parameter set
//! - **Device-Type Dispatch**: a closed registry of device families, each
//!   exposing the full connection-test capability surface
//! - **Terminal Automation**: deterministic expect-script generation with
//!   credential escaping, phase-sensitive timeouts and prompt stripping
//! - **Guaranteed Cleanup**: the single-use script file is removed on every
//!   exit path, including timeouts and cancellation
//! - **Failure as Data**: automation failures become result records, so
//!   multi-device batches finish and report partial failure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgeprobe::config::ConfigResolver;
//! use edgeprobe::device;
//! use edgeprobe::session::DockerEnvironment;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Resolve base.yaml + device_a.yaml from the config directory.
//!     let resolver = ConfigResolver::new("config");
//!     let config = resolver.resolve(Some("device_a"), Default::default())?;
//!
//!     let handler = device::handler_for("device_a", config)?;
//!     let env = DockerEnvironment::new(std::env::current_dir()?);
//!
//!     let result = handler.test_ssh_login(&env).await;
//!     println!("{} -> {}: {}", result.name, result.success, result.message);
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`config::ConfigResolver`] - Layered configuration resolution
//! - [`device::DeviceHandler`] - Protocol capability surface per device family
//! - [`session::run_ssh_command`] - The terminal-automation runner
//! - [`error::VerifyError`] - Errors for configuration and dispatch

pub mod config;
pub mod device;
pub mod error;
pub mod session;
pub mod templates;
pub mod verify;
