//! Resolves a device's configuration, runs the requested connection tests
//! against the real container-backed environment and prints the results as
//! JSON.
//!
//! Usage: verify_device <device-type> [connection ...]
//!
//! Connection tokens default to `ssh`. The config directory defaults to
//! `config/` and can be overridden with the EDGEPROBE_CONFIG_DIR
//! environment variable.

use anyhow::{Context, Result, bail};
use edgeprobe::config::ConfigResolver;
use edgeprobe::device::ConnectionKind;
use edgeprobe::session::DockerEnvironment;
use edgeprobe::verify;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let device = args
        .next()
        .context("usage: verify_device <device-type> [connection ...]")?;

    let mut kinds = Vec::new();
    for token in args {
        let kind = ConnectionKind::parse(&token)
            .with_context(|| format!("unknown connection type '{token}'"))?;
        kinds.push(kind);
    }
    if kinds.is_empty() {
        kinds.push(ConnectionKind::Ssh);
    }

    let config_dir =
        std::env::var("EDGEPROBE_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let resolver = ConfigResolver::new(&config_dir);
    let config = resolver
        .resolve(Some(&device), Default::default())
        .with_context(|| format!("resolving configuration for '{device}'"))?;

    let project_root = std::env::current_dir()?;
    let env = DockerEnvironment::new(project_root);

    let results = verify::verify_device(&env, &config, &kinds).await;
    println!("{}", serde_json::to_string_pretty(&results)?);

    if results.iter().any(|result| !result.success) {
        bail!("one or more verification tests failed");
    }
    Ok(())
}
