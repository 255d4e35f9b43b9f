//! End-to-end verification scenarios against stub execution environments.
//!
//! The stubs replay canned transcripts instead of launching a container,
//! which lets the full path (script generation, execution, classification,
//! cleanup) run without any device or container runtime.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use edgeprobe::config::{ConfigResolver, EffectiveConfig};
use edgeprobe::device::{self, ConnectionKind};
use edgeprobe::error::VerifyError;
use edgeprobe::session::{ExecEnvironment, ExecOutput};
use edgeprobe::verify;

const SUCCESS_TRANSCRIPT: &str = include_str!("fixtures/transcript_success.txt");
const PASSWORD_TIMEOUT_TRANSCRIPT: &str =
    include_str!("fixtures/transcript_password_timeout.txt");

/// What the stub environment should pretend happened.
enum Script {
    Transcript {
        exit_code: i32,
        stdout: &'static str,
        stderr: &'static str,
    },
    LauncherMissing,
    WallClockElapsed,
}

struct SeenScript {
    path: PathBuf,
    existed: bool,
    contents: Option<String>,
}

/// Stub execution environment replaying one canned response while recording
/// every script invocation it receives.
struct StubEnv {
    script: Script,
    seen: Mutex<Vec<SeenScript>>,
}

impl StubEnv {
    fn new(script: Script) -> StubEnv {
        StubEnv {
            script,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn success() -> StubEnv {
        StubEnv::new(Script::Transcript {
            exit_code: 0,
            stdout: SUCCESS_TRANSCRIPT,
            stderr: "",
        })
    }

    fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen
            .lock()
            .expect("seen lock")
            .iter()
            .map(|seen| seen.path.clone())
            .collect()
    }

    fn last_script_contents(&self) -> String {
        self.seen
            .lock()
            .expect("seen lock")
            .last()
            .and_then(|seen| seen.contents.clone())
            .expect("the environment should have received a script")
    }

    /// Every script the environment saw must have existed during execution
    /// and must be gone after the run returned.
    fn assert_scripts_cleaned_up(&self) {
        let seen = self.seen.lock().expect("seen lock");
        assert!(!seen.is_empty(), "no script reached the environment");
        for entry in seen.iter() {
            assert!(
                entry.existed,
                "script {} was not on disk during execution",
                entry.path.display()
            );
            assert!(
                !entry.path.exists(),
                "script {} was left behind after the run",
                entry.path.display()
            );
        }
    }
}

impl ExecEnvironment for StubEnv {
    async fn execute(&self, script_path: &Path) -> io::Result<ExecOutput> {
        let contents = std::fs::read_to_string(script_path).ok();
        self.seen.lock().expect("seen lock").push(SeenScript {
            path: script_path.to_path_buf(),
            existed: script_path.exists(),
            contents,
        });
        match &self.script {
            Script::Transcript {
                exit_code,
                stdout,
                stderr,
            } => Ok(ExecOutput {
                exit_code: *exit_code,
                stdout: (*stdout).to_string(),
                stderr: (*stderr).to_string(),
            }),
            Script::LauncherMissing => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no such file or directory: docker",
            )),
            Script::WallClockElapsed => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "script execution exceeded 60s",
            )),
        }
    }
}

fn config_from_yaml(text: &str) -> EffectiveConfig {
    EffectiveConfig::from_value(serde_yaml::from_str(text).expect("parse test yaml"))
        .expect("mapping root")
}

fn device_config() -> EffectiveConfig {
    config_from_yaml("device: device_a\nip: 10.0.0.5\nuser: admin\npassword: p@ss")
}

fn fixtures_config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/config")
}

#[tokio::test]
async fn ssh_login_success_produces_passing_result() {
    let env = StubEnv::success();
    let handler = device::handler_for("device_a", device_config()).expect("device_a is supported");

    let result = handler.test_ssh_login(&env).await;

    assert_eq!(result.name, "SSH Login Test");
    assert!(result.success, "unexpected failure: {}", result.message);
    assert!(result.message.contains("SSH Login Success"));
    assert!(
        !result.message.contains("edge-a01>"),
        "prompts must be stripped from the message: {}",
        result.message
    );
    env.assert_scripts_cleaned_up();
}

#[tokio::test]
async fn generated_script_carries_escaped_credentials() {
    let env = StubEnv::success();
    let config = config_from_yaml(
        r#"device: device_a
ip: 10.0.0.5
user: admin
password: 'p@$s"w[o{rd'
"#,
    );
    let handler = device::handler_for("device_a", config).expect("device_a is supported");

    let result = handler.test_ssh_login(&env).await;
    assert!(result.success, "unexpected failure: {}", result.message);

    let script = env.last_script_contents();
    assert!(script.contains("spawn ssh -tt"));
    assert!(script.contains("admin@10.0.0.5"));
    assert!(
        script.contains(r#"set password "p@\$s\"w\[o\{rd""#),
        "password was not escaped for the script: {script}"
    );
    env.assert_scripts_cleaned_up();
}

#[tokio::test]
async fn password_prompt_timeout_is_reported_and_cleaned_up() {
    let env = StubEnv::new(Script::Transcript {
        exit_code: 1,
        stdout: PASSWORD_TIMEOUT_TRANSCRIPT,
        stderr: "",
    });
    let handler = device::handler_for("device_a", device_config()).expect("device_a is supported");

    let result = handler.test_ssh_login(&env).await;

    assert!(!result.success);
    assert!(
        result.message.contains("Timeout waiting for password prompt"),
        "message should identify the password-prompt phase: {}",
        result.message
    );
    env.assert_scripts_cleaned_up();
}

#[tokio::test]
async fn missing_launcher_is_reported_and_cleaned_up() {
    let env = StubEnv::new(Script::LauncherMissing);
    let handler = device::handler_for("device_a", device_config()).expect("device_a is supported");

    let result = handler.test_ssh_login(&env).await;

    assert!(!result.success);
    assert!(
        result.message.contains("execution environment not found"),
        "unexpected message: {}",
        result.message
    );
    env.assert_scripts_cleaned_up();
}

#[tokio::test]
async fn wall_clock_timeout_is_reported_and_cleaned_up() {
    let env = StubEnv::new(Script::WallClockElapsed);
    let handler = device::handler_for("device_a", device_config()).expect("device_a is supported");

    let result = handler.test_ssh_login(&env).await;

    assert!(!result.success);
    assert!(
        result.message.contains("timed out after 60 seconds"),
        "unexpected message: {}",
        result.message
    );
    env.assert_scripts_cleaned_up();
}

#[tokio::test]
async fn script_failure_prefers_stdout_and_falls_back_to_stderr() {
    let stdout_env = StubEnv::new(Script::Transcript {
        exit_code: 2,
        stdout: "FAIL: Timeout waiting for shell prompt after login.",
        stderr: "ignored",
    });
    let handler = device::handler_for("device_a", device_config()).expect("device_a is supported");
    let result = handler.test_ssh_login(&stdout_env).await;
    assert!(result.message.contains("shell prompt"));
    assert!(!result.message.contains("ignored"));

    let stderr_env = StubEnv::new(Script::Transcript {
        exit_code: 2,
        stdout: "",
        stderr: "expect: spawn id exp4 not open",
    });
    let result = handler.test_ssh_login(&stderr_env).await;
    assert!(result.message.contains("spawn id exp4 not open"));
}

#[tokio::test]
async fn concurrent_runs_use_distinct_script_files() {
    let env = StubEnv::success();
    let handler = device::handler_for("device_a", device_config()).expect("device_a is supported");

    let (first, second) = tokio::join!(handler.test_ssh_login(&env), handler.test_ssh_login(&env));
    assert!(first.success && second.success);

    let paths = env.seen_paths();
    assert_eq!(paths.len(), 2);
    assert_ne!(paths[0], paths[1], "concurrent runs must not share a script file");
    env.assert_scripts_cleaned_up();
}

#[tokio::test]
async fn missing_credentials_fail_without_reaching_the_environment() {
    let env = StubEnv::success();
    let handler = device::handler_for("device_a", config_from_yaml("device: device_a\nip: 10.0.0.5"))
        .expect("device_a is supported");

    let result = handler.test_ssh_login(&env).await;

    assert!(!result.success);
    assert!(result.message.contains("user"));
    assert!(env.seen_paths().is_empty());
}

#[test]
fn unknown_device_type_fails_dispatch_by_name() {
    let err = match device::handler_for("unknown-type", device_config()) {
        Ok(_) => panic!("unknown device type must be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, VerifyError::UnsupportedDevice(_)));
    assert!(err.to_string().contains("unknown-type"));
}

#[tokio::test]
async fn verify_device_runs_requested_connection_kinds() {
    let env = StubEnv::success();
    let results = verify::verify_device(
        &env,
        &device_config(),
        &[ConnectionKind::Ssh, ConnectionKind::Http],
    )
    .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert_eq!(results[0].name, "SSH Login Test");
    assert!(!results[1].success);
    assert!(results[1].message.contains("not implemented"));
}

#[tokio::test]
async fn verify_device_reports_unsupported_device_as_synthetic_failures() {
    let env = StubEnv::success();
    let config = config_from_yaml("device: toaster\nip: 10.0.0.5\nuser: admin\npassword: p@ss");

    let results = verify::verify_device(&env, &config, &[ConnectionKind::Ssh]).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert_eq!(results[0].name, "SSH Login Test for 10.0.0.5");
    assert!(results[0].message.contains("toaster"));
    assert!(env.seen_paths().is_empty(), "no script should be generated");
}

#[test]
fn resolver_merges_base_overlay_and_overrides_in_order() {
    let resolver = ConfigResolver::new(fixtures_config_dir());
    let mut overrides = serde_yaml::Mapping::new();
    overrides.insert("password".into(), "override-secret".into());

    let config = resolver
        .resolve(Some("device_a"), overrides)
        .expect("resolve device_a");

    // base
    assert_eq!(config.get_str("user"), Some("admin"));
    // overlay
    assert_eq!(config.get_str("ip"), Some("192.0.2.10"));
    assert_eq!(config.get_str("device"), Some("device_a"));
    // caller override wins over both
    assert_eq!(config.get_str("password"), Some("override-secret"));

    // nested mappings merge key-wise instead of replacing wholesale
    let ssh = config
        .get("ssh")
        .and_then(|value| value.as_mapping())
        .expect("ssh section");
    assert_eq!(ssh.get("port").and_then(|v| v.as_u64()), Some(22));
    assert_eq!(ssh.get("banner_timeout").and_then(|v| v.as_u64()), Some(5));
}

#[test]
fn resolver_reports_missing_overlay_as_config_not_found() {
    let resolver = ConfigResolver::new(fixtures_config_dir());
    let err = match resolver.resolve(Some("device_zz"), Default::default()) {
        Ok(_) => panic!("missing overlay must fail"),
        Err(err) => err,
    };
    assert!(matches!(err, VerifyError::ConfigNotFound(_)));
    assert!(err.to_string().contains("device_zz.yaml"));
}
