//! Terminal-automation runner for interactive SSH login verification.
//!
//! One call to [`run_ssh_command`] generates a single-use expect script,
//! writes it to a uniquely named temporary file, executes it inside an
//! isolated execution environment, classifies the result and removes the
//! script again. The runner never returns an error: every automation
//! failure is downgraded to an [`ExecutionOutcome`] so a batch of device
//! verifications can finish and report partial failure.
//!
//! # Main Components
//!
//! - [`ExecEnvironment`] - Contract for the isolated environment running the script
//! - [`DockerEnvironment`] - Production environment backed by `docker run`
//! - [`run_ssh_command`] - One blocking verification run
//! - [`ExecutionOutcome`] - Classified result of a run

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use crate::config::EffectiveConfig;
use crate::templates;

/// Wall-clock budget for one complete script execution, independent of the
/// per-phase timeouts inside the script.
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(60);

/// Default container image carrying the expect interpreter.
pub const DEFAULT_IMAGE: &str = "edgeprobe-verifier";

/// Per-process sequence for script file names. Combined with the process id
/// this keeps concurrent runs in one process from colliding.
static SCRIPT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Matches a transcript line consisting solely of a shell prompt.
static PROMPT_LINE: Lazy<Regex> = Lazy::new(|| match Regex::new(r"^[^\s>#]*[>#]\s*$") {
    Ok(re) => re,
    Err(err) => panic!("invalid PROMPT_LINE regex: {err}"),
});

/// Raw result of one script execution inside an environment.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Classified outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub output: String,
}

impl ExecutionOutcome {
    fn passed(output: impl Into<String>) -> ExecutionOutcome {
        ExecutionOutcome {
            success: true,
            output: output.into(),
        }
    }

    fn failed(output: impl Into<String>) -> ExecutionOutcome {
        ExecutionOutcome {
            success: false,
            output: output.into(),
        }
    }
}

/// Contract for the isolated execution environment that runs generated
/// automation scripts.
///
/// The runner depends only on this contract, not on a specific
/// virtualization technology. Production code uses [`DockerEnvironment`];
/// tests substitute stubs that return canned transcripts.
#[allow(async_fn_in_trait)]
pub trait ExecEnvironment {
    /// Directory the generated script must be written to so the environment
    /// can see it.
    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    /// Runs the automation interpreter against `script_path`.
    ///
    /// Error kinds carry the classification: `NotFound` means the
    /// environment's launcher is unavailable, `TimedOut` means the
    /// wall-clock budget elapsed.
    async fn execute(&self, script_path: &Path) -> io::Result<ExecOutput>;
}

/// Isolated execution environment backed by `docker run`.
///
/// Mounts the project root and the temp directory into a disposable
/// container and invokes the expect interpreter against the script. The
/// whole invocation is bounded by a wall-clock budget; when it fires the
/// child process is killed.
#[derive(Debug, Clone)]
pub struct DockerEnvironment {
    image: String,
    project_root: PathBuf,
    temp_dir: PathBuf,
    wall_clock: Duration,
}

impl DockerEnvironment {
    pub fn new(project_root: impl Into<PathBuf>) -> DockerEnvironment {
        DockerEnvironment {
            image: DEFAULT_IMAGE.to_string(),
            project_root: project_root.into(),
            temp_dir: std::env::temp_dir(),
            wall_clock: EXEC_TIMEOUT,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> DockerEnvironment {
        self.image = image.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> DockerEnvironment {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_wall_clock(mut self, wall_clock: Duration) -> DockerEnvironment {
        self.wall_clock = wall_clock;
        self
    }
}

impl ExecEnvironment for DockerEnvironment {
    fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone()
    }

    async fn execute(&self, script_path: &Path) -> io::Result<ExecOutput> {
        let project_mount = format!("{}:/usr/src/app", self.project_root.display());
        let temp = self.temp_dir.display().to_string();
        let temp_mount = format!("{temp}:{temp}");

        let mut child = tokio::process::Command::new("docker")
            .args(["run", "--rm", "-i", "-v", &project_mount, "-v", &temp_mount])
            .arg(&self.image)
            .args(["/usr/bin/expect", "-f"])
            .arg(script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok(ExecOutput {
                    exit_code: status?.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                })
            } => result,
            () = tokio::time::sleep(self.wall_clock) => {
                let _ = child.kill().await;
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("script execution exceeded {}s", self.wall_clock.as_secs()),
                ))
            }
        }
    }
}

/// Owns the temporary script file for one run.
///
/// Removal happens in `Drop`, so the file disappears exactly once on every
/// exit path: success, classified failure, timeout, unexpected error, and
/// cancellation of the run future.
struct ScriptGuard {
    path: PathBuf,
}

impl ScriptGuard {
    fn new(path: PathBuf) -> ScriptGuard {
        ScriptGuard { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScriptGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                warn!(
                    "failed to remove automation script {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

fn unique_script_path(dir: &Path) -> PathBuf {
    let seq = SCRIPT_SEQ.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(
        "edgeprobe_ssh_script_{}_{seq}.exp",
        std::process::id()
    ))
}

/// Runs one interactive SSH login verification.
///
/// Generates the automation script for `config` (`ip`, `user`, `password`)
/// and `command`, executes it inside `env` and classifies the result. The
/// call blocks until the environment returns or its wall clock fires; it
/// spawns no internal tasks and never returns an error.
pub async fn run_ssh_command(
    env: &impl ExecEnvironment,
    config: &EffectiveConfig,
    command: &str,
) -> ExecutionOutcome {
    let (ip, user, password) = match (
        config.require_str("ip"),
        config.require_str("user"),
        config.require_str("password"),
    ) {
        (Ok(ip), Ok(user), Ok(password)) => (ip, user, password),
        (Err(err), ..) | (_, Err(err), _) | (.., Err(err)) => {
            return ExecutionOutcome::failed(err.to_string());
        }
    };

    let script = templates::render_login_script(user, ip, password, command);
    let guard = ScriptGuard::new(unique_script_path(&env.temp_dir()));
    debug!(
        "running ssh verification for {user}@{ip} via {}",
        guard.path().display()
    );
    execute_script(env, &guard, &script).await
}

async fn execute_script(
    env: &impl ExecEnvironment,
    guard: &ScriptGuard,
    script: &str,
) -> ExecutionOutcome {
    // UTF-8 with LF line endings; the expect interpreter reads it verbatim.
    if let Err(err) = std::fs::write(guard.path(), script) {
        return ExecutionOutcome::failed(format!("could not write automation script: {err}"));
    }

    match env.execute(guard.path()).await {
        Ok(output) if output.success() => {
            trace!("transcript: {:?}", output.stdout);
            ExecutionOutcome::passed(strip_prompts(&output.stdout))
        }
        Ok(output) => {
            // The script's FAIL markers arrive on stdout; fall back to stderr.
            let stdout = output.stdout.trim();
            let detail = if stdout.is_empty() {
                output.stderr.trim()
            } else {
                stdout
            };
            ExecutionOutcome::failed(format!("automation script failed: {detail}"))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => ExecutionOutcome::failed(
            "execution environment not found; is the container runtime installed and on PATH?",
        ),
        Err(err) if err.kind() == io::ErrorKind::TimedOut => ExecutionOutcome::failed(format!(
            "command execution timed out after {} seconds",
            EXEC_TIMEOUT.as_secs()
        )),
        Err(err) => ExecutionOutcome::failed(format!("unexpected execution error: {err}")),
    }
}

/// Strips every prompt occurrence from a captured transcript.
///
/// The prompt can appear several times between login and exit (the echo
/// round trips produce extra ones), so every line consisting solely of a
/// prompt is dropped before the remainder is trimmed.
pub fn strip_prompts(transcript: &str) -> String {
    let kept: Vec<&str> = transcript
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !PROMPT_LINE.is_match(line))
        .collect();
    kept.join("\n").trim().to_string()
}
