//! Expect-script generation for interactive SSH login automation.
//!
//! The automation script drives a single login session: wait for the
//! password prompt, authenticate, wait for the shell prompt (tolerating a
//! "change the default password" notice), disable echo, run one command,
//! capture the output, strip the prompt from the captured buffer, restore
//! echo and exit. The template is fixed; only the credentials and the
//! command are interpolated, and the password goes through one explicit
//! escape function.

/// Tcl regex that recognizes the remote shell's ready state.
///
/// The same pattern drives the prompt waits inside the script and the
/// prompt-stripping pass over the captured transcript.
pub const PROMPT_PATTERN: &str = r"[>#]\s*$";

/// Per-phase timeout (seconds) for the password-prompt and shell-prompt waits.
pub const PHASE_TIMEOUT_SECS: u64 = 20;

/// Interstitial notice some devices print before the first shell prompt.
pub const CHANGE_PASSWORD_NOTICE: &str = "please change the default password";

/// Marker the script prints when the password prompt never appears.
pub const PASSWORD_TIMEOUT_MARKER: &str = "FAIL: Timeout waiting for password prompt.";

/// Marker the script prints when the shell prompt never appears after login.
pub const SHELL_TIMEOUT_MARKER: &str = "FAIL: Timeout waiting for shell prompt after login.";

/// Escapes a credential for interpolation into a double-quoted Tcl literal.
///
/// `$`, `"`, `[` and `{` are each prefixed with a backslash so the value can
/// neither terminate the quoted string nor trigger command or variable
/// substitution. Every occurrence is escaped individually, including
/// characters that already follow a backslash.
pub fn escape_tcl_literal(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '$' | '"' | '[' | '{') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Renders the single-use automation script for one login verification.
///
/// `ip`, `user` and `command` are caller-controlled and interpolate as-is;
/// only the password is escaped. Host-key verification is relaxed because
/// the harness targets disposable lab devices.
pub fn render_login_script(user: &str, ip: &str, password: &str, command: &str) -> String {
    let escaped_password = escape_tcl_literal(password);
    format!(
        r#"#!/usr/bin/expect -f
# Generated by the verification harness for a single run.

set password "{escaped_password}"
set prompt {{{PROMPT_PATTERN}}}
set timeout {PHASE_TIMEOUT_SECS}

# -tt forces a pseudo-terminal, which interactive logins usually require.
spawn ssh -tt -o HostKeyAlgorithms=+ssh-rsa -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null {user}@{ip}

expect {{
  timeout {{ send_user "{PASSWORD_TIMEOUT_MARKER}\n"; exit 1 }}
  "password:"
}}

send "$password\r"

expect {{
  timeout {{ send_user "{SHELL_TIMEOUT_MARKER}\n"; exit 1 }}
  "{CHANGE_PASSWORD_NOTICE}" {{ exp_continue }}
  -re $prompt
}}

# Keep the command itself out of the captured output.
send "stty -echo\r"
expect -re $prompt

send "{command}\r"

# Everything between the command and the next prompt is the command's output.
expect -re $prompt

set output $expect_out(buffer)
regsub -all $prompt $output "" output

send "stty echo\r"
expect -re $prompt
send "exit\r"
expect eof
"#
    )
}
