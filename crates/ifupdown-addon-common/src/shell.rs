//! Running `ip(8)` through the shell.
//!
//! The builders in [`crate::link::commands`] produce complete command lines
//! which are handed to `/bin/sh -c`. Every interface name, mode and
//! parameter value must go through [`shellquote`] first.
//!
//! ```ignore
//! use ifupdown_addon_common::shell::{self, shellquote, IP_CMD};
//!
//! let out = shell::run_checked(&format!("{} link del {}", IP_CMD, shellquote("gre0")))?;
//! ```

use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{LinkError, LinkResult};

/// Path to iproute2's `ip`.
pub const IP_CMD: &str = "/sbin/ip";

const SHELL: &str = "/bin/sh";

/// Characters that keep a special meaning inside double quotes.
static DQUOTE_SPECIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[$`"\\\n]"#).expect("static pattern"));

/// Wraps `token` in double quotes, backslash-escaping `$`, backtick, `"`,
/// `\` and newline.
///
/// ```
/// use ifupdown_addon_common::shell::shellquote;
///
/// assert_eq!(shellquote("gre0"), "\"gre0\"");
/// assert_eq!(shellquote("a$b"), "\"a\\$b\"");
/// ```
pub fn shellquote(token: &str) -> String {
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    let mut tail = 0;
    for special in DQUOTE_SPECIAL.find_iter(token) {
        quoted.push_str(&token[tail..special.start()]);
        quoted.push('\\');
        quoted.push_str(special.as_str());
        tail = special.end();
    }
    quoted.push_str(&token[tail..]);
    quoted.push('"');
    quoted
}

/// Captured outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// What to show when the command failed: stderr, or stdout if `ip`
    /// printed nothing on stderr.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Stdout on success, [`LinkError::ShellCommandFailed`] otherwise.
    pub fn into_stdout(self, cmd: &str) -> LinkResult<String> {
        if self.success() {
            return Ok(self.stdout);
        }
        Err(LinkError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: self.status.unwrap_or(-1),
            output: self.diagnostic().to_string(),
        })
    }
}

/// Runs `cmd` and waits for it.
///
/// Only a failure to spawn the shell is an error here; exit codes are left
/// to the caller.
pub fn run(cmd: &str) -> LinkResult<CommandOutput> {
    debug!(command = %cmd, "exec");

    let output = Command::new(SHELL)
        .args(["-c", cmd])
        .stdin(Stdio::null())
        .output()
        .map_err(|source| LinkError::ShellExec {
            command: cmd.to_string(),
            source,
        })?;

    let captured = CommandOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };
    trace!(command = %cmd, status = ?captured.status, "exited");
    Ok(captured)
}

/// Runs `cmd`, returning stdout or an error for a non-zero exit.
pub fn run_checked(cmd: &str) -> LinkResult<String> {
    run(cmd)?.into_stdout(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shellquote_plain_tokens() {
        for token in ["gre0", "10.0.0.1", "2001:db8::1", "tunnel-physdev"] {
            assert_eq!(shellquote(token), format!("\"{}\"", token));
        }
        assert_eq!(shellquote(""), "\"\"");
    }

    #[test]
    fn test_shellquote_escapes() {
        assert_eq!(shellquote("$(reboot)"), "\"\\$(reboot)\"");
        assert_eq!(shellquote("`id`"), "\"\\`id\\`\"");
        assert_eq!(shellquote("a\"b"), "\"a\\\"b\"");
        assert_eq!(shellquote("a\\b"), "\"a\\\\b\"");
        assert_eq!(shellquote("a\nb"), "\"a\\\nb\"");
        // Single quotes and semicolons are inert inside double quotes
        assert_eq!(shellquote("x'; y"), "\"x'; y\"");
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let out = CommandOutput {
            status: Some(2),
            stdout: "partial".to_string(),
            stderr: "RTNETLINK answers: File exists".to_string(),
        };
        assert!(!out.success());
        assert_eq!(out.diagnostic(), "RTNETLINK answers: File exists");

        let out = CommandOutput {
            status: Some(1),
            stdout: "Cannot find device".to_string(),
            stderr: String::new(),
        };
        assert_eq!(out.diagnostic(), "Cannot find device");
    }

    #[test]
    fn test_run_captures_stdout() {
        let out = run("printf ' up \\n'").unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "up");
    }

    #[test]
    fn test_run_checked_failure() {
        match run_checked("echo busy >&2; exit 2") {
            Err(LinkError::ShellCommandFailed {
                exit_code, output, ..
            }) => {
                assert_eq!(exit_code, 2);
                assert_eq!(output, "busy");
            }
            other => panic!("Expected ShellCommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_run_checked_quoted_argument() {
        let cmd = format!("echo {}", shellquote("$HOME"));
        assert_eq!(run_checked(&cmd).unwrap(), "$HOME");
    }
}
