use std::path::{Path, PathBuf};
use std::process::Output;

use tracing::{debug, info};

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::repo::redact;

/// SSH connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u32 = 10;

/// Result of one remote command: exit code plus captured output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    #[must_use]
    pub fn ok(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Trimmed stdout on success. On failure, `to_err` receives a
    /// message built from `label`, the exit code and the redacted
    /// stderr.
    pub fn into_stdout(
        self,
        label: &str,
        to_err: impl FnOnce(String) -> DeployError,
    ) -> DeployResult<String> {
        if self.success() {
            return Ok(self.stdout.trim().to_string());
        }
        let code = self
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let stderr = redact(self.stderr.trim());
        let message = if stderr.is_empty() {
            format!("{label} (exit {code})")
        } else {
            format!("{label} (exit {code}): {stderr}")
        };
        Err(to_err(message))
    }
}

impl From<Output> for RemoteOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Executes shell commands on a remote host.
///
/// Implementations return `Err` only when the command could not be
/// dispatched at all; a non-zero remote exit is reported through
/// [`RemoteOutput::code`].
pub trait Remote {
    /// `user@host` description for log lines.
    fn target(&self) -> String;

    /// Run `command` through the remote login shell.
    fn exec(&self, command: &str) -> DeployResult<RemoteOutput>;

    /// Run `command` with `input` piped to its stdin.
    fn exec_with_input(&self, command: &str, input: &[u8]) -> DeployResult<RemoteOutput>;
}

/// SSH session wrapper around the system `ssh` client.
#[derive(Debug, Clone)]
pub struct SshSession {
    host: String,
    user: String,
    key: Option<PathBuf>,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &Path) -> Self {
        self.key = Some(key_path.to_path_buf());
        self
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn dispatch(&self, command: &str, input: Option<&[u8]>) -> DeployResult<RemoteOutput> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output: RemoteOutput = cmd::capture("ssh", &refs, input)?.into();
        debug!(target_host = %self.host, code = ?output.code, "remote command finished");
        Ok(output)
    }
}

impl Remote for SshSession {
    fn target(&self) -> String {
        self.destination()
    }

    fn exec(&self, command: &str) -> DeployResult<RemoteOutput> {
        self.dispatch(command, None)
    }

    fn exec_with_input(&self, command: &str, input: &[u8]) -> DeployResult<RemoteOutput> {
        self.dispatch(command, Some(input))
    }
}

/// Single-quote `value` for a POSIX shell.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Probe the host with a non-interactive `echo ok`. No retry.
pub fn check_connectivity(remote: &dyn Remote) -> DeployResult<()> {
    let target = remote.target();
    info!("Checking SSH connectivity to {target}...");

    let output = remote
        .exec("echo ok")
        .map_err(|e| DeployError::Connectivity(format!("{target}: {e}")))?;
    output.into_stdout(&format!("cannot reach {target}"), DeployError::Connectivity)?;

    info!("SSH connection to {target} OK");
    Ok(())
}
