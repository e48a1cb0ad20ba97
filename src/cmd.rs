use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::warn;

use crate::error::{DeployError, DeployResult};
use crate::repo::redact;

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    let mut command = Command::new(program);
    command.args(args);
    checked(program, args, &mut command)
}

/// Same as [`run`], with `dir` as the working directory.
pub fn run_in(dir: &Path, program: &str, args: &[&str]) -> DeployResult<String> {
    let mut command = Command::new(program);
    command.args(args).current_dir(dir);
    checked(program, args, &mut command)
}

/// Same as [`run`], with extra environment variables and an optional
/// working directory. Variable values are never logged.
pub fn run_with_env(
    dir: Option<&Path>,
    program: &str,
    args: &[&str],
    env: &[(&str, &str)],
) -> DeployResult<String> {
    let mut command = Command::new(program);
    command.args(args).envs(env.iter().copied());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    checked(program, args, &mut command)
}

/// Run a command, optionally feeding `stdin_data`, and return the raw
/// output without interpreting the exit status.
pub fn capture(program: &str, args: &[&str], stdin_data: Option<&[u8]>) -> DeployResult<Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    if let (Some(data), Some(stdin)) = (stdin_data, &mut child.stdin) {
        stdin.write_all(data)?;
    }
    drop(child.stdin.take());

    Ok(child.wait_with_output()?)
}

fn checked(program: &str, args: &[&str], command: &mut Command) -> DeployResult<String> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(program, "stderr: {}", redact(&stderr));
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}

/// Join a program and its arguments for display, with URL credentials
/// masked.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| redact(a)));
    parts.join(" ")
}
