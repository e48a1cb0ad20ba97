use std::io::{BufRead, Write};

use tracing::{error, info};

use crate::config::{DEFAULT_BRANCH, DeploymentConfig, DeploymentInput};
use crate::error::DeployResult;

/// Line-oriented prompter over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `label` and read one line. End of input reads as an empty
    /// answer.
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> DeployResult<String> {
        match default {
            Some(d) => write!(self.output, "{label} [{d}]: ")?,
            None => write!(self.output, "{label}: ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let answer = line.trim().to_string();

        Ok(match default {
            Some(d) if answer.is_empty() => d.to_string(),
            _ => answer,
        })
    }

    /// Prompt for every field `preset` leaves empty.
    pub fn collect(&mut self, preset: DeploymentInput) -> DeployResult<DeploymentInput> {
        let mut input = preset;

        if input.repo_url.is_empty() {
            input.repo_url = self.ask("Git repository URL", None)?;
        }
        if input.token.is_empty() {
            input.token = self.ask("Personal access token", None)?;
        }
        if input.branch.is_empty() {
            input.branch = self.ask("Branch", Some(DEFAULT_BRANCH))?;
        }
        if input.ssh_user.is_empty() {
            input.ssh_user = self.ask("SSH username", None)?;
        }
        if input.host.is_empty() {
            input.host = self.ask("Server IP address", None)?;
        }
        if input.ssh_key.is_empty() {
            input.ssh_key = self.ask("SSH key path", None)?;
        }
        if input.port.is_empty() {
            input.port = self.ask("Application port", None)?;
        }

        Ok(input)
    }
}

/// Collect and validate the deployment parameters, logging the outcome.
pub fn collect_config<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    preset: DeploymentInput,
) -> DeployResult<DeploymentConfig> {
    let result = prompter.collect(preset).and_then(DeploymentInput::validate);
    match &result {
        Ok(config) => info!(
            "Parameters collected: repo={} branch={} target={}@{} port={}",
            config.repo_url,
            config.branch,
            config.ssh_user,
            config.host,
            config.app_port
        ),
        Err(e) => error!(stage = e.stage(), "{e}"),
    }
    result
}
