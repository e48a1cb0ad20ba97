use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::config::{DeploymentInput, parse_port};
use crate::error::DeployResult;
use crate::logging;
use crate::pipeline::Pipeline;
use crate::prompt::{self, Prompter};

#[derive(Debug, Parser)]
#[command(name = "dockhand")]
#[command(about = "Deploy a Dockerized application to a server behind Nginx")]
#[command(version)]
pub struct Cli {
    /// Git repository URL (https)
    #[arg(long)]
    pub repo_url: Option<String>,

    /// Branch to deploy
    #[arg(long)]
    pub branch: Option<String>,

    /// SSH username
    #[arg(long)]
    pub user: Option<String>,

    /// Server hostname or IP address
    #[arg(long)]
    pub host: Option<String>,

    /// SSH private key path
    #[arg(long)]
    pub key: Option<String>,

    /// Host port the application is published on
    #[arg(long)]
    pub port: Option<String>,

    /// Port the application listens on inside the container
    #[arg(long, value_parser = parse_container_port)]
    pub container_port: Option<u16>,

    /// Remote directory holding the checkout
    #[arg(long)]
    pub remote_dir: Option<String>,

    /// Nginx `server_name` (defaults to `_`)
    #[arg(long)]
    pub server_name: Option<String>,

    /// Directory for the daily log file
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Parent directory of the local checkout
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Print the generated Nginx site and planned actions without
    /// touching the server
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Flag values as a partially filled input; the token is always
    /// left for the prompt.
    #[must_use]
    pub fn preset(&self) -> DeploymentInput {
        DeploymentInput {
            repo_url: self.repo_url.clone().unwrap_or_default(),
            token: String::new(),
            branch: self.branch.clone().unwrap_or_default(),
            ssh_user: self.user.clone().unwrap_or_default(),
            host: self.host.clone().unwrap_or_default(),
            ssh_key: self.key.clone().unwrap_or_default(),
            port: self.port.clone().unwrap_or_default(),
        }
    }
}

fn parse_container_port(raw: &str) -> Result<u16, String> {
    parse_port(raw).map_err(|e| e.to_string())
}

/// Entry point behind the binary: set up logging, collect parameters,
/// then run (or plan) the pipeline.
pub fn run(cli: &Cli) -> DeployResult<()> {
    let log_path = logging::init(&cli.log_dir)?;
    info!("Logging to {}", log_path.display());

    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stderr());
    let config = prompt::collect_config(&mut prompter, cli.preset())?;

    let mut pipeline = Pipeline::new(config).workdir(&cli.workdir);
    if let Some(port) = cli.container_port {
        pipeline = pipeline.container_port(port);
    }
    if let Some(dir) = &cli.remote_dir {
        pipeline = pipeline.remote_dir(dir);
    }
    if let Some(name) = &cli.server_name {
        pipeline = pipeline.server_name(name);
    }

    if cli.dry_run {
        let plan = pipeline.plan()?;
        eprintln!("=== Dry run: no changes will be made ===");
        eprintln!();
        eprintln!("--- nginx site ---");
        println!("{}", plan.nginx_site);
        eprintln!("--- plan ---");
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    pipeline.run()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_fill_preset() {
        let cli = Cli::parse_from([
            "dockhand",
            "--repo-url",
            "https://github.com/acme/shop.git",
            "--user",
            "deploy",
            "--port",
            "8080",
        ]);

        let preset = cli.preset();

        assert_eq!(preset.repo_url, "https://github.com/acme/shop.git");
        assert_eq!(preset.ssh_user, "deploy");
        assert_eq!(preset.port, "8080");
        assert!(preset.token.is_empty());
        assert!(preset.host.is_empty());
    }

    #[test]
    fn rejects_zero_container_port() {
        let res = Cli::try_parse_from(["dockhand", "--container-port", "0"]);

        assert!(res.is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["dockhand"]);

        assert_eq!(cli.log_dir, PathBuf::from("."));
        assert!(!cli.dry_run);
        assert!(cli.container_port.is_none());
    }
}
