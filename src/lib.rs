//! Deploy a Dockerized web application to a server over SSH and put
//! Nginx in front of it.
//!
//! Dockhand asks for a repository, a token and an SSH target, then
//! runs a fixed pipeline. Each stage only starts once the previous
//! one succeeded:
//!
//! 1. **Input** - collect and validate parameters ([`prompt`],
//!    [`config`])
//! 2. **Sync** - clone or pull the repository locally ([`repo`])
//! 3. **Artifact** - require a `Dockerfile` or compose file
//!    ([`artifact`])
//! 4. **Connectivity** - probe the host over SSH ([`ssh`])
//! 5. **Provision** - install Docker, the compose plugin and Nginx
//!    unless already present ([`provision`])
//! 6. **Deploy** - clone on the server, build, replace the container
//!    ([`deploy`])
//! 7. **Proxy** - write the Nginx site forwarding port 80 to the
//!    application port ([`nginx`])
//!
//! Failures are terminal: the stage is logged, the run stops, and
//! nothing already done is undone.
//!
//! # Example
//!
//! ```rust,no_run
//! use dockhand::{DeploymentInput, Pipeline};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DeploymentInput {
//!         repo_url: "https://github.com/acme/shop.git".into(),
//!         token: std::env::var("GIT_TOKEN")?,
//!         branch: String::new(),
//!         ssh_user: "deploy".into(),
//!         host: "203.0.113.10".into(),
//!         ssh_key: "~/.ssh/id_ed25519".into(),
//!         port: "8080".into(),
//!     }
//!     .validate()?;
//!
//!     let report = Pipeline::new(config).server_name("shop.example.com").run()?;
//!     println!("{} is running", report.container.name);
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod artifact;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod nginx;
pub mod pipeline;
pub mod prompt;
pub mod provision;
pub mod repo;
pub mod ssh;

pub use config::{ContainerSpec, DeploymentConfig, DeploymentInput};
pub use deploy::remote_build::RemoteBuild;
pub use error::{DeployError, DeployResult};
pub use nginx::Nginx;
pub use pipeline::Pipeline;
pub use ssh::SshSession;
