use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::artifact::{self, BuildDescriptor};
use crate::config::{ContainerSpec, DEFAULT_CONTAINER_PORT, DeploymentConfig};
use crate::deploy::remote_build::RemoteBuild;
use crate::deploy::{DeployTarget, Deployer};
use crate::error::DeployResult;
use crate::nginx::{self, Nginx};
use crate::provision::{self, ProvisionReport};
use crate::repo::{self, GitCli, Vcs};
use crate::ssh::{self, Remote, SshSession};

/// Deployment pipeline: sync, verify, connect, provision, deploy,
/// configure the proxy. Each stage runs only if the previous one
/// succeeded; nothing is rolled back.
pub struct Pipeline {
    config: DeploymentConfig,
    workdir: PathBuf,
    vcs: Box<dyn Vcs>,
    deployer: Box<dyn Deployer>,
    remote: Option<Box<dyn Remote>>,
    container_port: Option<u16>,
    remote_dir: Option<String>,
    server_name: Option<String>,
}

/// What a successful run did.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub container: ContainerSpec,
    pub provision: ProvisionReport,
}

/// What a run would do, printed by `--dry-run`.
#[derive(Debug, Clone, Serialize)]
pub struct DeployPlan {
    pub repository: String,
    pub branch: String,
    pub target: String,
    pub descriptor: String,
    pub container: ContainerSpec,
    pub nginx_site: String,
    pub steps: Vec<String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: DeploymentConfig) -> Self {
        Self {
            config,
            workdir: PathBuf::from("."),
            vcs: Box::new(GitCli),
            deployer: Box::new(RemoteBuild::new()),
            remote: None,
            container_port: None,
            remote_dir: None,
            server_name: None,
        }
    }

    /// Parent directory of the local checkout.
    #[must_use]
    pub fn workdir(mut self, dir: &Path) -> Self {
        self.workdir = dir.to_path_buf();
        self
    }

    #[must_use]
    pub fn vcs(mut self, vcs: impl Vcs + 'static) -> Self {
        self.vcs = Box::new(vcs);
        self
    }

    #[must_use]
    pub fn deployer(mut self, deployer: impl Deployer + 'static) -> Self {
        self.deployer = Box::new(deployer);
        self
    }

    /// Use `remote` instead of an SSH session built from the config.
    #[must_use]
    pub fn remote(mut self, remote: impl Remote + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    /// Override the internal container port found in the Dockerfile.
    #[must_use]
    pub const fn container_port(mut self, port: u16) -> Self {
        self.container_port = Some(port);
        self
    }

    #[must_use]
    pub fn remote_dir(mut self, dir: &str) -> Self {
        self.remote_dir = Some(dir.to_string());
        self
    }

    #[must_use]
    pub fn server_name(mut self, name: &str) -> Self {
        self.server_name = Some(name.to_string());
        self
    }

    /// Run every stage. A failure is logged with its stage and
    /// returned as is.
    pub fn run(&self) -> DeployResult<DeployReport> {
        let result = self.execute();
        match &result {
            Ok(report) => info!(
                "Deployment complete: http://{} -> {} (port {})",
                self.config.host, report.container.name, report.container.host_port
            ),
            Err(e) => error!(stage = e.stage(), "{e}"),
        }
        result
    }

    /// Run the local stages only and describe the remote ones.
    pub fn plan(&self) -> DeployResult<DeployPlan> {
        let result = self.build_plan();
        if let Err(e) = &result {
            error!(stage = e.stage(), "{e}");
        }
        result
    }

    fn execute(&self) -> DeployResult<DeployReport> {
        let (descriptor, spec) = self.prepare_local()?;

        let ssh_session;
        let remote: &dyn Remote = if let Some(r) = &self.remote {
            r.as_ref()
        } else {
            ssh_session = SshSession::new(&self.config.host, &self.config.ssh_user)
                .with_key(&self.config.ssh_key);
            &ssh_session
        };

        ssh::check_connectivity(remote)?;

        let provision = provision::provision(remote)?;

        let target = DeployTarget {
            config: &self.config,
            spec: &spec,
            descriptor: &descriptor,
            privilege: provision.privilege,
        };
        self.deployer.deploy(remote, &target)?;

        nginx::configure(remote, &self.nginx(&spec), &spec.name, provision.privilege)?;

        Ok(DeployReport {
            container: spec,
            provision,
        })
    }

    fn build_plan(&self) -> DeployResult<DeployPlan> {
        let (descriptor, spec) = self.prepare_local()?;
        let nginx = self.nginx(&spec);

        let mut steps = vec![
            format!(
                "Check SSH connectivity to {}@{}",
                self.config.ssh_user, self.config.host
            ),
            "Provision docker, docker compose plugin and nginx (skipping installed ones)"
                .to_string(),
            format!(
                "Clone or reset branch {} into {}",
                self.config.branch,
                spec.repo_dir()
            ),
        ];
        match &descriptor {
            BuildDescriptor::Dockerfile(_) => {
                steps.push(format!("Build image {}", spec.image));
                steps.push(format!(
                    "Replace container {} publishing {}",
                    spec.name,
                    spec.port_mapping()
                ));
            }
            BuildDescriptor::Compose(_) => {
                steps.push(format!(
                    "docker compose -p {} up -d --build ({})",
                    spec.name,
                    descriptor.file_name()
                ));
            }
        }
        steps.push(format!(
            "Write {}/{} and reload nginx",
            nginx::SITES_AVAILABLE,
            spec.name
        ));

        Ok(DeployPlan {
            repository: self.config.repo_url.to_string(),
            branch: self.config.branch.clone(),
            target: format!("{}@{}", self.config.ssh_user, self.config.host),
            descriptor: descriptor.file_name(),
            nginx_site: nginx.render(),
            container: spec,
            steps,
        })
    }

    /// Sync the repository, find its build descriptor, and derive the
    /// container to run from both.
    fn prepare_local(&self) -> DeployResult<(BuildDescriptor, ContainerSpec)> {
        let checkout = repo::sync(self.vcs.as_ref(), &self.config, &self.workdir)?;
        let descriptor = artifact::verify(&checkout)?;
        let spec = self.container_spec(&descriptor)?;
        Ok((descriptor, spec))
    }

    fn container_spec(&self, descriptor: &BuildDescriptor) -> DeployResult<ContainerSpec> {
        let port = if let Some(p) = self.container_port {
            p
        } else if let Some(p) = artifact::descriptor_port(descriptor)? {
            info!("Using container port {p} from EXPOSE");
            p
        } else {
            DEFAULT_CONTAINER_PORT
        };

        let mut spec =
            ContainerSpec::new(&self.config.repo_name(), self.config.app_port).container_port(port);
        if let Some(dir) = &self.remote_dir {
            spec = spec.remote_dir(dir);
        }
        Ok(spec)
    }

    fn nginx(&self, spec: &ContainerSpec) -> Nginx {
        let nginx = Nginx::new(spec.host_port);
        match &self.server_name {
            Some(name) => nginx.server_name(name),
            None => nginx,
        }
    }
}
