use serde::Deserialize;
use tracing::info;

use crate::artifact::BuildDescriptor;
use crate::deploy::{DeployTarget, Deployer};
use crate::error::{DeployError, DeployResult};
use crate::provision::Privilege;
use crate::repo;
use crate::ssh::{Remote, quote};

/// Build on the server: clone the repository there, `docker build`,
/// then `docker run` (or `docker compose up` for compose projects).
///
/// No registry and no image transfer; the host only needs git access
/// to the repository, which the access token provides. The token is
/// piped to git on stdin for each fetch and never stored on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteBuild;

impl RemoteBuild {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Deployer for RemoteBuild {
    fn sync_source(&self, remote: &dyn Remote, target: &DeployTarget<'_>) -> DeployResult<()> {
        let sudo = target.privilege.prefix();
        let dir = quote(&target.spec.remote_dir);
        let repo = target.spec.repo_dir();
        let repo_q = quote(&repo);
        let branch = quote(&target.config.branch);
        let upstream = quote(&format!("origin/{}", target.config.branch));
        let url = quote(target.config.repo_url.as_str());
        let auth = format!("{}\n", repo::auth_header(&target.config.token));

        let prepare = match target.privilege {
            Privilege::Root => format!("mkdir -p {dir}"),
            Privilege::Sudo => format!("{sudo}mkdir -p {dir} && {sudo}chown \"$(id -un)\" {dir}"),
        };
        step(remote, &format!("create {}", target.spec.remote_dir), &prepare)?;

        let has_checkout = remote
            .exec(&format!("test -d {repo_q}/.git"))
            .map_err(|e| DeployError::Deploy(format!("inspect {repo}: {e}")))?
            .success();

        if has_checkout {
            git_step(
                remote,
                &format!("reset {repo} to origin/{}", target.config.branch),
                &format!(
                    "git -C {repo_q} remote set-url origin {url} && \
                     git -C {repo_q} fetch origin {branch} && \
                     git -C {repo_q} reset --hard {upstream}"
                ),
                &auth,
            )?;
        } else {
            git_step(
                remote,
                &format!("clone branch {} into {repo}", target.config.branch),
                &format!("git clone --branch {branch} {url} {repo_q}"),
                &auth,
            )?;
        }

        let file = target.descriptor.file_name();
        step(
            remote,
            &format!("check {file} is present"),
            &format!("test -s {}", quote(&format!("{repo}/{file}"))),
        )
    }

    fn start(&self, remote: &dyn Remote, target: &DeployTarget<'_>) -> DeployResult<()> {
        match target.descriptor {
            BuildDescriptor::Dockerfile(_) => run_container(remote, target),
            BuildDescriptor::Compose(_) => compose_up(remote, target),
        }
    }
}

fn run_container(remote: &dyn Remote, target: &DeployTarget<'_>) -> DeployResult<()> {
    let sudo = target.privilege.prefix();
    let spec = target.spec;
    let name = quote(&spec.name);
    let image = quote(&spec.image);

    step(
        remote,
        &format!("build image {}", spec.image),
        &format!("{sudo}docker build -t {image} {}", quote(&spec.repo_dir())),
    )?;

    let existing = remote
        .exec(&format!(
            "{sudo}docker ps -a --filter {} --format '{{{{.Names}}}}'",
            quote(&format!("name=^/{}$", spec.name))
        ))
        .map_err(|e| DeployError::Deploy(format!("list containers: {e}")))?
        .into_stdout("list containers", DeployError::Deploy)?;

    if existing.lines().any(|l| l.trim() == spec.name) {
        info!("Replacing existing container {}", spec.name);
        step(
            remote,
            &format!("stop {}", spec.name),
            &format!("{sudo}docker stop {name}"),
        )?;
        step(
            remote,
            &format!("remove {}", spec.name),
            &format!("{sudo}docker rm {name}"),
        )?;
    }

    step(
        remote,
        &format!("run {} on port {}", spec.name, spec.port_mapping()),
        &format!(
            "{sudo}docker run -d --name {name} --restart unless-stopped -p {} {image}",
            spec.port_mapping()
        ),
    )?;

    let inspect = remote
        .exec(&format!("{sudo}docker inspect {name}"))
        .map_err(|e| DeployError::Deploy(format!("inspect {}: {e}", spec.name)))?
        .into_stdout(&format!("inspect {}", spec.name), DeployError::Deploy)?;
    let state = parse_inspect(&inspect)?;
    if !state.running {
        return Err(DeployError::Deploy(format!(
            "container {} is {} after start",
            spec.name, state.status
        )));
    }

    info!(
        "Container {} running ({} -> {})",
        spec.name, spec.host_port, spec.container_port
    );
    Ok(())
}

fn compose_up(remote: &dyn Remote, target: &DeployTarget<'_>) -> DeployResult<()> {
    let sudo = target.privilege.prefix();
    let spec = target.spec;
    let file = target.descriptor.file_name();

    step(
        remote,
        &format!("docker compose up ({file})"),
        &format!(
            "cd {} && {sudo}docker compose -p {} -f {} up -d --build",
            quote(&spec.repo_dir()),
            quote(&spec.name),
            quote(&file)
        ),
    )?;

    info!("Compose project {} started", spec.name);
    Ok(())
}

/// The `State` object of `docker inspect` output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    pub status: String,
    pub running: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    state: ContainerState,
}

/// Extract the state of the first container in `docker inspect`
/// output.
pub fn parse_inspect(json: &str) -> DeployResult<ContainerState> {
    let entries: Vec<InspectEntry> = serde_json::from_str(json)
        .map_err(|e| DeployError::Deploy(format!("unreadable docker inspect output: {e}")))?;
    entries
        .into_iter()
        .next()
        .map(|e| e.state)
        .ok_or_else(|| DeployError::Deploy("docker inspect returned no containers".into()))
}

/// Reads the `Authorization` header from stdin and hands it to git
/// through the environment.
const GIT_AUTH_PREFIX: &str = "read -r auth && export GIT_CONFIG_COUNT=1 \
    GIT_CONFIG_KEY_0=http.extraHeader GIT_CONFIG_VALUE_0=\"$auth\" && ";

/// Like [`step`], with the git credential sent over stdin so it stays
/// out of process arguments and `.git/config`.
fn git_step(remote: &dyn Remote, label: &str, command: &str, auth: &str) -> DeployResult<()> {
    info!("[deploy] {label}");
    remote
        .exec_with_input(&format!("{GIT_AUTH_PREFIX}{command}"), auth.as_bytes())
        .map_err(|e| DeployError::Deploy(format!("{label}: {e}")))?
        .into_stdout(label, DeployError::Deploy)?;
    Ok(())
}

fn step(remote: &dyn Remote, label: &str, command: &str) -> DeployResult<()> {
    info!("[deploy] {label}");
    remote
        .exec(command)
        .map_err(|e| DeployError::Deploy(format!("{label}: {e}")))?
        .into_stdout(label, DeployError::Deploy)?;
    Ok(())
}
