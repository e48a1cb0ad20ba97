use serde::Serialize;
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::ssh::Remote;

/// Packages installed on every run before the components.
pub const BASELINE_PACKAGES: &str = "ca-certificates curl git gnupg lsb-release";

/// How privileged commands are issued on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Privilege {
    Root,
    Sudo,
}

impl Privilege {
    /// Prefix to put in front of a privileged command.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Sudo => "sudo ",
        }
    }
}

/// A remote component installed only when its probe fails.
struct Component {
    name: &'static str,
    probe: &'static str,
    install: fn(Privilege) -> String,
    after: Option<fn(Privilege) -> String>,
}

const COMPONENTS: [Component; 3] = [
    Component {
        name: "docker",
        probe: "command -v docker",
        install: install_docker,
        after: Some(start_docker),
    },
    Component {
        name: "docker compose plugin",
        probe: "docker compose version",
        install: install_compose_plugin,
        after: None,
    },
    Component {
        name: "nginx",
        probe: "command -v nginx",
        install: install_nginx,
        after: Some(start_nginx),
    },
];

fn install_docker(privilege: Privilege) -> String {
    format!(
        "curl -fsSL https://get.docker.com -o /tmp/get-docker.sh && {}sh /tmp/get-docker.sh",
        privilege.prefix()
    )
}

fn start_docker(privilege: Privilege) -> String {
    let sudo = privilege.prefix();
    match privilege {
        Privilege::Root => format!("{sudo}systemctl enable --now docker"),
        Privilege::Sudo => format!(
            "{sudo}systemctl enable --now docker && {sudo}usermod -aG docker \"$(id -un)\""
        ),
    }
}

fn install_compose_plugin(privilege: Privilege) -> String {
    apt_install(privilege, "docker-compose-plugin")
}

fn install_nginx(privilege: Privilege) -> String {
    apt_install(privilege, "nginx")
}

fn start_nginx(privilege: Privilege) -> String {
    format!("{}systemctl enable --now nginx", privilege.prefix())
}

/// Outcome of [`provision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub privilege: Privilege,
    pub installed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

/// Bring the host to a state where it can build containers and serve
/// them through Nginx. Already installed components are skipped.
pub fn provision(remote: &dyn Remote) -> DeployResult<ProvisionReport> {
    info!("Provisioning {}...", remote.target());

    let privilege = check_privilege(remote)?;
    info!("Remote privilege: {privilege:?}");

    run_step(
        remote,
        "refresh package index",
        &format!("{}apt-get update -y", privilege.prefix()),
    )?;
    run_step(
        remote,
        "install baseline packages",
        &apt_install(privilege, BASELINE_PACKAGES),
    )?;

    let mut report = ProvisionReport {
        privilege,
        installed: Vec::new(),
        skipped: Vec::new(),
    };

    for component in &COMPONENTS {
        let present = remote
            .exec(component.probe)
            .map_err(|e| DeployError::Provision(format!("probe {}: {e}", component.name)))?
            .success();

        if present {
            info!("{} already installed, skipping", component.name);
            report.skipped.push(component.name);
        } else {
            run_step(
                remote,
                &format!("install {}", component.name),
                &(component.install)(privilege),
            )?;
            report.installed.push(component.name);
        }

        if let Some(after) = component.after {
            run_step(remote, &format!("start {}", component.name), &after(privilege))?;
        }
    }

    info!(
        installed = ?report.installed,
        skipped = ?report.skipped,
        "Provisioning complete"
    );
    Ok(report)
}

/// Root, or a user with passwordless sudo. Anything else is a
/// [`DeployError::Privilege`].
pub fn check_privilege(remote: &dyn Remote) -> DeployResult<Privilege> {
    let uid = remote
        .exec("id -u")
        .map_err(|e| DeployError::Privilege(e.to_string()))?
        .into_stdout("id -u", DeployError::Privilege)?;
    if uid == "0" {
        return Ok(Privilege::Root);
    }

    let sudo = remote
        .exec("sudo -n true")
        .map_err(|e| DeployError::Privilege(e.to_string()))?;
    if sudo.success() {
        Ok(Privilege::Sudo)
    } else {
        Err(DeployError::Privilege(format!(
            "{} is not root and has no passwordless sudo",
            remote.target()
        )))
    }
}

fn apt_install(privilege: Privilege, packages: &str) -> String {
    format!(
        "{}env DEBIAN_FRONTEND=noninteractive apt-get install -y {packages}",
        privilege.prefix()
    )
}

fn run_step(remote: &dyn Remote, label: &str, command: &str) -> DeployResult<()> {
    info!("[provision] {label}");
    remote
        .exec(command)
        .map_err(|e| DeployError::Provision(format!("{label}: {e}")))?
        .into_stdout(label, DeployError::Provision)?;
    Ok(())
}
