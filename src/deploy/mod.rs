pub mod remote_build;

use crate::artifact::BuildDescriptor;
use crate::config::{ContainerSpec, DeploymentConfig};
use crate::error::DeployResult;
use crate::provision::Privilege;
use crate::ssh::Remote;

/// Everything a [`Deployer`] needs to know about one deployment.
#[derive(Debug, Clone, Copy)]
pub struct DeployTarget<'a> {
    pub config: &'a DeploymentConfig,
    pub spec: &'a ContainerSpec,
    pub descriptor: &'a BuildDescriptor,
    pub privilege: Privilege,
}

/// A deployer fetches sources, builds, and starts containers on
/// a remote host.
pub trait Deployer {
    /// Clone or hard-reset the repository on the remote host and
    /// check the build descriptor made it across.
    fn sync_source(&self, remote: &dyn Remote, target: &DeployTarget<'_>) -> DeployResult<()>;

    /// Build the image and replace the running container.
    fn start(&self, remote: &dyn Remote, target: &DeployTarget<'_>) -> DeployResult<()>;

    /// Run both phases in order.
    fn deploy(&self, remote: &dyn Remote, target: &DeployTarget<'_>) -> DeployResult<()> {
        self.sync_source(remote, target)?;
        self.start(remote, target)
    }
}
