use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("repository sync failed: {0}")]
    Sync(String),

    #[error("no build descriptor: {0}")]
    MissingArtifact(String),

    #[error("SSH connection failed: {0}")]
    Connectivity(String),

    #[error("insufficient privileges: {0}")]
    Privilege(String),

    #[error("provisioning failed: {0}")]
    Provision(String),

    #[error("deployment failed: {0}")]
    Deploy(String),

    #[error("reverse proxy configuration failed: {0}")]
    ProxyConfig(String),

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Pipeline stage the error belongs to, used as a log field.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Validation(_) => "input",
            Self::Sync(_) => "sync",
            Self::MissingArtifact(_) => "artifact",
            Self::Connectivity(_) => "connectivity",
            Self::Privilege(_) | Self::Provision(_) => "provision",
            Self::Deploy(_) => "deploy",
            Self::ProxyConfig(_) => "proxy",
            Self::CommandFailed { .. } | Self::CommandNotFound(_) | Self::Io(_) | Self::Json(_) => {
                "internal"
            }
        }
    }
}
