use std::path::PathBuf;

use serde::Serialize;
use url::Url;

use crate::error::{DeployError, DeployResult};
use crate::repo;

/// Branch used when the user leaves the prompt empty.
pub const DEFAULT_BRANCH: &str = "main";

/// Remote directory holding the cloned repository.
pub const DEFAULT_REMOTE_DIR: &str = "/opt/app";

/// Internal container port assumed when the Dockerfile has no
/// `EXPOSE` directive.
pub const DEFAULT_CONTAINER_PORT: u16 = 80;

/// Raw, unvalidated answers as typed by the user or passed as flags.
#[derive(Debug, Clone, Default)]
pub struct DeploymentInput {
    pub repo_url: String,
    pub token: String,
    pub branch: String,
    pub ssh_user: String,
    pub host: String,
    pub ssh_key: String,
    pub port: String,
}

impl DeploymentInput {
    /// Validate the answers and freeze them into a
    /// [`DeploymentConfig`]. An empty branch becomes
    /// [`DEFAULT_BRANCH`]; credentials embedded in the repository URL
    /// are dropped in favour of the access token.
    pub fn validate(self) -> DeployResult<DeploymentConfig> {
        let required = [
            ("repository URL", &self.repo_url),
            ("access token", &self.token),
            ("SSH user", &self.ssh_user),
            ("server address", &self.host),
            ("SSH key path", &self.ssh_key),
            ("application port", &self.port),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(DeployError::Validation(format!(
                "required field(s) empty: {}",
                missing.join(", ")
            )));
        }

        let repo_url = parse_repo_url(self.repo_url.trim())?;

        let port = parse_port(&self.port)?;

        let branch = match self.branch.trim() {
            "" => DEFAULT_BRANCH.to_string(),
            b => b.to_string(),
        };

        Ok(DeploymentConfig {
            repo_url,
            token: self.token.trim().to_string(),
            branch,
            ssh_user: self.ssh_user.trim().to_string(),
            host: self.host.trim().to_string(),
            ssh_key: expand_home(self.ssh_key.trim()),
            app_port: port,
        })
    }
}

/// Parse an `https://` repository URL with a host and a repository
/// path, stripped of any userinfo.
pub fn parse_repo_url(raw: &str) -> DeployResult<Url> {
    let mut url = Url::parse(raw).map_err(|e| {
        DeployError::Validation(format!(
            "repository URL must be an https:// URL ({e}): {}",
            repo::redact(raw)
        ))
    })?;

    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    if !has_host || url.set_username("").is_err() || url.set_password(None).is_err() {
        return Err(DeployError::Validation(format!(
            "repository URL has no host: {}",
            repo::redact(raw)
        )));
    }
    if url.scheme() != "https" {
        return Err(DeployError::Validation(format!(
            "repository URL must use https://, got {url}"
        )));
    }
    if repo::local_dir_name(&url).is_none() {
        return Err(DeployError::Validation(format!(
            "repository URL has no repository path: {url}"
        )));
    }
    Ok(url)
}

/// Validated connection and repository parameters. Every field is
/// non-empty and `repo_url` carries no credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub repo_url: Url,
    pub token: String,
    pub branch: String,
    pub ssh_user: String,
    pub host: String,
    pub ssh_key: PathBuf,
    pub app_port: u16,
}

impl DeploymentConfig {
    /// Base name of the repository, without `.git`.
    #[must_use]
    pub fn repo_name(&self) -> String {
        repo::local_dir_name(&self.repo_url).unwrap_or_else(|| "app".to_string())
    }
}

/// What to build and run on the remote host.
///
/// # Example
///
/// ```
/// use dockhand::config::ContainerSpec;
///
/// let spec = ContainerSpec::new("shop", 8080).container_port(3000);
///
/// assert_eq!(spec.image, "shop:latest");
/// assert_eq!(spec.port_mapping(), "8080:3000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub host_port: u16,
    pub container_port: u16,
    pub remote_dir: String,
}

impl ContainerSpec {
    #[must_use]
    pub fn new(name: &str, host_port: u16) -> Self {
        let name = sanitize_name(name);
        Self {
            image: format!("{name}:latest"),
            name,
            host_port,
            container_port: DEFAULT_CONTAINER_PORT,
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
        }
    }

    #[must_use]
    pub fn image(mut self, image: &str) -> Self {
        self.image = image.to_string();
        self
    }

    #[must_use]
    pub const fn container_port(mut self, port: u16) -> Self {
        self.container_port = port;
        self
    }

    #[must_use]
    pub fn remote_dir(mut self, dir: &str) -> Self {
        self.remote_dir = dir.trim_end_matches('/').to_string();
        self
    }

    /// `<remote_dir>/repo`
    #[must_use]
    pub fn repo_dir(&self) -> String {
        format!("{}/repo", self.remote_dir)
    }

    /// `docker run -p` argument.
    #[must_use]
    pub fn port_mapping(&self) -> String {
        format!("{}:{}", self.host_port, self.container_port)
    }
}

/// Parse a TCP port; zero and non-numeric input are rejected.
pub fn parse_port(raw: &str) -> DeployResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(DeployError::Validation(format!(
            "application port must be between 1 and 65535, got '{}'",
            raw.trim()
        ))),
        Ok(port) => Ok(port),
    }
}

/// Docker names allow `[a-zA-Z0-9_.-]` and must be lowercase for
/// image references.
fn sanitize_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_matches(|c| matches!(c, '-' | '.' | '_'));
    if name.is_empty() {
        "app".to_string()
    } else {
        name.to_string()
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
