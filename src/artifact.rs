use std::path::{Path, PathBuf};

use docker_compose_types::Compose;
use tracing::info;

use crate::error::{DeployError, DeployResult};

/// Compose file names checked, in order of preference.
pub const COMPOSE_FILES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// How the synced repository describes its container build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDescriptor {
    Dockerfile(PathBuf),
    Compose(PathBuf),
}

impl BuildDescriptor {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Dockerfile(p) | Self::Compose(p) => p,
        }
    }

    /// File name relative to the repository root.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
    }
}

/// Locate the build descriptor in `dir`. A non-empty `Dockerfile` wins
/// over a compose file; a compose file must declare a service.
pub fn verify(dir: &Path) -> DeployResult<BuildDescriptor> {
    let dockerfile = dir.join("Dockerfile");
    if is_non_empty(&dockerfile)? {
        info!("Found Dockerfile in {}", dir.display());
        return Ok(BuildDescriptor::Dockerfile(dockerfile));
    }

    for name in COMPOSE_FILES {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        let compose: Compose = serde_yaml::from_str(&content)
            .map_err(|e| DeployError::MissingArtifact(format!("{name} is not valid: {e}")))?;
        if compose.services.0.is_empty() {
            return Err(DeployError::MissingArtifact(format!(
                "{name} declares no services"
            )));
        }
        info!(
            "Found {name} with {} service(s) in {}",
            compose.services.0.len(),
            dir.display()
        );
        return Ok(BuildDescriptor::Compose(path));
    }

    Err(DeployError::MissingArtifact(format!(
        "neither Dockerfile nor a compose file found in {}",
        dir.display()
    )))
}

/// First port of the first `EXPOSE` instruction, ignoring any
/// `/tcp` or `/udp` suffix.
#[must_use]
pub fn exposed_port(dockerfile: &str) -> Option<u16> {
    dockerfile.lines().find_map(|line| {
        let mut words = line.split_whitespace();
        let instruction = words.next()?;
        if !instruction.eq_ignore_ascii_case("EXPOSE") {
            return None;
        }
        words.find_map(|w| w.split('/').next()?.parse::<u16>().ok())
    })
}

/// Read the `EXPOSE`d port of a Dockerfile descriptor.
pub fn descriptor_port(descriptor: &BuildDescriptor) -> DeployResult<Option<u16>> {
    match descriptor {
        BuildDescriptor::Dockerfile(path) => Ok(exposed_port(&std::fs::read_to_string(path)?)),
        BuildDescriptor::Compose(_) => Ok(None),
    }
}

fn is_non_empty(path: &Path) -> DeployResult<bool> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
