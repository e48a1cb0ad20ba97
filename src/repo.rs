use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;
use url::Url;

use crate::cmd;
use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};

/// What [`sync`] will do for a given local directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Clone,
    Pull,
}

/// Version-control operations needed to keep a local checkout current.
///
/// `token` is sent as an HTTP header for the duration of the command
/// and never written to the checkout's git config.
pub trait Vcs {
    /// Clone `branch` of `url` into `dest`.
    fn clone_branch(&self, url: &Url, token: &str, branch: &str, dest: &Path) -> DeployResult<()>;

    /// Pull `branch` from `origin` inside `dir`.
    fn pull(&self, dir: &Path, token: &str, branch: &str) -> DeployResult<()>;
}

/// [`Vcs`] backed by the `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl Vcs for GitCli {
    fn clone_branch(&self, url: &Url, token: &str, branch: &str, dest: &Path) -> DeployResult<()> {
        let dest = dest.display().to_string();
        let header = auth_header(token);
        cmd::run_with_env(
            None,
            "git",
            &["clone", "--branch", branch, url.as_str(), &dest],
            &git_auth_env(&header),
        )?;
        Ok(())
    }

    fn pull(&self, dir: &Path, token: &str, branch: &str) -> DeployResult<()> {
        let header = auth_header(token);
        cmd::run_with_env(
            Some(dir),
            "git",
            &["pull", "origin", branch],
            &git_auth_env(&header),
        )?;
        Ok(())
    }
}

/// `Authorization` header carrying `token` as HTTP basic credentials.
#[must_use]
pub fn auth_header(token: &str) -> String {
    let credentials = STANDARD.encode(format!("x-access-token:{token}"));
    format!("Authorization: Basic {credentials}")
}

/// Environment that makes git send `header` with every HTTP request.
#[must_use]
pub fn git_auth_env(header: &str) -> [(&'static str, &str); 3] {
    [
        ("GIT_CONFIG_COUNT", "1"),
        ("GIT_CONFIG_KEY_0", "http.extraHeader"),
        ("GIT_CONFIG_VALUE_0", header),
    ]
}

/// Directory name git would pick for `url`: the last non-empty path
/// segment without a `.git` suffix.
#[must_use]
pub fn local_dir_name(url: &Url) -> Option<String> {
    let last = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}

/// Mask URL credentials (`scheme://secret@host` becomes
/// `scheme://***@host`) anywhere in `text`.
#[must_use]
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("://") {
        let scheme_len = rest[..pos]
            .chars()
            .rev()
            .take_while(|&c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            .count();
        let start = pos - scheme_len;
        let end = rest[pos..]
            .find(|c: char| c.is_whitespace() || matches!(c, '\'' | '"' | '<' | '>' | '`'))
            .map_or(rest.len(), |i| pos + i);

        out.push_str(&rest[..start]);
        let candidate = &rest[start..end];
        out.push_str(mask_credentials(candidate).as_deref().unwrap_or(candidate));
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

fn mask_credentials(candidate: &str) -> Option<String> {
    let mut url = Url::parse(candidate).ok()?;
    if url.username().is_empty() && url.password().is_none() {
        return None;
    }
    url.set_username("***").ok()?;
    url.set_password(None).ok()?;
    Some(url.to_string())
}

#[must_use]
pub fn plan_sync(dir: &Path) -> SyncAction {
    if dir.exists() {
        SyncAction::Pull
    } else {
        SyncAction::Clone
    }
}

/// Clone or pull the configured repository under `workdir` and return
/// the checkout path.
pub fn sync(vcs: &dyn Vcs, config: &DeploymentConfig, workdir: &Path) -> DeployResult<PathBuf> {
    let dir = workdir.join(config.repo_name());
    let shown = &config.repo_url;

    match plan_sync(&dir) {
        SyncAction::Pull => {
            info!(
                "Repository exists at {}, pulling branch {}...",
                dir.display(),
                config.branch
            );
            vcs.pull(&dir, &config.token, &config.branch)
                .map_err(|e| DeployError::Sync(format!("git pull in {}: {e}", dir.display())))?;
            info!("Pulled latest changes for {shown}");
        }
        SyncAction::Clone => {
            info!("Cloning {shown} (branch {})...", config.branch);
            vcs.clone_branch(&config.repo_url, &config.token, &config.branch, &dir)
                .map_err(|e| DeployError::Sync(format!("git clone {shown}: {e}")))?;
            info!("Cloned into {}", dir.display());
        }
    }

    Ok(dir)
}
