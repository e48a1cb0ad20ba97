//! Recording fakes for the `Remote` and `Vcs` seams.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use url::Url;

use dockhand::config::DeploymentInput;
use dockhand::error::{DeployError, DeployResult};
use dockhand::repo::Vcs;
use dockhand::ssh::{Remote, RemoteOutput};

pub const RUNNING: &str = r#"[{"State":{"Status":"running","Running":true}}]"#;

#[derive(Debug, Clone)]
pub struct Call {
    pub command: String,
    pub input: Option<String>,
}

#[derive(Default)]
struct RemoteState {
    rules: Vec<(String, RemoteOutput)>,
    calls: Vec<Call>,
    unreachable: bool,
}

/// Remote host that answers commands from a rule table. The first rule
/// whose pattern is a substring of the command wins; anything else
/// succeeds with empty output.
#[derive(Clone)]
pub struct FakeRemote {
    state: Rc<RefCell<RemoteState>>,
}

impl FakeRemote {
    /// Root user, every component installed, container starts fine.
    pub fn new() -> Self {
        let remote = Self {
            state: Rc::new(RefCell::new(RemoteState::default())),
        };
        remote
            .respond("id -u", RemoteOutput::ok("0\n"))
            .respond("docker inspect", RemoteOutput::ok(RUNNING))
    }

    /// Add a rule that takes precedence over earlier ones.
    pub fn respond(self, pattern: &str, output: RemoteOutput) -> Self {
        self.state
            .borrow_mut()
            .rules
            .insert(0, (pattern.to_string(), output));
        self
    }

    /// Fail dispatch entirely, like `ssh` exiting with 255.
    pub fn unreachable(self) -> Self {
        self.state.borrow_mut().unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands().iter().any(|c| c.contains(needle))
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands().iter().position(|c| c.contains(needle))
    }

    fn answer(&self, command: &str, input: Option<&[u8]>) -> RemoteOutput {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call {
            command: command.to_string(),
            input: input.map(|i| String::from_utf8_lossy(i).into_owned()),
        });
        if state.unreachable {
            return RemoteOutput::failed(
                255,
                "ssh: connect to host 203.0.113.10 port 22: Connection timed out",
            );
        }
        state
            .rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map_or_else(|| RemoteOutput::ok(""), |(_, out)| out.clone())
    }
}

impl Remote for FakeRemote {
    fn target(&self) -> String {
        "deploy@203.0.113.10".to_string()
    }

    fn exec(&self, command: &str) -> DeployResult<RemoteOutput> {
        Ok(self.answer(command, None))
    }

    fn exec_with_input(&self, command: &str, input: &[u8]) -> DeployResult<RemoteOutput> {
        Ok(self.answer(command, Some(input)))
    }
}

/// Version control that materialises `files` on clone.
#[derive(Clone, Default)]
pub struct FakeVcs {
    files: Vec<(String, String)>,
    calls: Rc<RefCell<Vec<String>>>,
    tokens: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl FakeVcs {
    pub fn with_file(mut self, name: &str, content: &str) -> Self {
        self.files.push((name.to_string(), content.to_string()));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Token handed to each call, in call order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.borrow().clone()
    }
}

impl Vcs for FakeVcs {
    fn clone_branch(&self, url: &Url, token: &str, branch: &str, dest: &Path) -> DeployResult<()> {
        self.calls.borrow_mut().push(format!("clone {url} {branch}"));
        self.tokens.borrow_mut().push(token.to_string());
        if self.fail {
            return Err(DeployError::Io(std::io::Error::other("remote: Repository not found")));
        }
        std::fs::create_dir_all(dest)?;
        for (name, content) in &self.files {
            std::fs::write(dest.join(name), content)?;
        }
        Ok(())
    }

    fn pull(&self, _dir: &Path, token: &str, branch: &str) -> DeployResult<()> {
        self.calls.borrow_mut().push(format!("pull {branch}"));
        self.tokens.borrow_mut().push(token.to_string());
        if self.fail {
            return Err(DeployError::Io(std::io::Error::other("merge conflict")));
        }
        Ok(())
    }
}

pub fn input() -> DeploymentInput {
    DeploymentInput {
        repo_url: "https://github.com/acme/shop.git".into(),
        token: "ghp_secret".into(),
        branch: String::new(),
        ssh_user: "deploy".into(),
        host: "203.0.113.10".into(),
        ssh_key: "/keys/id_ed25519".into(),
        port: "8080".into(),
    }
}
