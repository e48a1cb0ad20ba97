mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::FakeVcs;
use dockhand::error::DeployError;
use dockhand::repo::{
    self, SyncAction, auth_header, git_auth_env, local_dir_name, plan_sync, redact,
};
use url::Url;

fn dir_name(raw: &str) -> Option<String> {
    local_dir_name(&Url::parse(raw).unwrap())
}

#[test]
fn dir_name_strips_git_suffix() {
    assert_eq!(
        dir_name("https://github.com/acme/shop.git").as_deref(),
        Some("shop")
    );
    assert_eq!(
        dir_name("https://gitlab.com/group/sub/api").as_deref(),
        Some("api")
    );
}

#[test]
fn dir_name_cannot_escape_the_workdir() {
    assert_eq!(
        dir_name("https://github.com/acme/../shop.git").as_deref(),
        Some("shop")
    );
    assert_eq!(dir_name("https://github.com/acme/.."), None);
}

#[test]
fn header_carries_reserved_characters_verbatim() {
    let header = auth_header("p@ss/w:rd");

    let encoded = header.strip_prefix("Authorization: Basic ").unwrap();
    let decoded = STANDARD.decode(encoded).unwrap();
    assert_eq!(decoded, b"x-access-token:p@ss/w:rd");
    assert!(!header.contains("p@ss"));
}

#[test]
fn auth_env_sets_extra_header() {
    let header = auth_header("t");

    let env = git_auth_env(&header);

    assert_eq!(env[0], ("GIT_CONFIG_COUNT", "1"));
    assert_eq!(env[1], ("GIT_CONFIG_KEY_0", "http.extraHeader"));
    assert_eq!(env[2], ("GIT_CONFIG_VALUE_0", header.as_str()));
}

#[test]
fn redact_masks_every_url() {
    let text = "fatal: unable to access 'https://ghp_abc@github.com/acme/shop.git/': \
                mirror https://user:pw@mirror.local/x";

    let masked = redact(text);

    assert!(!masked.contains("ghp_abc"));
    assert!(!masked.contains("user:pw"));
    assert!(masked.contains("'https://***@github.com/acme/shop.git/'"));
    assert!(masked.contains("https://***@mirror.local/x"));
}

#[test]
fn redact_masks_percent_encoded_credentials() {
    let mut url = Url::parse("https://github.com/acme/shop.git").unwrap();
    url.set_username("p@ss/w:rd").unwrap();

    let masked = redact(&format!("clone {url} failed"));

    assert_eq!(masked, "clone https://***@github.com/acme/shop.git failed");
}

#[test]
fn plan_depends_on_directory() {
    let tmp = tempfile::tempdir().unwrap();

    assert_eq!(plan_sync(&tmp.path().join("shop")), SyncAction::Clone);

    std::fs::create_dir(tmp.path().join("shop")).unwrap();
    assert_eq!(plan_sync(&tmp.path().join("shop")), SyncAction::Pull);
}

#[test]
fn missing_directory_is_cloned_with_token_aside() {
    let tmp = tempfile::tempdir().unwrap();
    let vcs = FakeVcs::default().with_file("Dockerfile", "FROM nginx\n");
    let config = common::input().validate().unwrap();

    let dir = repo::sync(&vcs, &config, tmp.path()).unwrap();

    assert_eq!(dir, tmp.path().join("shop"));
    assert_eq!(
        vcs.calls(),
        vec!["clone https://github.com/acme/shop.git main"]
    );
    assert_eq!(vcs.tokens(), vec!["ghp_secret"]);
    assert!(dir.join("Dockerfile").exists());
}

#[test]
fn existing_directory_is_pulled() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("shop")).unwrap();
    let vcs = FakeVcs::default();
    let mut input = common::input();
    input.branch = "develop".into();
    let config = input.validate().unwrap();

    repo::sync(&vcs, &config, tmp.path()).unwrap();

    assert_eq!(vcs.calls(), vec!["pull develop"]);
}

#[test]
fn vcs_failure_is_sync_error_without_token() {
    let tmp = tempfile::tempdir().unwrap();
    let vcs = FakeVcs::default().failing();
    let config = common::input().validate().unwrap();

    let err = repo::sync(&vcs, &config, tmp.path()).unwrap_err();

    assert!(matches!(err, DeployError::Sync(_)));
    assert!(!err.to_string().contains("ghp_secret"));
}
