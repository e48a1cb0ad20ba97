use dockhand::artifact::{BuildDescriptor, descriptor_port, verify};
use dockhand::error::DeployError;

const COMPOSE: &str = "\
services:
  web:
    build: .
    ports:
      - \"8080:8080\"
";

#[test]
fn dockerfile_found() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("Dockerfile"), "FROM nginx:alpine\n").unwrap();

    let descriptor = verify(tmp.path()).unwrap();

    assert_eq!(
        descriptor,
        BuildDescriptor::Dockerfile(tmp.path().join("Dockerfile"))
    );
    assert_eq!(descriptor.file_name(), "Dockerfile");
}

#[test]
fn dockerfile_preferred_over_compose() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("Dockerfile"), "FROM nginx:alpine\n").unwrap();
    std::fs::write(tmp.path().join("docker-compose.yml"), COMPOSE).unwrap();

    assert!(matches!(
        verify(tmp.path()).unwrap(),
        BuildDescriptor::Dockerfile(_)
    ));
}

#[test]
fn compose_file_found() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("compose.yaml"), COMPOSE).unwrap();

    let descriptor = verify(tmp.path()).unwrap();

    assert_eq!(descriptor.file_name(), "compose.yaml");
    assert!(matches!(descriptor, BuildDescriptor::Compose(_)));
    assert_eq!(descriptor_port(&descriptor).unwrap(), None);
}

#[test]
fn nothing_found() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("README.md"), "# shop").unwrap();

    let err = verify(tmp.path()).unwrap_err();

    assert!(matches!(err, DeployError::MissingArtifact(_)));
}

#[test]
fn empty_dockerfile_is_missing() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("Dockerfile"), "").unwrap();

    assert!(matches!(
        verify(tmp.path()),
        Err(DeployError::MissingArtifact(_))
    ));
}

#[test]
fn compose_without_services_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("docker-compose.yml"), "services: {}\n").unwrap();

    let err = verify(tmp.path()).unwrap_err();

    assert!(err.to_string().contains("declares no services"));
}

#[test]
fn dockerfile_port_read() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("Dockerfile"),
        "FROM node:22-alpine\nWORKDIR /app\nEXPOSE 8080\nCMD [\"node\", \"server.js\"]\n",
    )
    .unwrap();

    let descriptor = verify(tmp.path()).unwrap();

    assert_eq!(descriptor_port(&descriptor).unwrap(), Some(8080));
}
