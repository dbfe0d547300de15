//! End-to-end scenarios across the config, env and credentials crates.
//!
//! Everything runs against a [`LabSandbox`] with in-memory stand-ins for
//! kind and sops.

use std::fs;
use std::sync::Arc;

use lab_config::{ConfigResolver, ExportFormat, ValidationKind};
use lab_credentials::{CredentialBroker, CredentialPointer, FakeDecryptor, ScopedPointer};
use lab_env::{
    EnvironmentManager, EnvironmentStatus, EnvironmentType, FakeProvisioner, FsEnvironmentStore,
};
use lab_test_utils::{LabSandbox, config};
use pretty_assertions::assert_eq;

fn standard_sandbox() -> LabSandbox {
    let sandbox = LabSandbox::new();
    sandbox.write_config("base.yaml", config::BASE_YAML);
    sandbox.write_config("production.yaml", config::PRODUCTION_YAML);
    sandbox.write_config("staging.yaml", config::STAGING_YAML);
    sandbox
}

fn manager(
    sandbox: &LabSandbox,
    provisioner: &Arc<FakeProvisioner>,
) -> EnvironmentManager<FsEnvironmentStore, Arc<FakeProvisioner>> {
    EnvironmentManager::new(
        FsEnvironmentStore::new(sandbox.env_state_dir()),
        Arc::clone(provisioner),
    )
}

#[test]
fn staging_from_config_to_running_cluster() {
    let sandbox = standard_sandbox();
    let resolver = ConfigResolver::new(&sandbox.paths().project_config);

    let staging = resolver.validate_environment("staging").unwrap();
    assert_eq!(staging.cluster.domain, "staging.lab.example.com");
    assert_eq!(staging.hosts.len(), 2);

    let provisioner = Arc::new(FakeProvisioner::new());
    let envs = manager(&sandbox, &provisioner);
    let created = envs.create(&staging.name, Some("production"), 2).unwrap();
    assert_eq!(created.record.kind, EnvironmentType::Kind);
    assert_eq!(created.status(), EnvironmentStatus::Running);
    assert_eq!(created.record.config.worker_count, 2);

    let listed: Vec<String> = envs
        .list()
        .unwrap()
        .iter()
        .map(|env| env.name().to_string())
        .collect();
    assert_eq!(listed, vec!["production", "staging"]);

    let kubeconfig = envs.kubeconfig("staging").unwrap();
    assert!(kubeconfig.starts_with(sandbox.env_state_dir().join("staging")));
    assert!(kubeconfig.is_file());
}

#[test]
fn records_survive_a_new_manager() {
    let sandbox = standard_sandbox();
    let provisioner = Arc::new(FakeProvisioner::new());

    manager(&sandbox, &provisioner)
        .create("pr-42", Some("staging"), 0)
        .unwrap();
    manager(&sandbox, &provisioner).stop("pr-42", false).unwrap();

    let reopened = manager(&sandbox, &provisioner);
    let env = reopened.get("pr-42").unwrap();
    assert_eq!(env.intended_status(), EnvironmentStatus::Stopped);
    assert_eq!(env.observed_status(), EnvironmentStatus::Stopped);
    assert_eq!(env.record.from_env.as_deref(), Some("staging"));

    let started = reopened.start("pr-42").unwrap();
    assert_eq!(started.status(), EnvironmentStatus::Running);
    assert_eq!(provisioner.created().len(), 2);

    reopened.delete("pr-42").unwrap();
    assert!(!reopened.exists("pr-42"));
    assert!(!sandbox.env_state_dir().join("pr-42").exists());
}

#[test]
fn state_file_is_json_with_camel_case_keys() {
    let sandbox = standard_sandbox();
    let provisioner = Arc::new(FakeProvisioner::new());
    manager(&sandbox, &provisioner)
        .create("review", None, 1)
        .unwrap();

    let raw =
        fs::read_to_string(sandbox.env_state_dir().join("review").join("state.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["type"], "kind");
    assert_eq!(value["status"], "running");
    assert_eq!(value["config"]["clusterName"], "lab-review");
    assert_eq!(value["config"]["workerCount"], 1);
}

#[test]
fn production_credentials_are_scoped_to_one_call() {
    let sandbox = standard_sandbox();
    sandbox.write_encrypted_kubeconfig("production", "apiVersion: v1\nkind: Config\n");
    let broker = CredentialBroker::from_paths(
        sandbox.paths(),
        FakeDecryptor::new(),
        ScopedPointer::with_value("/home/operator/.kube/config"),
    );

    let seen = broker
        .with_credentials("production", |path| {
            assert_eq!(broker.pointer().get().as_deref(), Some(path.as_os_str()));
            fs::read_to_string(path).unwrap()
        })
        .unwrap();
    assert_eq!(seen, "apiVersion: v1\nkind: Config\n");

    assert_eq!(
        broker.pointer().get().as_deref(),
        Some(std::ffi::OsStr::new("/home/operator/.kube/config"))
    );
    assert!(!broker.decrypted_path("production").exists());
    assert_eq!(broker.active_environment(), None);
}

#[test]
fn every_listed_environment_exports() {
    let sandbox = standard_sandbox();
    let resolver = ConfigResolver::new(&sandbox.paths().project_config);

    for name in resolver.list_environments().unwrap() {
        for format in [
            ExportFormat::Json,
            ExportFormat::Yaml,
            ExportFormat::Nix,
            ExportFormat::Helm,
            ExportFormat::Terraform,
        ] {
            let output = resolver
                .export_environment(&name, format.name())
                .unwrap_or_else(|e| panic!("{name} as {format}: {e}"));
            assert!(!output.is_empty());
        }
    }
}

#[test]
fn incomplete_environment_is_reported_not_created() {
    let sandbox = standard_sandbox();
    sandbox.write_config("scratch.yaml", "scratch:\n  inherits: base\n");
    let resolver = ConfigResolver::new(&sandbox.paths().project_config);

    let results = resolver.validate_all().unwrap();
    let failed: Vec<&str> = results
        .iter()
        .filter(|(_, result)| result.is_err())
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(failed, vec!["scratch"]);

    match resolver.validate_environment("scratch") {
        Err(lab_config::Error::Validation(e)) => {
            assert_eq!(e.kind, ValidationKind::Incomplete);
            assert!(e.issues.iter().any(|issue| issue.path == "cluster.domain"));
        }
        other => panic!("expected an incomplete configuration, got {other:?}"),
    }
}
