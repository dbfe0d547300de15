//! Tests for the lab binary.
//!
//! External tools are replaced by small shell scripts passed via `--kind`
//! and `--sops`, so the full command path runs without kind or sops.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lab_test_utils::{ConfigFixture, LabSandbox};
use predicates::prelude::*;

fn lab_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lab"));
    cmd.env("NO_COLOR", "1")
        .env_remove("LAB_CONFIG_DIR")
        .env_remove("LAB_STATE_DIR")
        .env_remove("LAB_CACHE_DIR")
        .env_remove("LAB_KIND")
        .env_remove("LAB_SOPS");
    cmd
}

/// `lab` with every directory inside the sandbox.
fn sandboxed(sandbox: &LabSandbox) -> Command {
    let paths = sandbox.paths();
    let mut cmd = lab_cmd();
    cmd.arg("--config-dir")
        .arg(&paths.project_config)
        .arg("--state-dir")
        .arg(&paths.state)
        .arg("--cache-dir")
        .arg(&paths.cache);
    cmd
}

fn config_cmd(fixture: &ConfigFixture) -> Command {
    let mut cmd = lab_cmd();
    cmd.arg("--config-dir").arg(fixture.dir());
    cmd
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A kind stand-in that tracks clusters in a text file next to it.
#[cfg(unix)]
fn fake_kind(sandbox: &LabSandbox) -> PathBuf {
    let state = sandbox.root().join("kind-clusters");
    let body = format!(
        r#"state="{state}"
touch "$state"
case "$1 $2" in
  "create cluster")
    echo "$4" >> "$state"
    printf 'apiVersion: v1\nkind: Config\n' > "$8"
    ;;
  "delete cluster")
    grep -vx "$4" "$state" > "$state.tmp"
    mv "$state.tmp" "$state"
    ;;
  "get clusters")
    cat "$state"
    ;;
esac
"#,
        state = state.display()
    );
    write_script(sandbox.root(), "kind", &body)
}

/// A sops stand-in that prints the file it is asked to decrypt.
#[cfg(unix)]
fn fake_sops(sandbox: &LabSandbox) -> PathBuf {
    write_script(sandbox.root(), "sops", "cat \"$2\"\n")
}

mod help_tests {
    use super::*;

    #[test]
    fn test_help_output() {
        lab_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("homelab environment"));
    }

    #[test]
    fn test_version_output() {
        lab_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("lab"));
    }

    #[test]
    fn test_no_command_prints_hint() {
        lab_cmd()
            .assert()
            .success()
            .stdout(predicate::str::contains("lab --help"));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        lab_cmd().arg("frobnicate").assert().failure();
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_list() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("production"))
            .stdout(predicate::str::contains("staging"))
            .stdout(predicate::str::contains("base").not());
    }

    #[test]
    fn test_config_list_json() {
        let fixture = ConfigFixture::standard();
        let output = config_cmd(&fixture)
            .args(["config", "list", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let names: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(names, vec!["production", "staging"]);
    }

    #[test]
    fn test_config_show_production() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "show", "production"])
            .assert()
            .success()
            .stdout(predicate::str::contains("lab.example.com"))
            .stdout(predicate::str::contains("node1"))
            .stdout(predicate::str::contains("192.168.1.0/24"));
    }

    #[test]
    fn test_config_show_defaults_to_base() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Environment: base"));
    }

    #[test]
    fn test_config_show_json_is_parseable() {
        let fixture = ConfigFixture::standard();
        let output = config_cmd(&fixture)
            .args(["--json", "config", "show", "staging"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["name"], "staging");
        assert_eq!(value["cluster"]["domain"], "staging.lab.example.com");
        assert_eq!(value["hosts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_config_show_unknown_environment() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "show", "qa"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"qa\" not found"));
    }

    #[test]
    fn test_config_validate_single() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "validate", "production"])
            .assert()
            .success()
            .stdout(predicate::str::contains("is valid"));
    }

    #[test]
    fn test_config_validate_all_valid() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("All 2 environment(s) are valid"));
    }

    #[test]
    fn test_config_validate_all_reports_failures() {
        let fixture = ConfigFixture::standard();
        fixture.write("broken.yaml", "broken:\n  inherits: base\n");

        config_cmd(&fixture)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("production"))
            .stderr(predicate::str::contains("broken"))
            .stderr(predicate::str::contains("incomplete configuration"))
            .stderr(predicate::str::contains("cluster.domain"))
            .stderr(predicate::str::contains("1 environment(s) failed validation"));
    }

    #[test]
    fn test_config_validate_base_is_incomplete() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "validate", "base"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("incomplete configuration"));
    }

    #[test]
    fn test_config_export_nix() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "export", "production", "nix"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(
                "# Generated from environment: production",
            ))
            .stdout(predicate::str::contains("node1"));
    }

    #[test]
    fn test_config_export_tf_alias() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "export", "staging", "tf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("staging.lab.example.com"));
    }

    #[test]
    fn test_config_export_unsupported_format() {
        let fixture = ConfigFixture::standard();
        config_cmd(&fixture)
            .args(["config", "export", "production", "toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported format: toml"));
    }

    #[test]
    fn test_config_list_empty_directory() {
        let fixture = ConfigFixture::empty();
        config_cmd(&fixture)
            .args(["config", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No environments found"));
    }

    #[test]
    fn test_config_show_without_documents() {
        let fixture = ConfigFixture::empty();
        config_cmd(&fixture)
            .args(["config", "show", "production"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No configuration documents found"));
    }

    #[test]
    fn test_config_missing_directory() {
        let fixture = ConfigFixture::empty();
        lab_cmd()
            .arg("--config-dir")
            .arg(fixture.root().join("nowhere"))
            .args(["config", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No configuration documents found"));
    }
}

mod env_tests {
    use super::*;

    #[test]
    fn test_env_create_production_rejected() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["env", "create", "production"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("reserved"));
    }

    #[test]
    fn test_env_create_invalid_name() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["env", "create", "Bad_Name"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid environment name"));
    }

    #[test]
    fn test_env_delete_production_rejected() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["env", "delete", "production", "--force"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Cannot delete the production environment",
            ));
    }

    #[test]
    fn test_env_status_unknown() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["--kind", "/nonexistent/kind", "env", "status", "ghost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"ghost\" not found"));
    }

    #[test]
    fn test_env_kubeconfig_production_points_to_decrypt() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["env", "kubeconfig", "production"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("lab kubeconfig decrypt production"));
    }

    #[test]
    fn test_env_list_without_kind_still_shows_production() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["--kind", "/nonexistent/kind", "env", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("production"))
            .stdout(predicate::str::contains("physical"));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_lifecycle_with_fake_kind() {
        let sandbox = LabSandbox::new();
        let kind = fake_kind(&sandbox);
        let run = |args: &[&str]| {
            let mut cmd = sandboxed(&sandbox);
            cmd.arg("--kind").arg(&kind).args(args);
            cmd
        };

        run(&["env", "create", "staging", "--workers", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Environment staging created"))
            .stdout(predicate::str::contains("export KUBECONFIG="));

        let topology =
            fs::read_to_string(sandbox.env_state_dir().join("staging").join("kind-config.yaml"))
                .unwrap();
        assert_eq!(topology.matches("role: worker").count(), 2);

        run(&["env", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("staging"))
            .stdout(predicate::str::contains("running"));

        run(&["env", "kubeconfig", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("staging"));

        run(&["env", "stop", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Environment staging stopped"));

        let output = run(&["--json", "env", "status", "staging"]).output().unwrap();
        assert!(output.status.success());
        let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(status["status"], "stopped");
        assert_eq!(status["observedStatus"], "stopped");
        assert_eq!(status["fromEnv"], "production");

        run(&["env", "start", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Environment staging started"));

        run(&["env", "delete", "staging", "-f"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Environment staging deleted"));

        run(&["env", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("staging").not());
        assert!(!sandbox.env_state_dir().join("staging").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_env_stop_preserve_state_reports_drift() {
        let sandbox = LabSandbox::new();
        let kind = fake_kind(&sandbox);
        let run = |args: &[&str]| {
            let mut cmd = sandboxed(&sandbox);
            cmd.arg("--kind").arg(&kind).args(args);
            cmd
        };

        run(&["env", "create", "pr-7"]).assert().success();
        run(&["env", "stop", "pr-7", "--preserve-state"])
            .assert()
            .success()
            .stdout(predicate::str::contains("still running"));

        run(&["env", "status", "pr-7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Recorded:"));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_create_failure_leaves_error_record() {
        let sandbox = LabSandbox::new();
        let kind = write_script(
            sandbox.root(),
            "kind",
            "echo 'ERROR: failed to create cluster: docker not running' >&2\nexit 1\n",
        );

        sandboxed(&sandbox)
            .arg("--kind")
            .arg(&kind)
            .args(["env", "create", "broken"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("docker not running"));

        let state = fs::read_to_string(
            sandbox.env_state_dir().join("broken").join("state.json"),
        )
        .unwrap();
        assert!(state.contains("\"error\""));
    }
}

mod kubeconfig_tests {
    use super::*;

    #[test]
    fn test_kubeconfig_list_empty() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["kubeconfig", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No kubeconfig files found"));
    }

    #[test]
    fn test_kubeconfig_list_shows_encrypted() {
        let sandbox = LabSandbox::new();
        sandbox.write_encrypted_kubeconfig("production", "apiVersion: v1\n");
        sandbox.write_encrypted_kubeconfig("staging", "apiVersion: v1\n");

        sandboxed(&sandbox)
            .args(["kubeconfig", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("production (encrypted)"))
            .stdout(predicate::str::contains("staging (encrypted)"));
    }

    #[test]
    fn test_kubeconfig_cleanup_with_nothing_to_do() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["kubeconfig", "cleanup"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleaned up"));
    }

    #[test]
    fn test_kubeconfig_decrypt_missing() {
        let sandbox = LabSandbox::new();
        sandboxed(&sandbox)
            .args(["kubeconfig", "decrypt", "staging"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_kubeconfig_decrypt_then_cleanup() {
        let sandbox = LabSandbox::new();
        let sops = fake_sops(&sandbox);
        sandbox.write_encrypted_kubeconfig("production", "apiVersion: v1\nkind: Config\n");

        let output = sandboxed(&sandbox)
            .arg("--sops")
            .arg(&sops)
            .args(["--json", "kubeconfig", "decrypt"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let decrypted: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(decrypted["environment"], "production");
        let path = PathBuf::from(decrypted["path"].as_str().unwrap());
        assert!(path.starts_with(sandbox.k8s_cache_dir()));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "apiVersion: v1\nkind: Config\n"
        );

        sandboxed(&sandbox)
            .args(["kubeconfig", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("production (decrypted)"));

        sandboxed(&sandbox)
            .args(["kubeconfig", "cleanup"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 removed"));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_kubeconfig_decrypt_failure() {
        let sandbox = LabSandbox::new();
        let sops = write_script(
            sandbox.root(),
            "sops",
            "echo 'Error getting data key: 0 successful groups required, got 0' >&2\nexit 128\n",
        );
        sandbox.write_encrypted_kubeconfig("production", "sops: {}\n");

        sandboxed(&sandbox)
            .arg("--sops")
            .arg(&sops)
            .args(["kubeconfig", "decrypt", "production"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error getting data key"));
        assert!(!sandbox.k8s_cache_dir().join("kubeconfig").join("production.yaml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_kubeconfig_exec_binds_and_removes() {
        let sandbox = LabSandbox::new();
        let sops = fake_sops(&sandbox);
        sandbox.write_encrypted_kubeconfig("production", "apiVersion: v1\n");

        sandboxed(&sandbox)
            .arg("--sops")
            .arg(&sops)
            .args([
                "kubeconfig",
                "exec",
                "production",
                "--",
                "sh",
                "-c",
                "cat \"$KUBECONFIG\"",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("apiVersion: v1"));

        assert!(!sandbox.k8s_cache_dir().join("kubeconfig").join("production.yaml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_kubeconfig_exec_propagates_failure() {
        let sandbox = LabSandbox::new();
        let sops = fake_sops(&sandbox);
        sandbox.write_encrypted_kubeconfig("production", "apiVersion: v1\n");

        sandboxed(&sandbox)
            .arg("--sops")
            .arg(&sops)
            .args(["kubeconfig", "exec", "production", "--", "sh", "-c", "exit 3"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("exited with"));

        assert!(!sandbox.k8s_cache_dir().join("kubeconfig").join("production.yaml").exists());
    }
}
