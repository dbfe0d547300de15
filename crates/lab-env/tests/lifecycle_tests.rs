//! Tests for the environment lifecycle state machine

use lab_env::{
    EnvironmentManager, EnvironmentStatus, EnvironmentStore, EnvironmentType, Error, FakeFailure,
    FakeProvisioner, KindCluster, MemoryStore, PRODUCTION,
};
use pretty_assertions::assert_eq;

fn manager() -> EnvironmentManager<MemoryStore, FakeProvisioner> {
    EnvironmentManager::new(MemoryStore::new(), FakeProvisioner::new())
}

mod create_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_then_get_is_running() {
        let mgr = manager();
        mgr.create("feature-x", None, 1).unwrap();

        let env = mgr.get("feature-x").unwrap();
        assert_eq!(env.status(), EnvironmentStatus::Running);
        assert_eq!(env.intended_status(), EnvironmentStatus::Running);
        assert_eq!(env.record.config.cluster_name, "lab-feature-x");
        assert!(!env.drifted());
    }

    #[test]
    fn test_create_writes_topology_and_passes_paths() {
        let mgr = manager();
        mgr.create("topo", Some("production"), 3).unwrap();

        let topology = mgr.store().topology("topo").unwrap();
        let parsed: KindCluster = serde_yaml::from_str(&topology).unwrap();
        assert_eq!(parsed.name, "lab-topo");
        assert_eq!(parsed.worker_count(), 3);

        let created = mgr.provisioner().created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].topology_path, mgr.store().topology_path("topo"));
        assert_eq!(created[0].kubeconfig_path, mgr.store().kubeconfig_path("topo"));
    }

    #[test]
    fn test_negative_workers_are_clamped() {
        let mgr = manager();
        let env = mgr.create("tiny", None, -5).unwrap();
        assert_eq!(env.record.config.worker_count, 0);
    }

    #[test]
    fn test_production_is_reserved() {
        let mgr = manager();
        let err = mgr.create(PRODUCTION, None, 0).unwrap_err();
        assert!(matches!(err, Error::ReservedName { .. }));
        assert!(mgr.provisioner().created().is_empty());
    }

    #[test]
    fn test_duplicate_create_fails() {
        let mgr = manager();
        mgr.create("dup", None, 0).unwrap();
        let err = mgr.create("dup", None, 0).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { ref name } if name == "dup"));
    }

    #[test]
    fn test_invalid_name_never_reaches_store() {
        let mgr = manager();
        let err = mgr.create("../etc", None, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }));
        assert!(mgr.store().names().unwrap().is_empty());
    }

    #[test]
    fn test_failed_create_keeps_error_record() {
        let mgr = manager();
        mgr.provisioner().fail(FakeFailure::Create);

        let err = mgr.create("flaky", None, 0).unwrap_err();
        assert!(matches!(err, Error::Provisioner { .. }));

        let record = mgr.store().load("flaky").unwrap().unwrap();
        assert_eq!(record.status, EnvironmentStatus::Error);
    }
}

mod transition_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stop_deletes_cluster() {
        let mgr = manager();
        mgr.create("s", None, 0).unwrap();

        let env = mgr.stop("s", false).unwrap();
        assert_eq!(env.intended_status(), EnvironmentStatus::Stopped);
        assert_eq!(env.observed_status(), EnvironmentStatus::Stopped);
        assert!(!mgr.provisioner().is_live("lab-s"));
    }

    #[test]
    fn test_stop_preserving_state_surfaces_drift() {
        let mgr = manager();
        mgr.create("keep", None, 0).unwrap();

        let env = mgr.stop("keep", true).unwrap();
        assert_eq!(env.intended_status(), EnvironmentStatus::Stopped);
        assert_eq!(env.observed_status(), EnvironmentStatus::Running);
        assert!(env.drifted());
        assert!(mgr.provisioner().is_live("lab-keep"));
    }

    #[test]
    fn test_stop_requires_running() {
        let mgr = manager();
        mgr.create("idle", None, 0).unwrap();
        mgr.stop("idle", false).unwrap();

        let err = mgr.stop("idle", false).unwrap_err();
        assert!(matches!(
            err,
            Error::NotRunning { status: EnvironmentStatus::Stopped, .. }
        ));
    }

    #[test]
    fn test_start_recreates_missing_cluster() {
        let mgr = manager();
        mgr.create("again", None, 0).unwrap();
        mgr.stop("again", false).unwrap();

        let env = mgr.start("again").unwrap();
        assert_eq!(env.status(), EnvironmentStatus::Running);
        assert_eq!(mgr.provisioner().created().len(), 2);
    }

    #[test]
    fn test_start_with_preserved_cluster_only_updates_status() {
        let mgr = manager();
        mgr.create("warm", None, 0).unwrap();
        mgr.stop("warm", true).unwrap();

        mgr.start("warm").unwrap();
        assert_eq!(mgr.provisioner().created().len(), 1);
        assert_eq!(
            mgr.get("warm").unwrap().intended_status(),
            EnvironmentStatus::Running
        );
    }

    #[test]
    fn test_start_rejects_running() {
        let mgr = manager();
        mgr.create("busy", None, 0).unwrap();
        assert!(matches!(
            mgr.start("busy").unwrap_err(),
            Error::AlreadyRunning { .. }
        ));
    }

    #[test]
    fn test_start_recovers_from_error() {
        let mgr = manager();
        mgr.provisioner().fail(FakeFailure::Create);
        mgr.create("retry", None, 0).unwrap_err();
        mgr.provisioner().heal();

        let env = mgr.start("retry").unwrap();
        assert_eq!(env.status(), EnvironmentStatus::Running);
    }

    #[test]
    fn test_unknown_environment_is_not_found() {
        let mgr = manager();
        assert!(mgr.get("nope").unwrap_err().is_not_found());
        assert!(mgr.start("nope").unwrap_err().is_not_found());
        assert!(mgr.stop("nope", false).unwrap_err().is_not_found());
    }
}

mod delete_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delete_is_idempotent() {
        let mgr = manager();
        mgr.create("gone", None, 0).unwrap();

        mgr.delete("gone").unwrap();
        mgr.delete("gone").unwrap();
        assert!(!mgr.exists("gone"));
        assert!(!mgr.provisioner().is_live("lab-gone"));
    }

    #[test]
    fn test_delete_after_out_of_band_cluster_removal() {
        let mgr = manager();
        mgr.create("oob", None, 0).unwrap();
        mgr.provisioner().set_live("lab-oob", false);

        mgr.delete("oob").unwrap();
        assert!(!mgr.exists("oob"));
    }

    #[test]
    fn test_delete_swallows_provisioner_failure() {
        let mgr = manager();
        mgr.create("stuck", None, 0).unwrap();
        mgr.provisioner().fail(FakeFailure::Delete);

        mgr.delete("stuck").unwrap();
        assert!(!mgr.exists("stuck"));
    }

    #[test]
    fn test_delete_production_is_rejected() {
        let mgr = manager();
        assert!(matches!(
            mgr.delete(PRODUCTION).unwrap_err(),
            Error::ReservedName { .. }
        ));
    }
}

mod listing_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_staging_scenario() {
        let mgr = manager();
        mgr.create("staging", Some("production"), 2).unwrap();

        let envs = mgr.list().unwrap();
        let names: Vec<_> = envs.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["production", "staging"]);

        let staging = &envs[1];
        assert_eq!(staging.record.kind, EnvironmentType::Kind);
        assert_eq!(staging.status(), EnvironmentStatus::Running);
        assert_eq!(staging.record.config.worker_count, 2);
        assert_eq!(staging.record.from_env.as_deref(), Some("production"));
    }

    #[test]
    fn test_list_queries_provisioner_once() {
        let mgr = manager();
        for name in ["c", "a", "b"] {
            mgr.create(name, None, 0).unwrap();
        }
        let before = mgr.provisioner().list_calls();

        let envs = mgr.list().unwrap();
        assert_eq!(mgr.provisioner().list_calls(), before + 1);
        let names: Vec<_> = envs.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["production", "a", "b", "c"]);
    }

    #[test]
    fn test_list_reports_error_when_provisioner_unreachable() {
        let mgr = manager();
        mgr.create("blind", None, 0).unwrap();
        mgr.provisioner().fail(FakeFailure::List);

        let envs = mgr.list().unwrap();
        assert_eq!(envs[0].status(), EnvironmentStatus::Running);
        assert_eq!(envs[1].observed_status(), EnvironmentStatus::Error);
        assert_eq!(envs[1].intended_status(), EnvironmentStatus::Running);
    }

    #[test]
    fn test_out_of_band_removal_is_observed_not_persisted() {
        let mgr = manager();
        mgr.create("vanish", None, 0).unwrap();
        mgr.provisioner().set_live("lab-vanish", false);

        let env = mgr.get("vanish").unwrap();
        assert_eq!(env.observed_status(), EnvironmentStatus::Stopped);
        assert_eq!(
            mgr.store().load("vanish").unwrap().unwrap().status,
            EnvironmentStatus::Running
        );
    }

    #[test]
    fn test_production_needs_no_collaborators() {
        let mgr = manager();
        mgr.provisioner().fail(FakeFailure::List);

        let prod = mgr.get(PRODUCTION).unwrap();
        assert_eq!(prod.record.kind, EnvironmentType::Physical);
        assert_eq!(prod.status(), EnvironmentStatus::Running);
        assert!(mgr.exists(PRODUCTION));
        assert_eq!(mgr.provisioner().list_calls(), 0);
    }
}
