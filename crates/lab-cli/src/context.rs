//! Wiring of global flags into the lab services

use std::path::{Path, PathBuf};

use lab_config::ConfigResolver;
use lab_credentials::{CredentialBroker, ProcessEnvPointer, SopsDecryptor};
use lab_env::{EnvironmentManager, FsEnvironmentStore, KindProvisioner};
use lab_fs::LabPaths;

use crate::cli::Cli;
use crate::error::Result;

pub type Manager = EnvironmentManager<FsEnvironmentStore, KindProvisioner>;
pub type Broker = CredentialBroker<SopsDecryptor, ProcessEnvPointer>;

/// Directory layout and tool binaries for one invocation.
#[derive(Debug, Clone)]
pub struct LabContext {
    pub paths: LabPaths,
    pub kind: PathBuf,
    pub sops: PathBuf,
    pub json: bool,
}

impl LabContext {
    /// Platform defaults, overridden by any directory flag that was given.
    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self> {
        let mut paths = match (&cli.state_dir, &cli.cache_dir) {
            (Some(state), Some(cache)) => LabPaths {
                project_config: cwd.join(lab_fs::layout::PROJECT_CONFIG_DIR),
                state: state.clone(),
                cache: cache.clone(),
            },
            _ => LabPaths::from_platform(cwd)?,
        };
        if let Some(dir) = &cli.config_dir {
            paths.project_config = dir.clone();
        }
        if let Some(dir) = &cli.state_dir {
            paths.state = dir.clone();
        }
        if let Some(dir) = &cli.cache_dir {
            paths.cache = dir.clone();
        }
        tracing::debug!(?paths, "Using directory layout");

        Ok(Self {
            paths,
            kind: cli.kind.clone(),
            sops: cli.sops.clone(),
            json: cli.json,
        })
    }

    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new(&self.paths.project_config)
    }

    pub fn manager(&self) -> Manager {
        EnvironmentManager::new(
            FsEnvironmentStore::new(self.paths.state_dir("env")),
            KindProvisioner::new(&self.kind),
        )
    }

    pub fn broker(&self) -> Broker {
        CredentialBroker::from_paths(
            &self.paths,
            SopsDecryptor::new(&self.sops),
            ProcessEnvPointer::default(),
        )
    }
}
