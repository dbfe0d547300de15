//! The credential broker
//!
//! Encrypted kubeconfigs live in the project configuration and are
//! decrypted on demand into the user's cache:
//!
//! ```text
//! <config>/kubeconfig/<env>.enc.yaml    sops-encrypted, committed
//! <cache>/k8s/kubeconfig/<env>.yaml     plaintext, 0600, short-lived
//! ```
//!
//! At most one environment is bound to the credential pointer at a time.
//! Binding and unbinding both happen under the broker's mutex.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use lab_fs::constants::{DECRYPTED_KUBECONFIG_SUFFIX, ENCRYPTED_KUBECONFIG_SUFFIX};
use lab_fs::{LabFile, LabPaths, io};
use parking_lot::Mutex;

use crate::decryptor::SecretDecryptor;
use crate::error::{Error, Result};
use crate::pointer::{CredentialPointer, KUBECONFIG_VAR};

#[derive(Debug)]
struct Binding {
    /// Distinguishes successive bindings of the same environment
    id: u64,
    env: String,
    path: PathBuf,
    /// Pointer value before this binding, restored on release
    previous: Option<OsString>,
    persistent: bool,
}

/// Decrypts environment credentials and binds them to a [`CredentialPointer`].
#[derive(Debug)]
pub struct CredentialBroker<D, P> {
    encrypted_dir: PathBuf,
    cache_dir: PathBuf,
    decryptor: D,
    pointer: P,
    binding: Mutex<Option<Binding>>,
    next_id: AtomicU64,
}

impl<D: SecretDecryptor, P: CredentialPointer> CredentialBroker<D, P> {
    /// `config_dir` holds `kubeconfig/<env>.enc.yaml`; plaintext goes to
    /// `cache_dir/kubeconfig/<env>.yaml`.
    pub fn new(
        config_dir: impl AsRef<Path>,
        cache_dir: impl AsRef<Path>,
        decryptor: D,
        pointer: P,
    ) -> Self {
        Self {
            encrypted_dir: config_dir.as_ref().join(LabFile::KubeconfigDir),
            cache_dir: cache_dir.as_ref().join(LabFile::KubeconfigDir),
            decryptor,
            pointer,
            binding: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Broker over the standard layout: project config and `<cache>/k8s`.
    pub fn from_paths(paths: &LabPaths, decryptor: D, pointer: P) -> Self {
        Self::new(&paths.project_config, paths.cache_dir("k8s"), decryptor, pointer)
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    pub fn decryptor(&self) -> &D {
        &self.decryptor
    }

    pub fn encrypted_path(&self, env: &str) -> PathBuf {
        self.encrypted_dir
            .join(format!("{env}{ENCRYPTED_KUBECONFIG_SUFFIX}"))
    }

    pub fn decrypted_path(&self, env: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{env}{DECRYPTED_KUBECONFIG_SUFFIX}"))
    }

    /// Whether an encrypted kubeconfig exists for `env`.
    pub fn exists(&self, env: &str) -> bool {
        self.encrypted_path(env).is_file()
    }

    /// Decrypt `env`'s kubeconfig without writing anything.
    pub fn decrypt(&self, env: &str) -> Result<Vec<u8>> {
        lab_fs::validate_path_identifier(env).map_err(|e| Error::InvalidName {
            env: env.to_string(),
            reason: e.to_string(),
        })?;

        let path = self.encrypted_path(env);
        if !path.is_file() {
            return Err(Error::NotFound {
                env: env.to_string(),
                path,
            });
        }
        self.decryptor.decrypt(&path)
    }

    /// Bind `env`'s credentials until the returned session is cleaned up
    /// or dropped.
    pub fn setup(&self, env: &str) -> Result<CredentialSession<'_, D, P>> {
        let (id, path) = self.bind(env, false)?;
        Ok(CredentialSession {
            broker: self,
            id,
            env: env.to_string(),
            path,
            released: false,
        })
    }

    /// Bind `env`'s credentials until [`cleanup`](Self::cleanup) is called.
    ///
    /// The plaintext stays on disk after this returns, for tools started
    /// later in the same shell.
    pub fn setup_persistent(&self, env: &str) -> Result<PathBuf> {
        self.bind(env, true).map(|(_, path)| path)
    }

    /// Release a persistent binding. Does nothing when none is active;
    /// session bindings are left to their session.
    pub fn cleanup(&self) -> Result<()> {
        let mut guard = self.binding.lock();
        if let Some(binding) = guard.take_if(|b| b.persistent) {
            self.release(binding)?;
        }
        Ok(())
    }

    /// Delete every cached plaintext kubeconfig, bound or not, and release
    /// any active binding. Returns how many files were removed.
    pub fn cleanup_all(&self) -> Result<usize> {
        let mut guard = self.binding.lock();
        if let Some(binding) = guard.take() {
            // the sweep below removes its plaintext
            self.pointer.restore(binding.previous);
        }

        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(lab_fs::Error::io(&self.cache_dir, e).into()),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| lab_fs::Error::io(&self.cache_dir, e))?.path();
            let is_yaml = path.extension().is_some_and(|ext| ext == "yaml");
            if is_yaml && path.is_file() && io::remove_file_if_exists(&path)? {
                removed += 1;
            }
        }
        tracing::info!(removed, dir = %self.cache_dir.display(), "Removed cached kubeconfigs");
        Ok(removed)
    }

    /// Environments with an encrypted kubeconfig, sorted.
    pub fn list_environments(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.encrypted_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(lab_fs::Error::io(&self.encrypted_dir, e).into()),
        };

        let mut envs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| lab_fs::Error::io(&self.encrypted_dir, e))?;
            let file_name = entry.file_name();
            if let Some(env) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(ENCRYPTED_KUBECONFIG_SUFFIX))
                .filter(|env| !env.is_empty())
            {
                envs.push(env.to_string());
            }
        }
        envs.sort();
        Ok(envs)
    }

    /// Run `f` with `env`'s credentials bound, cleaning up afterwards
    /// whether or not `f` panics.
    pub fn with_credentials<T>(&self, env: &str, f: impl FnOnce(&Path) -> T) -> Result<T> {
        let session = self.setup(env)?;
        let out = f(session.path());
        session.cleanup()?;
        Ok(out)
    }

    /// The environment currently bound, if any.
    pub fn active_environment(&self) -> Option<String> {
        self.binding.lock().as_ref().map(|b| b.env.clone())
    }

    fn bind(&self, env: &str, persistent: bool) -> Result<(u64, PathBuf)> {
        let mut guard = self.binding.lock();
        if let Some(active) = guard.as_ref() {
            return Err(Error::BindingActive {
                active: active.env.clone(),
                requested: env.to_string(),
            });
        }

        let previous = self.pointer.get();
        let plaintext = self.decrypt(env)?;

        let path = self.decrypted_path(env);
        io::ensure_private_dir(&self.cache_dir)?;
        io::write_atomic(&path, &plaintext)?;

        self.pointer.set(&path);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(env, id, path = %path.display(), persistent, "Bound credentials");
        *guard = Some(Binding {
            id,
            env: env.to_string(),
            path: path.clone(),
            previous,
            persistent,
        });
        Ok((id, path))
    }

    /// Called with the binding mutex held.
    fn release(&self, binding: Binding) -> Result<()> {
        self.pointer.restore(binding.previous);
        io::remove_file_if_exists(&binding.path)?;
        tracing::debug!(env = %binding.env, "Released credentials");
        Ok(())
    }

    /// Release the session binding `id`. Does nothing when that binding
    /// was already swept by [`cleanup_all`](Self::cleanup_all).
    fn release_session(&self, id: u64) -> Result<()> {
        let mut guard = self.binding.lock();
        if let Some(binding) = guard.take_if(|b| !b.persistent && b.id == id) {
            self.release(binding)?;
        }
        Ok(())
    }
}

/// A bound credential. Cleanup runs exactly once: on [`cleanup`](Self::cleanup)
/// or, failing that, on drop.
#[derive(Debug)]
pub struct CredentialSession<'a, D: SecretDecryptor, P: CredentialPointer> {
    broker: &'a CredentialBroker<D, P>,
    id: u64,
    env: String,
    path: PathBuf,
    released: bool,
}

impl<D: SecretDecryptor, P: CredentialPointer> CredentialSession<'_, D, P> {
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Plaintext kubeconfig, valid until cleanup.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point `command` at this session's kubeconfig.
    pub fn apply_to<'c>(&self, command: &'c mut Command) -> &'c mut Command {
        command.env(KUBECONFIG_VAR, &self.path)
    }

    /// Remove the plaintext and restore the pointer, reporting failures.
    pub fn cleanup(mut self) -> Result<()> {
        self.released = true;
        self.broker.release_session(self.id)
    }
}

impl<D: SecretDecryptor, P: CredentialPointer> Drop for CredentialSession<'_, D, P> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.broker.release_session(self.id) {
            tracing::warn!("Failed to clean up credentials for {}: {}", self.env, e);
        }
    }
}
