//! Where collaborating tools look for the active kubeconfig

use std::ffi::OsString;
use std::path::Path;

use parking_lot::Mutex;

/// Environment variable read by kubectl, helm and friends.
pub const KUBECONFIG_VAR: &str = "KUBECONFIG";

/// A single slot naming the kubeconfig other tools should use.
pub trait CredentialPointer: Send + Sync {
    fn get(&self) -> Option<OsString>;

    fn set(&self, path: &Path);

    fn unset(&self);

    /// Put back a value captured with [`get`](Self::get).
    fn restore(&self, previous: Option<OsString>) {
        match previous {
            Some(value) => self.set(Path::new(&value)),
            None => self.unset(),
        }
    }
}

/// Binds the process environment variable so unmodified child processes
/// inherit it.
#[derive(Debug, Clone)]
pub struct ProcessEnvPointer {
    var: String,
}

impl Default for ProcessEnvPointer {
    fn default() -> Self {
        Self::new(KUBECONFIG_VAR)
    }
}

impl ProcessEnvPointer {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialPointer for ProcessEnvPointer {
    fn get(&self) -> Option<OsString> {
        std::env::var_os(&self.var)
    }

    fn set(&self, path: &Path) {
        // SAFETY: only called by the credential broker while it holds its
        // mutex, and lab does not read its environment from other threads.
        unsafe { std::env::set_var(&self.var, path) }
    }

    fn unset(&self) {
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(&self.var) }
    }
}

/// Keeps the binding in memory. Callers hand the path to child processes
/// explicitly, e.g. with `CredentialSession::apply_to`.
#[derive(Debug, Default)]
pub struct ScopedPointer {
    value: Mutex<Option<OsString>>,
}

impl ScopedPointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a value, as if it had been inherited.
    pub fn with_value(value: impl Into<OsString>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }
}

impl CredentialPointer for ScopedPointer {
    fn get(&self) -> Option<OsString> {
        self.value.lock().clone()
    }

    fn set(&self, path: &Path) {
        *self.value.lock() = Some(path.as_os_str().to_owned());
    }

    fn unset(&self) {
        *self.value.lock() = None;
    }
}
