//! Secret decryption backends

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Error, Result};

/// Turns an encrypted-at-rest file into plaintext bytes.
pub trait SecretDecryptor: Send + Sync {
    fn decrypt(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Decrypts with `sops decrypt <path>`.
#[derive(Debug, Clone)]
pub struct SopsDecryptor {
    binary: PathBuf,
}

impl Default for SopsDecryptor {
    fn default() -> Self {
        Self::new("sops")
    }
}

impl SopsDecryptor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl SecretDecryptor for SopsDecryptor {
    fn decrypt(&self, path: &Path) -> Result<Vec<u8>> {
        tracing::debug!(path = %path.display(), "Decrypting with sops");
        let output = Command::new(&self.binary)
            .arg("decrypt")
            .arg(path)
            .output()
            .map_err(|source| Error::ToolUnavailable {
                tool: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::Decryption {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Test decryptor that returns the file content unchanged.
#[derive(Debug, Default)]
pub struct FakeDecryptor {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeDecryptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every decryption fail with a sops-like message.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SecretDecryptor for FakeDecryptor {
    fn decrypt(&self, path: &Path) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Decryption {
                path: path.to_path_buf(),
                stderr: "Error getting data key: 0 successful groups required, got 0".to_string(),
            });
        }
        std::fs::read(path).map_err(|e| lab_fs::Error::io(path, e).into())
    }
}
