//! Environment credentials for lab
//!
//! [`CredentialBroker`] decrypts an environment's kubeconfig with a
//! [`SecretDecryptor`], writes the plaintext to an owner-only cache file and
//! points a [`CredentialPointer`] at it. [`CredentialSession`] undoes all of
//! that when cleaned up or dropped.
//!
//! ```no_run
//! use lab_credentials::{CredentialBroker, ProcessEnvPointer, SopsDecryptor};
//! use std::process::Command;
//!
//! let broker = CredentialBroker::new("config", "/home/me/.cache/lab/k8s",
//!     SopsDecryptor::default(), ProcessEnvPointer::default());
//! let session = broker.setup("production")?;
//! session.apply_to(&mut Command::new("kubectl")).arg("get").arg("nodes").status().ok();
//! session.cleanup()?;
//! # Ok::<(), lab_credentials::Error>(())
//! ```

pub mod broker;
pub mod decryptor;
pub mod error;
pub mod pointer;

pub use broker::{CredentialBroker, CredentialSession};
pub use decryptor::{FakeDecryptor, SecretDecryptor, SopsDecryptor};
pub use error::{Error, Result};
pub use pointer::{CredentialPointer, KUBECONFIG_VAR, ProcessEnvPointer, ScopedPointer};
