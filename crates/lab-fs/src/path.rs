//! Identifier validation for names that become path components
//!
//! Environment names end up as directory names under the state root and as
//! file stems under the kubeconfig directories, so they must never be able
//! to escape those roots.

use crate::{Error, Result};

/// Validate that `value` is safe to use as a single path component.
///
/// Rejects empty values, `.`/`..`, hidden names, separators, NUL bytes and
/// whitespace.
pub fn validate_path_identifier(value: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(Error::InvalidIdentifier {
            value: value.to_string(),
            reason: reason.to_string(),
        })
    };

    if value.is_empty() {
        return reject("must not be empty");
    }
    if value == "." || value == ".." {
        return reject("must not be a relative path segment");
    }
    if value.starts_with('.') {
        return reject("must not start with '.'");
    }
    if value.contains(['/', '\\']) {
        return reject("must not contain path separators");
    }
    if value.contains('\0') {
        return reject("must not contain NUL bytes");
    }
    if value.chars().any(char::is_whitespace) {
        return reject("must not contain whitespace");
    }
    Ok(())
}
