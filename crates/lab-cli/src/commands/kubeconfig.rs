//! Kubeconfig command implementations

use std::process::Command;

use colored::Colorize;
use lab_credentials::{CredentialBroker, CredentialPointer, SecretDecryptor};
use serde::Serialize;

use crate::commands::print_json;
use crate::error::{CliError, Result};

#[derive(Serialize)]
struct DecryptedKubeconfig<'a> {
    environment: &'a str,
    path: String,
}

/// Decrypt `env`'s kubeconfig and leave it in the cache for later shells.
pub fn run_kubeconfig_decrypt<D: SecretDecryptor, P: CredentialPointer>(
    broker: &CredentialBroker<D, P>,
    env: &str,
    json: bool,
) -> Result<()> {
    let path = broker.setup_persistent(env)?;
    if json {
        return print_json(&DecryptedKubeconfig {
            environment: env,
            path: path.display().to_string(),
        });
    }

    println!(
        "{} Decrypted kubeconfig for {}",
        "OK".green().bold(),
        env.cyan()
    );
    println!("  Path: {}", path.display());
    println!();
    println!("To use it in this shell:");
    println!("  export KUBECONFIG={}", path.display());
    println!();
    println!("Remove it when done with {}", "lab kubeconfig cleanup".cyan());
    Ok(())
}

pub fn run_kubeconfig_cleanup<D: SecretDecryptor, P: CredentialPointer>(
    broker: &CredentialBroker<D, P>,
) -> Result<()> {
    let removed = broker.cleanup_all()?;
    println!(
        "{} Decrypted kubeconfig files cleaned up ({} removed)",
        "OK".green().bold(),
        removed
    );
    Ok(())
}

#[derive(Serialize)]
struct KubeconfigEntry {
    environment: String,
    decrypted: bool,
}

pub fn run_kubeconfig_list<D: SecretDecryptor, P: CredentialPointer>(
    broker: &CredentialBroker<D, P>,
    json: bool,
) -> Result<()> {
    let entries: Vec<KubeconfigEntry> = broker
        .list_environments()?
        .into_iter()
        .map(|environment| KubeconfigEntry {
            decrypted: broker.decrypted_path(&environment).is_file(),
            environment,
        })
        .collect();
    if json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No kubeconfig files found");
        println!("  Expected location: {}", broker.encrypted_path("<env>").display());
        return Ok(());
    }

    println!("{}", "Available kubeconfigs:".bold());
    for entry in entries {
        let state = if entry.decrypted {
            "decrypted".green()
        } else {
            "encrypted".yellow()
        };
        println!("  - {} ({})", entry.environment.cyan(), state);
    }
    Ok(())
}

/// Run `command` with `env`'s credentials bound; the plaintext is removed
/// when the command exits.
pub fn run_kubeconfig_exec<D: SecretDecryptor, P: CredentialPointer>(
    broker: &CredentialBroker<D, P>,
    env: &str,
    command: &[String],
) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Err(CliError::user("No command given"));
    };

    let session = broker.setup(env)?;
    tracing::debug!(env, program, path = %session.path().display(), "Running with credentials");
    let status = session
        .apply_to(Command::new(program).args(args))
        .status();
    session.cleanup()?;

    let status = status?;
    if !status.success() {
        return Err(CliError::user(format!(
            "{} exited with {}",
            program, status
        )));
    }
    Ok(())
}
