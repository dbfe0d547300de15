//! Environment lifecycle command implementations

use colored::Colorize;
use dialoguer::Confirm;
use lab_env::{
    ClusterProvisioner, EnvironmentManager, EnvironmentStore, ManagedEnvironment, PRODUCTION,
};

use crate::commands::print_json;
use crate::error::{CliError, Result};

pub fn run_env_create<S: EnvironmentStore, P: ClusterProvisioner>(
    manager: &EnvironmentManager<S, P>,
    name: &str,
    from: &str,
    workers: i32,
    json: bool,
) -> Result<()> {
    if !json {
        println!(
            "{} Creating environment {} from {}...",
            "=>".blue().bold(),
            name.cyan(),
            from
        );
    }
    let env = manager.create(name, Some(from), workers)?;
    if json {
        return print_json(&env);
    }

    println!("{} Environment {} created", "OK".green().bold(), name.cyan());
    println!("  Type:       {}", env.record.kind);
    println!("  Status:     {}", env.status());
    println!("  Workers:    {}", env.record.config.worker_count);
    println!(
        "  Kubeconfig: {}",
        env.record.config.kubeconfig_path.display()
    );
    println!();
    println!("To use this environment:");
    println!(
        "  export KUBECONFIG={}",
        env.record.config.kubeconfig_path.display()
    );
    Ok(())
}

pub fn run_env_start<S: EnvironmentStore, P: ClusterProvisioner>(
    manager: &EnvironmentManager<S, P>,
    name: &str,
    json: bool,
) -> Result<()> {
    if !json {
        println!("{} Starting environment {}...", "=>".blue().bold(), name.cyan());
    }
    let env = manager.start(name)?;
    if json {
        return print_json(&env);
    }
    println!("{} Environment {} started", "OK".green().bold(), name.cyan());
    Ok(())
}

pub fn run_env_stop<S: EnvironmentStore, P: ClusterProvisioner>(
    manager: &EnvironmentManager<S, P>,
    name: &str,
    preserve_state: bool,
    json: bool,
) -> Result<()> {
    if !json {
        println!("{} Stopping environment {}...", "=>".blue().bold(), name.cyan());
    }
    let env = manager.stop(name, preserve_state)?;
    if json {
        return print_json(&env);
    }
    println!("{} Environment {} stopped", "OK".green().bold(), name.cyan());
    if env.drifted() {
        println!(
            "  Cluster {} was kept and is still {}",
            env.record.config.cluster_name,
            env.observed_status()
        );
    }
    Ok(())
}

pub fn run_env_list<S: EnvironmentStore, P: ClusterProvisioner>(
    manager: &EnvironmentManager<S, P>,
    json: bool,
) -> Result<()> {
    let envs = manager.list()?;
    if json {
        return print_json(&envs);
    }

    println!(
        "{:<20} {:<10} {:<12} {:<15}",
        "NAME".bold(),
        "TYPE".bold(),
        "STATUS".bold(),
        "FROM".bold()
    );
    for env in &envs {
        println!(
            "{:<20} {:<10} {:<12} {:<15}",
            env.name(),
            env.record.kind.to_string(),
            status_cell(env),
            env.record.from_env.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Observed status, flagged when it disagrees with the recorded one.
fn status_cell(env: &ManagedEnvironment) -> String {
    if env.drifted() {
        format!("{}*", env.observed_status())
    } else {
        env.status().to_string()
    }
}

pub fn run_env_delete<S: EnvironmentStore, P: ClusterProvisioner>(
    manager: &EnvironmentManager<S, P>,
    name: &str,
    force: bool,
) -> Result<()> {
    if name == PRODUCTION {
        return Err(CliError::user("Cannot delete the production environment"));
    }

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete environment {}? This will destroy its cluster and all state",
                name
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("{} Deleting environment {}...", "=>".blue().bold(), name.cyan());
    manager.delete(name)?;
    println!("{} Environment {} deleted", "OK".green().bold(), name.cyan());
    Ok(())
}

pub fn run_env_status<S: EnvironmentStore, P: ClusterProvisioner>(
    manager: &EnvironmentManager<S, P>,
    name: &str,
    json: bool,
) -> Result<()> {
    let env = manager.get(name)?;
    if json {
        return print_json(&env);
    }

    let record = &env.record;
    println!("{}       {}", "Name:".bold(), record.name.cyan());
    println!("{}       {}", "Type:".bold(), record.kind);
    println!("{}     {}", "Status:".bold(), env.observed_status());
    if env.drifted() {
        println!("{}   {}", "Recorded:".bold(), env.intended_status());
    }
    if let Some(from) = &record.from_env {
        println!("{}       {}", "From:".bold(), from);
    }
    println!(
        "{}    {}",
        "Created:".bold(),
        record.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "{}    {}",
        "Updated:".bold(),
        record.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
    if !record.config.kubeconfig_path.as_os_str().is_empty() {
        println!(
            "{} {}",
            "Kubeconfig:".bold(),
            record.config.kubeconfig_path.display()
        );
    }
    if record.config.worker_count > 0 {
        println!("{}    {}", "Workers:".bold(), record.config.worker_count);
    }
    Ok(())
}

pub fn run_env_kubeconfig<S: EnvironmentStore, P: ClusterProvisioner>(
    manager: &EnvironmentManager<S, P>,
    name: &str,
) -> Result<()> {
    if name == PRODUCTION {
        return Err(CliError::user(
            "Production kubeconfig is encrypted; run 'lab kubeconfig decrypt production'",
        ));
    }
    let path = manager.kubeconfig(name)?;
    println!("{}", path.display());
    Ok(())
}
