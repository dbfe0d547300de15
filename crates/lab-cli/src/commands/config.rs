//! Config command implementations
//!
//! Read-only views over the resolved environment documents.

use colored::Colorize;
use lab_config::{ConfigResolver, Environment, Error as ConfigError};

use crate::commands::print_json;
use crate::error::{CliError, Result};

/// Print one resolved environment.
pub fn run_config_show(resolver: &ConfigResolver, env: &str, json: bool) -> Result<()> {
    let environment = resolver.load_environment(env)?;
    if json {
        return print_json(&environment);
    }
    print_environment(&environment);
    Ok(())
}

fn print_environment(env: &Environment) {
    println!("{} {}", "Environment:".bold(), env.name.cyan());
    if let Some(parent) = &env.inherits {
        println!("  Inherits: {}", parent);
    }
    println!("  Domain:   {}", env.cluster.domain);
    println!("  Timezone: {}", env.cluster.timezone);
    println!();

    println!("{}", "Networks:".bold());
    println!("  Pod CIDR:     {}", env.cluster.networks.pod_cidr);
    println!("  Service CIDR: {}", env.cluster.networks.service_cidr);
    println!("  Host CIDR:    {}", env.cluster.networks.host_cidr);
    println!();

    println!("{} ({})", "Hosts:".bold(), env.hosts.len());
    for host in &env.hosts {
        let init = if host.k3s.cluster_init { ", cluster-init" } else { "" };
        println!("  {} {} [{}{}]", host.name.cyan(), host.ip, host.k3s.role, init);
        if !host.modules.is_empty() {
            println!("    modules: {}", host.modules.join(", "));
        }
    }
    println!();

    println!("{}", "Apps:".bold());
    println!("  Foundation: {}", env.apps.foundation.join(", "));
    println!("  Platform:   {}", env.apps.platform.join(", "));
    println!("  Apps:       {}", env.apps.apps.join(", "));
}

/// Validate one environment, or every environment when `env` is `None`.
pub fn run_config_validate(resolver: &ConfigResolver, env: Option<&str>) -> Result<()> {
    if let Some(name) = env {
        resolver.validate_environment(name)?;
        println!("{} Environment {} is valid", "OK".green().bold(), name.cyan());
        return Ok(());
    }

    let results = resolver.validate_all()?;
    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(_) => println!("{} {}", "OK".green().bold(), name.cyan()),
            Err(e) => {
                failed += 1;
                report_failure(name, e);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::user(format!(
            "{} environment(s) failed validation",
            failed
        )));
    }
    println!();
    println!("All {} environment(s) are valid", results.len());
    Ok(())
}

fn report_failure(name: &str, error: &ConfigError) {
    match error {
        ConfigError::Validation(validation) => {
            eprintln!("{} {}: {}", "FAIL".red().bold(), name.cyan(), validation.kind);
            for issue in &validation.issues {
                eprintln!("  - {}", issue);
            }
        }
        other => eprintln!("{} {}: {}", "FAIL".red().bold(), name.cyan(), other),
    }
}

/// Render an environment for another tool and print it verbatim.
pub fn run_config_export(resolver: &ConfigResolver, env: &str, format: &str) -> Result<()> {
    let output = resolver.export_environment(env, format)?;
    print!("{}", output);
    Ok(())
}

pub fn run_config_list(resolver: &ConfigResolver, json: bool) -> Result<()> {
    let names = resolver.list_environments()?;
    if json {
        return print_json(&names);
    }
    if names.is_empty() {
        println!("No environments found in {}", resolver.source_dir().display());
        return Ok(());
    }
    println!("{}", "Environments:".bold());
    for name in names {
        println!("  - {}", name.cyan());
    }
    Ok(())
}
