//! lab CLI
//!
//! Command-line front end for the homelab environment runtime: resolved
//! configuration, ephemeral kind environments and encrypted kubeconfigs.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands, ConfigAction, EnvAction, KubeconfigAction};
use context::LabContext;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let Some(command) = cli.command.clone() else {
        println!("{} homelab environment runtime", "lab".green().bold());
        println!();
        println!("Run {} for available commands.", "lab --help".cyan());
        return Ok(());
    };

    let cwd = std::env::current_dir()?;
    let ctx = LabContext::from_cli(&cli, &cwd)?;
    execute_command(&ctx, command)
}

/// Debug output with `--verbose`, otherwise whatever `RUST_LOG` asks for.
fn init_tracing(verbose: bool) -> Result<()> {
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    result.map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {}", e)))?;
    tracing::debug!("Verbose mode enabled");
    Ok(())
}

fn execute_command(ctx: &LabContext, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Config { action } => cmd_config(ctx, action),
        Commands::Env { action } => cmd_env(ctx, action),
        Commands::Kubeconfig { action } => cmd_kubeconfig(ctx, action),
    }
}

fn cmd_config(ctx: &LabContext, action: ConfigAction) -> Result<()> {
    let resolver = ctx.resolver();
    match action {
        ConfigAction::Show { env } => commands::run_config_show(&resolver, &env, ctx.json),
        ConfigAction::Validate { env } => commands::run_config_validate(&resolver, env.as_deref()),
        ConfigAction::Export { env, format } => {
            commands::run_config_export(&resolver, &env, &format)
        }
        ConfigAction::List => commands::run_config_list(&resolver, ctx.json),
    }
}

fn cmd_env(ctx: &LabContext, action: EnvAction) -> Result<()> {
    let manager = ctx.manager();
    match action {
        EnvAction::Create {
            name,
            from,
            workers,
        } => commands::run_env_create(&manager, &name, &from, workers, ctx.json),
        EnvAction::Start { name } => commands::run_env_start(&manager, &name, ctx.json),
        EnvAction::Stop {
            name,
            preserve_state,
        } => commands::run_env_stop(&manager, &name, preserve_state, ctx.json),
        EnvAction::List => commands::run_env_list(&manager, ctx.json),
        EnvAction::Delete { name, force } => commands::run_env_delete(&manager, &name, force),
        EnvAction::Status { name } => commands::run_env_status(&manager, &name, ctx.json),
        EnvAction::Kubeconfig { name } => commands::run_env_kubeconfig(&manager, &name),
    }
}

fn cmd_kubeconfig(ctx: &LabContext, action: KubeconfigAction) -> Result<()> {
    let broker = ctx.broker();
    match action {
        KubeconfigAction::Decrypt { env } => {
            commands::run_kubeconfig_decrypt(&broker, &env, ctx.json)
        }
        KubeconfigAction::Cleanup => commands::run_kubeconfig_cleanup(&broker),
        KubeconfigAction::List => commands::run_kubeconfig_list(&broker, ctx.json),
        KubeconfigAction::Exec { env, command } => {
            commands::run_kubeconfig_exec(&broker, &env, &command)
        }
    }
}
