//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// lab - homelab environment and configuration runtime
#[derive(Parser, Debug)]
#[command(name = "lab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding environment documents and encrypted kubeconfigs
    /// [default: ./config]
    #[arg(long, global = true, env = "LAB_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// State root [default: ~/.local/state/lab]
    #[arg(long, global = true, env = "LAB_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Cache root [default: ~/.cache/lab]
    #[arg(long, global = true, env = "LAB_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// kind binary used to provision ephemeral clusters
    #[arg(long, global = true, env = "LAB_KIND", default_value = "kind")]
    pub kind: PathBuf,

    /// sops binary used to decrypt kubeconfigs
    #[arg(long, global = true, env = "LAB_SOPS", default_value = "sops")]
    pub sops: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Inspect, validate and export environment configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage ephemeral environments
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },

    /// Manage decrypted kubeconfig files
    Kubeconfig {
        #[command(subcommand)]
        action: KubeconfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show the resolved configuration for an environment
    Show {
        /// Environment name (dotted paths allowed)
        #[arg(default_value = "base")]
        env: String,
    },

    /// Validate one environment, or all of them
    Validate {
        /// Environment to validate; every environment when omitted
        env: Option<String>,
    },

    /// Export configuration for another tool
    ///
    /// Supported formats: json, yaml, nix, helm, terraform (or tf)
    ///
    /// Examples:
    ///   lab config export production nix > hosts.nix
    ///   lab config export staging tf > staging.tfvars
    Export {
        /// Environment name
        env: String,
        /// Output format
        format: String,
    },

    /// List available environments
    List,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum EnvAction {
    /// Create a new kind-based environment
    ///
    /// Examples:
    ///   lab env create staging
    ///   lab env create pr-123 --from staging --workers 2
    Create {
        /// Environment name
        name: String,

        /// Environment to clone configuration from
        #[arg(long, default_value = "production")]
        from: String,

        /// Number of worker nodes (0 for single-node)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        workers: i32,
    },

    /// Start a stopped environment
    ///
    /// If the kind cluster was deleted it is recreated from the saved topology.
    Start {
        /// Environment name
        name: String,
    },

    /// Stop a running environment
    Stop {
        /// Environment name
        name: String,

        /// Keep the kind cluster, only mark the environment stopped
        #[arg(long)]
        preserve_state: bool,
    },

    /// List environments
    List,

    /// Delete an environment and all its state
    Delete {
        /// Environment name
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show environment status
    Status {
        /// Environment name
        name: String,
    },

    /// Print the kubeconfig path of an ephemeral environment
    Kubeconfig {
        /// Environment name
        name: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KubeconfigAction {
    /// Decrypt an environment's kubeconfig into the cache
    Decrypt {
        /// Environment name
        #[arg(default_value = "production")]
        env: String,
    },

    /// Remove every decrypted kubeconfig
    Cleanup,

    /// List environments with an encrypted kubeconfig
    List,

    /// Run a command with an environment's kubeconfig, removing it afterwards
    ///
    /// Example:
    ///   lab kubeconfig exec production -- kubectl get nodes
    Exec {
        /// Environment name
        env: String,

        /// Command and arguments
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}
