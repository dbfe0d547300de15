//! Command implementations for lab-cli

pub mod config;
pub mod env;
pub mod kubeconfig;

pub use config::{run_config_export, run_config_list, run_config_show, run_config_validate};
pub use env::{
    run_env_create, run_env_delete, run_env_kubeconfig, run_env_list, run_env_start,
    run_env_status, run_env_stop,
};
pub use kubeconfig::{
    run_kubeconfig_cleanup, run_kubeconfig_decrypt, run_kubeconfig_exec, run_kubeconfig_list,
};

use serde::Serialize;

use crate::error::Result;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
