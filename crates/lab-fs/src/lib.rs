//! Filesystem layer for the lab environment runtime
//!
//! Provides owner-only atomic writes, format-agnostic document loading and
//! the XDG directory layout shared by the other lab crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod layout;
pub mod path;

pub use config::{ConfigStore, DocumentFormat};
pub use constants::LabFile;
pub use error::{Error, Result};
pub use layout::LabPaths;
pub use path::validate_path_identifier;
