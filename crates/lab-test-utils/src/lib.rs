//! Shared test utilities for the lab workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`config`]: [`ConfigFixture`] with a realistic set of environment documents
//! - [`sandbox`]: [`LabSandbox`] confining state, cache and config roots to a temp dir

pub mod config;
pub mod sandbox;

pub use config::ConfigFixture;
pub use sandbox::LabSandbox;
