//! Layered environment configuration for lab
//!
//! Every document in a configuration directory is unified into one tree.
//! An environment is a node of that tree, optionally layered on top of
//! another node through `inherits`, and checked against a schema before it
//! is handed to consumers or rendered by [`ExportFormat`].
//!
//! ```no_run
//! use lab_config::ConfigResolver;
//!
//! let resolver = ConfigResolver::new("config");
//! let env = resolver.validate_environment("production")?;
//! println!("{} hosts in {}", env.hosts.len(), env.cluster.domain);
//! # Ok::<(), lab_config::Error>(())
//! ```

pub mod error;
pub mod export;
pub mod resolver;
pub mod schema;
pub mod tree;
pub mod types;

pub use error::{Error, Result, ValidationError, ValidationIssue, ValidationKind};
pub use export::{ExportFormat, SUPPORTED_FORMATS};
pub use resolver::ConfigResolver;
pub use schema::{DEFAULT_SCHEMA, SchemaNode};
pub use types::{Apps, Cluster, Environment, Host, HostRole, K3sHost, Networks};
