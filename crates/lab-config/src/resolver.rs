//! Environment resolution over a directory of declarative documents

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result, ValidationError, ValidationIssue, ValidationKind};
use crate::export::ExportFormat;
use crate::schema::{SCHEMA_KEY, SchemaNode};
use crate::tree;
use crate::types::Environment;
use lab_fs::{ConfigStore, DocumentFormat};

/// Document stems that never describe an environment.
const RESERVED_STEMS: [&str; 2] = ["schema", "base"];

/// Resolves environments from every document under a source directory.
///
/// The documents are re-read on each call; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    source_dir: PathBuf,
    store: ConfigStore,
}

/// The unified tree together with the schema that governs it.
struct Unified {
    root: Value,
    schema: SchemaNode,
}

impl ConfigResolver {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            store: ConfigStore::new(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Resolve `name` (a dotted path into the unified tree) into a typed
    /// environment, applying inheritance.
    ///
    /// Values are not required to be concrete; use
    /// [`validate_environment`](Self::validate_environment) for that.
    pub fn load_environment(&self, name: &str) -> Result<Environment> {
        let unified = self.unify()?;
        let value = self.resolve(&unified.root, name)?;
        decode(name, value, &unified.schema)
    }

    /// Resolve and validate `name`.
    ///
    /// Schema conformance is checked before concreteness, so a wrongly typed
    /// value is reported as [`ValidationKind::Schema`] even when other fields
    /// are still missing.
    pub fn validate_environment(&self, name: &str) -> Result<Environment> {
        let unified = self.unify()?;
        self.validate_in(&unified, name)
    }

    /// Validate every environment returned by
    /// [`list_environments`](Self::list_environments).
    ///
    /// Failures are collected per environment. Only errors that prevent
    /// reading the tree at all are returned as `Err`.
    pub fn validate_all(&self) -> Result<Vec<(String, Result<Environment>)>> {
        let names = self.list_environments()?;
        let unified = self.unify()?;
        Ok(names
            .into_iter()
            .map(|name| {
                let outcome = self.validate_in(&unified, &name);
                (name, outcome)
            })
            .collect())
    }

    /// Environment document stems, sorted, excluding `schema` and `base`.
    pub fn list_environments(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .documents()?
            .iter()
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .filter(|stem| !RESERVED_STEMS.contains(&stem.as_str()))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Render `name` in `format`.
    ///
    /// The format is checked before any document is read. Only environments
    /// that pass [`validate_environment`](Self::validate_environment) are
    /// rendered, so placeholders never reach generated files.
    pub fn export_environment(&self, name: &str, format: &str) -> Result<String> {
        let format: ExportFormat = format.parse()?;
        let unified = self.unify()?;
        let env = self.validate_in(&unified, name)?;
        format.render(&env)
    }

    fn validate_in(&self, unified: &Unified, name: &str) -> Result<Environment> {
        let value = self.resolve(&unified.root, name)?;

        let mut issues = unified.schema.check_conformance(&value);
        issues.extend(duplicate_hosts(&value));
        if !issues.is_empty() {
            return Err(ValidationError {
                environment: name.to_string(),
                kind: ValidationKind::Schema,
                issues,
            }
            .into());
        }

        let issues = unified.schema.check_concreteness(&value);
        if !issues.is_empty() {
            return Err(ValidationError {
                environment: name.to_string(),
                kind: ValidationKind::Incomplete,
                issues,
            }
            .into());
        }

        decode(name, value, &unified.schema)
    }

    /// Supported documents directly under the source directory, sorted by
    /// file name. Hidden files are ignored.
    fn documents(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.source_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NoDocuments {
                    dir: self.source_dir.clone(),
                });
            }
            Err(e) => return Err(lab_fs::Error::io(&self.source_dir, e).into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| lab_fs::Error::io(&self.source_dir, e))?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && path.is_file() && DocumentFormat::from_path(&path).is_some() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn unify(&self) -> Result<Unified> {
        let documents = self.documents()?;
        if documents.is_empty() {
            return Err(Error::NoDocuments {
                dir: self.source_dir.clone(),
            });
        }

        let mut root = Value::Object(Map::new());
        for path in &documents {
            let document = match self.store.load_value(path)? {
                Value::Null => continue,
                doc @ Value::Object(_) => doc,
                _ => return Err(Error::NotAMapping { path: path.clone() }),
            };
            tracing::debug!(?path, "Unifying configuration document");
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tree::unify(&mut root, document, &label)?;
        }

        let schema = match root.get(SCHEMA_KEY) {
            Some(schema) => SchemaNode::parse(schema)?,
            None => SchemaNode::builtin()?,
        };
        Ok(Unified { root, schema })
    }

    fn resolve(&self, root: &Value, name: &str) -> Result<Value> {
        let mut value = self.resolve_node(root, name, &mut Vec::new())?;
        if let Value::Object(node) = &mut value {
            let fallback = name.rsplit('.').next().unwrap_or(name);
            tree::fill_name(node, fallback);
        }
        Ok(value)
    }

    fn resolve_node(&self, root: &Value, key: &str, chain: &mut Vec<String>) -> Result<Value> {
        if chain.iter().any(|seen| seen == key) {
            let mut cycle = chain.clone();
            cycle.push(key.to_string());
            return Err(Error::InheritanceCycle { chain: cycle });
        }

        let node = tree::lookup(root, key).ok_or_else(|| match chain.last() {
            Some(child) => Error::ParentNotFound {
                name: child.clone(),
                parent: key.to_string(),
            },
            None => Error::EnvironmentNotFound {
                name: key.to_string(),
                dir: self.source_dir.clone(),
            },
        })?;

        let Some(parent) = tree::parent_of(node) else {
            return Ok(node.clone());
        };
        tracing::debug!(environment = key, parent, "Resolving inherited environment");

        chain.push(key.to_string());
        let mut resolved = self.resolve_node(root, parent, chain)?;
        chain.pop();
        tree::overlay(&mut resolved, node.clone());
        Ok(resolved)
    }
}

/// Decode a resolved tree, attributing failures to the first offending field.
fn decode(name: &str, value: Value, schema: &SchemaNode) -> Result<Environment> {
    let path = schema
        .check_conformance(&value)
        .into_iter()
        .chain(schema.check_concreteness(&value))
        .next()
        .map(|issue| issue.path);

    serde_json::from_value(value).map_err(|e| Error::Decode {
        name: name.to_string(),
        path: path.unwrap_or_else(|| "<root>".to_string()),
        message: e.to_string(),
    })
}

fn duplicate_hosts(value: &Value) -> Vec<ValidationIssue> {
    let Some(hosts) = value.get("hosts").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = Vec::new();
    let mut issues = Vec::new();
    for (i, host) in hosts.iter().enumerate() {
        let Some(host_name) = host.get("name").and_then(Value::as_str) else {
            continue;
        };
        if seen.contains(&host_name) {
            issues.push(ValidationIssue {
                path: format!("hosts[{i}].name"),
                message: format!("duplicate host name {host_name:?}"),
            });
        } else {
            seen.push(host_name);
        }
    }
    issues
}
