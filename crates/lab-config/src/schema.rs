//! Environment schema
//!
//! The schema is a tree mirroring the environment shape. Leaves name a type
//! (`string`, `int`, `bool`, `ip`, `cidr`) or list literal alternatives
//! (`server|agent`). A one-element list describes every element of a list.
//! A key ending in `?` is optional.

use std::net::IpAddr;

use serde_json::Value;

use crate::error::{Error, Result, ValidationIssue};
use crate::tree::is_placeholder;

/// Key under which a configuration tree may carry its own schema.
pub const SCHEMA_KEY: &str = "#Environment";

/// Schema used when the configuration tree does not define [`SCHEMA_KEY`].
pub const DEFAULT_SCHEMA: &str = r#"
name: string
inherits?: string
cluster:
  domain: string
  timezone: string
  networks:
    podCIDR: cidr
    serviceCIDR: cidr
    hostCIDR: cidr
hosts:
  - name: string
    ip: ip
    k3s:
      role: server|agent
      clusterInit?: bool
      serverAddr?: string
    modules?:
      - string
apps:
  foundation:
    - string
  platform:
    - string
  apps:
    - string
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafType {
    String,
    Int,
    Bool,
    Ip,
    Cidr,
    OneOf(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub optional: bool,
    pub node: SchemaNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Leaf(LeafType),
    List(Box<SchemaNode>),
    Map(Vec<Field>),
}

impl SchemaNode {
    /// Parse a schema from its tree form.
    pub fn parse(value: &Value) -> Result<Self> {
        Self::parse_at(value, "#Environment")
    }

    /// The built-in environment schema.
    pub fn builtin() -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(DEFAULT_SCHEMA).map_err(|e| Error::InvalidSchema {
                path: SCHEMA_KEY.to_string(),
                message: e.to_string(),
            })?;
        Self::parse(&value)
    }

    fn parse_at(value: &Value, path: &str) -> Result<Self> {
        match value {
            Value::String(spec) => LeafType::parse(spec)
                .map(SchemaNode::Leaf)
                .ok_or_else(|| Error::InvalidSchema {
                    path: path.to_string(),
                    message: format!("unknown type {spec:?}"),
                }),
            Value::Array(items) if items.len() == 1 => {
                let element = Self::parse_at(&items[0], &format!("{path}[]"))?;
                Ok(SchemaNode::List(Box::new(element)))
            }
            Value::Object(entries) => {
                let mut fields = Vec::with_capacity(entries.len());
                for (key, node) in entries {
                    let (name, optional) = match key.strip_suffix('?') {
                        Some(name) => (name, true),
                        None => (key.as_str(), false),
                    };
                    fields.push(Field {
                        name: name.to_string(),
                        optional,
                        node: Self::parse_at(node, &format!("{path}.{name}"))?,
                    });
                }
                Ok(SchemaNode::Map(fields))
            }
            other => Err(Error::InvalidSchema {
                path: path.to_string(),
                message: format!("expected a type name, a one-element list or a map, got {other}"),
            }),
        }
    }

    /// Phase one: every concrete value present has the declared type and no
    /// unknown fields exist. Placeholders and absent fields are not reported.
    pub fn check_conformance(&self, value: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        conform(self, value, "", &mut issues);
        issues
    }

    /// Phase two: every required field is present and nothing is left as a
    /// placeholder.
    pub fn check_concreteness(&self, value: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        concrete(self, value, "", &mut issues);
        issues
    }
}

impl LeafType {
    fn parse(spec: &str) -> Option<Self> {
        let leaf = match spec {
            "string" => LeafType::String,
            "int" => LeafType::Int,
            "bool" => LeafType::Bool,
            "ip" => LeafType::Ip,
            "cidr" => LeafType::Cidr,
            alternatives if alternatives.contains('|') => LeafType::OneOf(
                alternatives
                    .split('|')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => return None,
        };
        Some(leaf)
    }

    fn accepts(&self, value: &Value) -> std::result::Result<(), String> {
        let ok = match (self, value) {
            (LeafType::String, Value::String(_)) => true,
            (LeafType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (LeafType::Bool, Value::Bool(_)) => true,
            (LeafType::Ip, Value::String(s)) => s.parse::<IpAddr>().is_ok(),
            (LeafType::Cidr, Value::String(s)) => is_cidr(s),
            (LeafType::OneOf(options), Value::String(s)) => options.iter().any(|o| o == s),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, got {value}", self.describe()))
        }
    }

    fn describe(&self) -> String {
        match self {
            LeafType::String => "a string".to_string(),
            LeafType::Int => "an integer".to_string(),
            LeafType::Bool => "a boolean".to_string(),
            LeafType::Ip => "an IP address".to_string(),
            LeafType::Cidr => "a CIDR block".to_string(),
            LeafType::OneOf(options) => format!("one of {}", options.join("|")),
        }
    }
}

fn is_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => prefix <= 32,
        Ok(IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn issue(path: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
        message: message.into(),
    }
}

fn conform(schema: &SchemaNode, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    if is_placeholder(value) {
        return;
    }
    match schema {
        SchemaNode::Leaf(leaf) => {
            if let Err(message) = leaf.accepts(value) {
                issues.push(issue(path, message));
            }
        }
        SchemaNode::List(element) => match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    conform(element, item, &format!("{path}[{i}]"), issues);
                }
            }
            other => issues.push(issue(path, format!("expected a list, got {other}"))),
        },
        SchemaNode::Map(fields) => match value {
            Value::Object(entries) => {
                for (key, item) in entries {
                    match fields.iter().find(|f| &f.name == key) {
                        Some(field) => conform(&field.node, item, &child(path, key), issues),
                        None => issues.push(issue(&child(path, key), "unknown field")),
                    }
                }
            }
            other => issues.push(issue(path, format!("expected a map, got {other}"))),
        },
    }
}

fn concrete(schema: &SchemaNode, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    if is_placeholder(value) {
        issues.push(issue(path, format!("unresolved value {value}")));
        return;
    }
    match (schema, value) {
        (SchemaNode::List(element), Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                concrete(element, item, &format!("{path}[{i}]"), issues);
            }
        }
        (SchemaNode::Map(fields), Value::Object(entries)) => {
            for field in fields {
                let field_path = child(path, &field.name);
                match entries.get(&field.name) {
                    Some(item) => concrete(&field.node, item, &field_path, issues),
                    None if field.optional => {}
                    None => issues.push(issue(&field_path, "missing required field")),
                }
            }
        }
        _ => {}
    }
}
