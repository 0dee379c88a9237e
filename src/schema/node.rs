//! Schema description types.
//!
//! A schema is an explicit tree of sections and typed fields, built once at
//! startup. Field metadata (ranges, custom rules, execution-mode
//! restrictions, section labels) lives directly on the descriptors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::instance::ConfigInstance;
use crate::error::SchemaError;
use crate::schema::rule::Rule;
use crate::store::parser::RawStore;

/// Key holding the persisted schema version.
pub const CONFIG_VERSION_KEY: &str = "config_version";

/// Error type returned by user-supplied hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Custom migration step, applied to the raw values of a file.
pub type MigrationStep = Arc<dyn Fn(&mut RawStore) -> Result<(), HookError> + Send + Sync>;

/// Instance-level validation hook, run after every leaf check passed.
pub type ValidationHook = Arc<dyn Fn(&ConfigInstance) -> Result<(), HookError> + Send + Sync>;

/// Runtime context deciding which restricted nodes are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Interactive client.
    #[default]
    Client,
    /// Headless server.
    Server,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Client => "client",
            ExecutionMode::Server => "server",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(ExecutionMode::Client),
            "server" | "dedicated" => Ok(ExecutionMode::Server),
            other => Err(format!("unknown execution mode `{other}`")),
        }
    }
}

/// Declared type of a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Long,
    Double,
    String,
    /// Enumeration over a fixed set of upper-case variant names.
    Enum(Vec<String>),
    StringList,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Long => "long",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::Enum(_) => "enum",
            FieldKind::StringList => "string list",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Int | FieldKind::Long | FieldKind::Double)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Enum(variants) => write!(f, "enum [{}]", variants.join(", ")),
            other => f.write_str(other.name()),
        }
    }
}

/// A materialized leaf value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Enum(String),
    List(Vec<String>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::List(_) => "string list",
        }
    }

    /// Numeric view used by range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value can be stored in a leaf of `kind`.
    pub fn fits(&self, kind: &FieldKind) -> bool {
        match (self, kind) {
            (Value::Bool(_), FieldKind::Bool)
            | (Value::Int(_), FieldKind::Int)
            | (Value::Long(_), FieldKind::Long)
            | (Value::Double(_), FieldKind::Double)
            | (Value::String(_), FieldKind::String)
            | (Value::List(_), FieldKind::StringList) => true,
            (Value::Enum(v), FieldKind::Enum(variants)) => variants.iter().any(|x| x == v),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) | Value::Enum(v) => f.write_str(v),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Inclusive numeric bounds attached to a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A typed leaf descriptor.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) default: Value,
    pub(crate) range: Option<Range>,
    pub(crate) rule: Option<String>,
    pub(crate) only_in: Option<ExecutionMode>,
}

impl Field {
    fn new(name: impl Into<String>, kind: FieldKind, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            range: None,
            rule: None,
            only_in: None,
        }
    }

    pub fn bool(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, FieldKind::Bool, Value::Bool(default))
    }

    pub fn int(name: impl Into<String>, default: i32) -> Self {
        Self::new(name, FieldKind::Int, Value::Int(default))
    }

    pub fn long(name: impl Into<String>, default: i64) -> Self {
        Self::new(name, FieldKind::Long, Value::Long(default))
    }

    pub fn double(name: impl Into<String>, default: f64) -> Self {
        Self::new(name, FieldKind::Double, Value::Double(default))
    }

    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, Value::String(default.into()))
    }

    /// Enumeration leaf. Variant names are normalized to upper case.
    pub fn enumeration<S: AsRef<str>>(name: impl Into<String>, variants: &[S], default: &str) -> Self {
        let variants: Vec<String> = variants
            .iter()
            .map(|v| v.as_ref().trim().to_uppercase())
            .collect();
        Self::new(
            name,
            FieldKind::Enum(variants),
            Value::Enum(default.trim().to_uppercase()),
        )
    }

    pub fn string_list<S: AsRef<str>>(name: impl Into<String>, default: &[S]) -> Self {
        let items = default.iter().map(|s| s.as_ref().to_string()).collect();
        Self::new(name, FieldKind::StringList, Value::List(items))
    }

    /// Inclusive numeric bounds checked by the validator.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(Range { min, max });
        self
    }

    /// Custom rule: `minLength:N`, `maxLength:N` or `regex:PATTERN`.
    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn only_in(mut self, mode: ExecutionMode) -> Self {
        self.only_in = Some(mode);
        self
    }

    pub fn client_only(self) -> Self {
        self.only_in(ExecutionMode::Client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }
}

/// A named group of child nodes.
#[derive(Debug, Clone)]
pub struct Section {
    pub(crate) name: String,
    pub(crate) label: Option<String>,
    pub(crate) only_in: Option<ExecutionMode>,
    pub(crate) children: Vec<Node>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            only_in: None,
            children: Vec::new(),
        }
    }

    /// Grouping label written as a banner above the section.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn only_in(mut self, mode: ExecutionMode) -> Self {
        self.only_in = Some(mode);
        self
    }

    pub fn client_only(self) -> Self {
        self.only_in(ExecutionMode::Client)
    }

    pub fn field(mut self, field: Field) -> Self {
        self.children.push(Node::Field(field));
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.children.push(Node::Section(section));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A node in the schema tree.
#[derive(Debug, Clone)]
pub enum Node {
    Field(Field),
    Section(Section),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Field(f) => &f.name,
            Node::Section(s) => &s.name,
        }
    }

    pub fn only_in(&self) -> Option<ExecutionMode> {
        match self {
            Node::Field(f) => f.only_in,
            Node::Section(s) => s.only_in,
        }
    }

    /// Whether the node is materialized under `mode`.
    pub fn visible_in(&self, mode: ExecutionMode) -> bool {
        self.only_in().map_or(true, |m| m == mode)
    }
}

/// A complete, validated schema description.
#[derive(Clone)]
pub struct Schema {
    pub(crate) version: u32,
    pub(crate) nodes: Vec<Node>,
    pub(crate) migrations: BTreeMap<u32, MigrationStep>,
    pub(crate) validator: Option<ValidationHook>,
}

impl Schema {
    pub fn builder(version: u32) -> SchemaBuilder {
        SchemaBuilder {
            version,
            nodes: Vec::new(),
            migrations: BTreeMap::new(),
            validator: None,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Custom migration step registered for `from_version`, if any.
    pub fn migration(&self, from_version: u32) -> Option<&MigrationStep> {
        self.migrations.get(&from_version)
    }

    pub fn validation_hook(&self) -> Option<&ValidationHook> {
        self.validator.as_ref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("version", &self.version)
            .field("nodes", &self.nodes)
            .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    version: u32,
    nodes: Vec<Node>,
    migrations: BTreeMap<u32, MigrationStep>,
    validator: Option<ValidationHook>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: Field) -> Self {
        self.nodes.push(Node::Field(field));
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.nodes.push(Node::Section(section));
        self
    }

    /// Register a custom step migrating files from `from_version` to the
    /// next version. It replaces the built-in step for that version.
    pub fn migration<F>(mut self, from_version: u32, step: F) -> Self
    where
        F: Fn(&mut RawStore) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.migrations.insert(from_version, Arc::new(step));
        self
    }

    pub fn validator<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ConfigInstance) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(hook));
        self
    }

    /// Check names, defaults, rules and path uniqueness.
    pub fn build(self) -> Result<Schema, SchemaError> {
        if self.version == 0 {
            return Err(SchemaError::InvalidVersion(self.version));
        }
        for node in &self.nodes {
            if node.name() == CONFIG_VERSION_KEY {
                return Err(SchemaError::ReservedKey(CONFIG_VERSION_KEY.to_string()));
            }
        }
        check_nodes(&self.nodes, "")?;

        let schema = Schema {
            version: self.version,
            nodes: self.nodes,
            migrations: self.migrations,
            validator: self.validator,
        };

        // Path uniqueness is checked over every node, restricted or not.
        crate::schema::walker::SchemaWalker::unrestricted().walk(&schema)?;
        Ok(schema)
    }
}

fn check_nodes(nodes: &[Node], prefix: &str) -> Result<(), SchemaError> {
    for node in nodes {
        let name = node.name();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if name.contains('.') || name.chars().any(char::is_whitespace) || name.contains(['[', ']', '=', '#']) {
            return Err(SchemaError::InvalidName(name.to_string()));
        }
        let path = join_path(prefix, name);
        match node {
            Node::Field(field) => check_field(field, &path)?,
            Node::Section(section) => check_nodes(&section.children, &path)?,
        }
    }
    Ok(())
}

fn check_field(field: &Field, path: &str) -> Result<(), SchemaError> {
    if !field.default.fits(&field.kind) {
        return Err(SchemaError::InvalidDefault {
            path: path.to_string(),
            reason: format!("expected {}, got {}", field.kind, field.default.kind_name()),
        });
    }
    if let Some(range) = field.range {
        let reason = if !field.kind.is_numeric() {
            Some(format!("{} fields cannot carry a range", field.kind))
        } else if range.min.is_nan() || range.max.is_nan() || range.min > range.max {
            Some(format!("min {} exceeds max {}", range.min, range.max))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(SchemaError::InvalidRange {
                path: path.to_string(),
                reason,
            });
        }
    }
    if let Some(rule) = &field.rule {
        Rule::parse(rule).map_err(|reason| SchemaError::InvalidRule {
            path: path.to_string(),
            rule: rule.clone(),
            reason,
        })?;
    }
    Ok(())
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
