//! Error types shared across the engine.
//!
//! Decode problems never show up here: a value that fails to parse is
//! replaced by its declared default and logged. Only failures that must
//! abort a registration, reload or save are represented.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::validation::ValidationError;

/// Errors raised while building a schema description.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema node names must not be empty")]
    EmptyName,

    #[error("invalid node name `{0}`: names must not contain '.' or whitespace")]
    InvalidName(String),

    #[error("duplicate schema path `{0}`")]
    DuplicatePath(String),

    #[error("`{0}` is reserved for the file version marker")]
    ReservedKey(String),

    #[error("default value for `{path}` does not match its declared type: {reason}")]
    InvalidDefault { path: String, reason: String },

    #[error("invalid range on `{path}`: {reason}")]
    InvalidRange { path: String, reason: String },

    #[error("invalid validation rule `{rule}` on `{path}`: {reason}")]
    InvalidRule {
        path: String,
        rule: String,
        reason: String,
    },

    #[error("schema version must be at least 1, got {0}")]
    InvalidVersion(u32),
}

/// Errors raised by the migration engine. All of them are fatal for the
/// load that triggered the migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration step from version {version} failed: {reason}")]
    Step { version: u32, reason: String },

    #[error("failed to persist migrated file {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file version {file} is newer than schema version {schema}")]
    NewerThanSchema { file: u32, schema: u32 },
}

/// Top-level error for registration, reload, save and update operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration already registered for owner `{0}`")]
    AlreadyRegistered(String),

    #[error("configuration not registered for owner `{0}`")]
    NotRegistered(String),

    #[error("invalid owner id `{0}`")]
    InvalidOwner(String),

    #[error("registry has been shut down")]
    RegistryClosed,

    #[error("configuration for owner `{0}` has been stopped")]
    Stopped(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("configuration invalid: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("unknown configuration key `{0}`")]
    UnknownKey(String),

    #[error("type mismatch for `{path}`: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

/// Errors raised while loading the engine's own settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigError {
    /// Whether this error is a validation rejection.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ConfigError::Invalid(_))
    }
}
