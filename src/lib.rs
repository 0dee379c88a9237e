//! Hot-reloadable hierarchical configuration engine.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod schema;
pub mod settings;
pub mod store;

pub use config::{ConfigEvent, ConfigEventKind, ConfigHandle, ConfigInstance, ConfigRegistry, FieldView};
pub use error::{ConfigError, MigrationError, SchemaError, SettingsError};
pub use schema::{ExecutionMode, Field, FieldKind, Range, Schema, Section, Value};
pub use settings::{load_settings, EngineSettings};
