//! Configuration engine subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigRegistry::register(owner, schema)
//!     → controller.rs: walk schema for the execution mode
//!     → synthesize <owner>_config.toml from defaults if absent
//!     → store parser (RawStore)
//!     → migration.rs (version steps, rewrite file)
//!     → instance.rs (materialize through the accessor cache)
//!     → validation.rs (ranges, rules, custom hook)
//!     → atomic swap of Arc<ConfigInstance>
//!
//! On file change:
//!     watcher.rs detects a newer mtime
//!     → controller reload: same pipeline from the parser onwards
//!     → failure keeps the previous instance live
//!     → ConfigEvent broadcast to subscribers
//! ```
//!
//! # Design Decisions
//! - Instances are immutable; every change publishes a new generation
//! - Reload, save and set are serialized per owner; reads never block
//! - The registry is an explicit value owned by the application

pub mod controller;
pub mod instance;
pub mod migration;
pub mod registry;
pub mod validation;
pub mod watcher;

pub use controller::{ConfigController, ConfigEvent, ConfigEventKind, ConfigHandle, FieldView};
pub use instance::ConfigInstance;
pub use migration::{MigrationEngine, MigrationOutcome};
pub use registry::ConfigRegistry;
pub use validation::{validate, ValidationError};
pub use watcher::FileWatcher;
