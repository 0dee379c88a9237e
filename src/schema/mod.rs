//! Schema description subsystem.
//!
//! # Data Flow
//! ```text
//! Schema::builder(version)
//!     → node.rs (sections, typed fields, metadata, hooks)
//!     → build() checks names, defaults, rules, path uniqueness
//!     → walker.rs flattens it for one execution mode
//!     → SchemaLayout (cached by the controller, reused across reloads)
//! ```
//!
//! # Design Decisions
//! - Fields are described explicitly; nothing is discovered at runtime
//! - Migration steps are looked up by version number, not by name
//! - Restricted nodes are dropped by the walker, so everything downstream
//!   (materialization, file generation) never sees them

pub mod node;
pub mod rule;
pub mod walker;

pub use node::{
    ExecutionMode, Field, FieldKind, HookError, MigrationStep, Node, Range, Schema, SchemaBuilder,
    Section, ValidationHook, Value, CONFIG_VERSION_KEY,
};
pub use rule::Rule;
pub use walker::{Leaf, SchemaLayout, SchemaWalker, SectionInfo};
