//! Persisted flat store subsystem.
//!
//! # Data Flow
//! ```text
//! <owner>_config.toml
//!     → parser.rs (sections, comments, quoted strings)
//!     → RawStore (dotted key → raw string, replaced wholesale per load)
//!     → cache.rs + decode.rs (typed, cached, default on failure)
//!
//! On generate / save / migrate:
//!     FlatDocument (writer.rs) → render → temp file → rename
//! ```
//!
//! # Design Decisions
//! - Raw values stay untyped until a leaf asks for them
//! - Decoding never fails a read; bad values fall back to defaults
//! - Writes regenerate the whole file, never edit it in place

pub mod cache;
pub mod decode;
pub mod parser;
pub mod writer;

pub use cache::{AccessorCache, CachedValue, DEFAULT_TTL};
pub use parser::{FlatStore, RawStore};
pub use writer::{describe_field, FlatDocument};
