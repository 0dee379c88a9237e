//! Versioned file migration.
//!
//! # State Machine
//! ```text
//! file_version = store[config_version] (1 when absent)
//! while file_version < schema_version:
//!     apply custom step for file_version, else built-in step, else nothing
//!     file_version += 1
//! store[config_version] = schema_version → rewrite file
//! ```
//!
//! A failing step leaves the file untouched.

use std::path::Path;

use crate::error::MigrationError;
use crate::schema::{Schema, CONFIG_VERSION_KEY};
use crate::store::writer::FlatDocument;
use crate::store::RawStore;

/// Version assumed for files without a `config_version` key.
pub const DEFAULT_FILE_VERSION: u32 = 1;

/// Built-in key renames, applied when the schema has no custom step for
/// that version.
const BUILTIN_RENAMES: &[(u32, &[(&str, &str)])] = &[
    (
        1,
        &[
            ("rendering.enableCulling", "rendering.entityCulling.enableCulling"),
            (
                "rendering.enableEntityCulling",
                "rendering.entityCulling.enableEntityCulling",
            ),
        ],
    ),
    (2, &[("old.setting", "new.setting")]),
];

/// Result of a successful migration run.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    /// The file already matched the schema version.
    UpToDate,
    /// The file was migrated and rewritten.
    Migrated { from: u32, to: u32, store: RawStore },
}

/// Version recorded in `store`.
pub fn file_version(store: &RawStore) -> u32 {
    match store.get(CONFIG_VERSION_KEY) {
        None => DEFAULT_FILE_VERSION,
        Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
            tracing::warn!(
                value = raw,
                "Invalid {} value, assuming version {}",
                CONFIG_VERSION_KEY,
                DEFAULT_FILE_VERSION
            );
            DEFAULT_FILE_VERSION
        }),
    }
}

/// Applies the schema's migration chain to raw file contents.
pub struct MigrationEngine<'a> {
    schema: &'a Schema,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Bring the file at `path` up to the schema version.
    pub fn migrate(&self, path: &Path, store: &RawStore) -> Result<MigrationOutcome, MigrationError> {
        let target = self.schema.version();
        let from = file_version(store);

        if from > target {
            return Err(MigrationError::NewerThanSchema {
                file: from,
                schema: target,
            });
        }
        if from == target {
            return Ok(MigrationOutcome::UpToDate);
        }

        tracing::info!(path = %path.display(), from, to = target, "Migrating config");

        let mut migrated = store.clone();
        for version in from..target {
            self.apply_step(version, &mut migrated)?;
        }
        migrated.insert(CONFIG_VERSION_KEY, target.to_string());

        let header = vec![
            "Configuration".to_string(),
            format!("Migrated from version {from} to {target}"),
        ];
        FlatDocument::from_raw(&migrated, header)
            .write(path)
            .map_err(|source| MigrationError::Persist {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(path = %path.display(), from, to = target, "Config migration completed");
        Ok(MigrationOutcome::Migrated {
            from,
            to: target,
            store: migrated,
        })
    }

    fn apply_step(&self, version: u32, store: &mut RawStore) -> Result<(), MigrationError> {
        if let Some(step) = self.schema.migration(version) {
            step(store).map_err(|e| MigrationError::Step {
                version,
                reason: e.to_string(),
            })?;
            tracing::debug!(version, "Applied custom migration step");
            return Ok(());
        }

        if let Some((_, renames)) = BUILTIN_RENAMES.iter().find(|(v, _)| *v == version) {
            for (old, new) in renames.iter() {
                store.rename(old, new);
            }
            tracing::debug!(version, "Applied built-in migration step");
        }
        Ok(())
    }
}
