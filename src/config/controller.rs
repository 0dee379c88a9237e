//! Per-owner configuration controller.
//!
//! Owns the live instance, the raw store and the accessor cache for one
//! owner id, and runs the load → migrate → materialize → validate → publish
//! pipeline on registration, on reload and on file change.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::config::instance::ConfigInstance;
use crate::config::migration::{MigrationEngine, MigrationOutcome};
use crate::config::validation;
use crate::config::watcher::FileWatcher;
use crate::error::ConfigError;
use crate::observability::metrics;
use crate::schema::{ExecutionMode, FieldKind, Range, Schema, SchemaLayout, SchemaWalker, Value};
use crate::settings::EngineSettings;
use crate::store::decode::decode_enum;
use crate::store::{AccessorCache, FlatDocument, FlatStore, RawStore};

const EVENT_CAPACITY: usize = 64;

/// What happened to a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEventKind {
    Registered,
    Reloaded,
    ReloadFailed,
    Saved,
    Stopped,
}

/// Change notification broadcast to subscribers.
#[derive(Debug, Clone)]
pub struct ConfigEvent {
    pub owner: String,
    pub kind: ConfigEventKind,
    /// Generation of the live instance after the event.
    pub generation: u64,
    pub error: Option<String>,
}

/// Per-leaf view consumed by editing front ends.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub path: String,
    pub kind: FieldKind,
    pub current: Value,
    pub default: Value,
    pub range: Option<Range>,
}

/// Controller for a single owner id.
pub struct ConfigController {
    owner: String,
    path: PathBuf,
    mode: ExecutionMode,
    schema: Arc<Schema>,
    layout: Arc<SchemaLayout>,
    live: ArcSwap<ConfigInstance>,
    store: Arc<ArcSwap<RawStore>>,
    cache: AccessorCache,
    /// Serializes reload, save and set.
    op_lock: Mutex<()>,
    watcher: FileWatcher,
    events: broadcast::Sender<ConfigEvent>,
    generation: AtomicU64,
    stopped: AtomicBool,
}

/// Cheap, cloneable handle to a registered controller.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ConfigController>,
}

impl Deref for ConfigHandle {
    type Target = ConfigController;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("owner", &self.inner.owner)
            .field("path", &self.inner.path)
            .field("generation", &self.inner.generation.load(Ordering::Acquire))
            .finish()
    }
}

impl ConfigController {
    /// Build the controller for `owner`: synthesize the file if absent,
    /// then load, migrate, materialize, validate and publish. Starts the
    /// file watcher when enabled.
    pub(crate) fn open(owner: &str, schema: Schema, settings: &EngineSettings) -> Result<ConfigHandle, ConfigError> {
        let path = settings.config_path(owner);
        let mode = settings.mode;
        let layout = SchemaWalker::new(mode).walk(&schema)?;

        let defaults = ConfigInstance::defaults(&layout, schema.version());
        if let Err(errors) = validation::validate(&schema, &layout, &defaults) {
            tracing::error!(owner, "Default configuration failed validation");
            return Err(ConfigError::Invalid(errors));
        }

        if !path.exists() {
            let doc = FlatDocument::from_instance(&layout, &defaults, file_header(owner, mode));
            match doc.write(&path) {
                Ok(()) => tracing::info!(owner, path = %path.display(), "Default configuration created"),
                Err(e) => tracing::error!(
                    owner,
                    path = %path.display(),
                    error = %e,
                    "Failed to create default configuration"
                ),
            }
        }

        // An unreadable file fails registration and is left untouched.
        let raw = if path.exists() {
            let raw = FlatStore::read(&path).map_err(|source| {
                tracing::error!(owner, path = %path.display(), error = %source, "Failed to read config file");
                ConfigError::Io {
                    path: path.clone(),
                    source,
                }
            })?;
            migrate(owner, &schema, &path, raw)?
        } else {
            tracing::warn!(owner, path = %path.display(), "Config file not found, using defaults");
            RawStore::new()
        };
        let store = Arc::new(ArcSwap::from_pointee(raw));
        let cache = AccessorCache::new(Arc::clone(&store), settings.cache_ttl());

        let instance = ConfigInstance::materialize(&layout, &cache, schema.version());
        if let Err(errors) = validation::validate(&schema, &layout, &instance) {
            tracing::error!(owner, path = %path.display(), "Configuration failed validation");
            return Err(ConfigError::Invalid(errors));
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let controller = Arc::new(ConfigController {
            owner: owner.to_string(),
            watcher: FileWatcher::new(&path, settings.poll_interval()),
            path,
            mode,
            schema: Arc::new(schema),
            layout: Arc::new(layout),
            live: ArcSwap::from_pointee(instance.with_generation(1)),
            store,
            cache,
            op_lock: Mutex::new(()),
            events,
            generation: AtomicU64::new(1),
            stopped: AtomicBool::new(false),
        });

        if settings.watch_files {
            let weak: Weak<ConfigController> = Arc::downgrade(&controller);
            let started = controller.watcher.start(move || {
                if let Some(controller) = weak.upgrade() {
                    // Failures are logged and broadcast by reload itself.
                    let _ = controller.reload();
                }
            });
            if let Err(e) = started {
                tracing::error!(owner, error = %e, "Failed to start config file watcher");
            }
        }

        controller.notify(ConfigEventKind::Registered, None);
        tracing::info!(owner, environment = %mode, "Config registered successfully");
        Ok(ConfigHandle { inner: controller })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn layout(&self) -> &SchemaLayout {
        &self.layout
    }

    /// The live instance. Never blocks.
    pub fn get(&self) -> Arc<ConfigInstance> {
        self.live.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    /// Cached decode of one leaf from the current raw store.
    pub fn read(&self, path: &str) -> Option<Value> {
        self.layout.leaf(path).map(|leaf| self.cache.get(leaf))
    }

    /// Uncached decode of one leaf.
    pub fn read_raw(&self, path: &str) -> Option<Value> {
        self.layout.leaf(path).map(|leaf| self.cache.get_raw(leaf))
    }

    pub fn cache_age(&self, path: &str) -> Option<Duration> {
        self.cache.age(path)
    }

    /// Every visible leaf with its current and default value.
    pub fn describe(&self) -> Vec<FieldView> {
        let live = self.live.load();
        self.layout
            .leaves()
            .iter()
            .map(|leaf| FieldView {
                path: leaf.path.clone(),
                kind: leaf.kind.clone(),
                current: live.get(&leaf.path).cloned().unwrap_or_else(|| leaf.default.clone()),
                default: leaf.default.clone(),
                range: leaf.range,
            })
            .collect()
    }

    /// Re-read the file and swap in a rebuilt instance. On any failure the
    /// previous instance stays live.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let _guard = self.op_lock.lock();
        self.ensure_running()?;

        let started = Instant::now();
        let result = self.rebuild().map(|(instance, raw)| {
            self.store.store(raw);
            self.cache.invalidate();
            self.publish(instance)
        });
        metrics::record_reload(&self.owner, result.is_ok(), started.elapsed());

        match result {
            Ok(generation) => {
                tracing::info!(owner = %self.owner, generation, "Configuration reloaded successfully");
                self.notify(ConfigEventKind::Reloaded, None);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    owner = %self.owner,
                    error = %e,
                    "Failed to reload configuration. Keeping current configuration."
                );
                self.notify(ConfigEventKind::ReloadFailed, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Write the live instance back to the file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let _guard = self.op_lock.lock();
        self.ensure_running()?;

        let instance = self.live.load_full();
        self.persist(&instance)?;
        tracing::debug!(owner = %self.owner, "Configuration saved");
        self.notify(ConfigEventKind::Saved, None);
        Ok(())
    }

    /// Update one leaf: type-check, validate, persist, then swap in.
    pub fn set(&self, path: &str, value: Value) -> Result<(), ConfigError> {
        let _guard = self.op_lock.lock();
        self.ensure_running()?;

        let leaf = self
            .layout
            .leaf(path)
            .ok_or_else(|| ConfigError::UnknownKey(path.to_string()))?;
        let value = coerce(value, &leaf.kind);
        if !value.fits(&leaf.kind) {
            return Err(ConfigError::TypeMismatch {
                path: path.to_string(),
                expected: leaf.kind.to_string(),
                actual: value.kind_name().to_string(),
            });
        }

        let candidate = self.live.load().with_value(path, value);
        validation::validate(&self.schema, &self.layout, &candidate).map_err(ConfigError::Invalid)?;
        self.persist(&candidate)?;
        let generation = self.publish(candidate);

        tracing::debug!(owner = %self.owner, path, generation, "Configuration value updated");
        self.notify(ConfigEventKind::Saved, None);
        Ok(())
    }

    /// Stop watching and drop cached decodes. The last instance stays
    /// readable; reload, save and set fail afterwards.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.watcher.stop();
        self.cache.invalidate();
        self.notify(ConfigEventKind::Stopped, None);
        tracing::info!(owner = %self.owner, "Configuration stopped");
    }

    fn ensure_running(&self) -> Result<(), ConfigError> {
        if self.is_stopped() {
            return Err(ConfigError::Stopped(self.owner.clone()));
        }
        Ok(())
    }

    /// Build and validate a candidate from the file without touching the
    /// live store or cache.
    fn rebuild(&self) -> Result<(ConfigInstance, Arc<RawStore>), ConfigError> {
        let raw = match FlatStore::read(&self.path) {
            Ok(raw) => migrate(&self.owner, &self.schema, &self.path, raw)?,
            Err(e) => {
                tracing::warn!(
                    owner = %self.owner,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read config file, keeping previous values"
                );
                RawStore::clone(&self.store.load())
            }
        };

        let staged = Arc::new(ArcSwap::from_pointee(raw));
        let staging_cache = AccessorCache::new(Arc::clone(&staged), self.cache.ttl());
        let instance = ConfigInstance::materialize(&self.layout, &staging_cache, self.schema.version());
        validation::validate(&self.schema, &self.layout, &instance).map_err(ConfigError::Invalid)?;

        Ok((instance, staged.load_full()))
    }

    fn publish(&self, instance: ConfigInstance) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.live.store(Arc::new(instance.with_generation(generation)));
        generation
    }

    fn persist(&self, instance: &ConfigInstance) -> Result<(), ConfigError> {
        let doc = FlatDocument::from_instance(&self.layout, instance, file_header(&self.owner, self.mode));
        doc.write(&self.path).map_err(|source| {
            tracing::error!(owner = %self.owner, error = %source, "Failed to save configuration");
            ConfigError::Io {
                path: self.path.clone(),
                source,
            }
        })?;
        self.store.store(Arc::new(doc.to_raw_store()));
        self.cache.invalidate();
        Ok(())
    }

    fn notify(&self, kind: ConfigEventKind, error: Option<String>) {
        let _ = self.events.send(ConfigEvent {
            owner: self.owner.clone(),
            kind,
            generation: self.generation(),
            error,
        });
    }
}

fn migrate(owner: &str, schema: &Schema, path: &Path, raw: RawStore) -> Result<RawStore, ConfigError> {
    match MigrationEngine::new(schema).migrate(path, &raw) {
        Ok(MigrationOutcome::UpToDate) => Ok(raw),
        Ok(MigrationOutcome::Migrated { store, .. }) => {
            metrics::record_migration(owner);
            Ok(store)
        }
        Err(e) => {
            tracing::error!(owner, error = %e, "Config migration failed");
            Err(e.into())
        }
    }
}

/// Widen numeric values and normalize enum spellings for `kind`.
fn coerce(value: Value, kind: &FieldKind) -> Value {
    match (value, kind) {
        (Value::Int(v), FieldKind::Long) => Value::Long(i64::from(v)),
        (Value::Int(v), FieldKind::Double) => Value::Double(f64::from(v)),
        (Value::Enum(s) | Value::String(s), FieldKind::Enum(variants)) => match decode_enum(&s, variants) {
            Some(variant) => Value::Enum(variant.clone()),
            None => Value::Enum(s),
        },
        (value, _) => value,
    }
}

fn file_header(owner: &str, mode: ExecutionMode) -> Vec<String> {
    vec![
        format!("{owner} Configuration"),
        format!("Generated by {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        format!("Environment: {mode}"),
        "Sections restricted to another environment are not generated".to_string(),
        "Edit this file and it will be automatically reloaded".to_string(),
    ]
}
