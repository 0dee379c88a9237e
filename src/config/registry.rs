//! Process-scoped registry of configuration controllers.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::controller::{ConfigController, ConfigHandle};
use crate::error::ConfigError;
use crate::observability::metrics;
use crate::schema::Schema;
use crate::settings::EngineSettings;

/// Owns one controller per owner id. Dropping the registry shuts it down.
pub struct ConfigRegistry {
    settings: EngineSettings,
    controllers: DashMap<String, ConfigHandle>,
    closed: AtomicBool,
}

impl ConfigRegistry {
    pub fn new(settings: EngineSettings) -> Self {
        tracing::info!(
            environment = %settings.mode,
            host_version = %settings.host.version,
            loader = %settings.host.loader,
            config_root = %settings.config_root.display(),
            "Config engine initialized"
        );
        Self {
            settings,
            controllers: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Bind `schema` to `owner` and load its file.
    pub fn register(&self, owner: &str, schema: Schema) -> Result<ConfigHandle, ConfigError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConfigError::RegistryClosed);
        }
        validate_owner(owner)?;

        if self.controllers.contains_key(owner) {
            tracing::error!(owner, "Config already registered");
            return Err(ConfigError::AlreadyRegistered(owner.to_string()));
        }

        // Opened outside the map lock; a concurrent registration of the same
        // owner is caught by the second check below.
        let handle = ConfigController::open(owner, schema, &self.settings)?;
        match self.controllers.entry(owner.to_string()) {
            Entry::Occupied(_) => {
                handle.stop();
                tracing::error!(owner, "Config already registered");
                return Err(ConfigError::AlreadyRegistered(owner.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(handle.clone());
            }
        }
        if self.is_closed() {
            self.controllers.remove(owner);
            handle.stop();
            return Err(ConfigError::RegistryClosed);
        }

        metrics::record_registered_owners(self.controllers.len());
        Ok(handle)
    }

    pub fn get(&self, owner: &str) -> Option<ConfigHandle> {
        self.controllers.get(owner).map(|entry| entry.value().clone())
    }

    /// Like [`get`](Self::get), failing with `NotRegistered`.
    pub fn handle(&self, owner: &str) -> Result<ConfigHandle, ConfigError> {
        self.get(owner)
            .ok_or_else(|| ConfigError::NotRegistered(owner.to_string()))
    }

    /// Registered owner ids, sorted.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.controllers.iter().map(|e| e.key().clone()).collect();
        owners.sort();
        owners
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop every controller and clear the registry. Runs once; later calls
    /// do nothing.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let handles: Vec<ConfigHandle> = self.controllers.iter().map(|e| e.value().clone()).collect();
        self.controllers.clear();
        for handle in &handles {
            handle.stop();
        }

        metrics::record_registered_owners(0);
        tracing::info!(stopped = handles.len(), "Config engine shut down");
    }
}

impl Drop for ConfigRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_owner(owner: &str) -> Result<(), ConfigError> {
    let invalid = owner.trim().is_empty()
        || owner == "."
        || owner == ".."
        || owner.contains(['/', '\\']);
    if invalid {
        return Err(ConfigError::InvalidOwner(owner.to_string()));
    }
    Ok(())
}
