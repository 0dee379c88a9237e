//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use hotconf::schema::{ExecutionMode, Field, Schema, Section};
use hotconf::settings::EngineSettings;

/// Settings rooted at `root` with short timings and no file watcher.
pub fn settings(root: &Path, mode: ExecutionMode) -> EngineSettings {
    EngineSettings {
        config_root: root.to_path_buf(),
        cache_ttl_ms: 200,
        poll_interval_ms: 100,
        watch_files: false,
        mode,
        ..EngineSettings::default()
    }
}

/// Same as [`settings`] with the file watcher enabled.
pub fn watching(root: &Path, mode: ExecutionMode) -> EngineSettings {
    EngineSettings {
        watch_files: true,
        ..settings(root, mode)
    }
}

/// Schema covering every field type, a nested section and a client-only
/// section.
pub fn sample_schema(version: u32) -> Schema {
    sample_builder(version).build().unwrap()
}

pub fn sample_builder(version: u32) -> hotconf::schema::SchemaBuilder {
    Schema::builder(version)
        .field(Field::bool("enabled", true))
        .section(
            Section::new("rendering")
                .field(Field::bool("enableFog", true))
                .field(Field::enumeration("quality", &["fast", "fancy"], "FANCY"))
                .section(
                    Section::new("entityCulling")
                        .label("Entity Culling")
                        .field(Field::bool("enableCulling", true))
                        .field(Field::bool("enableEntityCulling", true)),
                ),
        )
        .section(
            Section::new("limits")
                .field(Field::int("distance", 64).range(1.0, 256.0))
                .field(Field::long("seed", 42))
                .field(Field::double("scale", 1.0).range(0.5, 2.0))
                .field(Field::string("name", "abc").rule("minLength:3")),
        )
        .section(
            Section::new("clientOnly")
                .label("Client Only")
                .client_only()
                .field(Field::string_list(
                    "entities",
                    &["minecraft:player", "minecraft:villager"],
                )),
        )
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Push the file's modification time forward so the poll watcher sees a
/// change regardless of timestamp granularity.
pub fn bump_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .unwrap();
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}
