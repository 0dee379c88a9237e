mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use hotconf::config::{ConfigEventKind, ConfigRegistry};
use hotconf::error::ConfigError;
use hotconf::schema::{ExecutionMode, Field, Schema, Section, Value};

#[test]
fn test_generated_file_round_trips_every_type() {
    let dir = tempfile::tempdir().unwrap();
    let settings = common::settings(dir.path(), ExecutionMode::Client);
    let path = dir.path().join("mymod").join("mymod_config.toml");

    let saved = {
        let registry = ConfigRegistry::new(settings.clone());
        let handle = registry.register("mymod", common::sample_schema(2)).unwrap();
        assert_eq!(handle.path(), path.as_path());

        let content = fs::read_to_string(&path).unwrap();
        toml::from_str::<toml::Value>(&content).unwrap();
        assert!(content.starts_with("# mymod Configuration\n"));
        assert!(content.contains("# Environment: client\n"));
        assert!(content.contains("config_version = 2\n"));
        assert!(content.contains("[rendering.entityCulling]\n"));
        assert!(content.contains("# Entity Culling\n"));
        assert!(content.contains("## Enable Entity Culling\nenableEntityCulling = true\n"));

        handle.set("enabled", Value::Bool(false)).unwrap();
        handle.set("rendering.quality", Value::String("fast".into())).unwrap();
        handle.set("limits.distance", Value::Int(128)).unwrap();
        handle.set("limits.seed", Value::Long(-7_000_000_000)).unwrap();
        handle.set("limits.scale", Value::Double(1.5)).unwrap();
        handle.set("limits.name", Value::String("hello world".into())).unwrap();
        handle
            .set(
                "clientOnly.entities",
                Value::List(vec!["a:b".into(), "c:d".into()]),
            )
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        toml::from_str::<toml::Value>(&content).unwrap();
        handle.get()
    };

    let registry = ConfigRegistry::new(settings);
    let reloaded = registry.register("mymod", common::sample_schema(2)).unwrap().get();

    assert_eq!(reloaded.len(), saved.len());
    for key in saved.paths() {
        assert_eq!(reloaded.get(key), saved.get(key), "{key}");
    }
    assert_eq!(reloaded.get("rendering.quality"), Some(&Value::Enum("FAST".into())));
    assert_eq!(reloaded.get_long("limits.seed"), Some(-7_000_000_000));
    assert_eq!(reloaded.get_str("limits.name"), Some("hello world"));
    assert_eq!(reloaded.generation(), 1);
}

#[test]
fn test_server_mode_omits_client_sections() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Server));
    let handle = registry.register("mymod", common::sample_schema(2)).unwrap();

    let content = fs::read_to_string(handle.path()).unwrap();
    assert!(content.contains("# Environment: server\n"));
    assert!(!content.contains("[clientOnly]"));
    assert!(!content.contains("Client Only"));
    assert!(!content.contains("entities"));

    let instance = handle.get();
    assert!(!instance.contains("clientOnly.entities"));
    assert!(instance.contains("limits.distance"));
    assert_eq!(handle.read("clientOnly.entities"), None);
    assert!(handle.describe().iter().all(|f| !f.path.starts_with("clientOnly.")));
}

#[test]
fn test_client_mode_includes_client_sections() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let handle = registry.register("mymod", common::sample_schema(2)).unwrap();

    let content = fs::read_to_string(handle.path()).unwrap();
    assert!(content.contains("[clientOnly]\n"));
    assert!(content.contains("entities = [\"minecraft:player\", \"minecraft:villager\"]\n"));
    assert_eq!(
        handle.get().get_list("clientOnly.entities"),
        Some(&["minecraft:player".to_string(), "minecraft:villager".to_string()][..])
    );
}

#[test]
fn test_out_of_range_value_rejects_registration() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    common::write_file(
        &dir.path().join("mymod").join("mymod_config.toml"),
        "config_version = 2\n[limits]\ndistance = 0\n",
    );

    let err = registry.register("mymod", common::sample_schema(2)).unwrap_err();
    let ConfigError::Invalid(errors) = err else {
        panic!("expected validation failure, got {err}");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, "limits.distance");
    assert!(registry.get("mymod").is_none());
}

#[test]
fn test_undecodable_value_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    common::write_file(
        &dir.path().join("mymod").join("mymod_config.toml"),
        "config_version = 2\n[limits]\ndistance = abc\nscale = 1.75\n[rendering]\nquality = \"ultra\"\n",
    );

    let instance = registry.register("mymod", common::sample_schema(2)).unwrap().get();
    assert_eq!(instance.get_int("limits.distance"), Some(64));
    assert_eq!(instance.get_double("limits.scale"), Some(1.75));
    assert_eq!(instance.get("rendering.quality"), Some(&Value::Enum("FANCY".into())));
}

#[test]
fn test_invalid_defaults_abort_before_file_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let schema = Schema::builder(1)
        .section(Section::new("limits").field(Field::int("distance", 0).range(1.0, 10.0)))
        .build()
        .unwrap();

    let err = registry.register("broken", schema).unwrap_err();
    assert!(err.is_invalid());
    assert!(!dir.path().join("broken").join("broken_config.toml").exists());
}

#[test]
fn test_custom_validator_runs_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    common::write_file(
        &dir.path().join("mymod").join("mymod_config.toml"),
        "config_version = 2\n[limits]\nseed = 13\n",
    );
    let schema = common::sample_builder(2)
        .validator(|instance| match instance.get_long("limits.seed") {
            Some(13) => Err("seed 13 is reserved".into()),
            _ => Ok(()),
        })
        .build()
        .unwrap();

    let err = registry.register("mymod", schema).unwrap_err();
    assert!(err.to_string().contains("seed 13 is reserved"));
}

#[test]
fn test_duplicate_owner_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let first = registry.register("mymod", common::sample_schema(2)).unwrap();

    let err = registry.register("mymod", common::sample_schema(2)).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyRegistered(ref owner) if owner == "mymod"));
    assert!(!first.is_stopped());
    assert_eq!(registry.owners(), vec!["mymod".to_string()]);
}

#[test]
fn test_invalid_owner_ids() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    for owner in ["", "../escape", "a/b"] {
        let err = registry.register(owner, common::sample_schema(2)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOwner(_)), "{owner}");
    }
    assert!(registry.is_empty());
}

#[test]
fn test_set_rejects_bad_updates() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let handle = registry.register("mymod", common::sample_schema(2)).unwrap();
    let before = handle.get();

    assert!(matches!(
        handle.set("limits.missing", Value::Int(1)),
        Err(ConfigError::UnknownKey(_))
    ));
    assert!(matches!(
        handle.set("limits.seed", Value::String("x".into())),
        Err(ConfigError::TypeMismatch { .. })
    ));
    assert!(matches!(
        handle.set("rendering.quality", Value::String("ultra".into())),
        Err(ConfigError::TypeMismatch { .. })
    ));
    assert!(handle.set("limits.scale", Value::Double(5.0)).unwrap_err().is_invalid());
    assert!(handle.set("limits.name", Value::String("ab".into())).unwrap_err().is_invalid());

    assert!(Arc::ptr_eq(&before, &handle.get()));
    assert_eq!(handle.generation(), 1);
}

#[test]
fn test_set_widens_int_for_long_fields() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let handle = registry.register("mymod", common::sample_schema(2)).unwrap();
    let mut events = handle.subscribe();

    handle.set("limits.seed", Value::Int(7)).unwrap();
    assert_eq!(handle.get().get("limits.seed"), Some(&Value::Long(7)));
    assert_eq!(handle.generation(), 2);
    assert_eq!(handle.read("limits.seed"), Some(Value::Long(7)));

    let event = events.try_recv().unwrap();
    assert_eq!(event.kind, ConfigEventKind::Saved);
    assert_eq!(event.generation, 2);
}

#[test]
fn test_save_rewrites_edited_file() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let handle = registry.register("mymod", common::sample_schema(2)).unwrap();

    fs::write(handle.path(), "config_version = 2\n[limits]\ndistance = 12\n").unwrap();
    handle.save().unwrap();

    let content = fs::read_to_string(handle.path()).unwrap();
    assert!(content.contains("distance = 64\n"));
    assert!(content.contains("[rendering.entityCulling]\n"));
    assert!(!handle.path().with_file_name("mymod_config.toml.tmp").exists());
}

#[test]
fn test_describe_lists_current_and_default() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let handle = registry.register("mymod", common::sample_schema(2)).unwrap();
    handle.set("limits.distance", Value::Int(100)).unwrap();

    let fields = handle.describe();
    assert_eq!(fields.len(), handle.get().len());
    assert_eq!(fields[0].path, "enabled");

    let distance = fields.iter().find(|f| f.path == "limits.distance").unwrap();
    assert_eq!(distance.current, Value::Int(100));
    assert_eq!(distance.default, Value::Int(64));
    let range = distance.range.unwrap();
    assert_eq!((range.min, range.max), (1.0, 256.0));
}

#[test]
fn test_cache_age_resets_on_reload() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let handle = registry.register("mymod", common::sample_schema(2)).unwrap();

    assert_eq!(handle.read("limits.seed"), Some(Value::Long(42)));
    std::thread::sleep(Duration::from_millis(60));
    assert!(handle.cache_age("limits.seed").unwrap() >= Duration::from_millis(60));

    fs::write(handle.path(), "config_version = 2\n[limits]\nseed = 5\n").unwrap();
    assert_eq!(handle.read("limits.seed"), Some(Value::Long(42)));

    handle.reload().unwrap();
    assert!(handle.cache_age("limits.seed").unwrap() < Duration::from_millis(60));
    assert_eq!(handle.read("limits.seed"), Some(Value::Long(5)));
    assert_eq!(handle.read_raw("limits.seed"), Some(Value::Long(5)));
    assert_eq!(handle.read("limits.unknown"), None);
}

#[test]
fn test_set_keeps_quotes_and_line_breaks_inside_the_value() {
    let dir = tempfile::tempdir().unwrap();
    let settings = common::settings(dir.path(), ExecutionMode::Client);
    let path = dir.path().join("mymod").join("mymod_config.toml");
    let name = "okay\"\ndistance = 0\nx = \"y";

    {
        let registry = ConfigRegistry::new(settings.clone());
        let handle = registry.register("mymod", common::sample_schema(2)).unwrap();
        handle.set("limits.name", Value::String(name.into())).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let doc = toml::from_str::<toml::Value>(&content).unwrap();
        assert_eq!(doc["limits"]["name"].as_str(), Some(name));
        assert_eq!(doc["limits"]["distance"].as_integer(), Some(64));
        assert!(doc["limits"].get("x").is_none());
    }

    let registry = ConfigRegistry::new(settings);
    let instance = registry.register("mymod", common::sample_schema(2)).unwrap().get();
    assert_eq!(instance.get_str("limits.name"), Some(name));
    assert_eq!(instance.get_int("limits.distance"), Some(64));
}

#[test]
fn test_padded_strings_and_list_commas_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let settings = common::settings(dir.path(), ExecutionMode::Client);
    let entities = vec!["a,b".to_string(), "say \"hi\"".to_string(), " c ".to_string()];

    {
        let registry = ConfigRegistry::new(settings.clone());
        let handle = registry.register("mymod", common::sample_schema(2)).unwrap();
        handle.set("limits.name", Value::String("  padded  ".into())).unwrap();
        handle
            .set("clientOnly.entities", Value::List(entities.clone()))
            .unwrap();
    }

    let registry = ConfigRegistry::new(settings);
    let instance = registry.register("mymod", common::sample_schema(2)).unwrap().get();
    assert_eq!(instance.get_str("limits.name"), Some("  padded  "));
    assert_eq!(instance.get_list("clientOnly.entities"), Some(&entities[..]));
}

#[test]
fn test_unreadable_file_fails_registration_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mymod").join("mymod_config.toml");
    let bytes: &[u8] = b"config_version = 1\n[limits]\nname = \"caf\xe9\"\ndistance = 100\nseed = 777\n";
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();

    let registry = ConfigRegistry::new(common::settings(dir.path(), ExecutionMode::Client));
    let err = registry.register("mymod", common::sample_schema(2)).unwrap_err();
    assert!(matches!(err, ConfigError::Io { path: ref p, .. } if p == &path), "{err}");
    assert!(registry.get("mymod").is_none());
    assert_eq!(fs::read(&path).unwrap(), bytes);
}
