use tempfile::tempdir;
use topicbus_settings::*;

fn customized() -> Settings {
    let mut settings = Settings::new();
    settings.bus.isolate_panics = false;
    settings.bus.reject_duplicate_registration = true;
    settings.bus.initial_topic_capacity = 8;
    settings.logging.level = "debug".to_string();
    settings.logging.format = LogFormat::Json;
    settings
}

#[test]
fn test_toml_file_round_trip() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("topicbus.toml");

    let settings = customized();
    settings.save_to_file(&path).expect("save");
    let loaded = Settings::load_from_file(&path).expect("load");
    assert_eq!(loaded, settings);
}

#[test]
fn test_json_file_round_trip() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("topicbus.json");

    let settings = customized();
    settings.save_to_file(&path).expect("save creates parent");
    let loaded = Settings::load_from_file(&path).expect("load");
    assert_eq!(loaded, settings);
}

#[test]
fn test_unknown_extension_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("topicbus.yaml");

    let err = Settings::new().save_to_file(&path).expect_err("yaml");
    assert!(matches!(err, SettingsError::UnsupportedFormat(_)));
    assert!(!path.exists());
}

#[test]
fn test_invalid_file_contents_are_reported() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("topicbus.toml");
    std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").expect("write");

    let err = Settings::load_from_file(&path).expect_err("invalid level");
    assert!(matches!(err, SettingsError::InvalidSetting { .. }));

    std::fs::write(&path, "not = [valid").expect("write");
    let err = Settings::load_from_file(&path).expect_err("broken toml");
    assert!(matches!(err, SettingsError::TomlError(_)));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");

    let settings = Settings::load_or_default(&path).expect("defaults");
    assert_eq!(settings, Settings::default());
    assert!(matches!(
        Settings::load_from_file(&path),
        Err(SettingsError::IoError(_))
    ));
}
