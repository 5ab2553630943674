//! Integration tests for the configuration system

use std::fs;
use talebox_config::{
    Config, ConfigError, ConfigManager, ConfigSection, LogLevel, PlayerConfig, SleepTimerConfig,
    CONFIG_VERSION,
};
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    assert!(manager.initialize()?);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.player.default_speed = 1.5;
    modified.sleep_timer.default_track_count = 3;
    modified.app.log_level = LogLevel::Debug;
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded, modified);

    manager.reset()?;
    assert_eq!(manager.load()?, Config::default());

    Ok(())
}

#[test]
fn test_invalid_config_never_reaches_disk() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.save(&Config::default())?;

    let mut invalid = Config::default();
    invalid.sleep_timer.default_minutes = 0;
    assert!(manager.save(&invalid).is_err());

    assert_eq!(manager.load()?, Config::default());
    Ok(())
}

#[test]
fn test_save_error_lists_rejected_fields() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut invalid = Config::default();
    invalid.player.default_speed = 4.0;
    match manager.update(|config| *config = invalid) {
        Err(ConfigError::Invalid(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "player.default_speed");
        }
        other => panic!("expected Invalid, got {:?}", other),
    }
    assert!(!manager.config_path().exists());
    Ok(())
}

#[test]
fn test_serialization_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let toml_string = toml::to_string(&config)?;
    let deserialized: Config = toml::from_str(&toml_string)?;
    assert_eq!(config, deserialized);
    Ok(())
}

#[test]
fn test_unknown_keys_are_tolerated() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(
        manager.config_path(),
        "version = 1\n[player]\ndefault_volume = 70\nseek_step_secs = 45\n",
    )?;

    let config = manager.load()?;
    assert_eq!(config.player.seek_step_secs, 45);
    Ok(())
}

#[test]
fn test_load_or_default_on_corrupted_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "[player\n")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());
    Ok(())
}

#[test]
fn test_section_names() {
    assert_eq!(PlayerConfig::default().section_name(), "player");
    assert_eq!(SleepTimerConfig::default().section_name(), "sleep_timer");
}

#[test]
fn test_player_defaults() {
    let player = PlayerConfig::default();
    assert_eq!(player.default_speed, 1.0);
    assert_eq!(player.position_save_interval_secs, 10);
    assert_eq!(player.seek_settle_ms, 750);
    assert_eq!(player.load_timeout_secs, 15);
    assert_eq!(player.transient_retries, 1);
    assert_eq!(player.seek_step_secs, 30);
}
