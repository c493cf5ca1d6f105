/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use subcondense::app_config::{Config, LogLevel};
use subcondense::condense::{IgnoreRange, IgnoreRangeSpec};
use crate::common;

/// Test that a missing config file is created with defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let (config, created) = Config::load_or_create(&path)?;
    assert!(created);
    assert!(path.exists());
    assert_eq!(config.log_level, LogLevel::Info);

    let (_, created_again) = Config::load_or_create(&path)?;
    assert!(!created_again);
    Ok(())
}

/// Test that a saved config reads back unchanged
#[test]
fn test_save_thenFromFile_shouldKeepValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = Some("ja".to_string());
    config.condense.padding_ms = 300;
    config.condense.ignore_ranges.push(IgnoreRangeSpec::new("e-1m30s", "e"));
    config.condense.ignore_chapters.push("Opening".to_string());
    config.output.condensed_video = true;
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.target_language.as_deref(), Some("ja"));
    assert_eq!(loaded.condense.padding_ms, 300);
    assert_eq!(loaded.condense.ignore_ranges, vec![IgnoreRangeSpec::new("e-1m30s", "e")]);
    assert_eq!(loaded.condense.ignore_chapters, vec!["Opening".to_string()]);
    assert!(loaded.output.condensed_video);
    Ok(())
}

/// Test that malformed JSON is an error, not a silent default
#[test]
fn test_fromFile_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::from_file(&path).is_err());
    Ok(())
}

/// Test that every invalid setting is caught by validate
#[test]
fn test_validate_withInvalidSettings_shouldFail() {
    let mut config = Config::default();
    config.condense.minimum_compression_ratio = 1.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.condense.override_regex = Some("(unclosed".to_string());
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.condense.ignore_ranges.push(IgnoreRangeSpec::new("0", "1x"));
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.target_language = Some("klingon".to_string());
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.output.audio_extension = " ".to_string();
    assert!(config.validate().is_err());
}

/// Test that seconds become milliseconds in the engine options
#[test]
fn test_toOptions_shouldConvertSeconds() {
    let mut config = Config::default();
    config.condense.padding_ms = 100;
    config.condense.threshold_ms = 1500;
    config.condense.partition_secs = 1800;
    config.condense.split_secs = 600;

    let ranges = vec![IgnoreRange::new(0, 90_000).unwrap()];
    let options = config.condense.to_options(ranges.clone());

    assert_eq!(options.padding_ms, 100);
    assert_eq!(options.threshold_ms, 1500);
    assert_eq!(options.partition_size_ms, 1_800_000);
    assert_eq!(options.split_size_ms, 600_000);
    assert_eq!(options.ignore_ranges, ranges);
}

/// Test output defaults: mp3 bitrate and directory beside the input
#[test]
fn test_outputConfig_defaults_shouldFollowInput() {
    let mut config = Config::default();
    assert_eq!(config.output.effective_bitrate_kbps(), Some(320));
    assert_eq!(config.output.output_dir_for(Path::new("/media/show/e01.mkv")), PathBuf::from("/media/show"));

    config.output.audio_extension = "flac".to_string();
    assert_eq!(config.output.effective_bitrate_kbps(), None);

    config.output.output_dir = Some(PathBuf::from("/out"));
    assert_eq!(config.output.output_dir_for(Path::new("/media/show/e01.mkv")), PathBuf::from("/out"));
}
