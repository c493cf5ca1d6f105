use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::condense::{CondenseOptions, IgnoreRange, IgnoreRangeSpec};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Preferred language for audio and subtitle streams (ISO 639)
    #[serde(default)]
    pub target_language: Option<String>,

    /// Audio stream to use regardless of language, by ffprobe index
    #[serde(default)]
    pub audio_stream_index: Option<usize>,

    /// Embedded subtitle stream to try before other embedded streams, by ffprobe index
    #[serde(default)]
    pub subtitle_stream_index: Option<usize>,

    /// Timeline condensation settings
    #[serde(default)]
    pub condense: CondenseConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// How subtitles are turned into a condensed timeline
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CondenseConfig {
    // @field: Padding around every dialogue segment (ms)
    #[serde(default)]
    pub padding_ms: u64,

    // @field: Merge segments closer than this (ms)
    #[serde(default)]
    pub threshold_ms: u64,

    // @field: Partition length in source time, 0 disables (s)
    #[serde(default)]
    pub partition_secs: u64,

    // @field: Split length in condensed time, 0 disables (s)
    #[serde(default)]
    pub split_secs: u64,

    // @field: Keep every event as dialogue
    #[serde(default)]
    pub include_all_events: bool,

    // @field: Events matching this are not dialogue; replaces built-in filtering
    #[serde(default)]
    pub override_regex: Option<String>,

    // @field: Ranges to cut out, e.g. ["0", "1m30s"] or ["e-1m30s", "e"]
    #[serde(default)]
    pub ignore_ranges: Vec<IgnoreRangeSpec>,

    // @field: Chapter titles to cut out
    #[serde(default)]
    pub ignore_chapters: Vec<String>,

    // @field: Reject subtitle sources condensing to less than this share of the audio
    #[serde(default = "default_minimum_compression_ratio")]
    pub minimum_compression_ratio: f64,
}

impl Default for CondenseConfig {
    fn default() -> Self {
        Self {
            padding_ms: 0,
            threshold_ms: 0,
            partition_secs: 0,
            split_secs: 0,
            include_all_events: false,
            override_regex: None,
            ignore_ranges: Vec::new(),
            ignore_chapters: Vec::new(),
            minimum_compression_ratio: default_minimum_compression_ratio(),
        }
    }
}

impl CondenseConfig {
    /// Engine options for one unit, with ignore ranges already resolved
    pub fn to_options(&self, ignore_ranges: Vec<IgnoreRange>) -> CondenseOptions {
        CondenseOptions {
            padding_ms: self.padding_ms,
            threshold_ms: self.threshold_ms,
            partition_size_ms: self.partition_secs.saturating_mul(1000),
            split_size_ms: self.split_secs.saturating_mul(1000),
            include_all_events: self.include_all_events,
            override_regex: self.override_regex.clone(),
            ignore_ranges,
        }
    }
}

/// What gets written and where
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    // @field: Output directory, beside the input when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    // @field: Condensed audio container/extension
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    // @field: Audio encoder, chosen by ffmpeg when unset
    #[serde(default)]
    pub audio_codec: Option<String>,

    // @field: Audio bitrate (kbps)
    #[serde(default)]
    pub audio_bitrate_kbps: Option<u32>,

    // @field: Downmix to one channel
    #[serde(default)]
    pub mono: bool,

    // @field: Also export condensed video
    #[serde(default)]
    pub condensed_video: bool,

    // @field: Write the retimed subtitle file
    #[serde(default = "default_true")]
    pub condensed_subtitles: bool,

    // @field: Replace outputs that already exist
    #[serde(default = "default_true")]
    pub overwrite_existing: bool,

    // @field: Plan and log only, write nothing
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            audio_extension: default_audio_extension(),
            audio_codec: None,
            audio_bitrate_kbps: None,
            mono: false,
            condensed_video: false,
            condensed_subtitles: true,
            overwrite_existing: true,
            dry_run: false,
        }
    }
}

impl OutputConfig {
    /// Configured bitrate, or 320 kbps for mp3
    pub fn effective_bitrate_kbps(&self) -> Option<u32> {
        self.audio_bitrate_kbps.or_else(|| {
            if self.audio_extension.eq_ignore_ascii_case("mp3") {
                Some(320)
            } else {
                None
            }
        })
    }

    /// Directory outputs for `input` go to
    pub fn output_dir_for(&self, input: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => input.parent().unwrap_or(Path::new(".")).to_path_buf(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_minimum_compression_ratio() -> f64 {
    0.2
}

fn default_audio_extension() -> String {
    "mp3".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Read a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write this configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Load `path`, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            return Ok((Self::from_file(path)?, false));
        }

        let config = Config::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if let Some(language) = &self.target_language {
            let _name = crate::language_utils::get_language_name(language)?;
        }

        let ratio = self.condense.minimum_compression_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(anyhow!("Minimum compression ratio must be between 0 and 1, got {}", ratio));
        }

        if let Some(pattern) = &self.condense.override_regex {
            Regex::new(pattern)
                .with_context(|| format!("Invalid subtitle filter regex: {}", pattern))?;
        }

        for spec in &self.condense.ignore_ranges {
            spec.validate()
                .with_context(|| format!("Invalid ignore range [{}, {}]", spec.0, spec.1))?;
        }

        if self.output.audio_extension.trim().is_empty() {
            return Err(anyhow!("Audio extension must not be empty"));
        }

        Ok(())
    }
}
