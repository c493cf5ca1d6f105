/*!
 * Error types for the subcondense application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a condensed timeline
#[derive(Error, Debug)]
pub enum CondenseError {
    /// An ignore range whose end does not come after its start
    #[error("Invalid ignore range: end {end_ms}ms must be after start {start_ms}ms")]
    InvalidIgnoreRange {
        /// Resolved start in milliseconds
        start_ms: u64,
        /// Resolved end in milliseconds
        end_ms: u64,
    },

    /// A time bound that could not be parsed
    #[error("Invalid time specification: '{0}'")]
    InvalidTimeSpec(String),

    /// The user supplied filter regex does not compile
    #[error("Invalid subtitle filter regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// The subtitle source produced no events at all
    #[error("No subtitle events to condense")]
    NoEvents,

    /// Every event was filtered out or ignored
    #[error("No dialogue left after filtering {total} subtitle events")]
    InsufficientDialogue {
        /// Number of events that were examined
        total: usize,
    },
}

impl CondenseError {
    /// Errors caused by user settings; fatal to the current output unit
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIgnoreRange { .. } | Self::InvalidTimeSpec(_) | Self::InvalidRegex(_)
        )
    }

    /// Errors meaning "this subtitle source is not good enough", so another one may be tried
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::NoEvents | Self::InsufficientDialogue { .. })
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// Reading or writing the subtitle file failed
    #[error("Subtitle I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file extension and content match no supported format
    #[error("Unsupported subtitle format: {0}")]
    UnsupportedFormat(String),

    /// The content could not be parsed
    #[error("Failed to parse subtitle content: {0}")]
    Parse(String),

    /// Parsing succeeded but yielded no usable entries
    #[error("No valid subtitle entries found in {0}")]
    Empty(String),
}

/// Errors reported by the media toolkit (ffprobe/ffmpeg)
#[derive(Error, Debug)]
pub enum MediaError {
    /// The tool could not be started at all
    #[error("Failed to execute {tool}: {message}")]
    Spawn {
        /// Executable name
        tool: String,
        /// OS error text
        message: String,
    },

    /// The tool ran and exited unsuccessfully
    #[error("{tool} failed: {message}")]
    ToolFailed {
        /// Executable name
        tool: String,
        /// Filtered stderr
        message: String,
    },

    /// The tool did not finish in time
    #[error("{tool} timed out after {secs} seconds")]
    Timeout {
        /// Executable name
        tool: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// ffprobe output could not be understood
    #[error("Unexpected ffprobe output: {0}")]
    InvalidProbeOutput(String),

    /// The input has no audio stream to condense
    #[error("No audio stream found in {0}")]
    NoAudioStream(PathBuf),

    /// An export was requested with an empty segment list
    #[error("No segments to export for {0}")]
    NothingToExport(PathBuf),

    /// Temporary files for the filter graph could not be written
    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from the media toolkit
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Error from timeline condensation
    #[error("Condense error: {0}")]
    Condense(#[from] CondenseError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
