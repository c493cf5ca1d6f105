/*!
 * Media toolkit: probing, subtitle extraction and condensed exports.
 *
 * This module contains the interface to the external transcoder:
 * - `ffmpeg`: ffprobe/ffmpeg subprocesses
 * - `mock`: in-memory implementation for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::condense::TimeRange;
use crate::errors::MediaError;

pub mod ffmpeg;
pub mod mock;

pub use ffmpeg::FfmpegToolkit;
pub use mock::{MockBehavior, MockMediaToolkit};

/// Kind of an elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Audio,
    Video,
    Subtitle,
    Other,
}

impl StreamKind {
    /// Map an ffprobe `codec_type`
    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "subtitle" => Self::Subtitle,
            _ => Self::Other,
        }
    }
}

/// One stream of a media file
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Absolute stream index, as used by `-map 0:<index>`
    pub index: usize,

    pub kind: StreamKind,

    pub codec_name: String,

    /// Language tag (ISO 639 code, usually 639-2)
    pub language: Option<String>,

    pub title: Option<String>,

    pub duration_ms: Option<u64>,
}

impl StreamInfo {
    /// Check if a subtitle codec is bitmap-based and cannot be read as text
    pub fn is_bitmap_subtitle(&self) -> bool {
        is_bitmap_codec(&self.codec_name)
    }

    /// Subtitle stream that can be extracted to SRT or ASS
    pub fn is_text_subtitle(&self) -> bool {
        self.kind == StreamKind::Subtitle && !self.is_bitmap_subtitle()
    }

    /// Subtitle extension that keeps the most information for this codec
    pub fn subtitle_extension(&self) -> &'static str {
        match self.codec_name.as_str() {
            "ass" | "ssa" => "ass",
            _ => "srt",
        }
    }
}

impl std::fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {:?} {} lang={} title={}",
            self.index,
            self.kind,
            self.codec_name,
            self.language.as_deref().unwrap_or("-"),
            self.title.as_deref().unwrap_or("-"),
        )
    }
}

/// A chapter marker
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub start_ms: u64,
    pub end_ms: u64,
    pub title: Option<String>,
}

/// Probe result for one media file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    /// Container duration, 0 if unknown
    pub duration_ms: u64,
    pub streams: Vec<StreamInfo>,
    pub chapters: Vec<Chapter>,
}

impl MediaInfo {
    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Audio)
    }

    pub fn text_subtitle_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.is_text_subtitle())
    }

    pub fn has_video(&self) -> bool {
        self.streams.iter().any(|s| s.kind == StreamKind::Video)
    }

    /// Length of the given stream, falling back to the container duration
    pub fn stream_duration_ms(&self, index: usize) -> u64 {
        self.streams
            .iter()
            .find(|s| s.index == index)
            .and_then(|s| s.duration_ms)
            .filter(|&ms| ms > 0)
            .unwrap_or(self.duration_ms)
    }
}

/// Condensed audio export of one output bucket
#[derive(Debug, Clone, PartialEq)]
pub struct AudioExportRequest {
    pub input: PathBuf,
    pub stream_index: usize,
    /// Ranges to cut, concatenated in order
    pub segments: Vec<TimeRange>,
    pub output: PathBuf,
    /// Encoder name, `None` lets ffmpeg pick from the extension
    pub codec: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub mono: bool,
}

/// Condensed video export of one output bucket
#[derive(Debug, Clone, PartialEq)]
pub struct VideoExportRequest {
    pub input: PathBuf,
    pub audio_stream_index: usize,
    pub segments: Vec<TimeRange>,
    pub output: PathBuf,
    /// Condensed subtitle file to mux in
    pub subtitle: Option<PathBuf>,
}

/// Interface to the external transcoder
#[async_trait]
pub trait MediaToolkit: Send + Sync + Debug {
    /// Read duration, streams and chapters
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;

    /// Write one embedded subtitle stream to `output`; the format follows its extension
    async fn extract_subtitle(&self, path: &Path, stream_index: usize, output: &Path) -> Result<(), MediaError>;

    /// Cut and concatenate audio segments into one file
    async fn export_condensed_audio(&self, request: &AudioExportRequest) -> Result<(), MediaError>;

    /// Cut and concatenate video and audio segments into one file
    async fn export_condensed_video(&self, request: &VideoExportRequest) -> Result<(), MediaError>;
}

/// Check if a subtitle codec is bitmap-based (cannot be converted to text)
pub fn is_bitmap_codec(codec_name: &str) -> bool {
    matches!(
        codec_name,
        "hdmv_pgs_subtitle" | "dvd_subtitle" | "dvb_subtitle" | "xsub"
    )
}
