/*!
 * Mock media toolkit for testing.
 *
 * Serves a fixed probe result, writes canned subtitle content on extraction,
 * and records every export request instead of running ffmpeg. Exports write a
 * small placeholder file so output-skipping logic can be exercised.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::MediaError;
use crate::media::{AudioExportRequest, MediaInfo, MediaToolkit, VideoExportRequest};

/// Behavior mode for the mock toolkit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Every call succeeds
    Working,
    /// Probing succeeds, every export fails
    FailingExports,
    /// Every call fails as if ffmpeg were missing
    Missing,
}

/// In-memory media toolkit
#[derive(Debug)]
pub struct MockMediaToolkit {
    behavior: MockBehavior,
    info: MediaInfo,
    embedded_subtitles: HashMap<usize, String>,
    audio_exports: Mutex<Vec<AudioExportRequest>>,
    video_exports: Mutex<Vec<VideoExportRequest>>,
    probe_count: Arc<AtomicUsize>,
}

impl MockMediaToolkit {
    pub fn new(behavior: MockBehavior, info: MediaInfo) -> Self {
        Self {
            behavior,
            info,
            embedded_subtitles: HashMap::new(),
            audio_exports: Mutex::new(Vec::new()),
            video_exports: Mutex::new(Vec::new()),
            probe_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A toolkit that succeeds and reports `info` for every file
    pub fn working(info: MediaInfo) -> Self {
        Self::new(MockBehavior::Working, info)
    }

    /// Content written when subtitle stream `index` is extracted
    pub fn with_embedded_subtitle(mut self, index: usize, content: impl Into<String>) -> Self {
        self.embedded_subtitles.insert(index, content.into());
        self
    }

    pub fn audio_exports(&self) -> Vec<AudioExportRequest> {
        self.audio_exports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn video_exports(&self) -> Vec<VideoExportRequest> {
        self.video_exports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    fn missing() -> MediaError {
        MediaError::Spawn { tool: "ffmpeg".to_string(), message: "No such file or directory".to_string() }
    }

    fn check_export(&self) -> Result<(), MediaError> {
        match self.behavior {
            MockBehavior::Working => Ok(()),
            MockBehavior::FailingExports => Err(MediaError::ToolFailed {
                tool: "ffmpeg".to_string(),
                message: "simulated export failure".to_string(),
            }),
            MockBehavior::Missing => Err(Self::missing()),
        }
    }
}

#[async_trait]
impl MediaToolkit for MockMediaToolkit {
    async fn probe(&self, _path: &Path) -> Result<MediaInfo, MediaError> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        if self.behavior == MockBehavior::Missing {
            return Err(Self::missing());
        }
        Ok(self.info.clone())
    }

    async fn extract_subtitle(&self, _path: &Path, stream_index: usize, output: &Path) -> Result<(), MediaError> {
        if self.behavior == MockBehavior::Missing {
            return Err(Self::missing());
        }
        let content = self.embedded_subtitles.get(&stream_index).ok_or_else(|| MediaError::ToolFailed {
            tool: "ffmpeg".to_string(),
            message: format!("Stream map '0:{}' matches no streams", stream_index),
        })?;
        tokio::fs::write(output, content).await?;
        Ok(())
    }

    async fn export_condensed_audio(&self, request: &AudioExportRequest) -> Result<(), MediaError> {
        self.check_export()?;
        if request.segments.is_empty() {
            return Err(MediaError::NothingToExport(request.output.clone()));
        }
        tokio::fs::write(&request.output, b"condensed audio").await?;
        self.audio_exports.lock().unwrap_or_else(|e| e.into_inner()).push(request.clone());
        Ok(())
    }

    async fn export_condensed_video(&self, request: &VideoExportRequest) -> Result<(), MediaError> {
        self.check_export()?;
        if request.segments.is_empty() {
            return Err(MediaError::NothingToExport(request.output.clone()));
        }
        tokio::fs::write(&request.output, b"condensed video").await?;
        self.video_exports.lock().unwrap_or_else(|e| e.into_inner()).push(request.clone());
        Ok(())
    }
}
