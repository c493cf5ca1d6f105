use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::condense::{self, CondensedTimeline, IgnoreRange, TimeRange};
use crate::errors::MediaError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::media::{
    AudioExportRequest, Chapter, FfmpegToolkit, MediaInfo, MediaToolkit, StreamInfo, VideoExportRequest,
};
use crate::subtitle_processor::SubtitleCollection;

// @module: Application controller for condensing media units

/// Where a subtitle candidate comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SubtitleSource {
    /// A subtitle file on disk
    File(PathBuf),
    /// A text subtitle stream inside the media file
    Embedded(StreamInfo),
}

impl std::fmt::Display for SubtitleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Embedded(stream) => write!(
                f,
                "embedded stream #{} ({})",
                stream.index,
                stream.language.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

/// What was produced for one unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    /// Accepted subtitle source
    pub source: SubtitleSource,
    /// Number of merged segments
    pub segments: usize,
    /// Condensed length over audio length
    pub compression_ratio: f64,
    /// Files written, or that would be written in a dry run
    pub outputs: Vec<PathBuf>,
    /// Existing files left alone
    pub skipped: Vec<PathBuf>,
}

/// Result of processing one unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Condensed(UnitReport),
    /// No candidate subtitle gave enough dialogue; nothing was written
    Insufficient,
}

/// Counts for a directory run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub condensed: usize,
    pub insufficient: usize,
    pub failed: usize,
}

// One (partition, split) output bucket
struct Bucket {
    suffix: Option<String>,
    // Index of the bucket's first group in the timeline
    first_group: usize,
    ranges: Vec<TimeRange>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Probing, extraction and export backend
    toolkit: Arc<dyn MediaToolkit>,
}

impl Controller {
    // @method: Create a controller backed by ffmpeg
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self::with_toolkit(config, Arc::new(FfmpegToolkit::new())))
    }

    // @method: Create a controller with a specific media backend
    pub fn with_toolkit(config: Config, toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self { config, toolkit }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Probe a media file for the `streams` command
    pub async fn describe(&self, input: &Path) -> Result<MediaInfo> {
        self.toolkit
            .probe(input)
            .await
            .with_context(|| format!("Failed to probe {:?}", input))
    }

    /// Condense one media file, trying `extra_subtitles` before its sidecars
    pub async fn run(&self, input: &Path, extra_subtitles: &[PathBuf]) -> Result<UnitOutcome> {
        let start_time = Instant::now();

        if !input.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input));
        }
        let file_type = FileManager::detect_file_type(input)?;
        if !file_type.is_media() {
            return Err(anyhow!("Not a video or audio file: {:?}", input));
        }

        info!("Processing {:?}", input);
        let info = self.describe(input).await?;

        let audio = self.choose_audio_stream(&info)
            .ok_or_else(|| MediaError::NoAudioStream(input.to_path_buf()))?
            .clone();
        let audio_length_ms = info.stream_duration_ms(audio.index);
        debug!("Using audio stream {} ({} ms)", audio, audio_length_ms);

        let ignore_ranges = self.resolve_ignore_ranges(&info.chapters, audio_length_ms)?;
        let options = self.config.condense.to_options(ignore_ranges);

        let candidates = self.subtitle_candidates(input, &info, extra_subtitles)?;
        if candidates.is_empty() {
            warn!("No subtitle candidates for {:?}", input);
            return Ok(UnitOutcome::Insufficient);
        }

        // Embedded tracks are extracted here and removed with the unit
        let scratch = tempfile::Builder::new()
            .prefix("subcondense-")
            .tempdir()
            .context("Failed to create temporary directory")?;

        for source in candidates {
            let collection = match self.load_candidate(input, &source, scratch.path()).await {
                Ok(collection) => collection,
                Err(e) => {
                    warn!("Skipping subtitle {}: {:#}", source, e);
                    continue;
                }
            };

            let timeline = match condense::build_timeline(collection.entries.clone(), &options) {
                Ok(timeline) => timeline,
                Err(e) if e.is_insufficient() => {
                    warn!("Skipping subtitle {}: {}", source, e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let ratio = timeline.compression_ratio(audio_length_ms);
            if audio_length_ms == 0 {
                warn!("Audio length of {:?} is unknown, accepting {} without a ratio check", input, source);
            } else if ratio < self.config.condense.minimum_compression_ratio {
                warn!(
                    "Skipping subtitle {}: compression ratio {:.1}% is below the minimum {:.1}%",
                    source,
                    ratio * 100.0,
                    self.config.condense.minimum_compression_ratio * 100.0
                );
                continue;
            }

            info!(
                "Will condense {} of source audio to {} ({:.1}% compression ratio) using {}",
                format_ms(audio_length_ms),
                format_ms(timeline.condensed_duration_ms()),
                ratio * 100.0,
                source
            );

            let (outputs, skipped) = self
                .export(input, &info, &audio, &collection, &timeline, scratch.path())
                .await?;

            info!("Finished {:?} in {}", input, Self::format_duration(start_time.elapsed()));
            return Ok(UnitOutcome::Condensed(UnitReport {
                source,
                segments: timeline.groups.len(),
                compression_ratio: ratio,
                outputs,
                skipped,
            }));
        }

        warn!("No usable subtitle for {:?}, nothing condensed", input);
        Ok(UnitOutcome::Insufficient)
    }

    /// Run every media file under `input_dir`; a failed unit does not stop the batch
    pub async fn run_folder(&self, input_dir: &Path) -> Result<BatchSummary> {
        let start_time = Instant::now();

        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let media_files = FileManager::find_media_files(input_dir)?;
        if media_files.is_empty() {
            return Err(anyhow!("No video or audio files found in directory: {:?}", input_dir));
        }

        let folder_pb = ProgressBar::new(media_files.len() as u64);
        folder_pb.set_style(Self::bar_style("files"));
        folder_pb.set_message("Processing files");

        let mut summary = BatchSummary::default();
        for media_file in &media_files {
            let file_name = media_file.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.run(media_file, &[]).await {
                Ok(UnitOutcome::Condensed(_)) => summary.condensed += 1,
                Ok(UnitOutcome::Insufficient) => summary.insufficient += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed in {}: {} condensed, {} insufficient, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.condensed,
            summary.insufficient,
            summary.failed
        );

        Ok(summary)
    }

    /// Preferred-language audio stream, else the first one
    pub fn choose_audio_stream<'a>(&self, info: &'a MediaInfo) -> Option<&'a StreamInfo> {
        if let Some(index) = self.config.audio_stream_index {
            match info.audio_streams().find(|s| s.index == index) {
                Some(stream) => return Some(stream),
                None => warn!("No audio stream with index {}, choosing by language", index),
            }
        }

        let preferred = self.config.target_language.as_deref();
        info.audio_streams()
            .find(|s| language_utils::matches_preferred(s.language.as_deref(), preferred))
            .or_else(|| info.audio_streams().next())
    }

    /// Configured ranges plus ignored chapters, resolved against the audio length
    pub fn resolve_ignore_ranges(&self, chapters: &[Chapter], audio_length_ms: u64) -> Result<Vec<IgnoreRange>> {
        let mut ranges = condense::ignore_ranges::resolve_specs(&self.config.condense.ignore_ranges, audio_length_ms)
            .context("Invalid ignore range")?;
        ranges.extend(chapter_ranges(chapters, &self.config.condense.ignore_chapters));

        for range in &ranges {
            debug!("Ignoring {}", range);
        }
        Ok(ranges)
    }

    /// Subtitle sources in the order they are tried
    pub fn subtitle_candidates(&self, input: &Path, info: &MediaInfo, extra: &[PathBuf]) -> Result<Vec<SubtitleSource>> {
        let preferred = self.config.target_language.as_deref();
        let mut candidates: Vec<SubtitleSource> = extra.iter().cloned().map(SubtitleSource::File).collect();

        let mut sidecars = FileManager::find_sidecar_subtitles(input)?;
        sidecars.retain(|path| !extra.contains(path));
        // Stable sort keeps the alphabetical order within each group
        sidecars.sort_by_key(|path| {
            let tag = FileManager::sidecar_tag(input, path).unwrap_or_default();
            !language_utils::matches_preferred(Some(tag.as_str()), preferred)
        });
        candidates.extend(sidecars.into_iter().map(SubtitleSource::File));

        let mut embedded: Vec<StreamInfo> = info.text_subtitle_streams().cloned().collect();
        embedded.sort_by_key(|s| !language_utils::matches_preferred(s.language.as_deref(), preferred));
        if let Some(index) = self.config.subtitle_stream_index {
            match embedded.iter().position(|s| s.index == index) {
                Some(pos) => embedded[..=pos].rotate_right(1),
                None => warn!("No text subtitle stream with index {}", index),
            }
        }
        candidates.extend(embedded.into_iter().map(SubtitleSource::Embedded));

        let bitmap = info.streams.iter().filter(|s| s.is_bitmap_subtitle()).count();
        if bitmap > 0 {
            debug!("Ignoring {} bitmap subtitle stream(s)", bitmap);
        }

        Ok(candidates)
    }

    async fn load_candidate(&self, input: &Path, source: &SubtitleSource, scratch: &Path) -> Result<SubtitleCollection> {
        match source {
            SubtitleSource::File(path) => Ok(SubtitleCollection::load(path)?),
            SubtitleSource::Embedded(stream) => {
                let extracted = scratch.join(format!("stream_{}.{}", stream.index, stream.subtitle_extension()));
                self.toolkit.extract_subtitle(input, stream.index, &extracted).await?;
                Ok(SubtitleCollection::load(&extracted)?)
            }
        }
    }

    // Write subtitles, audio and video for an accepted timeline
    async fn export(
        &self,
        input: &Path,
        info: &MediaInfo,
        audio: &StreamInfo,
        collection: &SubtitleCollection,
        timeline: &CondensedTimeline,
        scratch: &Path,
    ) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let output = &self.config.output;
        let output_dir = output.output_dir_for(input);
        let dry_run = output.dry_run;
        if !dry_run {
            FileManager::ensure_dir(&output_dir)?;
        }

        let mut written = Vec::new();
        let mut skipped = Vec::new();

        if output.condensed_subtitles {
            let path = FileManager::condensed_output_path(input, &output_dir, None, collection.format.extension());
            if self.claim_output(&path, &mut written, &mut skipped) && !dry_run {
                collection.with_entries(timeline.events.clone()).write_to_file(&path)?;
            }
        }

        let buckets = Self::buckets(timeline);
        let with_video = output.condensed_video && info.has_video();
        if output.condensed_video && !with_video {
            warn!("{:?} has no video stream, skipping condensed video", input);
        }

        let jobs = buckets.len() as u64 * if with_video { 2 } else { 1 };
        let progress_bar = if dry_run { ProgressBar::hidden() } else { ProgressBar::new(jobs) };
        progress_bar.set_style(Self::bar_style("exports"));

        for bucket in &buckets {
            let suffix = bucket.suffix.as_deref();

            let audio_path = FileManager::condensed_output_path(input, &output_dir, suffix, &output.audio_extension);
            if self.claim_output(&audio_path, &mut written, &mut skipped) && !dry_run {
                progress_bar.set_message(format!("{}", audio_path.display()));
                let request = AudioExportRequest {
                    input: input.to_path_buf(),
                    stream_index: audio.index,
                    segments: bucket.ranges.clone(),
                    output: audio_path.clone(),
                    codec: output.audio_codec.clone(),
                    bitrate_kbps: output.effective_bitrate_kbps(),
                    mono: output.mono,
                };
                self.toolkit.export_condensed_audio(&request).await
                    .with_context(|| format!("Failed to export condensed audio {:?}", audio_path))?;
            }
            progress_bar.inc(1);

            if !with_video {
                continue;
            }

            let video_path = FileManager::condensed_output_path(input, &output_dir, suffix, "mkv");
            if self.claim_output(&video_path, &mut written, &mut skipped) && !dry_run {
                progress_bar.set_message(format!("{}", video_path.display()));
                let subtitle = if output.condensed_subtitles {
                    Some(Self::write_bucket_subtitles(collection, timeline, bucket, scratch)?)
                } else {
                    None
                };
                let request = VideoExportRequest {
                    input: input.to_path_buf(),
                    audio_stream_index: audio.index,
                    segments: bucket.ranges.clone(),
                    output: video_path.clone(),
                    subtitle,
                };
                self.toolkit.export_condensed_video(&request).await
                    .with_context(|| format!("Failed to export condensed video {:?}", video_path))?;
            }
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        Ok((written, skipped))
    }

    // Decide whether `path` gets written; records it in one of the two lists
    fn claim_output(&self, path: &Path, written: &mut Vec<PathBuf>, skipped: &mut Vec<PathBuf>) -> bool {
        if path.exists() && !self.config.output.overwrite_existing {
            warn!("Skipping {:?}, it already exists (overwriting is disabled)", path);
            skipped.push(path.to_path_buf());
            return false;
        }

        if self.config.output.dry_run {
            info!("Would write {:?}", path);
        }
        written.push(path.to_path_buf());
        true
    }

    // Flatten partitions into named buckets; a lone bucket gets no suffix
    fn buckets(timeline: &CondensedTimeline) -> Vec<Bucket> {
        let single = timeline.bucket_count() == 1;
        let mut buckets = Vec::new();
        let mut first_group = 0;

        for (p, partition) in timeline.partitions.iter().enumerate() {
            for (s, split) in partition.iter().enumerate() {
                if split.is_empty() {
                    continue;
                }
                buckets.push(Bucket {
                    suffix: if single { None } else { Some(FileManager::bucket_suffix(p, s)) },
                    first_group,
                    ranges: split.clone(),
                });
                first_group += split.len();
            }
        }
        buckets
    }

    // Subtitles retimed for one bucket only, for muxing into its video
    fn write_bucket_subtitles(
        collection: &SubtitleCollection,
        timeline: &CondensedTimeline,
        bucket: &Bucket,
        scratch: &Path,
    ) -> Result<PathBuf> {
        let groups = &timeline.groups[bucket.first_group..bucket.first_group + bucket.ranges.len()];
        let events = condense::condense_groups(groups);

        let name = format!(
            "bucket_{}.{}",
            bucket.suffix.as_deref().unwrap_or("all"),
            collection.format.extension()
        );
        let path = scratch.join(name);
        collection.with_entries(events).write_to_file(&path)?;
        Ok(path)
    }

    fn bar_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
                unit
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Chapters whose title matches one of `titles` (trimmed, case-insensitive)
pub fn chapter_ranges(chapters: &[Chapter], titles: &[String]) -> Vec<IgnoreRange> {
    if titles.is_empty() {
        return Vec::new();
    }

    chapters
        .iter()
        .filter(|chapter| {
            chapter.title.as_deref().is_some_and(|title| {
                titles.iter().any(|t| t.trim().eq_ignore_ascii_case(title.trim()))
            })
        })
        .filter_map(|chapter| match IgnoreRange::new(chapter.start_ms, chapter.end_ms) {
            Ok(range) => Some(range),
            Err(e) => {
                warn!("Ignoring chapter {:?}: {}", chapter.title, e);
                None
            }
        })
        .collect()
}

// H:MM:SS, as used in the compression summary
fn format_ms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}:{:02}", total_seconds / 3600, (total_seconds % 3600) / 60, total_seconds % 60)
}
