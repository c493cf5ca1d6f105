use async_trait::async_trait;
use log::{debug, error};
use serde_json::{from_str, Value};
use std::io::Write;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::condense::TimeRange;
use crate::errors::MediaError;
use crate::media::{
    AudioExportRequest, Chapter, MediaInfo, MediaToolkit, StreamInfo, StreamKind, VideoExportRequest,
};

// @module: ffprobe/ffmpeg subprocess implementation of the media toolkit

/// Media toolkit backed by the ffmpeg command line tools
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    // @field: ffmpeg executable
    ffmpeg: String,

    // @field: ffprobe executable
    ffprobe: String,

    // @field: Limit for probing
    probe_timeout: Duration,

    // @field: Limit for subtitle extraction
    extract_timeout: Duration,

    // @field: Limit for one condensed export
    export_timeout: Duration,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            probe_timeout: Duration::from_secs(60),
            extract_timeout: Duration::from_secs(120),
            export_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a tool to completion, killing it if it outlives `timeout`
    async fn run_tool(&self, program: &str, args: &[String], timeout: Duration) -> Result<Output, MediaError> {
        debug!("Running {} {}", program, args.join(" "));

        // Add timeout to prevent hanging on problematic files
        let future = Command::new(program).args(args).kill_on_drop(true).output();

        let output = tokio::select! {
            result = future => {
                result.map_err(|e| MediaError::Spawn { tool: program.to_string(), message: e.to_string() })?
            },
            _ = tokio::time::sleep(timeout) => {
                return Err(MediaError::Timeout { tool: program.to_string(), secs: timeout.as_secs() });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("{} failed: {}", program, filtered);
            return Err(MediaError::ToolFailed { tool: program.to_string(), message: filtered });
        }

        Ok(output)
    }

    // Writes the filter graph to a temp file that must outlive the ffmpeg run
    fn write_filter_script(graph: &str) -> Result<tempfile::NamedTempFile, MediaError> {
        let mut script = tempfile::Builder::new()
            .prefix("subcondense-filter-")
            .suffix(".txt")
            .tempfile()?;
        script.write_all(graph.as_bytes())?;
        script.flush()?;
        Ok(script)
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        let args = vec![
            "-v".to_string(), "quiet".to_string(),
            "-print_format".to_string(), "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            "-show_chapters".to_string(),
            path.to_string_lossy().into_owned(),
        ];

        let output = self.run_tool(&self.ffprobe, &args, self.probe_timeout).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&stdout)
    }

    async fn extract_subtitle(&self, path: &Path, stream_index: usize, output: &Path) -> Result<(), MediaError> {
        let codec = match output.extension().and_then(|e| e.to_str()) {
            Some("ass") | Some("ssa") => "ass",
            _ => "srt",
        };

        let args = vec![
            "-y".to_string(),
            "-i".to_string(), path.to_string_lossy().into_owned(),
            "-map".to_string(), format!("0:{}", stream_index),
            "-c:s".to_string(), codec.to_string(),
            output.to_string_lossy().into_owned(),
        ];

        self.run_tool(&self.ffmpeg, &args, self.extract_timeout).await?;

        let size = tokio::fs::metadata(output).await?.len();
        if size == 0 {
            return Err(MediaError::ToolFailed {
                tool: self.ffmpeg.clone(),
                message: format!("extracted file is empty, no subtitles in stream {}", stream_index),
            });
        }
        Ok(())
    }

    async fn export_condensed_audio(&self, request: &AudioExportRequest) -> Result<(), MediaError> {
        if request.segments.is_empty() {
            return Err(MediaError::NothingToExport(request.output.clone()));
        }

        let script = Self::write_filter_script(&audio_filter_graph(request.stream_index, &request.segments))?;

        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(), request.input.to_string_lossy().into_owned(),
            "-filter_complex_script".to_string(), script.path().to_string_lossy().into_owned(),
            "-map".to_string(), "[outa]".to_string(),
        ];
        if let Some(codec) = &request.codec {
            args.extend(["-c:a".to_string(), codec.clone()]);
        }
        if let Some(bitrate) = request.bitrate_kbps {
            args.extend(["-b:a".to_string(), format!("{}k", bitrate)]);
        }
        if request.mono {
            args.extend(["-ac".to_string(), "1".to_string()]);
        }
        args.push(request.output.to_string_lossy().into_owned());

        self.run_tool(&self.ffmpeg, &args, self.export_timeout).await?;
        Ok(())
    }

    async fn export_condensed_video(&self, request: &VideoExportRequest) -> Result<(), MediaError> {
        if request.segments.is_empty() {
            return Err(MediaError::NothingToExport(request.output.clone()));
        }

        let script = Self::write_filter_script(&video_filter_graph(request.audio_stream_index, &request.segments))?;

        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(), request.input.to_string_lossy().into_owned(),
        ];
        if let Some(subtitle) = &request.subtitle {
            args.extend(["-i".to_string(), subtitle.to_string_lossy().into_owned()]);
        }
        args.extend([
            "-filter_complex_script".to_string(), script.path().to_string_lossy().into_owned(),
            "-map".to_string(), "[outv]".to_string(),
            "-map".to_string(), "[outa]".to_string(),
        ]);
        if request.subtitle.is_some() {
            args.extend([
                "-map".to_string(), "1:0".to_string(),
                "-c:s".to_string(), "copy".to_string(),
            ]);
        }
        args.push(request.output.to_string_lossy().into_owned());

        self.run_tool(&self.ffmpeg, &args, self.export_timeout).await?;
        Ok(())
    }
}

/// `[0:<stream>]` trimmed once per segment and concatenated into `[outa]`
pub fn audio_filter_graph(stream_index: usize, segments: &[TimeRange]) -> String {
    let mut graph = String::new();
    for (i, segment) in segments.iter().enumerate() {
        graph.push_str(&format!(
            "[0:{}]atrim=start={}:end={},asetpts=PTS-STARTPTS[a{}];\n",
            stream_index,
            ms_to_seconds(segment.start_ms),
            ms_to_seconds(segment.end_ms),
            i
        ));
    }
    for i in 0..segments.len() {
        graph.push_str(&format!("[a{}]", i));
    }
    graph.push_str(&format!("concat=n={}:v=0:a=1[outa]", segments.len()));
    graph
}

/// First video stream and the given audio stream, trimmed in pairs and concatenated into `[outv][outa]`
pub fn video_filter_graph(audio_stream_index: usize, segments: &[TimeRange]) -> String {
    let mut graph = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let start = ms_to_seconds(segment.start_ms);
        let end = ms_to_seconds(segment.end_ms);
        graph.push_str(&format!(
            "[0:v:0]trim=start={start}:end={end},setpts=PTS-STARTPTS[v{i}];\n\
             [0:{audio_stream_index}]atrim=start={start}:end={end},asetpts=PTS-STARTPTS[a{i}];\n"
        ));
    }
    for i in 0..segments.len() {
        graph.push_str(&format!("[v{i}][a{i}]"));
    }
    graph.push_str(&format!("concat=n={}:v=1:a=1[outv][outa]", segments.len()));
    graph
}

// Seconds with millisecond precision, as ffmpeg filters expect
fn ms_to_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Parse seconds (`"83.400000"`) or a clock value (`"00:01:23.400000000"`) into milliseconds
fn parse_seconds_ms(value: &str) -> Option<u64> {
    let value = value.trim();
    let seconds = if value.contains(':') {
        value.split(':').try_fold(0.0f64, |total, part| {
            part.parse::<f64>().ok().map(|v| total * 60.0 + v)
        })?
    } else {
        value.parse::<f64>().ok()?
    };

    if seconds.is_finite() && seconds >= 0.0 {
        Some((seconds * 1000.0).round() as u64)
    } else {
        None
    }
}

fn tag<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    let tags = value.get("tags")?;
    tags.get(key)
        .or_else(|| tags.get(key.to_uppercase()))
        .and_then(|v| v.as_str())
}

/// Turn `ffprobe -print_format json` output into a `MediaInfo`
pub fn parse_probe_output(stdout: &str) -> Result<MediaInfo, MediaError> {
    if stdout.trim().is_empty() {
        return Err(MediaError::InvalidProbeOutput("ffprobe returned empty output".to_string()));
    }

    let json: Value = from_str(stdout)
        .map_err(|e| MediaError::InvalidProbeOutput(format!("Failed to parse ffprobe JSON output: {}", e)))?;

    let duration_ms = json.get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(parse_seconds_ms)
        .unwrap_or(0);

    let mut streams = Vec::new();
    if let Some(entries) = json.get("streams").and_then(|s| s.as_array()) {
        for stream in entries {
            let index = stream.get("index")
                .and_then(|v| v.as_u64())
                .map(|v| v as usize)
                .unwrap_or(0);

            let kind = stream.get("codec_type")
                .and_then(|v| v.as_str())
                .map(StreamKind::from_codec_type)
                .unwrap_or(StreamKind::Other);

            let codec_name = stream.get("codec_name")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            // Matroska keeps stream lengths in a DURATION tag
            let duration_ms = stream.get("duration")
                .and_then(|d| d.as_str())
                .and_then(parse_seconds_ms)
                .or_else(|| tag(stream, "duration").and_then(parse_seconds_ms));

            streams.push(StreamInfo {
                index,
                kind,
                codec_name: codec_name.to_string(),
                language: tag(stream, "language").map(|s| s.to_string()),
                title: tag(stream, "title").map(|s| s.to_string()),
                duration_ms,
            });
        }
    }

    let mut chapters = Vec::new();
    if let Some(entries) = json.get("chapters").and_then(|c| c.as_array()) {
        for chapter in entries {
            let start = chapter.get("start_time").and_then(|v| v.as_str()).and_then(parse_seconds_ms);
            let end = chapter.get("end_time").and_then(|v| v.as_str()).and_then(parse_seconds_ms);
            if let (Some(start_ms), Some(end_ms)) = (start, end) {
                chapters.push(Chapter {
                    start_ms,
                    end_ms,
                    title: tag(chapter, "title").map(|s| s.to_string()),
                });
            }
        }
    }

    Ok(MediaInfo { duration_ms, streams, chapters })
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "title",
        "BPS",
        "DURATION",
        "NUMBER_OF",
        "_STATISTICS",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
