/*!
 * Common test utilities for the subcondense test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use subcondense::media::{Chapter, MediaInfo, StreamInfo, StreamKind};

/// Route library logs through env_logger; set RUST_LOG to see them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Five spoken lines and one song line, spread over the first minute
pub const DIALOGUE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
Where were you last night?

2
00:00:04,500 --> 00:00:07,000
At the station, waiting.

3
00:00:10,000 --> 00:00:12,000
♪ la la la ♪

4
00:00:20,000 --> 00:00:24,000
You could have called.

5
00:00:40,000 --> 00:00:45,000
My phone was dead.

6
00:00:50,000 --> 00:00:55,000
Of course it was.
";

/// Only sound descriptions and lyrics
pub const NON_DIALOGUE_SRT: &str = "1
00:00:01,000 --> 00:00:03,000
（ドアが閉まる）

2
00:00:05,000 --> 00:00:08,000
♪ opening theme ♪
";

/// A sign, a comment and two dialogue lines
pub const DIALOGUE_ASS: &str = "[Script Info]
Title: Test
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,{\\an8}Good morning.
Dialogue: 0,0:00:02.00,0:00:03.00,Sign,,0,0,0,,{\\pos(320,50)}CITY HALL
Comment: 0,0:00:05.00,0:00:06.00,Default,,0,0,0,,timing note
Dialogue: 0,0:00:08.00,0:00:10.00,Default,,0,0,0,,Good morning to you too.
";

/// Creates `<stem>.srt` beside a media file
pub fn create_sidecar(media: &Path, tag: Option<&str>, content: &str) -> Result<PathBuf> {
    let stem = media.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let name = match tag {
        Some(tag) => format!("{}.{}.srt", stem, tag),
        None => format!("{}.srt", stem),
    };
    let dir = media.parent().unwrap_or(Path::new("."));
    create_test_file(dir, &name, content)
}

pub fn stream(index: usize, kind: StreamKind, codec_name: &str, language: Option<&str>) -> StreamInfo {
    StreamInfo {
        index,
        kind,
        codec_name: codec_name.to_string(),
        language: language.map(str::to_string),
        title: None,
        duration_ms: None,
    }
}

/// A video with one Japanese audio track and the given extra streams
pub fn video_info(duration_ms: u64, extra_streams: Vec<StreamInfo>) -> MediaInfo {
    let mut streams = vec![
        stream(0, StreamKind::Video, "h264", None),
        stream(1, StreamKind::Audio, "aac", Some("jpn")),
    ];
    streams.extend(extra_streams);
    MediaInfo { duration_ms, streams, chapters: Vec::new() }
}

/// An audio-only file
pub fn audio_info(duration_ms: u64) -> MediaInfo {
    MediaInfo {
        duration_ms,
        streams: vec![stream(0, StreamKind::Audio, "mp3", None)],
        chapters: Vec::new(),
    }
}

pub fn chapter(start_ms: u64, end_ms: u64, title: &str) -> Chapter {
    Chapter { start_ms, end_ms, title: Some(title.to_string()) }
}
