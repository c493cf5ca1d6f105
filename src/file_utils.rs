use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @const: Marker inserted between the stem and the extension of every output
pub const CONDENSED_MARKER: &str = "condensed";

const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa"];

// Common container extensions supported by ffmpeg
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v",
    "mpg", "mpeg", "ogv", "ts", "mts", "m2ts",
];

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "ogg", "opus", "wav", "wma", "mka",
];

/// Enum representing different file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Subtitle file (SRT/ASS/SSA)
    Subtitle,
    /// Video container
    Video,
    /// Audio-only file
    Audio,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Video and audio files are condensed, subtitles ride along with them
    pub fn is_media(self) -> bool {
        matches!(self, FileType::Video | FileType::Audio)
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Classify a path by its extension
    pub fn file_type_of<P: AsRef<Path>>(path: P) -> FileType {
        let Some(ext) = path.as_ref().extension() else {
            return FileType::Unknown;
        };
        let ext = ext.to_string_lossy().to_lowercase();

        if SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Subtitle
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Video
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Audio
        } else {
            FileType::Unknown
        }
    }

    /// Detect the type of an existing file
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }
        Ok(Self::file_type_of(path))
    }

    /// Whether a file is one of our own outputs
    pub fn is_condensed_output<P: AsRef<Path>>(path: P) -> bool {
        let Some(name) = path.as_ref().file_name() else {
            return false;
        };
        let marker = format!(".{}.", CONDENSED_MARKER);
        name.to_string_lossy().contains(&marker)
    }

    /// Every media file under `dir`, sorted, skipping previous outputs
    pub fn find_media_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(anyhow!("Not a directory: {:?}", dir));
        }

        let mut result: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| Self::file_type_of(path).is_media() && !Self::is_condensed_output(path))
            .collect();

        result.sort();
        Ok(result)
    }

    /// Subtitle files next to `media` whose name is the media stem, optionally
    /// followed by `.<tag>` (e.g. `movie.srt`, `movie.ja.ass`)
    pub fn find_sidecar_subtitles<P: AsRef<Path>>(media: P) -> Result<Vec<PathBuf>> {
        let media = media.as_ref();
        let dir = match media.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut result = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file()
                && Self::file_type_of(&path) == FileType::Subtitle
                && !Self::is_condensed_output(&path)
                && Self::sidecar_tag(media, &path).is_some()
            {
                result.push(path);
            }
        }

        result.sort();
        Ok(result)
    }

    /// For a sidecar of `media`: `Some("")` for `movie.srt`, `Some("ja")` for
    /// `movie.ja.srt`, `None` when `subtitle` does not belong to `media`
    pub fn sidecar_tag(media: &Path, subtitle: &Path) -> Option<String> {
        let media_stem = media.file_stem()?.to_string_lossy();
        let sub_stem = subtitle.file_stem()?.to_string_lossy();

        if sub_stem == media_stem {
            return Some(String::new());
        }
        sub_stem
            .strip_prefix(&*media_stem)
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
    }

    // @generates: `<out_dir>/<stem>.condensed[.<suffix>].<extension>`
    pub fn condensed_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        suffix: Option<&str>,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(CONDENSED_MARKER);
        if let Some(suffix) = suffix {
            output_filename.push('.');
            output_filename.push_str(suffix);
        }
        output_filename.push('.');
        output_filename.push_str(extension.trim_start_matches('.'));

        output_dir.as_ref().join(output_filename)
    }

    /// Suffix naming one (partition, split) bucket, both counted from 1
    pub fn bucket_suffix(partition: usize, split: usize) -> String {
        format!("p{:02}s{:02}", partition + 1, split + 1)
    }
}
