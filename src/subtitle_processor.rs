use std::fs;
use std::fmt;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use log::{warn, debug};
use crate::condense::TimeRange;
use crate::errors::SubtitleError;

// @module: Subtitle events and SRT/ASS reading and writing

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3}) --> (\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})").unwrap()
});

// @const: ASS timestamp regex (H:MM:SS.cc)
static ASS_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{2}):(\d{2})\.(\d{2,3})$").unwrap()
});

// @const: ASS override blocks such as {\an8} or {\i1}
static OVERRIDE_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[^}]*\}").unwrap()
});

// @const: HTML-style markup used by SRT files
static MARKUP_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?[A-Za-z][^>]*>").unwrap()
});

const ASS_EVENT_FORMAT: &str = "Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

const DEFAULT_ASS_HEADER: &str = "[Script Info]
ScriptType: v4.00+
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1

";

/// Line type of a subtitle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventKind {
    /// A displayed line (`Dialogue:` in ASS, every SRT block)
    #[default]
    Dialogue,
    /// A commented-out line (`Comment:` in ASS)
    Comment,
}

impl EventKind {
    fn ass_label(self) -> &'static str {
        match self {
            Self::Dialogue => "Dialogue",
            Self::Comment => "Comment",
        }
    }
}

/// ASS event fields other than timing and text, kept verbatim for round trips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssFields {
    pub layer: String,
    pub style: String,
    pub name: String,
    pub margin_l: String,
    pub margin_r: String,
    pub margin_v: String,
    pub effect: String,
}

impl Default for AssFields {
    fn default() -> Self {
        Self {
            layer: "0".to_string(),
            style: "Default".to_string(),
            name: String::new(),
            margin_l: "0".to_string(),
            margin_r: "0".to_string(),
            margin_v: "0".to_string(),
            effect: String::new(),
        }
    }
}

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, markup included
    pub text: String,

    // @field: Dialogue or comment line
    pub kind: EventKind,

    // @field: ASS-only fields
    pub ass: Option<AssFields>,
}

impl SubtitleEntry {
    /// Creates a new dialogue entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
            kind: EventKind::Dialogue,
            ass: None,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range
    pub fn new_validated(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Result<Self, SubtitleError> {
        if end_time_ms <= start_time_ms {
            return Err(SubtitleError::Parse(format!(
                "Invalid time range in entry {}: end time {} <= start time {}",
                seq_num, end_time_ms, start_time_ms
            )));
        }

        Ok(Self::new(seq_num, start_time_ms, end_time_ms, text))
    }

    /// Same entry with another line type
    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Same entry with ASS fields attached
    pub fn with_ass_fields(mut self, fields: AssFields) -> Self {
        self.ass = Some(fields);
        self
    }

    /// Whether the line is a displayed dialogue line rather than a comment
    pub fn is_dialogue_style(&self) -> bool {
        self.kind == EventKind::Dialogue
    }

    /// ASS style name, if any
    pub fn style_name(&self) -> Option<&str> {
        self.ass.as_ref().map(|fields| fields.style.as_str())
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_time_ms, self.end_time_ms)
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }

    /// Copy with new start and end times
    pub fn with_times(&self, start_time_ms: u64, end_time_ms: u64) -> Self {
        Self {
            start_time_ms,
            end_time_ms,
            ..self.clone()
        }
    }

    /// Copy moved earlier by `shift_ms`
    pub fn shifted(&self, shift_ms: u64) -> Self {
        self.with_times(
            self.start_time_ms.saturating_sub(shift_ms),
            self.end_time_ms.saturating_sub(shift_ms),
        )
    }

    /// Copy with start and end clamped into `range`
    pub fn clamped_to(&self, range: TimeRange) -> Self {
        self.with_times(
            self.start_time_ms.clamp(range.start_ms, range.end_ms),
            self.end_time_ms.clamp(range.start_ms, range.end_ms),
        )
    }

    /// Text with override blocks and markup removed and line breaks normalized
    pub fn plain_text(&self) -> String {
        let without_overrides = OVERRIDE_BLOCK_REGEX.replace_all(&self.text, "");
        let without_markup = MARKUP_TAG_REGEX.replace_all(&without_overrides, "");
        without_markup
            .replace("\\N", "\n")
            .replace("\\n", "\n")
            .replace("\\h", " ")
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        // Parse HH:MM:SS,mmm format
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(SubtitleError::Parse(format!("Invalid timestamp format: {}", timestamp)));
        }

        let parse = |part: &str| -> Result<u64, SubtitleError> {
            part.parse::<u64>()
                .map_err(|_| SubtitleError::Parse(format!("Invalid timestamp component '{}' in {}", part, timestamp)))
        };
        let hours = parse(parts[0])?;
        let minutes = parse(parts[1])?;
        let seconds = parse(parts[2])?;
        let millis = parse(parts[3])?;

        // Validate time components
        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(SubtitleError::Parse(format!("Invalid time components in timestamp: {}", timestamp)));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Parse an ASS timestamp (H:MM:SS.cc) to milliseconds
    pub fn parse_ass_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        let caps = ASS_TIMESTAMP_REGEX.captures(timestamp.trim())
            .ok_or_else(|| SubtitleError::Parse(format!("Invalid ASS timestamp: {}", timestamp)))?;

        let out_of_range = || SubtitleError::Parse(format!("ASS timestamp out of range: {}", timestamp));
        let number = |idx: usize| -> Result<u64, SubtitleError> {
            caps.get(idx).map_or(Ok(0), |m| m.as_str().parse::<u64>().map_err(|_| out_of_range()))
        };
        let fraction = caps.get(4).map_or("0", |m| m.as_str());
        // Two digits are centiseconds, three are milliseconds
        let millis = if fraction.len() == 2 { number(4)? * 10 } else { number(4)? };

        let (hours, minutes, seconds) = (number(1)?, number(2)?, number(3)?);

        hours
            .checked_mul(3_600_000)
            .and_then(|ms| ms.checked_add(minutes * 60_000 + seconds * 1_000 + millis))
            .ok_or_else(out_of_range)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Format a timestamp in milliseconds to ASS format (H:MM:SS.cc), rounded to centiseconds
    pub fn format_ass_timestamp(ms: u64) -> String {
        let centis = (ms + 5) / 10;
        let hours = centis / 360_000;
        let minutes = (centis % 360_000) / 6_000;
        let seconds = (centis % 6_000) / 100;
        let cs = centis % 100;

        format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, cs)
    }

    /// Render this entry as an ASS event line
    pub fn to_ass_line(&self) -> String {
        let default_fields = AssFields::default();
        let fields = self.ass.as_ref().unwrap_or(&default_fields);
        format!(
            "{}: {},{},{},{},{},{},{},{},{},{}",
            self.kind.ass_label(),
            fields.layer,
            Self::format_ass_timestamp(self.start_time_ms),
            Self::format_ass_timestamp(self.end_time_ms),
            fields.style,
            fields.name,
            fields.margin_l,
            fields.margin_r,
            fields.margin_v,
            fields.effect,
            self.text.replace('\n', "\\N"),
        )
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Supported subtitle file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Ass,
}

impl SubtitleFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "srt" => Some(Self::Srt),
            "ass" | "ssa" => Some(Self::Ass),
            _ => None,
        }
    }

    /// Guess the format from file content
    pub fn sniff(content: &str) -> Option<Self> {
        if content.lines().any(|line| line.trim().eq_ignore_ascii_case("[events]")) {
            Some(Self::Ass)
        } else if TIMESTAMP_REGEX.is_match(content) {
            Some(Self::Srt)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,

    /// Format the entries were read from and will be written as
    pub format: SubtitleFormat,

    /// Everything before the `[Events]` section of an ASS file
    pub ass_header: Option<String>,
}

impl SubtitleCollection {
    /// Create a new, empty subtitle collection
    pub fn new(source_file: PathBuf, format: SubtitleFormat) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
            format,
            ass_header: None,
        }
    }

    /// Copy of this collection's metadata holding other entries
    pub fn with_entries(&self, entries: Vec<SubtitleEntry>) -> Self {
        SubtitleCollection {
            source_file: self.source_file.clone(),
            entries,
            format: self.format,
            ass_header: self.ass_header.clone(),
        }
    }

    /// Load and parse a subtitle file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let content = raw.trim_start_matches('\u{feff}');

        let format = SubtitleFormat::from_path(path)
            .or_else(|| SubtitleFormat::sniff(content))
            .ok_or_else(|| SubtitleError::UnsupportedFormat(path.display().to_string()))?;

        let mut collection = Self::parse_str(content, format)
            .map_err(|e| match e {
                SubtitleError::Empty(_) => SubtitleError::Empty(path.display().to_string()),
                other => other,
            })?;
        collection.source_file = path.to_path_buf();

        debug!("Loaded {} subtitle entries from {:?}", collection.entries.len(), path);
        Ok(collection)
    }

    /// Parse subtitle content of a known format
    pub fn parse_str(content: &str, format: SubtitleFormat) -> Result<Self, SubtitleError> {
        let mut collection = Self::new(PathBuf::new(), format);
        match format {
            SubtitleFormat::Srt => {
                collection.entries = Self::parse_srt_string(content)?;
            }
            SubtitleFormat::Ass => {
                let (header, entries) = Self::parse_ass_string(content)?;
                collection.ass_header = Some(header);
                collection.entries = entries;
            }
        }
        Ok(collection)
    }

    /// Write subtitles in the collection's format
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SubtitleError> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, self.render())?;
        Ok(())
    }

    /// Render the collection as file content
    pub fn render(&self) -> String {
        match self.format {
            SubtitleFormat::Srt => self.entries.iter().map(|entry| entry.to_string()).collect(),
            SubtitleFormat::Ass => {
                let mut out = String::new();
                let header = self.ass_header.as_deref().unwrap_or(DEFAULT_ASS_HEADER);
                out.push_str(header);
                if !header.ends_with("\n\n") {
                    out.push('\n');
                }
                out.push_str("[Events]\n");
                out.push_str("Format: ");
                out.push_str(ASS_EVENT_FORMAT);
                out.push('\n');
                for entry in &self.entries {
                    out.push_str(&entry.to_ass_line());
                    out.push('\n');
                }
                out
            }
        }
    }

    /// Parse SRT format string into subtitle entries
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let mut entries = Vec::new();

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_start_time_ms: Option<u64> = None;
        let mut current_end_time_ms: Option<u64> = None;
        let mut current_text = String::new();
        let mut line_count = 0;

        // Helper function to add the current entry if complete
        let mut add_current_entry = |seq_num: usize, start_ms: u64, end_ms: u64, text: &str| {
            match SubtitleEntry::new_validated(seq_num, start_ms, end_ms, text.trim().to_string()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping invalid subtitle entry {}: {}", seq_num, e),
            }
        };

        for line in content.lines() {
            line_count += 1;
            let trimmed = line.trim();

            // Skip empty lines, but check if we need to finalize the current entry
            if trimmed.is_empty() {
                if let (Some(seq_num), Some(start_ms), Some(end_ms)) = (current_seq_num, current_start_time_ms, current_end_time_ms) {
                    if !current_text.is_empty() {
                        add_current_entry(seq_num, start_ms, end_ms, &current_text);

                        // Reset state for next entry
                        current_seq_num = None;
                        current_start_time_ms = None;
                        current_end_time_ms = None;
                        current_text.clear();
                    }
                }
                continue;
            }

            // Try to parse as sequence number (only if we're starting a new entry)
            if current_seq_num.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            // Try to parse as timestamp
            if current_seq_num.is_some() && current_start_time_ms.is_none() && current_end_time_ms.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_start_time_ms = Some(Self::parse_timestamp_to_ms(&caps, 1));
                    current_end_time_ms = Some(Self::parse_timestamp_to_ms(&caps, 5));
                    continue;
                }
            }

            // If we have a sequence number and timestamps, this must be subtitle text
            if current_seq_num.is_some() && current_start_time_ms.is_some() && current_end_time_ms.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_count, trimmed);
            }
        }

        // Add the last entry if there is one
        if let (Some(seq_num), Some(start_ms), Some(end_ms)) = (current_seq_num, current_start_time_ms, current_end_time_ms) {
            if !current_text.is_empty() {
                add_current_entry(seq_num, start_ms, end_ms, &current_text);
            }
        }

        if entries.is_empty() {
            warn!("No valid subtitle entries found in content");
            return Err(SubtitleError::Empty("SRT content".to_string()));
        }

        Self::finalize_entries(&mut entries);
        Ok(entries)
    }

    /// Parse ASS/SSA content into its script header and event entries
    pub fn parse_ass_string(content: &str) -> Result<(String, Vec<SubtitleEntry>), SubtitleError> {
        let mut header = String::new();
        let mut entries = Vec::new();
        let mut in_events = false;
        let mut format: Vec<String> = ASS_EVENT_FORMAT
            .split(',')
            .map(|field| field.trim().to_lowercase())
            .collect();

        for (line_idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                in_events = trimmed.eq_ignore_ascii_case("[events]");
                if !in_events {
                    header.push_str(line);
                    header.push('\n');
                }
                continue;
            }

            if !in_events {
                header.push_str(line);
                header.push('\n');
                continue;
            }

            let Some((key, rest)) = trimmed.split_once(':') else {
                continue;
            };

            let kind = match key.trim().to_lowercase().as_str() {
                "format" => {
                    format = rest.split(',').map(|field| field.trim().to_lowercase()).collect();
                    continue;
                }
                "dialogue" => EventKind::Dialogue,
                "comment" => EventKind::Comment,
                // Picture, Sound, Movie and Command lines carry no text
                _ => continue,
            };

            let values: Vec<&str> = rest.trim_start().splitn(format.len(), ',').collect();
            if values.len() < format.len() {
                warn!("Skipping malformed ASS event at line {}: {}", line_idx + 1, trimmed);
                continue;
            }

            let field = |names: &[&str]| -> Option<&str> {
                format.iter()
                    .position(|name| names.contains(&name.as_str()))
                    .and_then(|idx| values.get(idx).copied())
            };

            let times = field(&["start"]).zip(field(&["end"]))
                .map(|(start, end)| (SubtitleEntry::parse_ass_timestamp(start), SubtitleEntry::parse_ass_timestamp(end)));
            let (start_ms, end_ms) = match times {
                Some((Ok(start), Ok(end))) => (start, end),
                _ => {
                    warn!("Skipping ASS event with invalid timing at line {}", line_idx + 1);
                    continue;
                }
            };

            let defaults = AssFields::default();
            let owned = |names: &[&str], default: &str| field(names).map_or_else(|| default.to_string(), |v| v.trim().to_string());
            let fields = AssFields {
                layer: owned(&["layer", "marked"], &defaults.layer),
                style: owned(&["style"], &defaults.style),
                name: owned(&["name", "actor"], &defaults.name),
                margin_l: owned(&["marginl"], &defaults.margin_l),
                margin_r: owned(&["marginr"], &defaults.margin_r),
                margin_v: owned(&["marginv"], &defaults.margin_v),
                effect: owned(&["effect"], &defaults.effect),
            };
            let text = field(&["text"]).unwrap_or_default().to_string();

            match SubtitleEntry::new_validated(entries.len() + 1, start_ms, end_ms, text) {
                Ok(entry) => entries.push(entry.with_kind(kind).with_ass_fields(fields)),
                Err(e) => warn!("Skipping ASS event at line {}: {}", line_idx + 1, e),
            }
        }

        if entries.is_empty() {
            warn!("No valid subtitle entries found in content");
            return Err(SubtitleError::Empty("ASS content".to_string()));
        }

        Self::finalize_entries(&mut entries);
        Ok((header, entries))
    }

    // @sorts: Entries by start time and renumbers them
    fn finalize_entries(entries: &mut [SubtitleEntry]) {
        entries.sort_by_key(|entry| entry.start_time_ms);

        let overlap_count = entries.windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        if overlap_count > 0 {
            debug!("Found {} overlapping subtitle entries", overlap_count);
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }
    }

    /// Parse timestamp to milliseconds
    fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let part = |offset: usize| -> u64 {
            caps.get(start_idx + offset)
                .map_or(0, |m| m.as_str().parse().unwrap_or(0))
        };

        (part(0) * 3600 + part(1) * 60 + part(2)) * 1000 + part(3)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Format: {}", self.format.extension())?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
