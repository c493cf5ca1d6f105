/*!
 * Dialogue classification.
 *
 * Decides whether a subtitle event is spoken dialogue (drives merging and the
 * exported cut list) or ephemeral (signs, song lyrics, sound descriptions),
 * which is only carried along clipped into dialogue groups.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CondenseError;
use crate::subtitle_processor::SubtitleEntry;

// @const: Leading override block that only positions the line, e.g. {\an8} or {\a6}
static ALIGNMENT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\\an?\d{1,2}\}$").unwrap()
});

/// Glyphs and bracketing that mark a line as non-speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonSpeechMarkers {
    /// Any of these anywhere in the text makes the line ephemeral
    pub glyphs: Vec<char>,

    /// A line wrapped entirely in this pair is a sound description
    pub brackets: (char, char),
}

impl Default for NonSpeechMarkers {
    fn default() -> Self {
        Self {
            glyphs: vec!['♪', '♫', '♬', '♩'],
            brackets: ('（', '）'),
        }
    }
}

impl NonSpeechMarkers {
    pub fn contains_glyph(&self, text: &str) -> bool {
        text.chars().any(|c| self.glyphs.contains(&c))
    }

    pub fn is_bracketed(&self, text: &str) -> bool {
        let (open, close) = self.brackets;
        let text = text.trim();
        text.starts_with(open) && text.ends_with(close)
    }
}

/// Classifies events as dialogue (`true`) or ephemeral (`false`)
#[derive(Debug, Clone)]
pub struct EventClassifier {
    include_all: bool,
    override_regex: Option<Regex>,
    markers: NonSpeechMarkers,
}

impl EventClassifier {
    /// Build a classifier, compiling the override regex if one is given
    pub fn new(include_all: bool, override_regex: Option<&str>) -> Result<Self, CondenseError> {
        let override_regex = override_regex.map(Regex::new).transpose()?;
        if let Some(regex) = &override_regex {
            debug!("Using regex {} for subtitle filtering", regex.as_str());
        }

        Ok(Self {
            include_all,
            override_regex,
            markers: NonSpeechMarkers::default(),
        })
    }

    /// Replace the built-in non-speech markers
    pub fn with_markers(mut self, markers: NonSpeechMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn classify(&self, entry: &SubtitleEntry) -> bool {
        // A user regex replaces every built-in rule
        if let Some(regex) = &self.override_regex {
            let plain = entry.plain_text();
            let matches: Vec<&str> = regex.find_iter(&plain).map(|m| m.as_str()).collect();
            if !matches.is_empty() {
                debug!("Regex {} matched {:?} in \"{}\"", regex.as_str(), matches, plain);
                return false;
            }
            return true;
        }

        if self.include_all {
            return true;
        }

        is_spoken_dialogue(entry, &self.markers)
    }
}

/// Built-in heuristics for spotting non-dialogue lines
pub fn is_spoken_dialogue(entry: &SubtitleEntry, markers: &NonSpeechMarkers) -> bool {
    if markers.contains_glyph(&entry.text) {
        return false;
    }
    if !entry.is_dialogue_style() {
        return false;
    }
    if entry.text.trim().is_empty() {
        return false;
    }
    if starts_with_formatting_tag(&entry.text) {
        return false;
    }
    if markers.is_bracketed(&entry.plain_text()) {
        return false;
    }
    true
}

/// Classify a single event without keeping a classifier around
pub fn classify(entry: &SubtitleEntry, include_all: bool, override_regex: Option<&str>) -> Result<bool, CondenseError> {
    Ok(EventClassifier::new(include_all, override_regex)?.classify(entry))
}

// Leading override blocks other than pure alignment tags usually style signs or karaoke
fn starts_with_formatting_tag(text: &str) -> bool {
    if !text.starts_with('{') {
        return false;
    }
    match text.find('}') {
        Some(close) => !ALIGNMENT_TAG_REGEX.is_match(&text[..=close]),
        None => true,
    }
}
