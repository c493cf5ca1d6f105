/*!
 * Ignore ranges: time spans excluded from the condensed output.
 *
 * Users write bounds relative to the start (`1m30s`) or the end (`e-2m`) of
 * the audio. Once resolved against the audio length, every subtitle event is
 * trimmed or split so that no surviving piece overlaps any range.
 */

use std::fmt;
use std::str::FromStr;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::condense::TimeRange;
use crate::errors::CondenseError;
use crate::subtitle_processor::SubtitleEntry;

// @const: One duration component, e.g. "1h", "30s", "250ms"
static DURATION_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)(ms|h|m|s)").unwrap()
});

/// A resolved range to cut out; always `start_ms < end_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreRange {
    start_ms: u64,
    end_ms: u64,
}

impl IgnoreRange {
    pub fn new(start_ms: u64, end_ms: u64) -> Result<Self, CondenseError> {
        if end_ms <= start_ms {
            return Err(CondenseError::InvalidIgnoreRange { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn as_range(&self) -> TimeRange {
        TimeRange::new(self.start_ms, self.end_ms)
    }
}

impl fmt::Display for IgnoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_range().fmt(f)
    }
}

/// Trim or split `entry` so that none of it overlaps `ranges`.
///
/// Returns zero, one or more fragments in start order. Every fragment produced
/// by a clip or split goes back on the work list and is tested against all
/// ranges again, since it may still reach into another one. Each step strictly
/// shrinks the remaining duration, so the loop terminates.
pub fn resolve(entry: SubtitleEntry, ranges: &[IgnoreRange]) -> Vec<SubtitleEntry> {
    let mut pending = vec![entry];
    let mut resolved = Vec::new();

    while let Some(fragment) = pending.pop() {
        let span = fragment.time_range();
        match ranges.iter().find(|range| range.as_range().overlaps(&span)) {
            None => resolved.push(fragment),
            Some(range) => pending.extend(trim_against(&fragment, range)),
        }
    }

    resolved.sort_by_key(|fragment| fragment.start_time_ms);
    resolved
}

// Apply a single overlapping range to a fragment
fn trim_against(entry: &SubtitleEntry, range: &IgnoreRange) -> Vec<SubtitleEntry> {
    let (start, end) = (entry.start_time_ms, entry.end_time_ms);
    let starts_inside = start >= range.start_ms;
    let ends_inside = end <= range.end_ms;

    match (starts_inside, ends_inside) {
        (true, true) => {
            debug!("Dropping \"{}\": inside ignore range {}", entry.text, range);
            Vec::new()
        }
        (true, false) => vec![entry.with_times(range.end_ms, end)],
        (false, true) => vec![entry.with_times(start, range.start_ms)],
        (false, false) => {
            debug!("Splitting \"{}\" around ignore range {}", entry.text, range);
            vec![
                entry.with_times(start, range.start_ms),
                entry.with_times(range.end_ms, end),
            ]
        }
    }
}

/// A bound measured from the start or the end of the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAnchor {
    FromStart(u64),
    FromEnd(u64),
}

impl TimeAnchor {
    pub fn resolve(&self, audio_length_ms: u64) -> u64 {
        match *self {
            Self::FromStart(ms) => ms,
            Self::FromEnd(ms) => audio_length_ms.saturating_sub(ms),
        }
    }
}

impl FromStr for TimeAnchor {
    type Err = CondenseError;

    /// Accepts `1500` (ms), `1h2m3s500ms`, `e` and `e-<duration>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("e") {
            return Ok(Self::FromEnd(0));
        }
        if let Some(rest) = text.strip_prefix("e-").or_else(|| text.strip_prefix("E-")) {
            return parse_duration_ms(rest).map(Self::FromEnd);
        }
        parse_duration_ms(text).map(Self::FromStart)
    }
}

/// Parse `1500`, `90s`, `1m30s`, `1h2m3s500ms` into milliseconds
pub fn parse_duration_ms(text: &str) -> Result<u64, CondenseError> {
    let text = text.trim();
    let invalid = || CondenseError::InvalidTimeSpec(text.to_string());

    if text.is_empty() {
        return Err(invalid());
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().map_err(|_| invalid());
    }

    let mut consumed = 0;
    let mut total_ms: u64 = 0;
    for caps in DURATION_TOKEN_REGEX.captures_iter(text) {
        let whole = caps.get(0).ok_or_else(invalid)?;
        if whole.start() != consumed {
            return Err(invalid());
        }
        consumed = whole.end();

        let value: u64 = caps[1].parse().map_err(|_| invalid())?;
        let unit_ms = match &caps[2] {
            "h" => 3_600_000,
            "m" => 60_000,
            "s" => 1_000,
            _ => 1,
        };
        total_ms = value
            .checked_mul(unit_ms)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(invalid)?;
    }

    if consumed != text.len() {
        return Err(invalid());
    }
    Ok(total_ms)
}

/// A user-written ignore range, stored in config as `["<start>", "<end>"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRangeSpec(pub String, pub String);

impl IgnoreRangeSpec {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self(start.into(), end.into())
    }

    /// Check both bounds parse without resolving them
    pub fn validate(&self) -> Result<(), CondenseError> {
        self.0.parse::<TimeAnchor>()?;
        self.1.parse::<TimeAnchor>()?;
        Ok(())
    }

    pub fn resolve(&self, audio_length_ms: u64) -> Result<IgnoreRange, CondenseError> {
        let start = self.0.parse::<TimeAnchor>()?.resolve(audio_length_ms);
        let end = self.1.parse::<TimeAnchor>()?.resolve(audio_length_ms);
        IgnoreRange::new(start, end)
    }
}

/// Resolve every spec, failing on the first invalid one
pub fn resolve_specs(specs: &[IgnoreRangeSpec], audio_length_ms: u64) -> Result<Vec<IgnoreRange>, CondenseError> {
    specs.iter().map(|spec| spec.resolve(audio_length_ms)).collect()
}
