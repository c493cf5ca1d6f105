/*!
 * Groups: runs of subtitle events exported as one contiguous media segment.
 *
 * A group's `range` is the span actually cut from the source media, its
 * `limit` is the wider span used only to decide whether the next group
 * should be merged into it. Both are derived from the events on demand, so
 * absorbing events never leaves a stale range behind.
 */

use std::fmt;

use crate::subtitle_processor::SubtitleEntry;

/// Millisecond interval from `start_ms` to `end_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeRange {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Whether the two ranges share any time. Touching endpoints do not count.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }

    /// Whether `ms` falls strictly between the endpoints
    pub fn strictly_contains(&self, ms: u64) -> bool {
        self.start_ms < ms && ms < self.end_ms
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}ms, {}ms]", self.start_ms, self.end_ms)
    }
}

/// One or more events merged into a single exportable segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Dialogue events, or the single event of an ephemeral-only group
    pub events: Vec<SubtitleEntry>,

    /// Ephemeral events clipped into this group's range
    pub ephemeral_events: Vec<SubtitleEntry>,

    /// Group holds a non-dialogue event and takes no part in merging
    pub is_ephemeral_only: bool,

    pub threshold_ms: u64,
    pub padding_ms: u64,
}

impl Group {
    /// Wrap a single event
    pub fn singleton(entry: SubtitleEntry, is_ephemeral_only: bool, threshold_ms: u64, padding_ms: u64) -> Self {
        Self {
            events: vec![entry],
            ephemeral_events: Vec::new(),
            is_ephemeral_only,
            threshold_ms,
            padding_ms,
        }
    }

    /// Earliest event start, `None` for an empty group
    pub fn events_start(&self) -> Option<u64> {
        self.events.iter().map(|entry| entry.start_time_ms).min()
    }

    /// Latest event end, 0 for an empty group
    pub fn events_end(&self) -> u64 {
        self.events.iter().map(|entry| entry.end_time_ms).max().unwrap_or(0)
    }

    /// Span exported for this group
    pub fn range(&self) -> TimeRange {
        self.extended_by(self.padding_ms)
    }

    /// Span used to decide whether the next group merges into this one
    pub fn limit(&self) -> TimeRange {
        self.extended_by(self.threshold_ms / 2 + self.padding_ms)
    }

    pub fn duration_ms(&self) -> u64 {
        self.range().duration_ms()
    }

    /// Move every event of `other` into this group
    pub fn absorb(&mut self, other: Group) {
        self.events.extend(other.events);
        self.ephemeral_events.extend(other.ephemeral_events);
    }

    fn extended_by(&self, extension_ms: u64) -> TimeRange {
        let Some(start) = self.events_start() else {
            return TimeRange::default();
        };
        let end = self.events_end();

        if self.is_ephemeral_only {
            TimeRange::new(start, end)
        } else {
            TimeRange::new(start.saturating_sub(extension_ms), end + extension_ms)
        }
    }
}

/// Wraps classified, trimmed events into singleton groups
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupBuilder {
    pub threshold_ms: u64,
    pub padding_ms: u64,
}

impl GroupBuilder {
    pub fn new(threshold_ms: u64, padding_ms: u64) -> Self {
        Self { threshold_ms, padding_ms }
    }

    pub fn build(&self, entry: SubtitleEntry, is_dialogue: bool) -> Group {
        Group::singleton(entry, !is_dialogue, self.threshold_ms, self.padding_ms)
    }
}
