/*!
 * Timeline condensation engine.
 *
 * Turns a subtitle event list into the segments to cut from the source media
 * and a retimed event list for the condensed subtitle file:
 *
 * 1. classify each event as dialogue or ephemeral
 * 2. trim or split it around the ignore ranges
 * 3. wrap every fragment in a singleton group
 * 4. merge groups into non-overlapping segments
 * 5. divide the segment ranges into partitions and splits
 * 6. retime the segments onto a gap-free timeline
 *
 * Every stage is a synchronous, pure transform of its input.
 */

pub mod classifier;
pub mod group;
pub mod ignore_ranges;
pub mod merger;
pub mod partition;
pub mod retime;

use log::{debug, info};

use crate::errors::CondenseError;
use crate::subtitle_processor::SubtitleEntry;

pub use classifier::{EventClassifier, NonSpeechMarkers};
pub use group::{Group, GroupBuilder, TimeRange};
pub use ignore_ranges::{IgnoreRange, IgnoreRangeSpec, TimeAnchor};
pub use merger::merge_groups;
pub use partition::{partition_and_split, Partition, Split};
pub use retime::condense_groups;

/// Tunables for one condensation run
#[derive(Debug, Clone, Default)]
pub struct CondenseOptions {
    /// Added before and after every dialogue segment
    pub padding_ms: u64,

    /// Segments closer than this are merged
    pub threshold_ms: u64,

    /// Partition length in source time, 0 for none
    pub partition_size_ms: u64,

    /// Split length in condensed time, 0 for none
    pub split_size_ms: u64,

    /// Treat every event as dialogue
    pub include_all_events: bool,

    /// Events whose plain text matches are ephemeral; replaces the built-in rules
    pub override_regex: Option<String>,

    /// Resolved ranges to cut out
    pub ignore_ranges: Vec<IgnoreRange>,
}

/// Result of one condensation run
#[derive(Debug, Clone)]
pub struct CondensedTimeline {
    /// Merged segments in original timing
    pub groups: Vec<Group>,

    /// Segment ranges grouped into output buckets
    pub partitions: Vec<Partition>,

    /// Retimed events for the condensed subtitle file
    pub events: Vec<SubtitleEntry>,
}

impl CondensedTimeline {
    /// Segment ranges to cut from the source, in order
    pub fn group_ranges(&self) -> Vec<TimeRange> {
        self.groups.iter().map(Group::range).collect()
    }

    pub fn condensed_duration_ms(&self) -> u64 {
        retime::condensed_duration_ms(&self.groups)
    }

    /// Condensed length over source length, 0.0 when the source length is unknown
    pub fn compression_ratio(&self, audio_length_ms: u64) -> f64 {
        if audio_length_ms == 0 {
            return 0.0;
        }
        self.condensed_duration_ms() as f64 / audio_length_ms as f64
    }

    /// Number of (partition, split) output buckets
    pub fn bucket_count(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }
}

/// Run the whole engine over `entries`
pub fn build_timeline(entries: Vec<SubtitleEntry>, options: &CondenseOptions) -> Result<CondensedTimeline, CondenseError> {
    if entries.is_empty() {
        return Err(CondenseError::NoEvents);
    }

    let classifier = EventClassifier::new(options.include_all_events, options.override_regex.as_deref())?;
    let builder = GroupBuilder::new(options.threshold_ms, options.padding_ms);

    let total = entries.len();
    let mut ephemeral_count = 0;
    let mut singles = Vec::with_capacity(total);

    // Classification happens before trimming so fragments keep their parent's kind
    for entry in entries {
        let is_dialogue = classifier.classify(&entry);
        if !is_dialogue {
            debug!("Ignoring \"{}\", probably not spoken dialogue", entry.text);
            ephemeral_count += 1;
        }

        for fragment in ignore_ranges::resolve(entry, &options.ignore_ranges) {
            singles.push(builder.build(fragment, is_dialogue));
        }
    }

    debug!("Ignored {} of {} lines as non-dialogue", ephemeral_count, total);

    let fragment_count = singles.iter().filter(|group| !group.is_ephemeral_only).count();
    let groups = merge_groups(singles);
    if groups.is_empty() {
        return Err(CondenseError::InsufficientDialogue { total });
    }
    info!("Merged {} subtitles into {} segments", fragment_count, groups.len());

    let ranges: Vec<TimeRange> = groups.iter().map(Group::range).collect();
    let partitions = partition_and_split(&ranges, options.partition_size_ms, options.split_size_ms);
    let events = condense_groups(&groups);

    Ok(CondensedTimeline { groups, partitions, events })
}
