/*!
 * Partitioning and splitting of segment ranges.
 *
 * Partitions divide the original timeline by absolute end time, splits divide
 * each partition by condensed (cumulative) duration. Cuts only ever fall
 * between two ranges; a boundary lands on whichever side of the crossing range
 * is numerically closer to the ideal cut point.
 */

use std::ops::Range;

use crate::condense::group::TimeRange;

/// Ranges exported together as one output file
pub type Split = Vec<TimeRange>;

/// Consecutive splits cut from one stretch of the source timeline
pub type Partition = Vec<Split>;

/// Divide `ranges` into partitions of roughly `partition_size_ms` of source
/// time, each divided into splits of roughly `split_size_ms` of condensed time.
///
/// A size of 0 turns that level off. The result always holds at least one
/// partition with at least one split, even for empty input.
pub fn partition_and_split(ranges: &[TimeRange], partition_size_ms: u64, split_size_ms: u64) -> Vec<Partition> {
    let end_times: Vec<u64> = ranges.iter().map(|range| range.end_ms).collect();

    divide(&end_times, partition_size_ms)
        .into_iter()
        .map(|bucket| split_partition(&ranges[bucket], split_size_ms))
        .collect()
}

fn split_partition(ranges: &[TimeRange], split_size_ms: u64) -> Partition {
    let condensed_ends: Vec<u64> = ranges
        .iter()
        .scan(0u64, |total, range| {
            *total += range.duration_ms();
            Some(*total)
        })
        .collect();

    divide(&condensed_ends, split_size_ms)
        .into_iter()
        .map(|bucket| ranges[bucket].to_vec())
        .collect()
}

/// Cut a sequence of increasing positions into index buckets of about `size`.
///
/// `positions[i]` is where item `i` ends on the measured axis. When an item
/// crosses the next multiple of `size`, the cut goes after it if its end is
/// strictly closer to the boundary than the previous item's end, otherwise
/// before it. The next boundary is the first multiple at or past the crossing
/// item's end, so one long gap does not produce a run of tiny buckets.
pub fn divide(positions: &[u64], size: u64) -> Vec<Range<usize>> {
    if size == 0 {
        return vec![0..positions.len()];
    }

    let mut buckets = Vec::new();
    let mut start = 0;
    let mut boundary = size;

    for (idx, &position) in positions.iter().enumerate() {
        if position <= boundary {
            continue;
        }

        let previous = if idx == 0 { 0 } else { positions[idx - 1] };
        let end = if position.abs_diff(boundary) < previous.abs_diff(boundary) {
            idx + 1
        } else {
            idx
        };

        if end > start {
            buckets.push(start..end);
            start = end;
        }
        boundary = position.div_ceil(size) * size;
    }

    if start < positions.len() || buckets.is_empty() {
        buckets.push(start..positions.len());
    }
    buckets
}
