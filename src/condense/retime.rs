/*!
 * Retiming merged groups onto a gap-free timeline.
 */

use crate::condense::group::Group;
use crate::subtitle_processor::SubtitleEntry;

/// Shift every group so it starts where the previous one ended.
///
/// Dialogue events come before the ephemeral events of the same group.
/// The groups themselves are left untouched so their original ranges can
/// still drive media extraction. Sequence numbers are reassigned from 1.
pub fn condense_groups(groups: &[Group]) -> Vec<SubtitleEntry> {
    let mut condensed = Vec::new();
    let mut cursor = 0u64;

    for group in groups {
        let range = group.range();
        let shift = range.start_ms.saturating_sub(cursor);

        condensed.extend(
            group
                .events
                .iter()
                .chain(group.ephemeral_events.iter())
                .map(|entry| entry.shifted(shift)),
        );

        cursor = range.end_ms - shift;
    }

    for (i, entry) in condensed.iter_mut().enumerate() {
        entry.seq_num = i + 1;
    }
    condensed
}

/// Total length of the condensed timeline
pub fn condensed_duration_ms(groups: &[Group]) -> u64 {
    groups.iter().map(Group::duration_ms).sum()
}
