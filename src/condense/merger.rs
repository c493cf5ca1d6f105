/*!
 * Group merging.
 *
 * Dialogue groups are folded left to right into contiguous segments. Ephemeral
 * groups never influence where segments start or end: afterwards each one is
 * clipped into every finished segment that holds its start or its end.
 */

use log::debug;

use crate::condense::group::Group;

/// Merge singleton groups into the final, non-overlapping segment list
pub fn merge_groups(groups: Vec<Group>) -> Vec<Group> {
    let (mut dialogue, mut ephemeral): (Vec<Group>, Vec<Group>) =
        groups.into_iter().partition(|group| !group.is_ephemeral_only);

    dialogue.sort_by_key(|group| group.events_start());
    ephemeral.sort_by_key(|group| group.events_start());

    let mut merged = fold_dialogue(dialogue);
    attach_ephemeral(&mut merged, &ephemeral);
    merged
}

// Absorb each group into the accumulator while the accumulator's limit reaches its range
fn fold_dialogue(dialogue: Vec<Group>) -> Vec<Group> {
    let mut finished = Vec::new();
    let mut iter = dialogue.into_iter();

    let Some(mut current) = iter.next() else {
        return finished;
    };

    for group in iter {
        if current.limit().end_ms > group.range().start_ms {
            current.absorb(group);
        } else {
            finished.push(std::mem::replace(&mut current, group));
        }
    }
    finished.push(current);
    finished
}

/// Clip every ephemeral event into each merged group whose range strictly
/// contains the event's start or end.
///
/// An event reaching into two neighbouring groups is attached to both. One
/// that covers a group entirely, or shares both its endpoints, is not.
fn attach_ephemeral(merged: &mut [Group], ephemeral: &[Group]) {
    let mut dropped = 0;

    for group in ephemeral {
        for entry in &group.events {
            let span = entry.time_range();
            let mut attached = false;

            for target in merged.iter_mut() {
                let range = target.range();
                if range.strictly_contains(span.start_ms) || range.strictly_contains(span.end_ms) {
                    target.ephemeral_events.push(entry.clamped_to(range));
                    attached = true;
                }
            }

            if !attached {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        debug!("Dropped {} ephemeral events outside every dialogue segment", dropped);
    }
}
