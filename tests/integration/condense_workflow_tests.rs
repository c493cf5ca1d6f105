/*!
 * Integration tests for the subtitle to condensed timeline workflow
 */

use anyhow::Result;

use subcondense::condense::{build_timeline, CondenseOptions, IgnoreRange, TimeRange};
use subcondense::errors::CondenseError;
use subcondense::subtitle_processor::{SubtitleCollection, SubtitleFormat};
use crate::common;

fn spans(ranges: &[TimeRange]) -> Vec<(u64, u64)> {
    ranges.iter().map(|r| (r.start_ms, r.end_ms)).collect()
}

/// Test that a plain SRT condenses to its dialogue lines and drops the song
#[test]
fn test_condense_withSrtDefaults_shouldKeepDialogueOnly() -> Result<()> {
    let collection = SubtitleCollection::parse_str(common::DIALOGUE_SRT, SubtitleFormat::Srt)?;
    let timeline = build_timeline(collection.entries, &CondenseOptions::default())?;

    assert_eq!(
        spans(&timeline.group_ranges()),
        vec![(1000, 4000), (4500, 7000), (20_000, 24_000), (40_000, 45_000), (50_000, 55_000)]
    );
    assert_eq!(timeline.condensed_duration_ms(), 19_500);
    assert!(timeline.events.iter().all(|e| !e.text.contains('♪')));
    assert_eq!(timeline.bucket_count(), 1);
    Ok(())
}

/// Test that the threshold merges lines closer than half of it on either side
#[test]
fn test_condense_withThreshold_shouldMergeCloseLines() -> Result<()> {
    let collection = SubtitleCollection::parse_str(common::DIALOGUE_SRT, SubtitleFormat::Srt)?;
    let options = CondenseOptions { threshold_ms: 2000, ..Default::default() };
    let timeline = build_timeline(collection.entries, &options)?;

    assert_eq!(
        spans(&timeline.group_ranges()),
        vec![(1000, 7000), (20_000, 24_000), (40_000, 45_000), (50_000, 55_000)]
    );
    assert_eq!(timeline.groups[0].events.len(), 2);
    Ok(())
}

/// Test that padded segments are retimed back to back and written out
#[test]
fn test_condense_withPadding_shouldRetimeAndWrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "ep.srt", common::DIALOGUE_SRT)?;
    let collection = SubtitleCollection::load(&source)?;

    let options = CondenseOptions { padding_ms: 500, ..Default::default() };
    let timeline = build_timeline(collection.entries.clone(), &options)?;

    assert_eq!(
        spans(&timeline.group_ranges()),
        vec![(500, 7500), (19_500, 24_500), (39_500, 45_500), (49_500, 55_500)]
    );
    assert_eq!(timeline.condensed_duration_ms(), 24_000);

    let retimed: Vec<(u64, u64)> = timeline.events.iter().map(|e| (e.start_time_ms, e.end_time_ms)).collect();
    assert_eq!(
        retimed,
        vec![(500, 3500), (4000, 6500), (7500, 11_500), (12_500, 17_500), (18_500, 23_500)]
    );

    let out = temp_dir.path().join("ep.condensed.srt");
    collection.with_entries(timeline.events.clone()).write_to_file(&out)?;
    let reloaded = SubtitleCollection::load(&out)?;
    assert_eq!(reloaded.entries, timeline.events);
    Ok(())
}

/// Test that an ignore range at the start trims the first lines
#[test]
fn test_condense_withIgnoreRange_shouldTrimOverlappingLines() -> Result<()> {
    let collection = SubtitleCollection::parse_str(common::DIALOGUE_SRT, SubtitleFormat::Srt)?;
    let options = CondenseOptions { ignore_ranges: vec![IgnoreRange::new(0, 5000)?], ..Default::default() };
    let timeline = build_timeline(collection.entries, &options)?;

    assert_eq!(timeline.group_ranges()[0], TimeRange::new(5000, 7000));
    assert_eq!(timeline.groups.len(), 4);
    Ok(())
}

/// Test that ASS signs ride along clipped and comments are dropped
#[test]
fn test_condense_withAssSignsAndComments_shouldKeepSignsAsEphemeral() -> Result<()> {
    let collection = SubtitleCollection::parse_str(common::DIALOGUE_ASS, SubtitleFormat::Ass)?;
    let timeline = build_timeline(collection.entries.clone(), &CondenseOptions::default())?;

    assert_eq!(spans(&timeline.group_ranges()), vec![(1000, 4000), (8000, 10_000)]);
    assert_eq!(timeline.groups[0].ephemeral_events.len(), 1);

    let rendered = collection.with_entries(timeline.events.clone()).render();
    assert!(rendered.contains("Dialogue: 0,0:00:00.00,0:00:03.00,Default,,0,0,0,,{\\an8}Good morning."));
    assert!(rendered.contains("Dialogue: 0,0:00:01.00,0:00:02.00,Sign,,0,0,0,,{\\pos(320,50)}CITY HALL"));
    assert!(rendered.contains("Dialogue: 0,0:00:03.00,0:00:05.00,Default,,0,0,0,,Good morning to you too."));
    assert!(!rendered.contains("timing note"));
    Ok(())
}

/// Test that a source with no dialogue is reported as insufficient
#[test]
fn test_condense_withOnlyNonDialogue_shouldBeInsufficient() -> Result<()> {
    let collection = SubtitleCollection::parse_str(common::NON_DIALOGUE_SRT, SubtitleFormat::Srt)?;

    match build_timeline(collection.entries.clone(), &CondenseOptions::default()) {
        Err(CondenseError::InsufficientDialogue { total }) => assert_eq!(total, 2),
        other => panic!("expected InsufficientDialogue, got {:?}", other.map(|t| t.groups.len())),
    }

    let options = CondenseOptions { include_all_events: true, ..Default::default() };
    let timeline = build_timeline(collection.entries, &options)?;
    assert_eq!(timeline.groups.len(), 2);
    Ok(())
}

/// Test that a user regex replaces the built-in rules
#[test]
fn test_condense_withOverrideRegex_shouldReplaceBuiltInRules() -> Result<()> {
    let collection = SubtitleCollection::parse_str(common::DIALOGUE_SRT, SubtitleFormat::Srt)?;
    let options = CondenseOptions { override_regex: Some("station".to_string()), ..Default::default() };
    let timeline = build_timeline(collection.entries, &options)?;

    let texts: Vec<&str> = timeline.events.iter().map(|e| e.text.as_str()).collect();
    assert!(texts.contains(&"♪ la la la ♪"));
    assert!(!texts.contains(&"At the station, waiting."));
    assert_eq!(timeline.groups.len(), 5);
    Ok(())
}

/// Test that a bad regex is a configuration error, not an insufficient source
#[test]
fn test_condense_withInvalidRegex_shouldFailAsConfiguration() -> Result<()> {
    let collection = SubtitleCollection::parse_str(common::DIALOGUE_SRT, SubtitleFormat::Srt)?;
    let options = CondenseOptions { override_regex: Some("(".to_string()), ..Default::default() };

    let err = build_timeline(collection.entries, &options).err().map(|e| e.is_configuration_error());
    assert_eq!(err, Some(true));
    assert!(matches!(build_timeline(Vec::new(), &options), Err(CondenseError::NoEvents)));
    Ok(())
}
