/*!
 * Tests for subtitle parsing and writing
 */

use anyhow::Result;
use subcondense::errors::SubtitleError;
use subcondense::subtitle_processor::{EventKind, SubtitleCollection, SubtitleEntry, SubtitleFormat};
use crate::common;

/// Test that an SRT sidecar loads with every block parsed
#[test]
fn test_load_withSrtFile_shouldParseAllEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "movie.srt", common::DIALOGUE_SRT)?;

    let collection = SubtitleCollection::load(&path)?;

    assert_eq!(collection.format, SubtitleFormat::Srt);
    assert_eq!(collection.source_file, path);
    assert_eq!(collection.entries.len(), 6);
    assert_eq!(collection.entries[0].start_time_ms, 1000);
    assert_eq!(collection.entries[5].end_time_ms, 55_000);
    assert_eq!(collection.entries[2].text, "♪ la la la ♪");
    Ok(())
}

/// Test that a byte order mark does not break the first block
#[test]
fn test_load_withByteOrderMark_shouldIgnoreIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = format!("\u{feff}{}", common::DIALOGUE_SRT);
    let path = common::create_test_file(temp_dir.path(), "bom.srt", &content)?;

    let collection = SubtitleCollection::load(&path)?;
    assert_eq!(collection.entries.len(), 6);
    assert_eq!(collection.entries[0].seq_num, 1);
    Ok(())
}

/// Test that the format is sniffed when the extension says nothing
#[test]
fn test_load_withUnknownExtension_shouldSniffContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let ass = common::create_test_file(temp_dir.path(), "stream_3.sub", common::DIALOGUE_ASS)?;
    let srt = common::create_test_file(temp_dir.path(), "stream_4.txt", common::DIALOGUE_SRT)?;

    assert_eq!(SubtitleCollection::load(&ass)?.format, SubtitleFormat::Ass);
    assert_eq!(SubtitleCollection::load(&srt)?.format, SubtitleFormat::Srt);
    Ok(())
}

/// Test that content with no usable entries is reported as empty
#[test]
fn test_load_withNoEntries_shouldReturnEmptyError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "empty.srt", "1\n00:00:05,000 --> 00:00:01,000\nbackwards\n")?;

    match SubtitleCollection::load(&path) {
        Err(SubtitleError::Empty(name)) => assert!(name.contains("empty.srt")),
        other => panic!("expected Empty error, got {:?}", other),
    }
    Ok(())
}

/// Test that unreadable formats are rejected
#[test]
fn test_load_withUnrecognizedContent_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "notes.txt", "just some notes")?;

    assert!(matches!(SubtitleCollection::load(&path), Err(SubtitleError::UnsupportedFormat(_))));
    Ok(())
}

/// Test that ASS events keep their kind, style and header through a write
#[test]
fn test_writeToFile_withAss_shouldPreserveHeaderAndKinds() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "in.ass", common::DIALOGUE_ASS)?;
    let collection = SubtitleCollection::load(&source)?;

    assert_eq!(collection.entries.len(), 4);
    assert_eq!(collection.entries[1].style_name(), Some("Sign"));
    assert_eq!(collection.entries[2].kind, EventKind::Comment);

    let out = temp_dir.path().join("nested").join("out.ass");
    collection.write_to_file(&out)?;
    let reloaded = SubtitleCollection::load(&out)?;

    assert!(reloaded.ass_header.as_deref().unwrap_or_default().contains("Style: Default,Arial"));
    assert_eq!(reloaded.entries.len(), collection.entries.len());
    for (a, b) in collection.entries.iter().zip(&reloaded.entries) {
        assert_eq!(a.start_time_ms, b.start_time_ms);
        assert_eq!(a.end_time_ms, b.end_time_ms);
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.text, b.text);
    }
    Ok(())
}

/// Test that entries are sorted and renumbered after parsing
#[test]
fn test_parseSrtString_withUnorderedBlocks_shouldSortAndRenumber() -> Result<()> {
    let content = "7\n00:00:05,000 --> 00:00:06,000\nsecond\n\n3\n00:00:01,000 --> 00:00:02,000\nfirst\n";
    let entries = SubtitleCollection::parse_srt_string(content)?;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "first");
    assert_eq!(entries[0].seq_num, 1);
    assert_eq!(entries[1].seq_num, 2);
    Ok(())
}

/// Test that timestamps format the SRT way
#[test]
fn test_formatTimestamp_shouldPadAllComponents() {
    assert_eq!(SubtitleEntry::format_timestamp(3_723_004), "01:02:03,004");
    assert_eq!(SubtitleEntry::format_ass_timestamp(3_723_004), "1:02:03.00");
    assert_eq!(SubtitleEntry::parse_timestamp("01:02:03,004").unwrap(), 3_723_004);
    assert!(SubtitleEntry::parse_timestamp("01:72:03,004").is_err());
}

/// Test that plain text drops override blocks and markup
#[test]
fn test_plainText_shouldStripMarkup() {
    let entry = SubtitleEntry::new(1, 0, 1000, "{\\an8}<i>Hello</i>\\Nthere".to_string());
    assert_eq!(entry.plain_text(), "Hello\nthere");
}
