/*!
 * # subcondense - condensed audio and video from subtitles
 *
 * A Rust library that uses subtitle timing to cut the dialogue out of a
 * video or audio file, producing a shorter "condensed" file plus matching
 * retimed subtitles.
 *
 * ## Features
 *
 * - SRT and ASS/SSA subtitles, from sidecar files or embedded text streams
 * - Dialogue detection that skips signs, songs and sound descriptions
 *   (or a user regex instead)
 * - Padding and threshold based merging of nearby lines
 * - Ignore ranges (`0` to `1m30s`, `e-1m30s` to `e`) and ignored chapters
 * - Partitions and splits that never cut through a segment
 * - Condensed audio, optional condensed video, retimed subtitles
 * - ISO 639-1 and ISO 639-2 language preference for stream selection
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `condense`: the timeline engine
 *   - `condense::classifier`: dialogue vs. ephemeral events
 *   - `condense::ignore_ranges`: trimming events around ignored time
 *   - `condense::group`: groups, ranges and limits
 *   - `condense::merger`: merging groups into segments
 *   - `condense::partition`: partitions and splits
 *   - `condense::retime`: gap-free retiming
 * - `subtitle_processor`: Subtitle file handling
 * - `media`: ffprobe/ffmpeg access behind the `MediaToolkit` trait
 * - `app_config`: Configuration management
 * - `app_controller`: Per-file and per-directory workflow
 * - `file_utils`: File system operations and output naming
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod condense;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod subtitle_processor;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, UnitOutcome};
pub use condense::{build_timeline, CondenseOptions, CondensedTimeline};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use media::{FfmpegToolkit, MediaToolkit};
pub use language_utils::{language_codes_match, normalize_to_part2t, get_language_name};
pub use errors::{AppError, CondenseError, MediaError, SubtitleError};
