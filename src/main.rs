// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use subcondense::app_config::{self, Config};
use subcondense::app_controller::{Controller, UnitOutcome};
use subcondense::condense::IgnoreRangeSpec;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Condense a media file or every media file in a directory (default command)
    Condense(CondenseArgs),

    /// List the streams and chapters of a media file
    Streams {
        /// Media file to probe
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Generate shell completions for subcondense
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct CondenseArgs {
    /// Input media file or directory to process
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Subtitle file to try before sidecars and embedded streams (repeatable)
    #[arg(long = "subtitle", value_name = "FILE")]
    subtitles: Vec<PathBuf>,

    /// Padding added around every dialogue segment, in milliseconds
    #[arg(short, long, value_name = "MS")]
    padding: Option<u64>,

    /// Merge segments closer than this, in milliseconds
    #[arg(short, long, value_name = "MS")]
    threshold: Option<u64>,

    /// Partition the source timeline every SECS seconds (0 disables)
    #[arg(short = 'r', long, value_name = "SECS")]
    partition: Option<u64>,

    /// Split each partition every SECS seconds of condensed output (0 disables)
    #[arg(short, long, value_name = "SECS")]
    split: Option<u64>,

    /// Treat every subtitle line as dialogue
    #[arg(long)]
    include_all: bool,

    /// Lines matching this regex are not dialogue (replaces built-in filtering)
    #[arg(long, value_name = "RE")]
    filter_regex: Option<String>,

    /// Cut out a range, e.g. `--ignore-range 0 1m30s` or `--ignore-range e-1m30s e` (repeatable)
    #[arg(long = "ignore-range", num_args = 2, value_names = ["START", "END"], action = ArgAction::Append)]
    ignore_range: Vec<String>,

    /// Cut out every chapter with this title (repeatable)
    #[arg(long = "ignore-chapter", value_name = "TITLE")]
    ignore_chapter: Vec<String>,

    /// Reject subtitles that condense to less than this share of the audio
    #[arg(short = 'c', long = "min-ratio", value_name = "R")]
    min_ratio: Option<f64>,

    /// Preferred audio and subtitle language (e.g. 'ja', 'jpn')
    #[arg(short = 'l', long)]
    target_language: Option<String>,

    /// Use this audio stream, overriding the language preference (see `streams`)
    #[arg(long = "audio-index", value_name = "INDEX")]
    audio_index: Option<usize>,

    /// Try this embedded subtitle stream before the other embedded streams (see `streams`)
    #[arg(long = "subtitle-index", value_name = "INDEX")]
    subtitle_index: Option<usize>,

    /// Directory for condensed outputs (default: beside the input)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Condensed audio extension (e.g. mp3, flac, m4a)
    #[arg(long, value_name = "EXT")]
    audio_extension: Option<String>,

    /// Condensed audio bitrate in kbps
    #[arg(long, value_name = "KBPS")]
    bitrate: Option<u32>,

    /// Downmix condensed audio to mono
    #[arg(long)]
    mono: bool,

    /// Also export condensed video
    #[arg(long)]
    video: bool,

    /// Do not write condensed subtitles
    #[arg(long)]
    no_subtitles: bool,

    /// Keep outputs that already exist
    #[arg(long)]
    no_overwrite: bool,

    /// Show what would be written without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Configuration file path
    #[arg(long = "config", value_name = "PATH", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subcondense - condensed audio from subtitles
///
/// Uses subtitle timing to keep only the dialogue of a video or audio file.
#[derive(Parser, Debug)]
#[command(name = "subcondense")]
#[command(version)]
#[command(about = "Condense audio and video down to their dialogue using subtitles")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "subcondense cuts the dialogue out of video and audio files using subtitle timing,
producing condensed audio (and optionally video) plus retimed subtitles.

EXAMPLES:
    subcondense movie.mkv                              # Condense using default config
    subcondense -p 250 -t 1500 movie.mkv               # Pad lines and merge close ones
    subcondense -l ja --video movie.mkv                # Prefer Japanese streams, also write video
    subcondense --ignore-range 0 1m30s movie.mkv       # Skip the opening
    subcondense --ignore-range e-1m30s e movie.mkv     # Skip the ending
    subcondense -r 1800 -s 600 /anime/                 # Partition and split a whole directory
    subcondense streams movie.mkv                      # List streams and chapters
    subcondense completions bash > subcondense.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. Command line flags override the file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    condense: CondenseArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subcondense", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Streams { input }) => run_streams(input).await,
        Some(Commands::Condense(args)) => run_condense(args).await,
        None => run_condense(cli.condense).await,
    }
}

async fn run_streams(input: PathBuf) -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let info = controller.describe(&input).await?;

    println!("{} ({} ms)", input.display(), info.duration_ms);
    for stream in &info.streams {
        let note = if stream.is_bitmap_subtitle() { " [bitmap, unusable]" } else { "" };
        println!("  {}{}", stream, note);
    }
    for chapter in &info.chapters {
        println!(
            "  chapter {} - {} ms: {}",
            chapter.start_ms,
            chapter.end_ms,
            chapter.title.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_condense(args: CondenseArgs) -> Result<()> {
    let input = args.input.clone().ok_or_else(|| {
        anyhow!("INPUT is required when no subcommand is specified")
    })?;

    // A command line log level applies before the config is read
    if let Some(level) = args.log_level {
        log::set_max_level(app_config::LogLevel::from(level).to_level_filter());
    }

    let (mut config, created) = Config::load_or_create(&args.config_path)?;
    if created {
        warn!("Config file not found at '{}', created a default one.", args.config_path);
    }
    apply_overrides(&mut config, &args);

    config.validate()?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    if input.is_file() {
        match controller.run(&input, &args.subtitles).await? {
            UnitOutcome::Condensed(report) => {
                for path in &report.outputs {
                    info!("Success: {:?}", path);
                }
            }
            UnitOutcome::Insufficient => {
                return Err(anyhow!("No subtitle gave enough dialogue to condense {:?}", input));
            }
        }
    } else if input.is_dir() {
        if !args.subtitles.is_empty() {
            warn!("--subtitle is ignored for directory input");
        }
        let summary = controller.run_folder(&input).await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} file(s) failed", summary.failed));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input));
    }

    Ok(())
}

// Command line flags win over the config file
fn apply_overrides(config: &mut Config, args: &CondenseArgs) {
    let condense = &mut config.condense;
    if let Some(padding) = args.padding {
        condense.padding_ms = padding;
    }
    if let Some(threshold) = args.threshold {
        condense.threshold_ms = threshold;
    }
    if let Some(partition) = args.partition {
        condense.partition_secs = partition;
    }
    if let Some(split) = args.split {
        condense.split_secs = split;
    }
    if args.include_all {
        condense.include_all_events = true;
    }
    if let Some(regex) = &args.filter_regex {
        condense.override_regex = Some(regex.clone());
    }
    for pair in args.ignore_range.chunks_exact(2) {
        condense.ignore_ranges.push(IgnoreRangeSpec::new(pair[0].clone(), pair[1].clone()));
    }
    condense.ignore_chapters.extend(args.ignore_chapter.iter().cloned());
    if let Some(ratio) = args.min_ratio {
        condense.minimum_compression_ratio = ratio;
    }

    if let Some(language) = &args.target_language {
        config.target_language = Some(language.clone());
    }
    if let Some(index) = args.audio_index {
        config.audio_stream_index = Some(index);
    }
    if let Some(index) = args.subtitle_index {
        config.subtitle_stream_index = Some(index);
    }

    let output = &mut config.output;
    if let Some(dir) = &args.output_dir {
        output.output_dir = Some(dir.clone());
    }
    if let Some(ext) = &args.audio_extension {
        output.audio_extension = ext.trim_start_matches('.').to_string();
    }
    if let Some(bitrate) = args.bitrate {
        output.audio_bitrate_kbps = Some(bitrate);
    }
    if args.mono {
        output.mono = true;
    }
    if args.video {
        output.condensed_video = true;
    }
    if args.no_subtitles {
        output.condensed_subtitles = false;
    }
    if args.no_overwrite {
        output.overwrite_existing = false;
    }
    if args.dry_run {
        output.dry_run = true;
    }

    if let Some(level) = args.log_level {
        config.log_level = level.into();
    }
}
