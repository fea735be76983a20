// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use subtimeline::app_config::{self, Config, DEFAULT_CONFIG_FILE};
use subtimeline::duration::{SRT_FRACTION_SEPARATOR, format_duration};
use subtimeline::file_utils::FileManager;
use subtimeline::{Format, Subtitles};

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
    /// Print a summary of a subtitle file
    Info {
        /// Subtitle file to inspect
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Convert between formats, chosen from the file extensions
    Convert(IoArgs),

    /// Shift every caption by a signed number of milliseconds
    Shift {
        #[command(flatten)]
        io: IoArgs,

        /// Offset in milliseconds, negative to move captions earlier
        #[arg(long, allow_hyphen_values = true)]
        by: i64,
    },

    /// Clip or pad the timeline to an exact total duration
    ForceDuration {
        #[command(flatten)]
        io: IoArgs,

        /// Target duration in milliseconds
        #[arg(long)]
        duration: u64,
    },

    /// Split captions on fixed-length window boundaries
    Fragment {
        #[command(flatten)]
        io: IoArgs,

        /// Window length in milliseconds (defaults to the configured value)
        #[arg(long)]
        window: Option<u64>,
    },

    /// Merge a second file into the first, ordered by start time
    Merge {
        /// First subtitle file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Subtitle file merged into the first
        #[arg(value_name = "OTHER")]
        other: PathBuf,

        /// Output file or directory
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Generate shell completions for subtimeline
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct IoArgs {
    /// Input subtitle file (.srt or .ttml)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file or directory
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

/// subtimeline - read, reshape and write subtitle timelines
#[derive(Parser, Debug)]
#[command(name = "subtimeline")]
#[command(version)]
#[command(about = "Subtitle timeline tool")]
#[command(long_about = "subtimeline reads .srt and .ttml subtitle files, reshapes their timeline and writes them back.

EXAMPLES:
    subtimeline info movie.srt                                  # Show a summary
    subtimeline convert movie.srt movie.ttml                    # Convert formats
    subtimeline shift movie.srt out/ --by -1500                 # Move captions 1.5s earlier
    subtimeline force-duration movie.srt out.srt --duration 60000
    subtimeline fragment movie.ttml out/ --window 2000          # Split on 2s windows
    subtimeline merge a.srt b.srt merged.srt                    # Merge two timelines
    subtimeline completions bash > subtimeline.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in subtimeline.json by default. You can specify a
    different file with --config. If the file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", global = true, default_value = DEFAULT_CONFIG_FILE)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
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
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set through max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subtimeline", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).into());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.into());

    run(cli.command, &config)
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Info { input } => {
            let subtitles = open(&input)?;
            print_summary(&input, &subtitles)
        }
        Commands::Convert(io) => {
            let subtitles = open(&io.input)?;
            save(&subtitles, &io.input, &io.output, "converted", config)
        }
        Commands::Shift { io, by } => {
            let mut subtitles = open(&io.input)?;
            subtitles.add(milliseconds(by)?);
            save(&subtitles, &io.input, &io.output, "shifted", config)
        }
        Commands::ForceDuration { io, duration } => {
            let mut subtitles = open(&io.input)?;
            let target = milliseconds(i64::try_from(duration)?)?;
            subtitles.force_duration_with_filler(target, &config.timeline.filler_text);
            save(&subtitles, &io.input, &io.output, "forced", config)
        }
        Commands::Fragment { io, window } => {
            let window = window.unwrap_or(config.timeline.fragment_window_ms);
            if window == 0 {
                return Err(anyhow!("Fragment window must be greater than zero"));
            }
            let mut subtitles = open(&io.input)?;
            let before = subtitles.items.len();
            subtitles.fragment(milliseconds(i64::try_from(window)?)?);
            debug!("Fragmented {} captions into {}", before, subtitles.items.len());
            save(&subtitles, &io.input, &io.output, "fragmented", config)
        }
        Commands::Merge { input, other, output } => {
            let mut subtitles = open(&input)?;
            let other_subtitles = open(&other)?;
            subtitles.merge(&other_subtitles);
            save(&subtitles, &input, &output, "merged", config)
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn milliseconds(ms: i64) -> Result<Duration> {
    Duration::try_milliseconds(ms).ok_or_else(|| anyhow!("Duration out of range: {}ms", ms))
}

fn open(path: &Path) -> Result<Subtitles> {
    Subtitles::open(path).context(format!("Failed to read subtitles: {}", path.display()))
}

// @resolves: Output file, derived from the input name when `output` is a directory
fn resolve_output(input: &Path, output: &Path, tag: &str) -> PathBuf {
    if !FileManager::dir_exists(output) {
        return output.to_path_buf();
    }
    let extension = FileManager::extension(input).unwrap_or_else(|| Format::Srt.extension().to_string());
    FileManager::generate_output_path(input, output, tag, &extension)
}

fn save(subtitles: &Subtitles, input: &Path, output: &Path, tag: &str, config: &Config) -> Result<()> {
    let output = resolve_output(input, output, tag);
    subtitles
        .write_with(&output, &config.output)
        .context(format!("Failed to write subtitles: {}", output.display()))?;

    info!("Success: {} ({} captions)", output.display(), subtitles.items.len());
    Ok(())
}

fn print_summary(path: &Path, subtitles: &Subtitles) -> Result<()> {
    let format = Format::from_path(path)?;
    let mut stdout = std::io::stdout();
    writeln!(stdout, "File:      {}", path.display())?;
    writeln!(stdout, "Format:    {}", format.extension())?;
    writeln!(stdout, "Captions:  {}", subtitles.items.len())?;
    writeln!(
        stdout,
        "Duration:  {}",
        format_duration(subtitles.duration(), SRT_FRACTION_SEPARATOR)
    )?;
    writeln!(stdout, "Regions:   {}", if subtitles.regions { "yes" } else { "no" })?;
    writeln!(stdout, "Styles:    {}", if subtitles.styles { "yes" } else { "no" })?;

    if let (Some(first), Some(last)) = (subtitles.items.first(), subtitles.items.last()) {
        writeln!(
            stdout,
            "First:     {} {}",
            format_duration(first.start_at, SRT_FRACTION_SEPARATOR),
            first.text_lines().join(" / ")
        )?;
        writeln!(
            stdout,
            "Last:      {} {}",
            format_duration(last.start_at, SRT_FRACTION_SEPARATOR),
            last.text_lines().join(" / ")
        )?;
    }
    Ok(())
}
