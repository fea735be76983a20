use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::timeline::FILLER_TEXT;

// Application configuration module
// This module handles loading, validating and saving the settings used by
// the command line front-end. The library itself only reads `OutputConfig`.

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "subtimeline.json";

const MAX_MARKUP_INDENT: usize = 16;

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Timeline operation defaults
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Output file options
    #[serde(default)]
    pub output: OutputConfig,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Defaults for timeline operations
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimelineConfig {
    // @field: Text of the caption appended when padding a timeline
    #[serde(default = "default_filler_text")]
    pub filler_text: String,

    // @field: Fragment window when none is given on the command line
    #[serde(default = "default_fragment_window_ms")]
    pub fragment_window_ms: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            filler_text: default_filler_text(),
            fragment_window_ms: default_fragment_window_ms(),
        }
    }
}

/// Options applied when writing subtitle files
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// Spaces per nesting level in markup output
    #[serde(default = "default_markup_indent")]
    pub markup_indent: usize,

    /// Create missing parent directories of the output file
    #[serde(default = "default_true")]
    pub create_dirs: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            markup_indent: default_markup_indent(),
            create_dirs: true,
        }
    }
}

fn default_filler_text() -> String {
    FILLER_TEXT.to_string()
}

fn default_fragment_window_ms() -> u64 {
    2000
}

fn default_markup_indent() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Reads a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", path.display()))
    }

    /// Writes the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json).context(format!("Failed to write config to file: {}", path.display()))
    }

    /// Loads the file at `path`, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.timeline.filler_text.trim().is_empty() {
            return Err(anyhow!("Filler text must not be empty"));
        }

        if self.timeline.fragment_window_ms == 0 {
            return Err(anyhow!("Fragment window must be greater than zero"));
        }

        if self.output.markup_indent > MAX_MARKUP_INDENT {
            return Err(anyhow!(
                "Markup indent must be at most {} (got {})",
                MAX_MARKUP_INDENT,
                self.output.markup_indent
            ));
        }

        Ok(())
    }
}
