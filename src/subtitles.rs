use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use log::debug;

use crate::app_config::OutputConfig;
use crate::duration::{SRT_FRACTION_SEPARATOR, format_duration};
use crate::errors::{ParseError, Result, SubtitleError};
use crate::file_utils::FileManager;
use crate::srt::Srt;
use crate::ttml::Ttml;

// @module: In-memory subtitle model and format dispatch

/// Ordered collection of captions.
///
/// Entries are kept ascending by `start_at`; every timeline operation
/// preserves that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subtitles {
    /// Captions in playback order
    pub items: Vec<Subtitle>,

    /// Whether any caption references a region
    pub regions: bool,

    /// Whether any caption references a style
    pub styles: bool,
}

// @struct: Single caption
#[derive(Debug, Clone, PartialEq)]
pub struct Subtitle {
    // @field: Offset from the timeline origin
    pub start_at: Duration,

    // @field: Offset from the timeline origin, never before start_at
    pub end_at: Duration,

    // @field: Visible lines
    pub lines: Vec<Line>,

    // @field: Markup only
    pub region: Option<Arc<Region>>,

    // @field: Markup only
    pub style: Option<Arc<Style>>,

    // @field: Ad-hoc attribute overrides
    pub inline_styles: BTreeMap<String, String>,
}

impl Subtitle {
    /// Creates a caption without style or region
    pub fn new(start_at: Duration, end_at: Duration, lines: Vec<Line>) -> Self {
        Subtitle {
            start_at,
            end_at,
            lines,
            region: None,
            style: None,
            inline_styles: BTreeMap::new(),
        }
    }

    /// Creates a caption with one single-run line per string
    pub fn from_text<S: AsRef<str>>(start_at: Duration, end_at: Duration, lines: &[S]) -> Self {
        Self::new(
            start_at,
            end_at,
            lines.iter().map(|l| Line::from(l.as_ref())).collect(),
        )
    }

    /// Each line rendered as plain text, runs joined with a space
    pub fn text_lines(&self) -> Vec<String> {
        self.lines.iter().map(Line::to_plain_text).collect()
    }
}

/// One visual line made of consecutive text runs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    pub items: Vec<Text>,
}

impl Line {
    pub fn new(items: Vec<Text>) -> Self {
        Line { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Concatenates the runs with a single space
    pub fn to_plain_text(&self) -> String {
        self.items
            .iter()
            .map(|t| t.sentence.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<&str> for Line {
    fn from(sentence: &str) -> Self {
        Line::new(vec![Text::new(sentence)])
    }
}

/// Sentence fragment inside a line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    pub sentence: String,

    /// Per-run attribute overrides
    pub styles: BTreeMap<String, String>,

    /// Markup element this run came from (`span`, `br`, ...), if any
    pub kind: Option<String>,
}

impl Text {
    pub fn new(sentence: impl Into<String>) -> Self {
        Text {
            sentence: sentence.into(),
            ..Default::default()
        }
    }

    /// Whether this run marks an explicit line break
    pub fn is_line_break(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("br"))
    }
}

/// Named attribute bag with an optional single-level parent
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
    pub parent: Option<Arc<Style>>,
}

/// Named positioning bag with an optional style
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
    pub style: Option<Arc<Style>>,
}

/// Reads and writes one on-disk format
pub trait SubtitleCodec {
    /// Decodes a whole document
    fn read<R: BufRead>(&self, reader: R) -> Result<Subtitles>;

    /// Encodes a non-empty timeline
    fn write<W: Write>(&self, subtitles: &Subtitles, writer: W) -> Result<()>;
}

/// Supported on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Line-oriented indexed blocks
    Srt,
    /// XML with attribute timing
    Ttml,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Srt, Format::Ttml];

    /// File extension without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            Format::Srt => "srt",
            Format::Ttml => "ttml",
        }
    }

    /// Picks the format from a path's extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = FileManager::extension(path).unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
            .ok_or_else(|| SubtitleError::InvalidExtension(path.display().to_string()))
    }

    /// Decodes with this format's codec
    pub fn read<R: BufRead>(self, reader: R) -> Result<Subtitles> {
        match self {
            Format::Srt => Srt.read(reader),
            Format::Ttml => Ttml::default().read(reader),
        }
    }

    /// Encodes with this format's codec using default options
    pub fn write<W: Write>(self, subtitles: &Subtitles, writer: W) -> Result<()> {
        self.write_with(subtitles, writer, &OutputConfig::default())
    }

    /// Encodes with this format's codec
    pub fn write_with<W: Write>(self, subtitles: &Subtitles, writer: W, options: &OutputConfig) -> Result<()> {
        match self {
            Format::Srt => Srt.write(subtitles, writer),
            Format::Ttml => Ttml::with_indent(options.markup_indent).write(subtitles, writer),
        }
    }
}

impl Subtitles {
    pub fn new(items: Vec<Subtitle>) -> Self {
        Subtitles {
            items,
            regions: false,
            styles: false,
        }
    }

    /// Opens a subtitle file, choosing the codec from its extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SubtitleError::io(format!("opening {}", path.display()), e))?;
        let format = Format::from_path(path)?;

        let subtitles = format.read(BufReader::new(file))?;
        debug!(
            "Read {} subtitles from {} ({:?})",
            subtitles.items.len(),
            path.display(),
            format
        );
        Ok(subtitles)
    }

    /// Writes to a file, choosing the codec from its extension
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_with(path, &OutputConfig::default())
    }

    /// Writes to a file with explicit output options
    pub fn write_with<P: AsRef<Path>>(&self, path: P, options: &OutputConfig) -> Result<()> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        self.check_writable()?;

        if options.create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                FileManager::ensure_dir(parent)
                    .map_err(|e| SubtitleError::io(format!("creating {}", parent.display()), e))?;
            }
        }

        let file = File::create(path)
            .map_err(|e| SubtitleError::io(format!("creating {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        format.write_with(self, &mut writer, options)?;
        writer
            .flush()
            .map_err(|e| SubtitleError::io(format!("writing {}", path.display()), e))?;

        debug!("Wrote {} subtitles to {}", self.items.len(), path.display());
        Ok(())
    }

    /// Whether the timeline has no captions
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // @checks: Timeline is non-empty and starts at or after the origin
    pub(crate) fn check_writable(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(SubtitleError::NoSubtitlesToWrite);
        }

        for (index, subtitle) in self.items.iter().enumerate() {
            if let Some(offset) = [subtitle.start_at, subtitle.end_at]
                .into_iter()
                .find(|offset| *offset < Duration::zero())
            {
                return Err(ParseError::NegativeOffset {
                    caption: index + 1,
                    offset: format_duration(offset, SRT_FRACTION_SEPARATOR),
                }
                .into());
            }
        }
        Ok(())
    }
}
