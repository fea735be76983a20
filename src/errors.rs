/*!
 * Error types for the subtimeline library.
 *
 * Every codec and dispatcher operation surfaces a `SubtitleError`. Parse
 * failures are grouped under `ParseError` and always carry the offending
 * text, id or line so the caller can locate the problem in the source file.
 */

use std::io;
use thiserror::Error;

/// Errors raised while decoding a subtitle file or one of its fields
#[derive(Error, Debug)]
pub enum ParseError {
    /// Duration has no fractional-seconds component
    #[error("No milliseconds detected in {0}")]
    MissingFraction(String),

    /// Fractional-seconds component is not exactly 3 digits
    #[error("Invalid number of millisecond digits detected in {0}")]
    FractionDigits(String),

    /// Duration lacks the HH:MM:SS triple
    #[error("No hours, minutes or seconds detected in {0}")]
    MissingClock(String),

    /// One of the numeric duration components is not a non-negative integer
    #[error("Invalid {component} '{value}' in {input}")]
    InvalidComponent {
        /// Full duration text
        input: String,
        /// Which component failed (hours, minutes, ...)
        component: &'static str,
        /// Offending component text
        value: String,
    },

    /// Duration does not fit the time representation
    #[error("Duration {0} is out of range")]
    OutOfRange(String),

    /// Line-oriented time range line is malformed
    #[error("Invalid time boundaries at line {line}: {text}")]
    TimeBoundaries {
        /// 1-based line number
        line: usize,
        /// Offending line
        text: String,
    },

    /// Line-oriented block does not follow the index/time/text grammar
    #[error("Expected {expected} at line {line}, found: {text}")]
    UnexpectedLine {
        /// 1-based line number
        line: usize,
        /// What the grammar required at this point
        expected: &'static str,
        /// Offending line
        text: String,
    },

    /// XML document is not well-formed
    #[error("Malformed XML: {0}")]
    Xml(String),

    /// Required attribute missing on an element
    #[error("Missing attribute {attribute} on <{element}>")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// Attribute present but its value cannot be used
    #[error("Invalid value '{value}' for attribute {attribute}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },

    /// Style reference that does not resolve
    #[error("Unknown style ID {id} for {owner}")]
    UnknownStyle {
        /// Unresolved style id
        id: String,
        /// Element that referenced it
        owner: String,
    },

    /// Region reference that does not resolve
    #[error("Unknown region ID {id} for {owner}")]
    UnknownRegion {
        /// Unresolved region id
        id: String,
        /// Element that referenced it
        owner: String,
    },

    /// Caption starts or ends before the timeline origin, which no format can encode
    #[error("Negative offset {offset} in caption {caption} cannot be written")]
    NegativeOffset {
        /// 1-based caption position
        caption: usize,
        /// Offending offset, signed
        offset: String,
    },

    /// Field error with its position in the source document
    #[error("{source} at {location}")]
    Located {
        /// Line number or element the error comes from
        location: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Attaches a source position to this error
    pub fn at(self, location: impl Into<String>) -> Self {
        Self::Located {
            location: location.into(),
            source: Box::new(self),
        }
    }
}

/// Coarse error category, one per failure family the library reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Parse,
    EmptyInput,
    Io,
}

/// Main error type returned by the library
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// File extension is not mapped to any codec
    #[error("Invalid extension: {0}")]
    InvalidExtension(String),

    /// Write attempted on an empty timeline
    #[error("No subtitles to write")]
    NoSubtitlesToWrite,

    /// Malformed input
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Underlying file or stream failure
    #[error("{context} failed: {source}")]
    Io {
        /// Action and target, e.g. "opening movie.srt"
        context: String,
        #[source]
        source: io::Error,
    },
}

impl SubtitleError {
    /// Wraps an I/O error with the action that produced it
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the failure family of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidExtension(_) => ErrorKind::Format,
            Self::NoSubtitlesToWrite => ErrorKind::EmptyInput,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

impl From<quick_xml::Error> for SubtitleError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Parse(ParseError::Xml(error.to_string()))
    }
}

impl From<quick_xml::events::attributes::AttrError> for SubtitleError {
    fn from(error: quick_xml::events::attributes::AttrError) -> Self {
        Self::Parse(ParseError::Xml(error.to_string()))
    }
}

/// Library result alias
pub type Result<T, E = SubtitleError> = std::result::Result<T, E>;
