/*!
 * Line-oriented subtitle codec (`.srt`).
 *
 * A document is a sequence of blocks separated by blank lines:
 *
 * ```text
 * 1
 * 00:01:39,000 --> 00:01:41,370
 * first line
 * second line
 * ```
 *
 * Indexes are validated but not kept; they are regenerated on write.
 */

use std::io::{BufRead, Write};

use chrono::Duration;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::duration::{SRT_FRACTION_SEPARATOR, format_duration, parse_duration};
use crate::errors::{ParseError, Result, SubtitleError};
use crate::subtitles::{Line, Subtitle, SubtitleCodec, Subtitles};

/// Separator between the two time boundaries of a block
pub const TIME_BOUNDARIES_SEPARATOR: &str = " --> ";

const BOM: char = '\u{feff}';

// @const: Caption index line
static INDEX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Codec value for the line-oriented format
#[derive(Debug, Clone, Copy, Default)]
pub struct Srt;

impl SubtitleCodec for Srt {
    fn read<R: BufRead>(&self, reader: R) -> Result<Subtitles> {
        read(reader)
    }

    fn write<W: Write>(&self, subtitles: &Subtitles, writer: W) -> Result<()> {
        write(subtitles, writer)
    }
}

// Where the parser is inside the current block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Index,
    Boundaries,
    Text,
}

/// Parses line-oriented content into subtitles
pub fn read<R: BufRead>(reader: R) -> Result<Subtitles> {
    let mut subtitles = Subtitles::default();
    let mut state = BlockState::Index;
    let mut current: Option<Subtitle> = None;
    let mut line_number = 0;

    for line in reader.lines() {
        line_number += 1;
        let line = line.map_err(|e| SubtitleError::io(format!("reading line {}", line_number), e))?;
        let text = if line_number == 1 {
            line.strip_prefix(BOM).unwrap_or(&line)
        } else {
            line.as_str()
        };

        match state {
            BlockState::Index => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if !INDEX_REGEX.is_match(trimmed) {
                    return Err(ParseError::UnexpectedLine {
                        line: line_number,
                        expected: "caption index",
                        text: text.to_string(),
                    }
                    .into());
                }
                state = BlockState::Boundaries;
            }
            BlockState::Boundaries => {
                let (start_at, end_at) = parse_time_boundaries(text, line_number)?;
                current = Some(Subtitle::new(start_at, end_at, Vec::new()));
                state = BlockState::Text;
            }
            BlockState::Text => {
                if text.trim().is_empty() {
                    flush(&mut subtitles, current.take());
                    state = BlockState::Index;
                } else if is_time_line(text, line_number) {
                    return Err(ParseError::UnexpectedLine {
                        line: line_number,
                        expected: "blank line before the next caption",
                        text: text.to_string(),
                    }
                    .into());
                } else if let Some(subtitle) = current.as_mut() {
                    subtitle.lines.push(Line::from(text));
                }
            }
        }
    }

    if state == BlockState::Boundaries {
        return Err(ParseError::UnexpectedLine {
            line: line_number + 1,
            expected: "time boundaries",
            text: "end of input".to_string(),
        }
        .into());
    }
    flush(&mut subtitles, current.take());

    debug!("Parsed {} line-oriented captions", subtitles.items.len());
    Ok(subtitles)
}

fn flush(subtitles: &mut Subtitles, pending: Option<Subtitle>) {
    if let Some(subtitle) = pending {
        if subtitle.lines.is_empty() {
            warn!(
                "Caption {} has no text",
                format_duration(subtitle.start_at, SRT_FRACTION_SEPARATOR)
            );
        }
        subtitles.items.push(subtitle);
    }
}

// A full time range inside text means the blank separator line is missing
fn is_time_line(text: &str, line_number: usize) -> bool {
    text.contains(TIME_BOUNDARIES_SEPARATOR) && parse_time_boundaries(text, line_number).is_ok()
}

/// Parses `<start> --> <end>`, ignoring trailing position hints after `<end>`
fn parse_time_boundaries(text: &str, line_number: usize) -> Result<(Duration, Duration)> {
    let invalid = || ParseError::TimeBoundaries {
        line: line_number,
        text: text.to_string(),
    };
    let (start, end) = text.split_once(TIME_BOUNDARIES_SEPARATOR).ok_or_else(invalid)?;
    let end = end.split_whitespace().next().ok_or_else(invalid)?;

    let located = |e: ParseError| e.at(format!("line {}", line_number));
    let start_at = parse_duration(start.trim(), SRT_FRACTION_SEPARATOR).map_err(located)?;
    let end_at = parse_duration(end, SRT_FRACTION_SEPARATOR).map_err(located)?;
    if end_at < start_at {
        return Err(invalid().into());
    }
    Ok((start_at, end_at))
}

/// Serializes subtitles in the line-oriented format.
///
/// A blank line ends a block, so lines without visible text are left out.
pub fn write<W: Write>(subtitles: &Subtitles, mut writer: W) -> Result<()> {
    subtitles.check_writable()?;

    let mut content = String::new();
    content.push(BOM);
    for (index, subtitle) in subtitles.items.iter().enumerate() {
        content.push_str(&(index + 1).to_string());
        content.push('\n');
        content.push_str(&format_duration(subtitle.start_at, SRT_FRACTION_SEPARATOR));
        content.push_str(TIME_BOUNDARIES_SEPARATOR);
        content.push_str(&format_duration(subtitle.end_at, SRT_FRACTION_SEPARATOR));
        content.push('\n');
        for line in subtitle.text_lines() {
            for row in line.lines().filter(|row| !row.trim().is_empty()) {
                content.push_str(row);
                content.push('\n');
            }
        }
        content.push('\n');
    }

    // No dangling blank line after the last block
    content.pop();

    writer
        .write_all(content.as_bytes())
        .map_err(|e| SubtitleError::io("writing line-oriented subtitles", e))
}
