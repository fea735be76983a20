/*!
 * Tests for the line-oriented subtitle codec
 */

use anyhow::Result;
use chrono::Duration;
use std::fs::File;
use std::io::BufReader;

use subtimeline::errors::{ParseError, SubtitleError};
use subtimeline::srt::{self, Srt};
use subtimeline::ttml;
use subtimeline::{Subtitle, SubtitleCodec, Subtitles};
use crate::common;

/// Test reading the bundled fixture
#[test]
fn test_read_withFixtureFile_shouldParseAllBlocks() -> Result<()> {
    let file = File::open(common::test_resource_path("example.srt"))?;
    let subtitles = srt::read(BufReader::new(file))?;

    assert_eq!(
        common::triples(&subtitles),
        vec![
            (1_000, 3_000, "The harbour lights went out at nine.".to_string()),
            (
                3_000,
                7_000,
                "Nobody on the pier saw the boat leave.\nNot even the keeper.".to_string()
            ),
            (8_500, 10_250, "- Where were you?\n- Asleep.".to_string()),
        ]
    );
    assert!(!subtitles.regions);
    assert!(!subtitles.styles);
    Ok(())
}

/// Test that the codec value and the free functions agree
#[test]
fn test_codec_withSameInput_shouldMatchFreeFunctions() -> Result<()> {
    let input = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";
    let via_codec = Srt.read(input.as_bytes())?;
    let via_function = srt::read(input.as_bytes())?;
    assert_eq!(via_codec, via_function);
    Ok(())
}

/// Test that a position hint after the end time is ignored
#[test]
fn test_read_withPositionHint_shouldIgnoreIt() -> Result<()> {
    let input = "1\n00:00:01,000 --> 00:00:02,000 X1:40 X2:600 Y1:20 Y2:50\nHello\n";
    let subtitles = srt::read(input.as_bytes())?;
    assert_eq!(common::triples(&subtitles), vec![(1_000, 2_000, "Hello".to_string())]);
    Ok(())
}

/// Test that a block without text is kept
#[test]
fn test_read_withEmptyBlock_shouldKeepCaption() -> Result<()> {
    common::init_logging();
    let input = "1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:03,000 --> 00:00:04,000\nHi\n";
    let subtitles = srt::read(input.as_bytes())?;
    assert_eq!(subtitles.items.len(), 2);
    assert!(subtitles.items[0].lines.is_empty());
    Ok(())
}

/// Test that parse errors carry the offending line number
#[test]
fn test_read_withGarbageBetweenBlocks_shouldReportLine() {
    let input = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\nnot an index\n";
    let err = srt::read(input.as_bytes()).unwrap_err();
    match err {
        SubtitleError::Parse(ParseError::UnexpectedLine { line, text, .. }) => {
            assert_eq!(line, 5);
            assert_eq!(text, "not an index");
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// Test that a bad time line names its line number
#[test]
fn test_read_withBadDurationInSecondBlock_shouldReportLine() {
    let input = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03 --> 00:00:04,000\nWorld\n";
    let err = srt::read(input.as_bytes()).unwrap_err();
    assert!(err.to_string().ends_with("at line 6"), "got: {}", err);
    assert!(matches!(err, SubtitleError::Parse(ParseError::Located { .. })));
}

/// Test that arrows in caption text survive a write and read
#[test]
fn test_write_thenRead_withArrowInText_shouldKeepText() -> Result<()> {
    let original = common::timeline_ms(&[(1_000, 2_000, "Paris --> London"), (3_000, 4_000, "Bye")]);
    let mut out = Vec::new();
    srt::write(&original, &mut out)?;

    let again = srt::read(out.as_slice())?;
    assert_eq!(common::triples(&again), common::triples(&original));
    Ok(())
}

/// Test that a time line straight after text still needs a blank line
#[test]
fn test_read_withMissingBlankLine_shouldReportTimeLine() {
    let input = "1\n00:00:01,000 --> 00:00:02,000\nHello\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n";
    let err = srt::read(input.as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        SubtitleError::Parse(ParseError::UnexpectedLine { line: 5, .. })
    ));
}

/// Test that lines without text are left out instead of ending the block
#[test]
fn test_write_withEmptyLine_shouldStayReadable() -> Result<()> {
    let original = Subtitles::new(vec![Subtitle::from_text(
        Duration::seconds(1),
        Duration::seconds(2),
        &["", "Hello"],
    )]);
    let mut out = Vec::new();
    srt::write(&original, &mut out)?;
    assert_eq!(
        String::from_utf8(out.clone())?,
        "\u{feff}1\n00:00:01,000 --> 00:00:02,000\nHello\n"
    );

    let again = srt::read(out.as_slice())?;
    assert_eq!(again.items[0].text_lines(), vec!["Hello"]);
    Ok(())
}

/// Test that a markup paragraph opening with a line break converts cleanly
#[test]
fn test_write_withMarkupLeadingBreak_shouldReadBack() -> Result<()> {
    let doc = r#"<tt><body><div><p begin="00:00:01.000" end="00:00:02.000"><br/>Hello</p></div></body></tt>"#;
    let markup = ttml::read(doc.as_bytes())?;
    assert_eq!(markup.items[0].text_lines(), vec!["", "Hello"]);

    let mut out = Vec::new();
    srt::write(&markup, &mut out)?;
    let again = srt::read(out.as_slice())?;
    assert_eq!(common::triples(&again), vec![(1_000, 2_000, "Hello".to_string())]);
    Ok(())
}

/// Test that writing and reading back keeps timings and text
#[test]
fn test_write_thenRead_shouldKeepTimingsAndText() -> Result<()> {
    let original = common::timeline_ms(&[(0, 1_250, "one"), (1_250, 2_000, "two"), (5_000, 5_000, "three")]);
    let mut out = Vec::new();
    srt::write(&original, &mut out)?;

    let again = srt::read(out.as_slice())?;
    assert_eq!(common::triples(&again), common::triples(&original));
    Ok(())
}

/// Test that empty timelines are refused
#[test]
fn test_write_withNoSubtitles_shouldFail() {
    let err = Srt.write(&Subtitles::default(), Vec::new()).unwrap_err();
    assert!(matches!(err, SubtitleError::NoSubtitlesToWrite));
}
