/*!
 * Integration tests for subtitle processing workflows
 */

use anyhow::Result;
use chrono::Duration;

use subtimeline::file_utils::FileManager;
use subtimeline::{Format, Subtitles};
use crate::common;

/// Test that we can load, reshape, and save subtitles in a full workflow
#[test]
fn test_subtitle_workflow_withFullProcess_shouldSucceed() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "source.srt")?;

    let mut subtitles = Subtitles::open(&input)?;
    assert_eq!(subtitles.items.len(), 3);
    assert_eq!(subtitles.duration(), Duration::seconds(14));

    subtitles.add(Duration::milliseconds(-500));
    subtitles.fragment(Duration::seconds(5));
    subtitles.force_duration(Duration::seconds(20));

    let output = FileManager::generate_output_path(&input, temp_dir.path(), "reshaped", "srt");
    subtitles.write(&output)?;

    let reloaded = Subtitles::open(&output)?;
    assert_eq!(common::triples(&reloaded), common::triples(&subtitles));
    assert_eq!(
        common::triples(&reloaded),
        vec![
            (500, 3_500, "This is a test subtitle.".to_string()),
            (4_500, 5_000, "It contains multiple entries.".to_string()),
            (5_000, 8_500, "It contains multiple entries.".to_string()),
            (9_500, 10_000, "For testing purposes.".to_string()),
            (10_000, 13_500, "For testing purposes.".to_string()),
            (20_000, 20_000, "...".to_string()),
        ]
    );
    Ok(())
}

/// Test converting the markup fixture to the line-oriented format and back
#[test]
fn test_convert_withMarkupFixture_shouldKeepTimingsAndText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let markup = Subtitles::open(common::test_resource_path("example.ttml"))?;

    let srt_path = temp_dir.path().join("converted.srt");
    markup.write(&srt_path)?;
    let line_oriented = Subtitles::open(&srt_path)?;
    assert_eq!(common::triples(&line_oriented), common::triples(&markup));
    assert!(!line_oriented.styles && !line_oriented.regions);

    let ttml_path = temp_dir.path().join("converted.ttml");
    line_oriented.write(&ttml_path)?;
    let back = Subtitles::open(&ttml_path)?;
    assert_eq!(common::triples(&back), common::triples(&markup));
    Ok(())
}

/// Test that both fixtures describe the same captions apart from frame rounding
#[test]
fn test_fixtures_withBothFormats_shouldAgreeOnText() -> Result<()> {
    let srt = Subtitles::open(common::test_resource_path("example.srt"))?;
    let ttml = Subtitles::open(common::test_resource_path("example.ttml"))?;

    assert_eq!(srt.items.len(), ttml.items.len());
    assert_eq!(srt.items[0], {
        let mut plain = ttml.items[0].clone();
        plain.region = None;
        plain
    });
    assert_eq!(srt.items[2].text_lines(), ttml.items[2].text_lines());
    Ok(())
}

/// Test merging two files of different formats
#[test]
fn test_merge_withMixedFormats_shouldCombineFlagsAndCaptions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut srt = Subtitles::open(common::test_resource_path("example.srt"))?;
    let ttml = Subtitles::open(common::test_resource_path("example.ttml"))?;

    srt.merge(&ttml);
    assert_eq!(srt.items.len(), 6);
    assert!(srt.styles && srt.regions);

    let output = temp_dir.path().join("merged.ttml");
    srt.write(&output)?;
    let back = Subtitles::open(&output)?;
    assert_eq!(back.items.len(), 6);
    assert!(back.styles && back.regions);
    Ok(())
}

/// Test that every supported format can be written to a file named after it
#[test]
fn test_write_withEveryFormat_shouldBeReadable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let subtitles = common::timeline_ms(&[(0, 900, "zero"), (1_000, 1_900, "one")]);

    for format in Format::ALL {
        let path = temp_dir.path().join(format!("all.{}", format.extension()));
        subtitles.write(&path)?;
        assert_eq!(Format::from_path(&path)?, format);
        assert_eq!(common::triples(&Subtitles::open(&path)?), common::triples(&subtitles));
    }
    Ok(())
}
