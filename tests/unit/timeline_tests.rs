/*!
 * Tests for the timeline operations
 */

use chrono::Duration;

use subtimeline::{FILLER_TEXT, Subtitles};
use crate::common;

fn secs(s: i64) -> Duration {
    Duration::seconds(s)
}

/// Test the extend scenario
#[test]
fn test_force_duration_withLongerTarget_shouldAppendFiller() {
    let mut subtitles = common::timeline_secs(&[(1, 3, "A"), (3, 7, "B")]);
    subtitles.force_duration(secs(10));

    assert_eq!(subtitles.items.len(), 3);
    assert_eq!(subtitles.items[2].start_at, secs(10));
    assert_eq!(subtitles.items[2].end_at, secs(10));
    assert_eq!(subtitles.items[2].text_lines(), vec![FILLER_TEXT]);
    assert_eq!(subtitles.duration(), secs(10));
}

/// Test the truncate scenario
#[test]
fn test_force_duration_withShorterTarget_shouldClipLastCaption() {
    let mut subtitles = common::timeline_secs(&[(1, 3, "A"), (3, 7, "B")]);
    subtitles.items[1].start_at = secs(7);
    subtitles.items[1].end_at = secs(12);
    subtitles.force_duration(secs(10));

    assert_eq!(
        common::triples(&subtitles),
        vec![(1_000, 3_000, "A".to_string()), (7_000, 10_000, "B".to_string())]
    );
}

/// Test that an equal target changes nothing
#[test]
fn test_force_duration_withCurrentDuration_shouldBeNoOp() {
    let original = common::timeline_secs(&[(1, 3, "A"), (3, 7, "B")]);
    let mut subtitles = original.clone();
    subtitles.force_duration(secs(7));
    assert_eq!(subtitles, original);

    let mut empty = Subtitles::default();
    empty.force_duration(Duration::zero());
    assert!(empty.is_empty());
}

/// Test the fragment scenario
#[test]
fn test_fragment_withTwoSecondWindow_shouldSplitIntoFive() {
    let mut subtitles = common::timeline_secs(&[(1, 3, "A"), (3, 7, "B")]);
    subtitles.fragment(secs(2));

    assert_eq!(
        common::triples(&subtitles),
        vec![
            (1_000, 2_000, "A".to_string()),
            (2_000, 3_000, "A".to_string()),
            (3_000, 4_000, "B".to_string()),
            (4_000, 6_000, "B".to_string()),
            (6_000, 7_000, "B".to_string()),
        ]
    );
}

/// Test that pieces share the style of the caption they came from
#[test]
fn test_fragment_withStyledCaption_shouldCopyReferences() -> anyhow::Result<()> {
    let mut subtitles = subtimeline::ttml::read(std::fs::File::open(common::test_resource_path("example.ttml"))
        .map(std::io::BufReader::new)?)?;
    subtitles.fragment(secs(2));

    let pieces: Vec<_> = subtitles
        .items
        .iter()
        .filter(|s| s.style.as_ref().is_some_and(|style| style.id == "emphasis"))
        .collect();
    assert_eq!(pieces.len(), 3);
    assert!(pieces.iter().all(|p| p.lines == pieces[0].lines));
    Ok(())
}

/// Test that a window longer than the timeline changes nothing
#[test]
fn test_fragment_withHugeWindow_shouldChangeNothing() {
    let original = common::timeline_secs(&[(1, 3, "A"), (3, 7, "B")]);
    let mut subtitles = original.clone();
    subtitles.fragment(secs(60));
    assert_eq!(subtitles, original);

    let mut empty = Subtitles::default();
    empty.fragment(secs(1));
    assert!(empty.is_empty());
}

/// Test the merge scenario
#[test]
fn test_merge_withInterleavedTimelines_shouldSortByStart() {
    let mut a = common::timeline_secs(&[(1, 3, "a1"), (5, 8, "a2"), (10, 12, "a3")]);
    let b = common::timeline_secs(&[(2, 4, "b1"), (6, 7, "b2"), (9, 11, "b3"), (13, 14, "b4")]);
    a.merge(&b);

    let texts: Vec<String> = a.items.iter().map(|s| s.text_lines().join("")).collect();
    assert_eq!(texts, vec!["a1", "b1", "a2", "b2", "b3", "a3", "b4"]);
}

/// Test merging into an empty timeline
#[test]
fn test_merge_withEmptyTarget_shouldCopyOther() {
    let mut a = Subtitles::default();
    let b = common::timeline_secs(&[(2, 4, "b1"), (6, 7, "b2")]);
    a.merge(&b);
    assert_eq!(a, b);
}

/// Test that shifting back and forth is the identity
#[test]
fn test_add_withOppositeDeltas_shouldRestoreTimeline() {
    let original = common::timeline_ms(&[(0, 1_000, "A"), (1_500, 2_250, "B")]);
    let mut subtitles = original.clone();
    subtitles.add(Duration::milliseconds(3_333));
    assert_eq!(subtitles.items[1].start_at, Duration::milliseconds(4_833));
    subtitles.add(Duration::milliseconds(-3_333));
    assert_eq!(subtitles, original);
}
