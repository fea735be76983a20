/*!
 * Timeline operations on an in-memory `Subtitles` value.
 *
 * None of these perform I/O or fail. They assume entries ascending by
 * `start_at` with `start_at <= end_at`; other inputs give a deterministic but
 * unspecified result.
 */

use chrono::Duration;
use log::{debug, trace, warn};

use crate::subtitles::{Subtitle, Subtitles};

/// Placeholder text of the caption appended by `force_duration`
pub const FILLER_TEXT: &str = "...";

impl Subtitles {
    /// End of the last caption, zero when empty
    pub fn duration(&self) -> Duration {
        self.items.last().map_or_else(Duration::zero, |s| s.end_at)
    }

    /// Shifts every caption by a signed offset
    pub fn add(&mut self, delta: Duration) {
        for subtitle in &mut self.items {
            subtitle.start_at += delta;
            subtitle.end_at += delta;
        }
    }

    /// Clips or pads the timeline so that `duration()` equals `target`
    pub fn force_duration(&mut self, target: Duration) {
        self.force_duration_with_filler(target, FILLER_TEXT);
    }

    /// Same as `force_duration` with a caller-chosen filler text
    pub fn force_duration_with_filler(&mut self, target: Duration, filler: &str) {
        if self.duration() == target {
            return;
        }

        if self.duration() > target {
            let keep = self
                .items
                .iter()
                .position(|s| s.start_at >= target)
                .unwrap_or(self.items.len());
            self.items.truncate(keep);
            for subtitle in &mut self.items {
                if subtitle.end_at > target {
                    subtitle.end_at = target;
                }
            }
        }

        if self.duration() < target {
            debug!("Padding timeline up to {}ms", target.num_milliseconds());
            self.items.push(Subtitle::from_text(target, target, &[filler]));
        }
    }

    /// Splits captions straddling multiples of `window`.
    ///
    /// Boundaries run from zero up to the first multiple at or after the end
    /// of the last caption. A boundary equal to a caption's start or end does
    /// not split it.
    pub fn fragment(&mut self, window: Duration) {
        if self.items.is_empty() || window <= Duration::zero() {
            return;
        }
        let (Some(step), Some(last_end)) = (window.num_nanoseconds(), self.duration().num_nanoseconds()) else {
            warn!("Timeline too long to fragment with a {}ms window", window.num_milliseconds());
            return;
        };
        if last_end <= 0 {
            return;
        }
        let limit = last_end
            .checked_add(step - 1)
            .map_or(i64::MAX, |rounded| rounded / step * step);

        let mut fragmented = Vec::with_capacity(self.items.len());
        for subtitle in self.items.drain(..) {
            let cuts = boundaries_within(&subtitle, step, limit);
            if cuts.is_empty() {
                fragmented.push(subtitle);
                continue;
            }

            trace!(
                "Splitting caption [{}ms, {}ms] at {} boundaries",
                subtitle.start_at.num_milliseconds(),
                subtitle.end_at.num_milliseconds(),
                cuts.len()
            );
            let mut piece_start = subtitle.start_at;
            for cut in cuts {
                let mut piece = subtitle.clone();
                piece.start_at = piece_start;
                piece.end_at = cut;
                fragmented.push(piece);
                piece_start = cut;
            }
            let mut tail = subtitle;
            tail.start_at = piece_start;
            fragmented.push(tail);
        }
        self.items = fragmented;
    }

    /// Inserts every caption of `other`, keeping the result ascending by start.
    ///
    /// Ties go after the existing captions starting at the same time.
    pub fn merge(&mut self, other: &Subtitles) {
        self.regions |= other.regions;
        self.styles |= other.styles;

        for subtitle in &other.items {
            let at = self.items.partition_point(|s| s.start_at <= subtitle.start_at);
            self.items.insert(at, subtitle.clone());
        }

        let overlaps = self
            .items
            .windows(2)
            .filter(|pair| pair[1].start_at < pair[0].end_at)
            .count();
        if overlaps > 0 {
            warn!("Merged timeline has {} overlapping caption pairs", overlaps);
        }
    }
}

// Multiples of `step` (in nanoseconds) strictly inside the caption, capped at `limit`
fn boundaries_within(subtitle: &Subtitle, step: i64, limit: i64) -> Vec<Duration> {
    let (Some(start), Some(end)) = (subtitle.start_at.num_nanoseconds(), subtitle.end_at.num_nanoseconds()) else {
        return Vec::new();
    };
    let end = end.min(limit.saturating_add(1));
    let first = start.div_euclid(step).saturating_add(1).max(0);

    (first..)
        .map_while(|k| k.checked_mul(step))
        .take_while(|&b| b < end)
        .map(Duration::nanoseconds)
        .collect()
}
