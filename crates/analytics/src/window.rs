//! Temporal window arithmetic.
//!
//! Single source of truth for the "enough time has elapsed" rule: a cell
//! whose measurement window has not fully elapsed must render as unknown
//! (`None`), never as zero. Every calculator derives its null cells from
//! [`has_elapsed`] and nowhere else.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Seconds in one day.
pub const DAY_SECS: i64 = 86_400;

/// Absolute `[start, end)` interval for the `day_offset`-th day after
/// `anchor`.
pub fn day_window(anchor: i64, day_offset: u32) -> (i64, i64) {
    let start = anchor + i64::from(day_offset) * DAY_SECS;
    (start, start + DAY_SECS)
}

/// Whether the `day_offset`-th day after `anchor` has fully elapsed as of
/// `now`.
pub fn has_elapsed(anchor: i64, day_offset: u32, now: i64) -> bool {
    let (_, end) = day_window(anchor, day_offset);
    end <= now
}

/// A registration-time cohort boundary: `[start, end)` epoch seconds,
/// labeled by start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortWindow {
    pub label: String,
    pub start: i64,
    pub end: i64,
}

impl CohortWindow {
    fn new(start: i64, end: i64) -> Self {
        Self {
            label: date_label(start),
            start,
            end,
        }
    }
}

/// `weeks` consecutive non-overlapping 7-day intervals ending at `now`,
/// oldest first. Windows with zero registered members are still returned;
/// downstream consumers render them as no-data rows, not errors.
pub fn weekly_cohort_windows(weeks: u32, now: i64) -> Vec<CohortWindow> {
    cohort_windows(weeks, 7 * DAY_SECS, now)
}

/// `days` consecutive 1-day intervals ending at `now`, oldest first.
pub fn daily_cohort_windows(days: u32, now: i64) -> Vec<CohortWindow> {
    cohort_windows(days, DAY_SECS, now)
}

fn cohort_windows(count: u32, span: i64, now: i64) -> Vec<CohortWindow> {
    (0..i64::from(count))
        .rev()
        .map(|i| {
            let end = now - i * span;
            CohortWindow::new(end - span, end)
        })
        .collect()
}

fn date_label(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| epoch.to_string())
}

/// Round to two decimal places, half away from zero.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn day_window_offsets_from_anchor() {
        let (start, end) = day_window(1000, 0);
        assert_eq!((start, end), (1000, 1000 + DAY_SECS));

        let (start, end) = day_window(1000, 3);
        assert_eq!(start, 1000 + 3 * DAY_SECS);
        assert_eq!(end, start + DAY_SECS);
    }

    #[test]
    fn has_elapsed_boundary_is_inclusive_of_end() {
        let anchor = NOW - 2 * DAY_SECS;
        // Day-1 window ends exactly at NOW.
        assert!(has_elapsed(anchor, 1, NOW));
        assert!(!has_elapsed(anchor, 1, NOW - 1));
        assert!(!has_elapsed(anchor, 2, NOW));
    }

    #[test]
    fn weekly_windows_tile_the_trailing_range_oldest_first() {
        let windows = weekly_cohort_windows(4, NOW);
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].start, NOW - 4 * 7 * DAY_SECS);
        assert_eq!(windows[3].end, NOW);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[1].end - pair[1].start, 7 * DAY_SECS);
        }
    }

    #[test]
    fn daily_windows_tile_the_trailing_range() {
        let windows = daily_cohort_windows(3, NOW);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].start, NOW - 3 * DAY_SECS);
        for w in &windows {
            assert_eq!(w.end - w.start, DAY_SECS);
        }
    }

    #[test]
    fn window_labels_are_start_dates() {
        // 2023-11-14T22:13:20Z
        let windows = daily_cohort_windows(1, NOW);
        assert_eq!(windows[0].label, "2023-11-13");
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(40.0), 40.0);
        assert_eq!(round2(66.6666), 66.67);
        assert_eq!(round2(60.784313), 60.78);
        // 0.125 is exact in binary; the half rounds up.
        assert_eq!(round2(0.125), 0.13);
    }
}
