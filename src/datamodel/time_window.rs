use hifitime::{Duration, Epoch};
use std::fmt;

/// The query window shared by every fetch of a run.
///
/// `start <= end` is expected but not enforced, an inverted window is sent
/// as is and the remote API decides what to answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: Epoch,
    pub end: Epoch,
    /// Bucket width of each datapoint
    pub period_seconds: u32,
}

impl TimeWindow {
    pub fn new(start: Epoch, end: Epoch, period_seconds: u32) -> Self {
        Self {
            start,
            end,
            period_seconds,
        }
    }

    /// Builds a window from optional bounds.
    ///
    /// A missing bound is placed `default_length` away from the other one,
    /// and when both are missing the window ends at `now`.
    pub fn resolve(
        start: Option<Epoch>,
        end: Option<Epoch>,
        default_length: Duration,
        now: Epoch,
        period_seconds: u32,
    ) -> Self {
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, start + default_length),
            (None, Some(end)) => (end - default_length, end),
            (None, None) => (now - default_length, now),
        };
        Self::new(start, end, period_seconds)
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hifitime::Unit;

    fn day(d: u8) -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2016, 1, d)
    }

    #[test]
    fn test_resolve_both_bounds() {
        let window = TimeWindow::resolve(
            Some(day(18)),
            Some(day(20)),
            Unit::Hour * 24_i64,
            day(1),
            300,
        );
        assert_eq!(window.start, day(18));
        assert_eq!(window.end, day(20));
        assert_eq!(window.period_seconds, 300);
    }

    #[test]
    fn test_resolve_without_bounds_looks_back_from_now() {
        let window = TimeWindow::resolve(None, None, Unit::Hour * 24_i64, day(20), 60);
        assert_eq!(window.start, day(19));
        assert_eq!(window.end, day(20));
        assert!(!window.is_inverted());
    }

    #[test]
    fn test_resolve_single_bound() {
        let only_start = TimeWindow::resolve(
            Some(day(18)),
            None,
            Unit::Hour * 48_i64,
            day(1),
            60,
        );
        assert_eq!(only_start.start, day(18));
        assert_eq!(only_start.end, day(20));

        let only_end = TimeWindow::resolve(
            None,
            Some(day(20)),
            Unit::Hour * 24_i64,
            day(1),
            60,
        );
        assert_eq!(only_end.start, day(19));
        assert_eq!(only_end.end, day(20));
    }

    #[test]
    fn test_inverted_window_is_kept() {
        let window = TimeWindow::resolve(
            Some(day(20)),
            Some(day(18)),
            Unit::Hour * 24_i64,
            day(1),
            60,
        );
        assert!(window.is_inverted());
        assert_eq!(window.start, day(20));
    }
}
