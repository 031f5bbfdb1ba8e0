//! Load progress reporting.
//!
//! Milestones on the 0..=100 scale shared by every load:
//! 5 started, 15 timeline loaded, 25 sprite fetched, 25..50 parse,
//! 60..90 attach, 100 timeline built.

use serde::{Deserialize, Serialize};

pub const PROGRESS_STARTED: f64 = 5.0;
pub const PROGRESS_TIMELINE_LOADED: f64 = 15.0;
pub const PROGRESS_SPRITE_FETCHED: f64 = 25.0;
pub const PROGRESS_PARSE_END: f64 = 50.0;
pub const PROGRESS_ATTACH_START: f64 = 60.0;
pub const PROGRESS_ATTACH_END: f64 = 90.0;
pub const PROGRESS_COMPLETE: f64 = 100.0;

/// How a load attempt ended, passed to [`LoadingIndicator::cleanup`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

/// Progress sink for one load attempt (the loading overlay on the web).
pub trait LoadingIndicator {
    fn update_progress(&mut self, percent: f64);
    fn cleanup(&mut self, outcome: LoadOutcome);
}

/// Indicator that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl LoadingIndicator for NoIndicator {
    fn update_progress(&mut self, _percent: f64) {}
    fn cleanup(&mut self, _outcome: LoadOutcome) {}
}

/// Forwards progress to an indicator, clamped to `[0, 100]` and never moving backwards.
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn LoadingIndicator,
    last: f64,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn LoadingIndicator) -> Self {
        Self { sink, last: 0.0 }
    }

    pub fn report(&mut self, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        let percent = percent.clamp(0.0, PROGRESS_COMPLETE);
        if percent > self.last {
            self.last = percent;
            self.sink.update_progress(percent);
        }
    }

    /// Last value forwarded to the sink.
    #[inline]
    pub fn last(&self) -> f64 {
        self.last
    }
}

/// Linear position `fraction` of the way through `[start, end]`.
#[inline]
pub fn band(start: f64, end: f64, fraction: f64) -> f64 {
    start + (end - start) * fraction.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<f64>);

    impl LoadingIndicator for Log {
        fn update_progress(&mut self, percent: f64) {
            self.0.push(percent);
        }
        fn cleanup(&mut self, _outcome: LoadOutcome) {}
    }

    #[test]
    fn tracker_is_monotonic_and_clamped() {
        let mut log = Log::default();
        {
            let mut tracker = ProgressTracker::new(&mut log);
            tracker.report(20.0);
            tracker.report(10.0);
            tracker.report(f64::NAN);
            tracker.report(150.0);
            assert_eq!(tracker.last(), 100.0);
        }
        assert_eq!(log.0, vec![20.0, 100.0]);
    }

    #[test]
    fn band_interpolates_and_clamps() {
        assert_eq!(band(60.0, 90.0, 0.5), 75.0);
        assert_eq!(band(60.0, 90.0, 2.0), 90.0);
    }
}
