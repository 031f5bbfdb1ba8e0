//! Frame-time accounting for the shared loop.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::Config;

const ROLLING_WINDOW: usize = 60;

/// Upper bounds (inclusive, ms) of the distribution buckets; the last bucket is open.
pub const BUCKET_BOUNDS_MS: [f64; 4] = [20.0, 30.0, 50.0, 100.0];

/// Frame-time distribution in buckets `<=20`, `<=30`, `<=50`, `<=100`, `>100` ms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTimeBuckets {
    pub le_20: u64,
    pub le_30: u64,
    pub le_50: u64,
    pub le_100: u64,
    pub gt_100: u64,
}

impl FrameTimeBuckets {
    fn record(&mut self, delta_ms: f64) {
        let slot = match BUCKET_BOUNDS_MS.iter().position(|&b| delta_ms <= b) {
            Some(0) => &mut self.le_20,
            Some(1) => &mut self.le_30,
            Some(2) => &mut self.le_50,
            Some(3) => &mut self.le_100,
            _ => &mut self.gt_100,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u64 {
        self.le_20 + self.le_30 + self.le_50 + self.le_100 + self.gt_100
    }
}

/// Counters fed with every scheduler tick's delta.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub total_frames: u64,
    /// Frames slower than the stutter threshold.
    pub dropped_frames: u64,
    /// Frames slower than the bad-frame threshold.
    pub stutters: u64,
    pub max_frame_time_ms: f64,
    pub average_frame_time_ms: f64,
    pub buckets: FrameTimeBuckets,
    #[serde(skip)]
    recent: VecDeque<f64>,
    #[serde(skip)]
    dropped_threshold_ms: f64,
    #[serde(skip)]
    stutter_threshold_ms: f64,
}

impl FrameStats {
    pub fn new(config: &Config) -> Self {
        Self {
            total_frames: 0,
            dropped_frames: 0,
            stutters: 0,
            max_frame_time_ms: 0.0,
            average_frame_time_ms: 0.0,
            buckets: FrameTimeBuckets::default(),
            recent: VecDeque::with_capacity(ROLLING_WINDOW),
            dropped_threshold_ms: config.stutter_threshold_ms,
            stutter_threshold_ms: config.bad_frame_threshold_ms,
        }
    }

    pub fn record(&mut self, delta_ms: f64) {
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            return;
        }
        self.total_frames += 1;
        self.buckets.record(delta_ms);
        self.max_frame_time_ms = self.max_frame_time_ms.max(delta_ms);

        if delta_ms > self.dropped_threshold_ms {
            self.dropped_frames += 1;
        }
        if delta_ms > self.stutter_threshold_ms {
            self.stutters += 1;
            log::warn!("stutter: frame took {delta_ms:.1}ms");
        }

        if self.recent.len() == ROLLING_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(delta_ms);
        self.average_frame_time_ms = self.recent.iter().sum::<f64>() / self.recent.len() as f64;
    }

    /// Share of recorded frames that were dropped, in `[0, 1]`.
    pub fn drop_rate(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.dropped_frames as f64 / self.total_frames as f64
        }
    }

    pub fn reset(&mut self) {
        let config = Config {
            stutter_threshold_ms: self.dropped_threshold_ms,
            bad_frame_threshold_ms: self.stutter_threshold_ms,
            ..Config::default()
        };
        *self = Self::new(&config);
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_frames_against_thresholds() {
        let mut stats = FrameStats::default();
        for delta in [16.7, 26.0, 41.0, 120.0] {
            stats.record(delta);
        }
        assert_eq!(stats.total_frames, 4);
        assert_eq!(stats.dropped_frames, 3);
        assert_eq!(stats.stutters, 2);
        assert_eq!(stats.max_frame_time_ms, 120.0);
        assert_eq!(
            stats.buckets,
            FrameTimeBuckets {
                le_20: 1,
                le_30: 1,
                le_50: 1,
                le_100: 0,
                gt_100: 1,
            }
        );
        assert_eq!(stats.drop_rate(), 0.75);
    }

    #[test]
    fn bucket_bounds_are_inclusive() {
        let mut stats = FrameStats::default();
        for delta in BUCKET_BOUNDS_MS {
            stats.record(delta);
        }
        assert_eq!(stats.buckets.le_20, 1);
        assert_eq!(stats.buckets.le_100, 1);
        assert_eq!(stats.buckets.gt_100, 0);
    }

    #[test]
    fn average_covers_the_last_sixty_frames() {
        let mut stats = FrameStats::default();
        for _ in 0..ROLLING_WINDOW {
            stats.record(100.0);
        }
        for _ in 0..ROLLING_WINDOW {
            stats.record(10.0);
        }
        assert_eq!(stats.average_frame_time_ms, 10.0);
        assert_eq!(stats.max_frame_time_ms, 100.0);
    }

    #[test]
    fn ignores_invalid_deltas_and_resets() {
        let mut stats = FrameStats::default();
        stats.record(f64::NAN);
        stats.record(-3.0);
        assert_eq!(stats.total_frames, 0);
        stats.record(50.0);
        stats.reset();
        assert_eq!(stats.total_frames, 0);
        assert_eq!(stats.buckets.total(), 0);
    }

    #[test]
    fn serializes_public_counters() {
        let mut stats = FrameStats::default();
        stats.record(12.0);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalFrames"], 1);
        assert_eq!(json["buckets"]["le_20"], 1);
        assert!(json.get("recent").is_none());
    }
}
