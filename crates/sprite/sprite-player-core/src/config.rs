//! Core configuration for sprite-player-core.

use serde::{Deserialize, Serialize};

/// Configuration for loading, scheduling, and frame-time accounting.
/// Every field has a default so hosts can pass partial JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logic update rate of the shared scheduler, independent of display refresh.
    pub fixed_fps: f64,

    /// Frame groups matched by the sprite parser between two yields.
    pub parse_batch_size: usize,
    /// Frame fragments parsed and attached per batch.
    pub attach_batch_size: usize,
    /// Timeline entries cross-referenced per batch.
    pub build_batch_size: usize,

    /// Asset file names resolved against each animation's base path.
    pub preview_file: String,
    pub sprite_file: String,
    pub timeline_file: String,

    /// CSS selector used by hosts to discover animation containers.
    pub container_selector: String,

    /// Frame time (ms) above which a frame counts as dropped.
    pub stutter_threshold_ms: f64,
    /// Frame time (ms) above which a dropped frame counts as a stutter.
    pub bad_frame_threshold_ms: f64,

    /// Delay before the loading overlay is removed after a successful load.
    pub overlay_cleanup_delay_ms: u32,
}

impl Config {
    /// Milliseconds per logic update.
    #[inline]
    pub fn fixed_timestep_ms(&self) -> f64 {
        1000.0 / self.fixed_fps.max(f64::EPSILON)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixed_fps: 24.0,
            parse_batch_size: 5,
            attach_batch_size: 10,
            build_batch_size: 20,
            preview_file: "preview.svg".into(),
            sprite_file: "sprite.svg".into(),
            timeline_file: "timeline.js".into(),
            container_selector: ".svg-animation-container".into(),
            stutter_threshold_ms: 25.0,
            bad_frame_threshold_ms: 40.0,
            overlay_cleanup_delay_ms: 300,
        }
    }
}
