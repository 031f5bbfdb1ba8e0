//! Sprite Player Core (host-agnostic)
//!
//! Plays SVG sprite-sheet animations: one SVG packs every frame as a sibling
//! `<g id="frame_<n>">` group and a timeline lists `(frame, duration)` holds.
//! This crate owns parsing, incremental attachment, timeline lookup, the
//! per-animation player state machine, and the shared fixed-timestep loop.
//! Hosts (the web adapter, tests) plug in through the traits in [`host`].

pub mod config;
pub mod error;
pub mod frames;
pub mod host;
pub mod ids;
pub mod loader;
pub mod player;
pub mod progress;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod sprite;
pub mod stats;
pub mod timeline;

// Re-exports for consumers (adapters)
pub use config::Config;
pub use error::{PlayerError, Result};
pub use frames::{attach_sprite, AttachedSprite};
pub use host::{
    yield_now, AssetSource, Clock, Cooperative, FrameDriver, Opacity, RenderTree, SpriteHost,
    SpriteNode, Stage,
};
pub use ids::{FrameId, IdAllocator, PlayerId};
pub use loader::{load_animation, LoadedAnimation};
pub use player::{LoadState, Readiness, SpritePlayer, Transport};
pub use progress::{LoadOutcome, LoadingIndicator, NoIndicator, ProgressTracker};
pub use registry::PlayerRegistry;
pub use scheduler::{Scheduler, TickReceiver, TickReport, WeakScheduler};
pub use source::{AnimationSource, ContainerAttributes};
pub use sprite::{parse_sprite, FrameFragment, SpriteDocument};
pub use stats::{FrameStats, FrameTimeBuckets};
pub use timeline::{parse_timeline_resource, Timeline, TimelineEntry};
