//! Load orchestration: fetch → parse → attach → build.
//!
//! Everything that can fail while bringing an animation up happens here and
//! is returned as a [`PlayerError`]; callers decide how to contain it.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::{PlayerError, Result};
use crate::frames::attach_sprite;
use crate::host::{AssetSource, Cooperative, RenderTree, SpriteHost};
use crate::ids::FrameId;
use crate::progress::{
    LoadingIndicator, ProgressTracker, PROGRESS_COMPLETE, PROGRESS_SPRITE_FETCHED,
    PROGRESS_STARTED, PROGRESS_TIMELINE_LOADED,
};
use crate::source::AnimationSource;
use crate::sprite::parse_sprite;
use crate::timeline::{parse_timeline_resource, retain_known, Timeline, TimelineEntry};

/// A fully built animation, not yet mounted.
#[derive(Debug)]
pub struct LoadedAnimation<N> {
    /// Detached sprite root carrying the background and every frame.
    pub root: N,
    /// Frames the timeline references.
    pub frames: BTreeMap<FrameId, N>,
    /// `None` when no timeline entry survived cross-referencing.
    pub timeline: Option<Timeline>,
}

/// Run the whole load sequence for one animation, reporting progress to `indicator`.
pub async fn load_animation<H>(
    host: &H,
    source: &AnimationSource,
    config: &Config,
    indicator: &mut dyn LoadingIndicator,
) -> Result<LoadedAnimation<H::Node>>
where
    H: AssetSource + Cooperative + RenderTree + ?Sized,
{
    let mut progress = ProgressTracker::new(indicator);
    progress.report(PROGRESS_STARTED);

    let timeline_path = source.timeline_path(config);
    let timeline_text = host
        .fetch_text(&timeline_path)
        .await
        .map_err(|reason| PlayerError::TimelineFetch {
            path: timeline_path.clone(),
            reason,
        })?;
    let entries = parse_timeline_resource(&timeline_text, &source.timeline_binding())?;
    log::debug!("{}: {} timeline entries", source.id, entries.len());
    progress.report(PROGRESS_TIMELINE_LOADED);

    let sprite_path = source.sprite_path(config);
    let sprite_text = host
        .fetch_text(&sprite_path)
        .await
        .map_err(|reason| PlayerError::SpriteFetch {
            path: sprite_path.clone(),
            reason,
        })?;
    progress.report(PROGRESS_SPRITE_FETCHED);

    let doc = parse_sprite(&sprite_text, host, config.parse_batch_size, &mut progress).await;
    let attached = attach_sprite(host, &doc, config.attach_batch_size, &mut progress).await?;

    let timeline = build_timeline(
        host,
        entries,
        |frame| attached.contains(frame),
        config.build_batch_size,
    )
    .await;

    let mut frames = attached.frames;
    match &timeline {
        Some(timeline) => frames.retain(|frame, _| timeline.contains(*frame)),
        None => frames.clear(),
    }
    progress.report(PROGRESS_COMPLETE);

    Ok(LoadedAnimation {
        root: attached.root,
        frames,
        timeline,
    })
}

/// Cross-reference timeline entries against the attached frames in batches,
/// yielding before each batch.
pub async fn build_timeline<Y>(
    yielder: &Y,
    entries: Vec<TimelineEntry>,
    known: impl Fn(FrameId) -> bool,
    batch_size: usize,
) -> Option<Timeline>
where
    Y: Cooperative + ?Sized,
{
    let mut kept = Vec::with_capacity(entries.len());
    for chunk in entries.chunks(batch_size.max(1)) {
        yielder.yield_now().await;
        retain_known(chunk.iter().copied(), &known, &mut kept);
    }
    Timeline::new(kept)
}

/// Fetch the preview and hand it to the stage.
pub async fn show_preview<H>(
    host: &H,
    container: &H::Container,
    source: &AnimationSource,
    config: &Config,
) -> Result<()>
where
    H: SpriteHost,
{
    let path = source.preview_path(config);
    let markup = host
        .fetch_text(&path)
        .await
        .map_err(|reason| PlayerError::PreviewFetch {
            path: path.clone(),
            reason,
        })?;
    host.show_preview(container, &markup)
}
