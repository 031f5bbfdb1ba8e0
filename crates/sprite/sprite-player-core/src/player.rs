//! Per-animation player: lifecycle, transport and frame visibility.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::host::{Opacity, SpriteHost, SpriteNode};
use crate::ids::{FrameId, PlayerId};
use crate::loader::{load_animation, show_preview, LoadedAnimation};
use crate::progress::{LoadOutcome, LoadingIndicator};
use crate::scheduler::{Scheduler, TickReceiver};
use crate::source::AnimationSource;
use crate::timeline::Timeline;

/// Shared handle that completes when a load attempt finishes.
pub type Readiness = Shared<LocalBoxFuture<'static, Result<()>>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    /// Last load attempt failed; `init()` may be called again.
    Failed,
}

/// Playback position of a ready player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    pub playing: bool,
    /// Wall-clock origin (ms) of the current run, set on the first tick after `play()`.
    pub start_time: Option<f64>,
    /// Seconds into the timeline to resume from.
    pub paused_offset: f64,
    pub current_frame: FrameId,
}

struct Animation<N> {
    frames: BTreeMap<FrameId, N>,
    timeline: Timeline,
    transport: Transport,
}

impl<N: SpriteNode> Animation<N> {
    fn show(&self, frame: FrameId, opacity: Opacity) {
        if let Some(node) = self.frames.get(&frame) {
            node.set_opacity(opacity);
        }
    }

    fn reset_to_first(&mut self) {
        self.transport.playing = false;
        self.transport.start_time = None;
        for node in self.frames.values() {
            node.set_opacity(Opacity::Hidden);
        }
        let first = self.timeline.first_frame();
        self.show(first, Opacity::Visible);
        self.transport.current_frame = first;
        self.transport.paused_offset = 0.0;
        self.timeline.reset_cursor();
    }
}

struct PlayerInner<H: SpriteHost> {
    id: PlayerId,
    source: AnimationSource,
    container: H::Container,
    host: Rc<H>,
    config: Rc<Config>,
    scheduler: Scheduler,
    state: Cell<LoadState>,
    readiness: RefCell<Option<Readiness>>,
    /// `None` until loaded, and for a player whose timeline came out empty.
    animation: RefCell<Option<Animation<H::Node>>>,
}

impl<H: SpriteHost> PlayerInner<H> {
    fn init(self: &Rc<Self>) -> Readiness {
        if matches!(self.state.get(), LoadState::Loading | LoadState::Ready) {
            log::warn!("animation {} is already initialized or loading", self.source.id);
            if let Some(ready) = self.readiness.borrow().as_ref() {
                return ready.clone();
            }
        }

        self.state.set(LoadState::Loading);
        let inner = Rc::clone(self);
        let ready = async move { inner.load().await }.boxed_local().shared();
        *self.readiness.borrow_mut() = Some(ready.clone());
        ready
    }

    async fn load(&self) -> Result<()> {
        log::debug!("loading animation {}", self.source.id);
        let mut indicator = self.host.loading_indicator(&self.container);

        let result = self.load_and_mount(&mut indicator).await;
        match &result {
            Ok(()) => {
                self.state.set(LoadState::Ready);
                indicator.cleanup(LoadOutcome::Loaded);
                log::debug!("animation {} ready", self.source.id);
            }
            Err(err) => {
                self.animation.borrow_mut().take();
                self.state.set(LoadState::Failed);
                indicator.cleanup(LoadOutcome::Failed);
                log::error!("failed to load animation {}: {err}", self.source.id);
            }
        }
        result
    }

    async fn load_and_mount(&self, indicator: &mut dyn LoadingIndicator) -> Result<()> {
        let LoadedAnimation {
            root,
            frames,
            timeline,
        } = load_animation(&*self.host, &self.source, &self.config, indicator).await?;

        match timeline {
            Some(timeline) => {
                let first = timeline.first_frame();
                let mut animation = Animation {
                    frames,
                    timeline,
                    transport: Transport {
                        playing: false,
                        start_time: None,
                        paused_offset: 0.0,
                        current_frame: first,
                    },
                };
                animation.reset_to_first();
                *self.animation.borrow_mut() = Some(animation);
            }
            None => log::warn!("animation {} has no playable frames", self.source.id),
        }

        self.host.mount(&self.container, &root).await
    }

    fn is_ready(&self) -> bool {
        self.state.get() == LoadState::Ready
    }

    fn play(self: &Rc<Self>) {
        if !self.is_ready() {
            log::warn!("player {} not ready, call init() first", self.source.id);
            return;
        }
        {
            let mut animation = self.animation.borrow_mut();
            let Some(animation) = animation.as_mut() else {
                return;
            };
            if animation.transport.playing {
                return;
            }
            animation.transport.playing = true;
            animation.transport.start_time = None;
        }
        let receiver: Rc<dyn TickReceiver> = self.clone();
        self.scheduler.join(self.id, receiver);
    }

    fn pause(&self) {
        if !self.is_ready() {
            return;
        }
        if self.halt() {
            self.scheduler.leave(self.id);
        }
    }

    /// Stop the transport, remembering the position. Returns whether it was playing.
    fn halt(&self) -> bool {
        let mut animation = self.animation.borrow_mut();
        let Some(animation) = animation.as_mut() else {
            return false;
        };
        if !animation.transport.playing {
            return false;
        }
        if let Some(start) = animation.transport.start_time {
            let elapsed = (self.scheduler.now_ms() - start) / 1000.0;
            animation.transport.paused_offset =
                elapsed.rem_euclid(animation.timeline.total_duration());
        }
        animation.transport.playing = false;
        true
    }

    fn show_first_frame(&self) {
        if !self.is_ready() {
            return;
        }
        self.pause();
        if let Some(animation) = self.animation.borrow_mut().as_mut() {
            animation.reset_to_first();
        }
    }

    fn goto_frame(&self, frame: FrameId) {
        if !self.is_ready() {
            return;
        }
        let known = self
            .animation
            .borrow()
            .as_ref()
            .is_some_and(|a| a.frames.contains_key(&frame));
        if !known {
            return;
        }
        self.pause();
        if let Some(animation) = self.animation.borrow_mut().as_mut() {
            let current = animation.transport.current_frame;
            animation.show(current, Opacity::Hidden);
            animation.show(frame, Opacity::Visible);
            animation.transport.current_frame = frame;
            if let Some(start) = animation.timeline.start_time_of(frame) {
                animation.transport.paused_offset = start;
            }
        }
    }

    /// Returns whether a visibility write happened.
    fn update(&self, timestamp_ms: f64) -> bool {
        let mut animation = self.animation.borrow_mut();
        let Some(Animation {
            frames,
            timeline,
            transport,
        }) = animation.as_mut()
        else {
            return false;
        };
        if !transport.playing {
            return false;
        }

        let start = *transport
            .start_time
            .get_or_insert(timestamp_ms - transport.paused_offset * 1000.0);
        let elapsed = (timestamp_ms - start) / 1000.0;
        let next = timeline.frame_at(elapsed.rem_euclid(timeline.total_duration()));
        if next == transport.current_frame {
            return false;
        }

        if let Some(node) = frames.get(&transport.current_frame) {
            node.set_opacity(Opacity::Hidden);
        }
        if let Some(node) = frames.get(&next) {
            node.set_opacity(Opacity::Visible);
        }
        transport.current_frame = next;
        true
    }

    async fn load_preview(&self) {
        let result = show_preview(&*self.host, &self.container, &self.source, &self.config);
        if let Err(err) = result.await {
            log::warn!("preview not found for {}: {err}", self.source.id);
        }
    }
}

impl<H: SpriteHost> TickReceiver for PlayerInner<H> {
    fn advance(&self, timestamp_ms: f64) {
        self.update(timestamp_ms);
    }

    fn stopped(&self) {
        self.halt();
    }
}

/// Handle to one animation. Clones share the same player.
pub struct SpritePlayer<H: SpriteHost> {
    inner: Rc<PlayerInner<H>>,
}

impl<H: SpriteHost> Clone for SpritePlayer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: SpriteHost> SpritePlayer<H> {
    pub fn new(
        id: PlayerId,
        source: AnimationSource,
        container: H::Container,
        host: Rc<H>,
        config: Rc<Config>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            inner: Rc::new(PlayerInner {
                id,
                source,
                container,
                host,
                config,
                scheduler,
                state: Cell::new(LoadState::Uninitialized),
                readiness: RefCell::new(None),
                animation: RefCell::new(None),
            }),
        }
    }

    /// Start loading, or return the in-flight/completed load.
    ///
    /// The returned future resolves to this player once the sprite is built
    /// and mounted. Loading makes progress whenever any clone of the readiness
    /// handle is polled. After a failed load, calling `init()` again retries.
    pub fn init(&self) -> LocalBoxFuture<'static, Result<Self>> {
        let ready = self.inner.init();
        let this = self.clone();
        async move {
            ready.await?;
            Ok(this)
        }
        .boxed_local()
    }

    /// Readiness handle of the latest load attempt, if any.
    pub fn readiness(&self) -> Option<Readiness> {
        self.inner.readiness.borrow().clone()
    }

    /// Start or resume playback. Warns when the player is not loaded yet.
    pub fn play(&self) {
        self.inner.play();
    }

    /// Stop playback, remembering the position for the next `play()`.
    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Pause on the timeline's first entry with a zero offset.
    pub fn show_first_frame(&self) {
        self.inner.show_first_frame();
    }

    /// Pause on `frame`; ignored when the frame is not in the timeline.
    pub fn goto_frame(&self, frame: u32) {
        self.inner.goto_frame(FrameId(frame));
    }

    /// Resolve the frame for `timestamp_ms` and swap visibility if it changed.
    /// Returns whether anything was written.
    pub fn update(&self, timestamp_ms: f64) -> bool {
        self.inner.update(timestamp_ms)
    }

    /// Show the preview; failures are logged and swallowed.
    pub async fn load_preview(&self) {
        self.inner.load_preview().await;
    }

    #[inline]
    pub fn id(&self) -> PlayerId {
        self.inner.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.source.id
    }

    #[inline]
    pub fn source(&self) -> &AnimationSource {
        &self.inner.source
    }

    #[inline]
    pub fn container(&self) -> &H::Container {
        &self.inner.container
    }

    #[inline]
    pub fn state(&self) -> LoadState {
        self.inner.state.get()
    }

    pub fn transport(&self) -> Option<Transport> {
        self.inner.animation.borrow().as_ref().map(|a| a.transport)
    }

    pub fn is_playing(&self) -> bool {
        self.transport().is_some_and(|t| t.playing)
    }

    pub fn current_frame(&self) -> Option<FrameId> {
        self.transport().map(|t| t.current_frame)
    }

    pub fn paused_offset(&self) -> Option<f64> {
        self.transport().map(|t| t.paused_offset)
    }

    pub fn total_duration(&self) -> Option<f64> {
        self.inner
            .animation
            .borrow()
            .as_ref()
            .map(|a| a.timeline.total_duration())
    }

    /// Number of timeline entries (0 until loaded or when nothing is playable).
    pub fn frame_count(&self) -> usize {
        self.inner
            .animation
            .borrow()
            .as_ref()
            .map_or(0, |a| a.timeline.len())
    }
}
