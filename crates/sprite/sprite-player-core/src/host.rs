//! Host seams.
//!
//! The core never touches a DOM, a network stack, or a timer directly. Adapters
//! (web, tests) implement these traits and the loader/player/scheduler are
//! written against them:
//! - [`AssetSource`] fetches same-origin text assets.
//! - [`Cooperative`] hands control back to the host task queue between batches.
//! - [`RenderTree`] parses standalone markup documents into [`SpriteNode`]s.
//! - [`Stage`] owns per-container presentation (preview, mount, loading UI).
//! - [`Clock`] and [`FrameDriver`] feed the shared [`Scheduler`](crate::Scheduler).

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::progress::LoadingIndicator;

/// Frame visibility as written to the render tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Opacity {
    Hidden,
    Visible,
}

impl Opacity {
    /// Attribute value written for this opacity.
    #[inline]
    pub fn as_attr(self) -> &'static str {
        match self {
            Self::Hidden => "0",
            Self::Visible => "1",
        }
    }
}

/// A render-tree element owned by a player (frame group, background, sprite root).
/// Handles are cheap to clone and share the underlying element.
pub trait SpriteNode: Clone + 'static {
    fn set_opacity(&self, opacity: Opacity);
    /// Toggle whole-element visibility (used to keep the root hidden while it is built).
    fn set_visible(&self, visible: bool);
}

/// Parses markup and assembles the detached sprite tree.
pub trait RenderTree {
    type Node: SpriteNode;

    /// Parse a standalone document and return its root element.
    fn parse_document(&self, markup: &str) -> Result<Self::Node>;

    /// Find a descendant of `root` by element id.
    fn find_by_id(&self, root: &Self::Node, id: &str) -> Option<Self::Node>;

    /// Move `child` under `parent`, after any existing children.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;
}

/// Same-origin text fetches. Errors are reported as a human-readable reason;
/// the loader attaches the asset kind and path.
pub trait AssetSource {
    fn fetch_text(&self, path: &str) -> impl Future<Output = core::result::Result<String, String>>;
}

/// Cooperative suspension point between batches of synchronous work.
pub trait Cooperative {
    fn yield_now(&self) -> impl Future<Output = ()>;
}

/// Per-container presentation.
pub trait Stage: RenderTree {
    type Container: Clone + 'static;
    type Indicator: LoadingIndicator + 'static;

    /// Show standalone preview markup in the container.
    fn show_preview(&self, container: &Self::Container, markup: &str) -> Result<()>;

    /// Insert the fully built sprite root, reveal it, and remove any preview
    /// in one step.
    fn mount(&self, container: &Self::Container, root: &Self::Node) -> impl Future<Output = Result<()>>;

    /// Create the loading UI for one load attempt.
    fn loading_indicator(&self, container: &Self::Container) -> Self::Indicator;
}

/// Everything a player needs from its host.
pub trait SpriteHost: AssetSource + Cooperative + Stage + 'static {}

impl<T> SpriteHost for T where T: AssetSource + Cooperative + Stage + 'static {}

/// Monotonic millisecond clock (`performance.now()` on the web).
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Requests one scheduler tick on the next display frame.
pub trait FrameDriver {
    fn request_frame(&self);
}

/// Future that is pending exactly once, waking itself before returning.
#[derive(Debug, Default)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yield back to whatever executor is polling the current task.
pub fn yield_now() -> YieldNow {
    YieldNow::default()
}
