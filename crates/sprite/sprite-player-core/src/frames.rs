//! Frame registry: attaches parsed fragments to a detached sprite root.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::host::{Cooperative, Opacity, RenderTree, SpriteNode};
use crate::ids::FrameId;
use crate::progress::{band, ProgressTracker, PROGRESS_ATTACH_END, PROGRESS_ATTACH_START};
use crate::sprite::SpriteDocument;

/// Detached sprite tree plus the frame-id → element index.
#[derive(Clone, Debug)]
pub struct AttachedSprite<N> {
    /// Root element, hidden until it is mounted.
    pub root: N,
    pub background: Option<N>,
    pub frames: BTreeMap<FrameId, N>,
}

impl<N> AttachedSprite<N> {
    #[inline]
    pub fn contains(&self, frame: FrameId) -> bool {
        self.frames.contains_key(&frame)
    }

    #[inline]
    pub fn frame(&self, frame: FrameId) -> Option<&N> {
        self.frames.get(&frame)
    }
}

/// Build the detached sprite: background first (forced visible), then every
/// frame in source order (forced hidden).
///
/// Frames are parsed `batch_size` at a time as one standalone document wrapped
/// in the sprite header, with a yield before each batch, so no single
/// synchronous step grows with the size of the sheet. A batch that fails to
/// parse is skipped with a warning; its frames are simply missing.
pub async fn attach_sprite<H>(
    host: &H,
    doc: &SpriteDocument,
    batch_size: usize,
    progress: &mut ProgressTracker<'_>,
) -> Result<AttachedSprite<H::Node>>
where
    H: RenderTree + Cooperative + ?Sized,
{
    let batch_size = batch_size.max(1);

    let root = host.parse_document(&doc.wrap(""))?;
    root.set_visible(false);
    progress.report(PROGRESS_ATTACH_START);

    let background = match &doc.background {
        Some(markup) => {
            let isolated = host.parse_document(&doc.wrap(markup))?;
            match host.find_by_id(&isolated, "background") {
                Some(el) => {
                    el.set_opacity(Opacity::Visible);
                    host.append_child(&root, &el)?;
                    Some(el)
                }
                None => {
                    log::warn!("background group did not survive re-parsing");
                    None
                }
            }
        }
        None => None,
    };

    let total = doc.frames.len();
    let mut frames = BTreeMap::new();
    let mut attached = 0usize;

    for chunk in doc.frames.chunks(batch_size) {
        host.yield_now().await;

        let body = chunk
            .iter()
            .map(|f| f.markup.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        match host.parse_document(&doc.wrap(&body)) {
            Ok(batch_doc) => {
                for fragment in chunk {
                    match host.find_by_id(&batch_doc, &fragment.element_id) {
                        Some(el) => {
                            el.set_opacity(Opacity::Hidden);
                            host.append_child(&root, &el)?;
                            frames.insert(fragment.id, el);
                        }
                        None => log::warn!("{} did not survive re-parsing", fragment.element_id),
                    }
                }
            }
            Err(err) => {
                let first = chunk.first().map_or("", |f| f.element_id.as_str());
                log::warn!(
                    "skipping {} frames starting at {first}: {err}",
                    chunk.len()
                );
            }
        }

        attached += chunk.len();
        progress.report(band(
            PROGRESS_ATTACH_START,
            PROGRESS_ATTACH_END,
            attached as f64 / total as f64,
        ));
    }

    progress.report(PROGRESS_ATTACH_END);
    log::debug!("attached {} of {} frames", frames.len(), total);

    Ok(AttachedSprite {
        root,
        background,
        frames,
    })
}
