//! Sprite sheet parsing.
//!
//! A sprite sheet is one SVG document whose root holds an optional
//! `<g id="background">` group and any number of `<g id="frame_<n>">` groups.
//! Parsing only slices the source text into self-contained fragments; turning
//! them into render-tree nodes happens later, batch by batch, in
//! [`attach_sprite`](crate::frames::attach_sprite).

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::host::Cooperative;
use crate::ids::FrameId;
use crate::progress::{band, ProgressTracker, PROGRESS_PARSE_END, PROGRESS_SPRITE_FETCHED};

const DEFAULT_HEADER: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">"#;
const ROOT_CLOSE: &str = "</svg>";
const BACKGROUND_ID: &str = "background";

/// Opening tag of a group carrying one of the ids we care about.
fn named_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<g\b[^>]*?\sid="(background|frame_\d+)"[^>]*>"#)
            .expect("named group pattern is valid")
    })
}

/// Any group open, close, or self-closing tag.
fn group_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(/?)g\b[^>]*?(/?)>").expect("group tag pattern is valid"))
}

/// One frame group, still as markup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFragment {
    pub id: FrameId,
    /// Element id exactly as written in the source (`frame_0007`).
    pub element_id: String,
    pub markup: String,
}

/// Parsed sprite source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteDocument {
    /// Root `<svg ...>` opening tag, reused to wrap fragments for isolated parsing.
    pub header: String,
    pub background: Option<String>,
    /// Frame groups in source order.
    pub frames: Vec<FrameFragment>,
}

impl SpriteDocument {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.frames.iter().map(|f| f.id)
    }

    /// Wrap `body` in the sprite header so it parses as a standalone document.
    pub fn wrap(&self, body: &str) -> String {
        let mut out = String::with_capacity(self.header.len() + body.len() + ROOT_CLOSE.len());
        out.push_str(&self.header);
        out.push_str(body);
        out.push_str(ROOT_CLOSE);
        out
    }
}

/// Locate the root opening tag and the slice between it and the last `</svg>`.
fn split_root(text: &str) -> (String, &str) {
    let Some(start) = text.find("<svg") else {
        log::warn!("sprite has no <svg> root; using a default header");
        return (DEFAULT_HEADER.to_string(), text);
    };
    let Some(tag_len) = text[start..].find('>') else {
        log::warn!("sprite root tag is unterminated; using a default header");
        return (DEFAULT_HEADER.to_string(), &text[start..]);
    };
    let tag_end = start + tag_len + 1;
    let header = text[start..tag_end].to_string();
    let body_end = text.rfind(ROOT_CLOSE).filter(|&end| end >= tag_end).unwrap_or(text.len());
    (header, &text[tag_end..body_end])
}

/// End offset of the group whose opening tag spans `open_start..open_end`,
/// matching nested groups. `None` when the group never closes.
fn group_end(body: &str, open_start: usize, open_end: usize) -> Option<usize> {
    if body[open_start..open_end].ends_with("/>") {
        return Some(open_end);
    }
    let mut depth = 1usize;
    for caps in group_tag_re().captures_iter(&body[open_end..]) {
        let closing = !caps[1].is_empty();
        let self_closing = !caps[2].is_empty();
        if closing {
            depth -= 1;
            if depth == 0 {
                let whole = caps.get(0)?;
                return Some(open_end + whole.end());
            }
        } else if !self_closing {
            depth += 1;
        }
    }
    None
}

/// Slice a sprite sheet into its background and frame fragments.
///
/// Control is yielded to the host after every `batch_size` frame matches and
/// progress moves through the parse band in proportion to bytes scanned,
/// staying below the next phase's threshold until scanning ends. A sheet
/// without frame groups yields an empty document, not an error.
pub async fn parse_sprite<Y>(
    text: &str,
    yielder: &Y,
    batch_size: usize,
    progress: &mut ProgressTracker<'_>,
) -> SpriteDocument
where
    Y: Cooperative + ?Sized,
{
    let batch_size = batch_size.max(1);
    let (header, body) = split_root(text);
    let total = body.len().max(1) as f64;

    let mut background = None;
    let mut frames = Vec::new();
    let mut seen = BTreeSet::new();
    let mut matched = 0usize;
    let mut pos = 0usize;

    while let Some(caps) = named_group_re().captures_at(body, pos) {
        let Some(open) = caps.get(0) else { break };
        let element_id = &caps[1];

        let Some(end) = group_end(body, open.start(), open.end()) else {
            log::warn!("sprite group {element_id} is never closed; skipping it");
            pos = open.end();
            continue;
        };
        let markup = &body[open.start()..end];
        pos = end;

        if element_id == BACKGROUND_ID {
            if background.is_none() {
                background = Some(markup.to_string());
            } else {
                log::debug!("ignoring extra background group");
            }
            continue;
        }

        let Some(id) = FrameId::from_element_id(element_id) else {
            log::warn!("frame id {element_id} is out of range; skipping it");
            continue;
        };
        if !seen.insert(id) {
            log::warn!("duplicate frame {id} ({element_id}); keeping the first");
            continue;
        }
        frames.push(FrameFragment {
            id,
            element_id: element_id.to_string(),
            markup: markup.to_string(),
        });

        matched += 1;
        if matched % batch_size == 0 {
            let scanned = band(PROGRESS_SPRITE_FETCHED, PROGRESS_PARSE_END, pos as f64 / total);
            progress.report(scanned.min(PROGRESS_PARSE_END - 1.0));
            yielder.yield_now().await;
        }
    }

    progress.report(PROGRESS_PARSE_END);
    log::debug!("parsed sprite: {} frames, background: {}", frames.len(), background.is_some());

    SpriteDocument {
        header,
        background,
        frames,
    }
}
