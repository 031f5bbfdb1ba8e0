//! Timeline model: ordered `(frame, duration)` entries and time → frame lookup.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, Result};
use crate::ids::FrameId;

/// One hold in the playback order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub frame: FrameId,
    /// Hold time in seconds.
    pub duration: f64,
}

impl TimelineEntry {
    pub fn new(frame: u32, duration: f64) -> Self {
        Self {
            frame: FrameId(frame),
            duration,
        }
    }
}

/// Playback order with derived start times and a resumable lookup cursor.
#[derive(Clone, Debug)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    start_times: Vec<f64>,
    total_duration: f64,
    cursor: usize,
}

impl Timeline {
    /// Build from already cross-referenced entries. Entries with a duration
    /// that is not finite and positive are dropped with a warning. Returns
    /// `None` when nothing survives.
    pub fn new(entries: impl IntoIterator<Item = TimelineEntry>) -> Option<Self> {
        let entries: Vec<TimelineEntry> = entries
            .into_iter()
            .filter(|e| {
                let ok = e.duration.is_finite() && e.duration > 0.0;
                if !ok {
                    log::warn!("dropping timeline entry for {} with duration {}", e.frame, e.duration);
                }
                ok
            })
            .collect();

        if entries.is_empty() {
            log::warn!("timeline has no playable entries");
            return None;
        }

        let mut total_duration = 0.0;
        let start_times = entries
            .iter()
            .map(|e| {
                let start = total_duration;
                total_duration += e.duration;
                start
            })
            .collect();

        Some(Self {
            entries,
            start_times,
            total_duration,
            cursor: 0,
        })
    }

    /// Drop entries whose frame is unknown (warning per entry), then build.
    pub fn build(
        entries: impl IntoIterator<Item = TimelineEntry>,
        known: impl Fn(FrameId) -> bool,
    ) -> Option<Self> {
        let mut kept = Vec::new();
        retain_known(entries, &known, &mut kept);
        Self::new(kept)
    }

    #[inline]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    #[inline]
    pub fn start_times(&self) -> &[f64] {
        &self.start_times
    }

    #[inline]
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn first_frame(&self) -> FrameId {
        self.entries[0].frame
    }

    pub fn contains(&self, frame: FrameId) -> bool {
        self.entries.iter().any(|e| e.frame == frame)
    }

    pub fn first_index_of(&self, frame: FrameId) -> Option<usize> {
        self.entries.iter().position(|e| e.frame == frame)
    }

    /// Start time of the first entry showing `frame`.
    pub fn start_time_of(&self, frame: FrameId) -> Option<f64> {
        self.first_index_of(frame).map(|i| self.start_times[i])
    }

    /// End of entry `i` (start of the next one, or the total for the last).
    #[inline]
    fn end_of(&self, i: usize) -> f64 {
        self.start_times
            .get(i + 1)
            .copied()
            .unwrap_or(self.total_duration)
    }

    /// Index of the entry covering `t` (already reduced into `[0, total)`).
    ///
    /// Scans forward from the previous hit, so monotonic playback is amortized
    /// O(1); a `t` before the cached entry (loop wrap) restarts from 0.
    /// Falls back to entry 0 when no interval matches.
    pub fn index_at(&mut self, t: f64) -> usize {
        if t < self.start_times[self.cursor] {
            self.cursor = 0;
        }
        for i in self.cursor..self.entries.len() {
            if t >= self.start_times[i] && t < self.end_of(i) {
                self.cursor = i;
                return i;
            }
        }
        self.cursor = 0;
        0
    }

    #[inline]
    pub fn frame_at(&mut self, t: f64) -> FrameId {
        let i = self.index_at(t);
        self.entries[i].frame
    }

    #[inline]
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }
}

/// Move entries whose frame is known into `out`, warning about the rest.
pub fn retain_known(
    entries: impl IntoIterator<Item = TimelineEntry>,
    known: &dyn Fn(FrameId) -> bool,
    out: &mut Vec<TimelineEntry>,
) {
    for entry in entries {
        if known(entry.frame) {
            out.push(entry);
        } else {
            log::warn!("timeline references unknown {}; dropping entry", entry.frame);
        }
    }
}

fn bare_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$]*)\s*:").expect("bare key pattern is valid")
    })
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[\]}])").expect("trailing comma pattern is valid"))
}

fn line_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)//[^\n]*$").expect("comment pattern is valid"))
}

/// Slice of `text` holding the bracket-balanced array literal opening at `open`.
fn array_literal(text: &str, open: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..open + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a timeline resource holding the array bound to `binding`
/// (`<id>_timeline`).
///
/// Accepts a bare array of `{frame, duration}` records, or a script that
/// assigns an object-literal array to `binding` (bare keys and trailing
/// commas allowed). Arrays bound to any other name are never used.
pub fn parse_timeline_resource(text: &str, binding: &str) -> Result<Vec<TimelineEntry>> {
    let without_comments = line_comment_re().replace_all(text, "");
    let source = without_comments.as_ref();

    let binding_re = Regex::new(&format!(r"\b{}\s*=\s*\[", regex::escape(binding)))
        .map_err(|e| PlayerError::TimelineParse {
            reason: e.to_string(),
        })?;
    let open = match binding_re.find(source) {
        Some(m) => m.end() - 1,
        None => {
            let leading = source.len() - source.trim_start().len();
            if !source[leading..].starts_with('[') {
                return Err(PlayerError::TimelineNotFound {
                    name: binding.to_string(),
                });
            }
            leading
        }
    };
    let literal = array_literal(source, open).ok_or_else(|| PlayerError::TimelineParse {
        reason: format!("unterminated array for {binding}"),
    })?;

    let quoted = bare_key_re().replace_all(literal, "$1\"$2\":");
    let json = trailing_comma_re().replace_all(&quoted, "$1");
    Ok(serde_json::from_str(&json)?)
}
