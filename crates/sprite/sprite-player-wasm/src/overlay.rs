//! DOM loading overlay: progress ring plus percentage label.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element};

use sprite_player_core::{LoadOutcome, LoadingIndicator};

use crate::fetch::describe;

const STYLE_ID: &str = "svg-player-loading-styles";
/// Circumference of the r=40 progress ring.
const RING_CIRCUMFERENCE: f64 = 251.2;

const OVERLAY_MARKUP: &str = r#"
  <div class="loading-container">
    <svg class="loading-spinner" viewBox="0 0 100 100">
      <circle class="loading-track" cx="50" cy="50" r="40" />
      <circle class="loading-progress" cx="50" cy="50" r="40" />
    </svg>
    <div class="loading-text">Loading<span class="loading-dots"></span></div>
    <div class="loading-percentage">0%</div>
  </div>
"#;

const OVERLAY_STYLES: &str = r#"
.svg-player-loading {
  position: absolute;
  inset: 0;
  display: flex;
  align-items: center;
  justify-content: center;
  background: rgba(81, 81, 81, 0.8);
  backdrop-filter: blur(4px);
  z-index: 1000;
}
.loading-container {
  text-align: center;
  padding: 10%;
  box-sizing: border-box;
  display: flex;
  flex-direction: column;
  align-items: center;
  justify-content: center;
}
.loading-spinner {
  display: block;
  width: 120px;
  height: 120px;
  max-width: 40%;
  max-height: 40%;
  margin: 0 auto 20px;
  flex-shrink: 0;
}
.loading-track,
.loading-progress {
  fill: none;
  stroke-width: 6;
}
.loading-track {
  stroke: rgba(255, 255, 255, 0.2);
}
.loading-progress {
  stroke: #ffffff;
  stroke-linecap: round;
  stroke-dasharray: 251.2;
  stroke-dashoffset: 251.2;
  transform-origin: center;
  transform: rotate(-90deg);
}
.loading-text {
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
  font-size: 18px;
  font-weight: 600;
  color: #ffffff;
  margin-bottom: 8px;
  white-space: nowrap;
}
.loading-percentage {
  font-family: "SF Mono", "Monaco", "Inconsolata", monospace;
  font-size: 14px;
  color: rgba(255, 255, 255, 0.8);
}
.loading-dots::after {
  content: '';
  animation: loadingDots 1.5s infinite;
}
@keyframes loadingDots {
  0%, 20% { content: ''; }
  40% { content: '.'; }
  60% { content: '..'; }
  80%, 100% { content: '...'; }
}
"#;

fn ensure_styles(document: &Document) -> Result<(), String> {
    if document.get_element_by_id(STYLE_ID).is_some() {
        return Ok(());
    }
    let style = document.create_element("style").map_err(|e| describe(&e))?;
    style.set_id(STYLE_ID);
    style.set_text_content(Some(OVERLAY_STYLES));
    let head = document
        .head()
        .ok_or_else(|| "document has no <head>".to_string())?;
    head.append_child(&style).map_err(|e| describe(&e))?;
    Ok(())
}

fn make_positioned(container: &Element) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let position = window
        .get_computed_style(container)
        .ok()
        .flatten()
        .and_then(|style| style.get_property_value("position").ok());
    if position.as_deref() == Some("static") {
        if let Some(html) = container.dyn_ref::<web_sys::HtmlElement>() {
            let _ = html.style().set_property("position", "relative");
        }
    }
}

/// Overlay shown over a container for one load attempt.
pub struct LoadingOverlay {
    root: Option<Element>,
    ring: Option<Element>,
    label: Option<Element>,
    cleanup_delay_ms: i32,
}

impl LoadingOverlay {
    /// Build and attach the overlay. A failure leaves an inert overlay and logs a warning.
    pub fn new(document: &Document, container: &Element, cleanup_delay_ms: u32) -> Self {
        let delay = i32::try_from(cleanup_delay_ms).unwrap_or(i32::MAX);
        match Self::build(document, container) {
            Ok(root) => Self {
                ring: root.query_selector(".loading-progress").ok().flatten(),
                label: root.query_selector(".loading-percentage").ok().flatten(),
                root: Some(root),
                cleanup_delay_ms: delay,
            },
            Err(err) => {
                log::warn!("loading overlay unavailable: {err}");
                Self {
                    root: None,
                    ring: None,
                    label: None,
                    cleanup_delay_ms: delay,
                }
            }
        }
    }

    fn build(document: &Document, container: &Element) -> Result<Element, String> {
        ensure_styles(document)?;
        let overlay = document.create_element("div").map_err(|e| describe(&e))?;
        overlay.set_class_name("svg-player-loading");
        overlay.set_inner_html(OVERLAY_MARKUP);
        make_positioned(container);
        container.append_child(&overlay).map_err(|e| describe(&e))?;
        Ok(overlay)
    }

    fn remove_after(root: Element, delay_ms: i32) {
        if delay_ms <= 0 {
            root.remove();
            return;
        }
        let Some(window) = web_sys::window() else {
            root.remove();
            return;
        };
        let target = root.clone();
        let callback = Closure::once_into_js(move || target.remove());
        if window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                delay_ms,
            )
            .is_err()
        {
            root.remove();
        }
    }
}

impl LoadingIndicator for LoadingOverlay {
    fn update_progress(&mut self, percent: f64) {
        let offset = RING_CIRCUMFERENCE - RING_CIRCUMFERENCE * percent / 100.0;
        if let Some(ring) = &self.ring {
            let _ = ring.set_attribute("style", &format!("stroke-dashoffset: {offset}"));
        }
        if let Some(label) = &self.label {
            label.set_text_content(Some(&format!("{}%", percent.round())));
        }
    }

    fn cleanup(&mut self, outcome: LoadOutcome) {
        let Some(root) = self.root.take() else {
            return;
        };
        self.ring = None;
        self.label = None;
        match outcome {
            LoadOutcome::Loaded => Self::remove_after(root, self.cleanup_delay_ms),
            LoadOutcome::Failed => root.remove(),
        }
    }
}
