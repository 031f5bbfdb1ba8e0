//! wasm-bindgen interface for the sprite animation player.
//!
//! ```javascript
//! const players = new SvgPlayers();          // scans `.svg-animation-container`
//! const intro = await players.get("intro").init();
//! intro.play();
//! window.SVGPlayers.intro.gotoFrame(12);
//! ```

use std::rc::Rc;

use js_sys::{Object, Promise, Reflect};
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use sprite_player_core::{Config, LoadState, PlayerRegistry, Scheduler, SpritePlayer};

pub mod dom;
pub mod fetch;
pub mod overlay;
pub mod raf;

pub use dom::{DomHost, DomNode};
pub use overlay::LoadingOverlay;
pub use raf::{PerformanceClock, RafDriver};

const GLOBAL_NAME: &str = "SVGPlayers";

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// `window.SVGPlayers`, created on first use.
fn global_registry(window: &web_sys::Window) -> Result<Object, JsError> {
    let key = JsValue::from_str(GLOBAL_NAME);
    let existing = Reflect::get(window, &key)
        .map_err(|e| JsError::new(&format!("read window.{GLOBAL_NAME}: {e:?}")))?;
    if let Some(object) = existing.dyn_ref::<Object>() {
        return Ok(object.clone());
    }
    let object = Object::new();
    Reflect::set(window, &key, &object)
        .map_err(|e| JsError::new(&format!("set window.{GLOBAL_NAME}: {e:?}")))?;
    Ok(object)
}

/// Registry of every animation container on the page.
#[wasm_bindgen]
pub struct SvgPlayers {
    registry: PlayerRegistry<DomHost>,
}

#[wasm_bindgen]
impl SvgPlayers {
    /// Discover containers, register one player each, start their previews
    /// and publish them on `window.SVGPlayers`. Pass a config object or
    /// undefined/null for defaults. Containers missing `data-id` or
    /// `data-base-path` are logged and skipped.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<SvgPlayers, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };

        let window = web_sys::window().ok_or_else(|| JsError::new("no window available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsError::new("no document available"))?;
        let host = Rc::new(DomHost::new(document, &cfg)?);
        let containers = host.discover(&cfg.container_selector)?;

        let driver = Rc::new(RafDriver::new());
        let scheduler = Scheduler::new(&cfg, Rc::new(PerformanceClock), driver.clone());
        let ticker = scheduler.downgrade();
        driver.set_callback(move |timestamp_ms| {
            if let Some(scheduler) = ticker.upgrade() {
                scheduler.tick(timestamp_ms);
            }
        });

        let mut registry = PlayerRegistry::new(host, cfg, scheduler);
        let players = registry.discover(containers);

        let global = global_registry(&window)?;
        for player in players {
            let preview = player.clone();
            spawn_local(async move { preview.load_preview().await });
            let handle = JsValue::from(SvgPlayer { inner: player.clone() });
            Reflect::set(&global, &JsValue::from_str(player.name()), &handle)
                .map_err(|e| JsError::new(&format!("publish {}: {e:?}", player.name())))?;
        }

        Ok(SvgPlayers { registry })
    }

    /// Player registered under `id`, if any.
    pub fn get(&self, id: &str) -> Option<SvgPlayer> {
        self.registry.get(id).map(|inner| SvgPlayer { inner })
    }

    /// Registered identifiers in discovery order.
    pub fn ids(&self) -> Vec<String> {
        self.registry.ids().map(str::to_string).collect()
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.registry.len()
    }

    /// Frame-time counters of the shared loop.
    #[wasm_bindgen(js_name = frameStats)]
    pub fn frame_stats(&self) -> Result<JsValue, JsError> {
        swb::to_value(&self.registry.scheduler().stats())
            .map_err(|e| JsError::new(&format!("serialize stats: {e}")))
    }

    /// Stop the shared loop and drop every playing animation from it.
    pub fn shutdown(&self) {
        self.registry.scheduler().shutdown();
    }
}

/// One animation's public handle.
#[wasm_bindgen]
#[derive(Clone)]
pub struct SvgPlayer {
    inner: SpritePlayer<DomHost>,
}

#[wasm_bindgen]
impl SvgPlayer {
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.inner.name().to_string()
    }

    /// Load the sprite and timeline. Resolves to this player; repeated calls
    /// return the same in-flight or completed load.
    pub fn init(&self) -> Promise {
        let ready = self.inner.init();
        future_to_promise(async move {
            match ready.await {
                Ok(inner) => Ok(JsValue::from(SvgPlayer { inner })),
                Err(err) => Err(JsError::from(err).into()),
            }
        })
    }

    pub fn play(&self) {
        self.inner.play();
    }

    pub fn pause(&self) {
        self.inner.pause();
    }

    #[wasm_bindgen(js_name = showFirstFrame)]
    pub fn show_first_frame(&self) {
        self.inner.show_first_frame();
    }

    #[wasm_bindgen(js_name = gotoFrame)]
    pub fn goto_frame(&self, frame: u32) {
        self.inner.goto_frame(frame);
    }

    #[wasm_bindgen(getter)]
    pub fn initialized(&self) -> bool {
        self.inner.state() == LoadState::Ready
    }

    #[wasm_bindgen(getter)]
    pub fn playing(&self) -> bool {
        self.inner.is_playing()
    }

    #[wasm_bindgen(getter, js_name = currentFrame)]
    pub fn current_frame(&self) -> Option<u32> {
        self.inner.current_frame().map(|f| f.0)
    }

    /// `"uninitialized"`, `"loading"`, `"ready"` or `"failed"`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        match self.inner.state() {
            LoadState::Uninitialized => "uninitialized",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed => "failed",
        }
        .to_string()
    }
}
