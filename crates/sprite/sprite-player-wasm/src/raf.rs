//! `requestAnimationFrame` frame driver and `performance.now()` clock.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use js_sys::Promise;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use sprite_player_core::{Clock, FrameDriver};

// Global bindings avoid fetching the Window/Performance objects every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

/// Monotonic clock backed by `performance.now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        performance_now()
    }
}

type RafClosure = Closure<dyn FnMut(f64)>;

struct RafInner {
    /// Registered with every `requestAnimationFrame` call; created on first use.
    closure: RefCell<Option<RafClosure>>,
    callback: RefCell<Option<Box<dyn Fn(f64)>>>,
    /// A frame has been requested and not delivered yet.
    pending: Cell<bool>,
    /// Id of the pending request, for `cancelAnimationFrame`.
    raf_id: Cell<i32>,
}

/// Delivers at most one pending display frame at a time to its callback.
pub struct RafDriver {
    inner: Rc<RafInner>,
}

impl RafDriver {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RafInner {
                closure: RefCell::new(None),
                callback: RefCell::new(None),
                pending: Cell::new(false),
                raf_id: Cell::new(0),
            }),
        }
    }

    /// Install the per-frame callback (the scheduler tick).
    pub fn set_callback(&self, callback: impl Fn(f64) + 'static) {
        *self.inner.callback.borrow_mut() = Some(Box::new(callback));
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }

    fn closure(&self) -> RafClosure {
        let inner: Weak<RafInner> = Rc::downgrade(&self.inner);
        Closure::wrap(Box::new(move |timestamp_ms: f64| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            inner.pending.set(false);
            if let Some(callback) = inner.callback.borrow().as_ref() {
                callback(timestamp_ms);
            };
        }) as Box<dyn FnMut(f64)>)
    }
}

impl Default for RafDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDriver for RafDriver {
    fn request_frame(&self) {
        if self.inner.pending.replace(true) {
            return;
        }
        if self.inner.closure.borrow().is_none() {
            let closure = self.closure();
            *self.inner.closure.borrow_mut() = Some(closure);
        }
        if let Some(closure) = self.inner.closure.borrow().as_ref() {
            let id = request_animation_frame(closure.as_ref().unchecked_ref());
            self.inner.raf_id.set(id);
        }
    }
}

impl Drop for RafDriver {
    fn drop(&mut self) {
        if self.is_pending() {
            cancel_animation_frame(self.inner.raf_id.get());
            self.inner.pending.set(false);
        }
        self.inner.callback.borrow_mut().take();
        self.inner.closure.borrow_mut().take();
    }
}

/// Resolve on the next display frame.
pub async fn next_animation_frame() {
    let promise = Promise::new(&mut |resolve, _reject| {
        request_animation_frame(&resolve);
    });
    let _ = JsFuture::from(promise).await;
}
