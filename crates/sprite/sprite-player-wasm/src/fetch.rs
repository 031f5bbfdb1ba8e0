//! Same-origin fetches and task-queue suspension points.

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Human-readable text for a rejected JS value.
pub(crate) fn describe(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{err:?}")
}

/// GET `path` and return the body as text; non-2xx statuses are errors.
pub async fn fetch_text(path: &str) -> Result<String, String> {
    let window = web_sys::window().ok_or_else(|| "missing window".to_string())?;
    let resp = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|e| describe(&e))?;
    let resp: web_sys::Response = resp.dyn_into().map_err(|e| describe(&e))?;
    if !resp.ok() {
        return Err(format!("HTTP {} {}", resp.status(), resp.status_text()));
    }
    let body = resp.text().map_err(|e| describe(&e))?;
    let text = JsFuture::from(body).await.map_err(|e| describe(&e))?;
    text.as_string()
        .ok_or_else(|| "response body is not text".to_string())
}

fn timeout(resolve: &Function, ms: i32) {
    let scheduled = web_sys::window().and_then(|w| {
        w.set_timeout_with_callback_and_timeout_and_arguments_0(resolve, ms)
            .ok()
    });
    if scheduled.is_none() {
        let _ = resolve.call0(&JsValue::UNDEFINED);
    }
}

/// Resolve after `ms` milliseconds via `setTimeout`.
pub async fn sleep_ms(ms: i32) {
    let promise = Promise::new(&mut |resolve, _reject| timeout(&resolve, ms));
    let _ = JsFuture::from(promise).await;
}

/// Resolve on a later macrotask so the page can render and handle input.
pub async fn next_task() {
    sleep_ms(0).await;
}
