//! `web-sys` bindings and `wasm-bindgen` exports for the localizer.
//!
//! Only compiled on `wasm32` targets. Loading the module localizes the page
//! on `DOMContentLoaded` and wires the `.dropdown-item` language switches.
//! `changeLanguage(code)` is exported for inline `onclick` handlers.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{
    JsFuture,
    spawn_local,
};
use web_sys::{
    DocumentReadyState,
    Element,
    Event,
    Response,
    Storage,
};

use super::{
    BoundElement,
    Document,
    LanguageSource,
    LanguageSwitch,
    Localizer,
    PreferenceStore,
    RuntimeError,
    language_url,
};
use crate::types::{
    LanguageMap,
    parse_language_map,
};

/// Selector of the language switch controls.
const SWITCH_SELECTOR: &str = ".dropdown-item";

type WebLocalizer = Localizer<WebDocument, LocalStorage, FetchSource>;

thread_local! {
    static LOCALIZER: RefCell<Option<Rc<WebLocalizer>>> = const { RefCell::new(None) };
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn console_error(message: &str) {
    web_sys::console::error_1(&JsValue::from_str(message));
}

#[derive(Debug, Clone)]
pub struct WebElement(Element);

impl BoundElement for WebElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn set_inner_html(&self, html: &str) -> Result<(), RuntimeError> {
        self.0.set_inner_html(html);
        Ok(())
    }

    fn set_attribute(&self, name: &str, value: &str) -> Result<(), RuntimeError> {
        self.0.set_attribute(name, value).map_err(|e| RuntimeError::Dom(js_message(&e)))
    }
}

#[derive(Debug, Clone)]
pub struct WebDocument(web_sys::Document);

impl WebDocument {
    fn query(&self, selector: &str) -> Result<Vec<Element>, RuntimeError> {
        let nodes =
            self.0.query_selector_all(selector).map_err(|e| RuntimeError::Dom(js_message(&e)))?;
        Ok((0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }
}

impl Document for WebDocument {
    type Element = WebElement;

    fn elements_with_attribute(&self, attribute: &str) -> Result<Vec<WebElement>, RuntimeError> {
        Ok(self.query(&format!("[{attribute}]"))?.into_iter().map(WebElement).collect())
    }
}

/// `window.localStorage`. Missing storage (e.g. disabled cookies) reads as
/// unset and fails on write.
#[derive(Debug, Clone)]
pub struct LocalStorage(Option<Storage>);

impl PreferenceStore for LocalStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.0.as_ref()?.get_item(key).ok().flatten()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), RuntimeError> {
        let storage =
            self.0.as_ref().ok_or_else(|| RuntimeError::Storage("unavailable".to_string()))?;
        storage.set_item(key, value).map_err(|e| RuntimeError::Storage(js_message(&e)))
    }
}

/// Fetches `languages/<code>.json` relative to the current page.
#[derive(Debug, Clone)]
pub struct FetchSource(web_sys::Window);

impl FetchSource {
    async fn fetch_text(&self, url: &str) -> Result<String, RuntimeError> {
        let fetch_error = |e: JsValue| RuntimeError::Fetch {
            url: url.to_string(),
            message: js_message(&e),
        };

        let response: Response = JsFuture::from(self.0.fetch_with_str(url))
            .await
            .map_err(fetch_error)?
            .dyn_into()
            .map_err(fetch_error)?;
        if !response.ok() {
            return Err(RuntimeError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let text = JsFuture::from(response.text().map_err(fetch_error)?)
            .await
            .map_err(fetch_error)?;
        text.as_string().ok_or_else(|| RuntimeError::Fetch {
            url: url.to_string(),
            message: "response body is not text".to_string(),
        })
    }
}

impl LanguageSource for FetchSource {
    fn fetch(&self, code: &str) -> impl Future<Output = Result<LanguageMap, RuntimeError>> {
        let url = language_url(code);
        async move {
            let text = self.fetch_text(&url).await?;
            parse_language_map(&text)
                .map_err(|e| RuntimeError::Parse { url, message: e.to_string() })
        }
    }
}

fn run_and_report<F>(task: F)
where
    F: Future<Output = Result<super::LoadOutcome, RuntimeError>> + 'static,
{
    spawn_local(async move {
        if let Err(e) = task.await {
            console_error(&e.to_string());
        }
    });
}

fn current_localizer() -> Option<Rc<WebLocalizer>> {
    LOCALIZER.with(|slot| slot.borrow().clone())
}

/// Stores `code`, then localizes the page in the background.
fn switch_to(localizer: Rc<WebLocalizer>, code: String) {
    if let Err(e) = localizer.select_language(&code) {
        console_error(&e.to_string());
    }
    run_and_report(async move { localizer.load_language(&code).await });
}

/// Click handler of a language switch: store the choice and navigate
/// without waiting for the translations.
fn on_switch_click(event: &Event) {
    event.prevent_default();

    let Some(target) = event.current_target().and_then(|t| t.dyn_into::<Element>().ok()) else {
        return;
    };
    let Some(switch) = LanguageSwitch::from_element(&WebElement(target)) else {
        console_error("language switch without a language code");
        return;
    };
    let Some(localizer) = current_localizer() else {
        return;
    };

    switch_to(localizer, switch.language);
    if let (Some(href), Some(window)) = (switch.href, web_sys::window())
        && let Err(e) = window.location().set_href(&href)
    {
        console_error(&js_message(&e));
    }
}

fn install_switches(document: &WebDocument) -> Result<(), RuntimeError> {
    let handler = Closure::<dyn FnMut(Event)>::new(|event: Event| on_switch_click(&event));
    for item in document.query(SWITCH_SELECTOR)? {
        item.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())
            .map_err(|e| RuntimeError::Dom(js_message(&e)))?;
    }
    handler.forget();
    Ok(())
}

/// Runs `callback` once the document is parsed.
///
/// The module is usually instantiated after `DOMContentLoaded` has already
/// fired, in which case `callback` runs immediately.
fn when_ready<F>(document: &web_sys::Document, callback: F) -> Result<(), JsValue>
where
    F: FnOnce() + 'static,
{
    if document.ready_state() != DocumentReadyState::Loading {
        callback();
        return Ok(());
    }
    let on_ready = Closure::once(callback);
    document.add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())?;
    on_ready.forget();
    Ok(())
}

fn on_ready(page: &WebDocument) {
    if let Err(e) = install_switches(page) {
        console_error(&e.to_string());
    }
    if let Some(localizer) = current_localizer() {
        run_and_report(async move { localizer.initialize().await });
    }
}

/// Module entry point.
///
/// # Errors
/// Fails when there is no `window` or `document`.
#[cfg_attr(not(test), wasm_bindgen(start))]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let storage = window.local_storage().ok().flatten();

    let page = WebDocument(document.clone());
    let localizer =
        Rc::new(Localizer::new(page.clone(), LocalStorage(storage), FetchSource(window)));
    LOCALIZER.with(|slot| *slot.borrow_mut() = Some(localizer));

    when_ready(&document, move || on_ready(&page))
}

/// Stores `code` and re-localizes the page. Exported for inline handlers.
#[wasm_bindgen(js_name = changeLanguage)]
pub fn change_language(code: String) {
    if let Some(localizer) = current_localizer() {
        switch_to(localizer, code);
    }
}
