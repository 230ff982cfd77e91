//! In-browser localizer.
//!
//! The core here is platform independent: it talks to the page through the
//! [`Document`], [`PreferenceStore`] and [`LanguageSource`] traits. The
//! `web` submodule provides the `web-sys` implementations and the
//! `wasm-bindgen` entry points.
//!
//! Elements opt in with one of three attributes naming a translation key:
//!
//! | attribute        | target           |
//! |------------------|------------------|
//! | `data-i18n`      | inner markup     |
//! | `data-i18n-img`  | `src` attribute  |
//! | `data-i18n-link` | `href` attribute |

#[cfg(target_arch = "wasm32")]
pub mod web;

use std::cell::Cell;
use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::LanguageMap;

/// Storage key of the chosen language.
pub const PREFERENCE_KEY: &str = "language";

/// Language used when no preference has been stored.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Directory (relative to the page) holding `<code>.json` files.
pub const LANGUAGES_PATH: &str = "languages";

#[allow(clippy::expect_used)]
static HANDLER_LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)'").expect("handler pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Failed to fetch '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse '{url}': {message}")]
    Parse { url: String, message: String },

    #[error("Failed to access preference storage: {0}")]
    Storage(String),

    #[error("DOM operation failed: {0}")]
    Dom(String),
}

/// What a binding attribute writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Text,
    Image,
    Link,
}

impl Binding {
    pub const ALL: [Self; 3] = [Self::Text, Self::Image, Self::Link];

    #[must_use]
    pub const fn attribute(self) -> &'static str {
        match self {
            Self::Text => "data-i18n",
            Self::Image => "data-i18n-img",
            Self::Link => "data-i18n-link",
        }
    }

    fn write<E: BoundElement>(self, element: &E, value: &str) -> Result<(), RuntimeError> {
        match self {
            Self::Text => element.set_inner_html(value),
            Self::Image => element.set_attribute("src", value),
            Self::Link => element.set_attribute("href", value),
        }
    }
}

/// An element of the page.
pub trait BoundElement {
    fn attribute(&self, name: &str) -> Option<String>;
    fn set_inner_html(&self, html: &str) -> Result<(), RuntimeError>;
    fn set_attribute(&self, name: &str, value: &str) -> Result<(), RuntimeError>;
}

/// The page.
pub trait Document {
    type Element: BoundElement;

    /// Elements carrying `attribute`, in document order.
    fn elements_with_attribute(&self, attribute: &str)
    -> Result<Vec<Self::Element>, RuntimeError>;
}

/// Origin-scoped key/value storage that survives navigation.
pub trait PreferenceStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), RuntimeError>;
}

/// Loads the translations of one language.
pub trait LanguageSource {
    fn fetch(&self, code: &str) -> impl Future<Output = Result<LanguageMap, RuntimeError>>;
}

/// URL of a language file relative to the page.
#[must_use]
pub fn language_url(code: &str) -> String {
    format!("{LANGUAGES_PATH}/{code}.json")
}

/// Extracts the language code from a switch control's click handler,
/// e.g. `changeLanguage('de')` -> `de`.
#[must_use]
pub fn language_from_handler(handler: &str) -> Option<&str> {
    HANDLER_LANGUAGE.captures(handler)?.get(1).map(|m| m.as_str())
}

/// A language switch control, e.g.
/// `<a class="dropdown-item" href="/de/" onclick="changeLanguage('de')">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSwitch {
    pub language: String,
    /// Page to open once the choice is stored.
    pub href: Option<String>,
}

impl LanguageSwitch {
    /// Reads a switch control. `None` when its click handler names no
    /// language.
    pub fn from_element<E: BoundElement>(element: &E) -> Option<Self> {
        let handler = element.attribute("onclick")?;
        let language = language_from_handler(&handler)?.to_string();
        Some(Self { language, href: element.attribute("href") })
    }
}

/// Result of applying a language map to the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Elements that were rewritten.
    pub updated: usize,
    /// Keys referenced by the page but absent from the map. Those elements
    /// keep their current content.
    pub missing: Vec<String>,
}

/// Outcome of a load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied(ApplyReport),
    /// A newer request was issued while this one was in flight; its
    /// response was discarded.
    Superseded,
}

/// Localizes a page and remembers the chosen language.
#[derive(Debug)]
pub struct Localizer<D, S, L> {
    document: D,
    store: S,
    source: L,
    /// Incremented per request; a response is applied only if no newer
    /// request started meanwhile.
    generation: Cell<u64>,
}

impl<D, S, L> Localizer<D, S, L>
where
    D: Document,
    S: PreferenceStore,
    L: LanguageSource,
{
    pub fn new(document: D, store: S, source: L) -> Self {
        Self {
            document,
            store,
            source,
            generation: Cell::new(0),
        }
    }

    /// The stored language, or [`FALLBACK_LANGUAGE`] when none (or an empty
    /// one) is stored.
    pub fn preferred_language(&self) -> String {
        self.store
            .load(PREFERENCE_KEY)
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
    }

    /// Localizes the page with the preferred language.
    ///
    /// # Errors
    /// See [`Self::load_language`].
    pub async fn initialize(&self) -> Result<LoadOutcome, RuntimeError> {
        let code = self.preferred_language();
        self.load_language(&code).await
    }

    /// Fetches `languages/<code>.json` and applies it.
    ///
    /// On error the page is left untouched.
    ///
    /// # Errors
    /// Fetch, parse or DOM errors.
    pub async fn load_language(&self, code: &str) -> Result<LoadOutcome, RuntimeError> {
        let request = self.generation.get().wrapping_add(1);
        self.generation.set(request);

        let fetched = self.source.fetch(code).await;

        if self.generation.get() != request {
            tracing::debug!(language = code, "Discarding superseded translations");
            return Ok(LoadOutcome::Superseded);
        }
        self.apply(&fetched?).map(LoadOutcome::Applied)
    }

    /// Stores `code` as the chosen language, then loads it.
    ///
    /// # Errors
    /// Storage errors, then everything [`Self::load_language`] returns.
    pub async fn change_language(&self, code: &str) -> Result<LoadOutcome, RuntimeError> {
        self.select_language(code)?;
        self.load_language(code).await
    }

    /// Stores `code` as the chosen language without loading it.
    ///
    /// # Errors
    /// Storage errors.
    pub fn select_language(&self, code: &str) -> Result<(), RuntimeError> {
        self.store.save(PREFERENCE_KEY, code)
    }

    /// Rewrites every bound element from `translations`.
    ///
    /// # Errors
    /// DOM errors.
    pub fn apply(&self, translations: &LanguageMap) -> Result<ApplyReport, RuntimeError> {
        let mut report = ApplyReport::default();

        for binding in Binding::ALL {
            let attribute = binding.attribute();
            for element in self.document.elements_with_attribute(attribute)? {
                let Some(key) = element.attribute(attribute) else {
                    continue;
                };
                match translations.get(&key) {
                    Some(value) => {
                        binding.write(&element, value)?;
                        report.updated += 1;
                    }
                    None => {
                        tracing::warn!(key = %key, attribute, "Missing runtime translation");
                        report.missing.push(key);
                    }
                }
            }
        }

        Ok(report)
    }
}
