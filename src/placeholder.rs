//! `{{key}}` placeholder substitution.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::{
    Captures,
    Regex,
};

use crate::config::ValueEncoding;
use crate::types::LanguageMap;

/// `{{identifier}}` where identifier is one or more word characters or hyphens.
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([\w\-]+)\}\}").expect("placeholder pattern is valid"));

/// Result of one substitution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Keys that had no value, once per occurrence, in document order.
    pub missing: Vec<String>,
}

/// Replaces every placeholder in a single left-to-right pass.
///
/// `lookup` receives the identifier. `Some` is inserted as-is, `None` keeps
/// the placeholder text. Inserted values are never scanned again.
pub fn substitute<'v, F>(template: &str, mut lookup: F) -> Substitution
where
    F: FnMut(&str) -> Option<Cow<'v, str>>,
{
    let mut missing = Vec::new();
    let text = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = caps.get(1).map_or("", |m| m.as_str());
        lookup(key).map_or_else(
            || {
                missing.push(key.to_string());
                caps.get(0).map_or_else(String::new, |m| m.as_str().to_string())
            },
            Cow::into_owned,
        )
    });

    Substitution { text: text.into_owned(), missing }
}

/// Non-fatal diagnostic: a placeholder without a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKey {
    pub key: String,
    pub language: String,
    pub template: String,
}

impl fmt::Display for MissingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missing key: {} for language: {} (in {})",
            self.key, self.language, self.template
        )
    }
}

/// A rendered template and the diagnostics produced while rendering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub missing: Vec<MissingKey>,
}

/// Renders templates for one language.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    language: &'a str,
    translations: &'a LanguageMap,
    encoding: ValueEncoding,
}

impl<'a> Renderer<'a> {
    #[must_use]
    pub const fn new(
        language: &'a str,
        translations: &'a LanguageMap,
        encoding: ValueEncoding,
    ) -> Self {
        Self { language, translations, encoding }
    }

    /// Substitutes placeholders in `text`; missing keys are logged and
    /// returned.
    #[must_use]
    pub fn render(&self, template_name: &str, text: &str) -> Rendered {
        let substitution = substitute(text, |key| {
            self.translations.get(key).map(|value| encode(value, self.encoding))
        });

        let missing = substitution
            .missing
            .into_iter()
            .map(|key| {
                let diagnostic = MissingKey {
                    key,
                    language: self.language.to_string(),
                    template: template_name.to_string(),
                };
                tracing::warn!("{diagnostic}");
                diagnostic
            })
            .collect();

        Rendered { text: substitution.text, missing }
    }
}

fn encode(value: &str, encoding: ValueEncoding) -> Cow<'_, str> {
    match encoding {
        ValueEncoding::Raw => Cow::Borrowed(value),
        ValueEncoding::Html => quick_xml::escape::escape(value),
    }
}
