//! Core types shared by the build-time generator and the runtime localizer.

use std::collections::BTreeMap;

/// Translations of a single language (key -> text).
///
/// This is also the on-disk shape of `languages/<code>.json`, so the
/// generator and the browser agree on one format.
pub type LanguageMap = BTreeMap<String, String>;

/// Parses a runtime language file.
///
/// The file is a flat JSON object whose values are strings. Numbers and
/// booleans are accepted and stored in their JSON text form; nested values
/// are rejected.
///
/// # Errors
/// Returns the JSON error when the text is not a flat object.
pub fn parse_language_map(json: &str) -> Result<LanguageMap, serde_json::Error> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut map = LanguageMap::new();
    for (key, value) in raw {
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                return Err(serde::de::Error::custom(format!(
                    "value of '{key}' must be a string, found a nested structure"
                )));
            }
            other => other.to_string(),
        };
        map.insert(key, text);
    }
    Ok(map)
}

/// Serializes a language map the way the runtime expects it.
///
/// # Errors
/// Propagates serializer errors.
pub fn language_map_to_json(map: &LanguageMap) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(map)
}
