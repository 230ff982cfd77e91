//! Translation table built from the spreadsheet.

use std::collections::HashMap;
use std::path::Path;

use crate::error::BuildError;
use crate::input::workbook::Workbook;
use crate::types::LanguageMap;

/// Key -> language -> text, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    entries: HashMap<String, HashMap<String, String>>,

    /// Language columns in the order they were first seen.
    column_order: Vec<String>,
}

impl TranslationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the rows of one worksheet.
    ///
    /// The first row is the header: column 0 labels the key column, the
    /// remaining cells are language codes. A later row is only used when it
    /// has exactly as many cells as the header. Values overwrite earlier
    /// ones for the same (key, language).
    ///
    /// Language codes become output directory names, so empty or path-like
    /// header cells are ignored along with their column.
    pub fn ingest_sheet(&mut self, sheet_name: &str, rows: &[Vec<String>]) {
        let Some((header, data)) = rows.split_first() else {
            tracing::debug!(sheet = sheet_name, "Skipping empty worksheet");
            return;
        };
        let languages: Vec<Option<&String>> = header
            .get(1..)
            .unwrap_or_default()
            .iter()
            .map(|language| {
                if is_language_code(language) {
                    Some(language)
                } else {
                    tracing::warn!(
                        sheet = sheet_name,
                        header = %language,
                        "Ignoring invalid language column"
                    );
                    None
                }
            })
            .collect();

        for language in languages.iter().copied().flatten() {
            if !self.column_order.contains(language) {
                self.column_order.push(language.clone());
            }
        }

        for (index, row) in data.iter().enumerate() {
            if row.len() != header.len() {
                tracing::debug!(
                    sheet = sheet_name,
                    row = index + 2,
                    cells = row.len(),
                    expected = header.len(),
                    "Skipping row with mismatched cell count"
                );
                continue;
            }
            let Some((key, values)) = row.split_first() else {
                continue;
            };
            let entry = self.entries.entry(key.clone()).or_default();
            for (language, value) in languages.iter().zip(values) {
                if let Some(language) = language {
                    entry.insert((*language).clone(), value.clone());
                }
            }
        }
    }

    /// Languages that have at least one value, in first-seen column order.
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        self.column_order
            .iter()
            .filter(|language| self.entries.values().any(|values| values.contains_key(*language)))
            .map(String::as_str)
            .collect()
    }

    /// All values of one language.
    #[must_use]
    pub fn language_map(&self, language: &str) -> LanguageMap {
        self.entries
            .iter()
            .filter_map(|(key, values)| {
                values.get(language).map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A header cell usable as a directory name.
fn is_language_code(cell: &str) -> bool {
    !cell.is_empty() && !cell.contains(['/', '\\']) && !cell.contains("..")
}

/// Loads the translation table from every worksheet of an `.xlsx` file.
///
/// # Errors
/// - `FileAccess` when the file cannot be opened
/// - `Format` when the shared strings or the sheet list are missing or
///   malformed
pub fn load_translation_table(path: &Path) -> Result<TranslationTable, BuildError> {
    let mut workbook = Workbook::open(path)?;
    let shared = workbook.shared_strings()?;
    let mut table = TranslationTable::new();

    for sheet in workbook.worksheets()? {
        let rows = workbook.rows(&sheet, &shared)?;
        tracing::debug!(sheet = %sheet.name, rows = rows.len(), "Reading worksheet");
        table.ingest_sheet(&sheet.name, &rows);
    }

    tracing::info!(
        path = %path.display(),
        keys = table.len(),
        languages = ?table.languages(),
        "Loaded translations"
    );
    Ok(table)
}
