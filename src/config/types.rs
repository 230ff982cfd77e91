use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "templatePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// How translated values are written into the generated markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueEncoding {
    /// Insert values verbatim. Spreadsheet cells may carry markup.
    #[default]
    Raw,
    /// Escape `& < > " '` before insertion.
    Html,
}

/// Settings of a build run. Relative paths are resolved against the
/// working directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildSettings {
    pub spreadsheet: String,
    pub template_dir: String,
    pub output_dir: String,

    /// File name patterns selecting templates inside `templateDir`.
    pub template_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    pub value_encoding: ValueEncoding,

    /// Where to write `<lang>.json` files for the browser localizer.
    /// Disabled when unset.
    pub runtime_json_dir: Option<String>,
}

impl BuildSettings {
    /// # Errors
    /// - Required path is empty
    /// - Invalid glob pattern
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("spreadsheet", &self.spreadsheet),
            ("templateDir", &self.template_dir),
            ("outputDir", &self.output_dir),
        ] {
            if value.is_empty() {
                errors.push(ValidationError::new(field, "The path cannot be empty"));
            }
        }

        if let Some(dir) = &self.runtime_json_dir
            && dir.is_empty()
        {
            errors.push(ValidationError::new(
                "runtimeJsonDir",
                "The path cannot be empty. Please specify a directory (e.g., \"../dist/languages\"), or remove this field",
            ));
        }

        if self.template_patterns.is_empty() {
            errors.push(ValidationError::new(
                "templatePatterns",
                "At least one pattern is required. Example: [\"*.html\"]",
            ));
        }

        for (index, pattern) in self.template_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("templatePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, pattern) in self.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            spreadsheet: "language.xlsx".to_string(),
            template_dir: "templates".to_string(),
            output_dir: "../dist".to_string(),
            template_patterns: vec!["*.html".to_string()],
            exclude_patterns: vec![],
            value_encoding: ValueEncoding::Raw,
            runtime_json_dir: None,
        }
    }
}
