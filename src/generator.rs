//! Build-time site generator.

use std::io::Write;
use std::path::{
    Path,
    PathBuf,
};

use tempfile::NamedTempFile;

use crate::config::{
    BuildSettings,
    TemplateMatcher,
};
use crate::error::BuildError;
use crate::input::template::{
    TemplateFile,
    scan_templates,
};
use crate::input::translation::{
    TranslationTable,
    load_translation_table,
};
use crate::placeholder::{
    MissingKey,
    Renderer,
};
use crate::types::language_map_to_json;

/// Summary of a successful build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub languages: Vec<String>,
    pub written: Vec<PathBuf>,
    pub missing: Vec<MissingKey>,
}

/// Runs a whole build: spreadsheet, templates, one output tree per language.
///
/// Relative paths in `settings` are resolved against `root`.
///
/// # Errors
/// The first fatal error aborts the run. Files written before it are kept.
pub fn build_site(root: &Path, settings: &BuildSettings) -> Result<BuildReport, BuildError> {
    let table = load_translation_table(&root.join(&settings.spreadsheet))?;
    if table.is_empty() {
        tracing::warn!(spreadsheet = %settings.spreadsheet, "No translations found");
    }
    let matcher = TemplateMatcher::new(settings)?;
    let templates = scan_templates(&root.join(&settings.template_dir), &matcher)?;

    let report = generate(root, settings, &table, &templates)?;
    tracing::info!(
        languages = report.languages.len(),
        files = report.written.len(),
        missing = report.missing.len(),
        "Build finished"
    );
    Ok(report)
}

/// Writes `<outputDir>/<lang>/<template>` for every language and template,
/// plus the runtime JSON files when configured.
///
/// # Errors
/// `FileAccess` on the first read or write failure.
pub fn generate(
    root: &Path,
    settings: &BuildSettings,
    table: &TranslationTable,
    templates: &[TemplateFile],
) -> Result<BuildReport, BuildError> {
    let output_dir = root.join(&settings.output_dir);
    let json_dir = settings.runtime_json_dir.as_ref().map(|dir| root.join(dir));
    let mut report = BuildReport::default();

    for language in table.languages() {
        let translations = table.language_map(language);
        let renderer = Renderer::new(language, &translations, settings.value_encoding);

        let language_dir = output_dir.join(language);
        create_dir(&language_dir)?;
        tracing::info!(language, dir = %language_dir.display(), "Generating pages");

        for template in templates {
            let rendered = renderer.render(&template.name, &template.read()?);
            let target = language_dir.join(&template.name);
            write_atomic(&target, rendered.text.as_bytes())?;
            report.written.push(target);
            report.missing.extend(rendered.missing);
        }

        if let Some(json_dir) = &json_dir {
            create_dir(json_dir)?;
            let target = json_dir.join(format!("{language}.json"));
            let json = language_map_to_json(&translations).map_err(|e| {
                BuildError::file_access(&target, std::io::Error::other(e))
            })?;
            write_atomic(&target, json.as_bytes())?;
            report.written.push(target);
        }

        report.languages.push(language.to_string());
    }

    Ok(report)
}

fn create_dir(dir: &Path) -> Result<(), BuildError> {
    std::fs::create_dir_all(dir).map_err(|e| BuildError::file_access(dir, e))
}

/// Replaces `path` with `contents` via a temporary file in the same directory.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(|e| BuildError::file_access(path, e))?;
    file.write_all(contents).map_err(|e| BuildError::file_access(path, e))?;
    file.persist(path).map_err(|e| BuildError::file_access(path, e.error))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
    Ok(())
}
