//! Template discovery.

use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;

use crate::config::TemplateMatcher;
use crate::error::BuildError;

/// A template found in the template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// File name, reused as the output file name.
    pub name: String,
    pub path: PathBuf,
}

impl TemplateFile {
    /// Reads the template text.
    ///
    /// # Errors
    /// `FileAccess` when the file cannot be read as UTF-8.
    pub fn read(&self) -> Result<String, BuildError> {
        std::fs::read_to_string(&self.path).map_err(|e| BuildError::file_access(&self.path, e))
    }
}

/// Lists templates directly inside `dir` (no recursion), sorted by name.
///
/// # Errors
/// `FileAccess` when the directory cannot be listed.
pub fn scan_templates(
    dir: &Path,
    matcher: &TemplateMatcher,
) -> Result<Vec<TemplateFile>, BuildError> {
    let metadata = std::fs::metadata(dir).map_err(|e| BuildError::file_access(dir, e))?;
    if !metadata.is_dir() {
        return Err(BuildError::file_access(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }

    let mut templates = Vec::new();
    for result in WalkBuilder::new(dir)
        .standard_filters(false)
        .max_depth(Some(1))
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
    {
        let entry = result.map_err(|err| {
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("failed to list directory"));
            BuildError::file_access(dir, source)
        })?;

        if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::debug!(path = ?entry.path(), "Skipping file with non UTF-8 name");
            continue;
        };
        if !matcher.is_template(Path::new(name)) {
            continue;
        }

        templates.push(TemplateFile { name: name.to_string(), path: entry.path().to_path_buf() });
    }

    tracing::debug!(dir = %dir.display(), count = templates.len(), "Scanned templates");
    Ok(templates)
}
