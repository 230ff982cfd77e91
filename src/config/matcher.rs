//! File name matcher for templates.

use std::path::Path;

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};

use super::BuildSettings;

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid template pattern '{pattern}': {source}")]
    InvalidTemplatePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),
}

/// Matches template file names against the configured glob patterns.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    include_set: GlobSet,
    exclude_set: GlobSet,
}

impl TemplateMatcher {
    /// Creates a new matcher from settings.
    pub fn new(settings: &BuildSettings) -> Result<Self, MatcherError> {
        let include_set = Self::build_glob_set(&settings.template_patterns, |pattern, source| {
            MatcherError::InvalidTemplatePattern { pattern, source }
        })?;

        let exclude_set = Self::build_glob_set(&settings.exclude_patterns, |pattern, source| {
            MatcherError::InvalidExcludePattern { pattern, source }
        })?;

        Ok(Self { include_set, exclude_set })
    }

    fn build_glob_set<F>(patterns: &[String], make_error: F) -> Result<GlobSet, MatcherError>
    where
        F: Fn(String, globset::Error) -> MatcherError,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| make_error(pattern.clone(), e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    /// Returns true if the file name matches `templatePatterns` but not
    /// `excludePatterns`.
    #[must_use]
    pub fn is_template(&self, file_name: &Path) -> bool {
        self.include_set.is_match(file_name) && !self.exclude_set.is_match(file_name)
    }
}
