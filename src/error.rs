use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

use crate::config::{
    ConfigError,
    MatcherError,
};

/// Fatal errors of a build run. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A file or directory could not be opened, listed, read or written.
    #[error("Failed to access '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet container is readable but its content is not usable.
    #[error("Invalid spreadsheet '{}': {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

impl BuildError {
    pub(crate) fn file_access(path: &Path, source: std::io::Error) -> Self {
        Self::FileAccess { path: path.to_path_buf(), source }
    }

    pub(crate) fn format(path: &Path, message: impl Into<String>) -> Self {
        Self::Format { path: path.to_path_buf(), message: message.into() }
    }
}
