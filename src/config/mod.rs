//! Build configuration: the optional `.site-i18n.json` file and its defaults.

/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Template file name matcher
mod matcher;
/// Configuration types and settings
mod types;

pub use manager::ConfigManager;
pub use matcher::{
    MatcherError,
    TemplateMatcher,
};
pub use types::{
    BuildSettings,
    ConfigError,
    ValidationError,
    ValueEncoding,
};
