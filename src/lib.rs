//! site-i18n
//!
//! Spreadsheet-driven localization for static HTML sites: one output tree per
//! language at build time, plus a browser-side localizer for switching
//! languages in place.

pub mod config;
pub mod error;
pub mod generator;
pub mod input;
pub mod placeholder;
pub mod runtime;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use error::BuildError;
pub use generator::{
    BuildReport,
    build_site,
};
