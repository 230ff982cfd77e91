//! Command-line entry point: builds the localized site from the current
//! directory.

use std::process::ExitCode;

use site_i18n::build_site;
use site_i18n::config::ConfigManager;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = match std::env::current_dir() {
        Ok(root) => root,
        Err(e) => {
            tracing::error!("Cannot determine working directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut config_manager = ConfigManager::new();
    if let Err(e) = config_manager.load_settings(&root) {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }

    match build_site(&root, config_manager.get_settings()) {
        Ok(report) => {
            if !report.missing.is_empty() {
                tracing::warn!(
                    count = report.missing.len(),
                    "Some placeholders were left untranslated"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
