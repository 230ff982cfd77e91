//! 設定ファイルの読み込み関数

use std::path::Path;

use super::{
    BuildSettings,
    ConfigError,
};

/// 設定ファイル名
pub(super) const CONFIG_FILE_NAME: &str = ".site-i18n.json";

/// 作業ディレクトリから設定を読み込む
///
/// `.site-i18n.json` ファイルを探して読み込む
///
/// # Arguments
/// * `root` - 作業ディレクトリのパス
///
/// # Returns
/// - `Ok(Some(settings))`: 設定ファイルが見つかり、読み込みに成功
/// - `Ok(None)`: 設定ファイルが見つからない
/// - `Err(ConfigError)`: ファイル読み込みまたはパースエラー
pub(super) fn load_from_root(root: &Path) -> Result<Option<BuildSettings>, ConfigError> {
    let config_path = root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    let settings: BuildSettings = serde_json::from_str(&content)?;

    Ok(Some(settings))
}
