//! 設定管理を行うモジュール

use std::path::Path;

use super::{
    BuildSettings,
    ConfigError,
    loader,
};

/// 設定管理を行う
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: BuildSettings,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: BuildSettings::default() }
    }

    /// 設定を読み込む
    ///
    /// # Arguments
    /// * `root` - 作業ディレクトリのパス
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, root: &Path) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings for root: {:?}", root);

        let settings =
            loader::load_from_root(root)?.map_or_else(BuildSettings::default, |settings| {
                tracing::debug!("Loaded settings file: {:?}", settings);
                settings
            });

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// 現在の設定を取得
    #[must_use]
    pub const fn get_settings(&self) -> &BuildSettings {
        &self.current_settings
    }
}
