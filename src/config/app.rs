/// アプリケーション設定モジュール
///
/// ビルド時に config.toml から埋め込まれる静的設定を管理します。
/// グローバル定数としては公開せず、起動時に一度だけ `AppConfig::load()` で
/// 構築し、各コンポーネントへ参照または値として渡します。
use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ビルド時に埋め込まれる設定ファイル
const EMBEDDED_CONFIG: &str = include_str!("../../config.toml");

/// アプリケーション全体の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub upload: UploadConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// アップロード制約
///
/// バリデータとセッションエンジンからは読み取り専用として扱われます。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 同時に登録できる最大セッション数
    pub max_files: usize,

    /// アップロード可能な最大ファイルサイズ (バイト)
    pub max_file_size: u64,

    /// 許可する MIME タイプ（空の場合は制限なし）
    #[serde(default)]
    pub allowed_types: Vec<String>,
}

impl UploadConfig {
    /// MIME タイプが許可されているか判定
    pub fn allows_type(&self, mime_type: &str) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// 擬似転送のタイミングと失敗注入に関する設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 0% から 100% までのステップ数
    pub steps: u32,

    /// ステップ間隔の下限 (ミリ秒, 含む)
    pub min_step_delay_ms: u64,

    /// ステップ間隔の上限 (ミリ秒, 含まない)
    pub max_step_delay_ms: u64,

    /// 100% 到達時の失敗確率
    pub failure_probability: f64,

    /// 擬似失敗時のエラーメッセージ
    pub failure_message: String,

    /// 履歴の保持件数
    pub history_capacity: usize,
}

impl SimulationConfig {
    pub fn min_step_delay(&self) -> Duration {
        Duration::from_millis(self.min_step_delay_ms)
    }

    pub fn max_step_delay(&self) -> Duration {
        Duration::from_millis(self.max_step_delay_ms)
    }
}

/// ロギング関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// RUST_LOG 未指定時のログレベル (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// ビルド時に埋め込まれた config.toml から設定を読み込む
    ///
    /// # Errors
    /// パースまたは検証に失敗した場合に ConfigError を返します。
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_toml(EMBEDDED_CONFIG)
    }

    /// TOML 文字列から設定を構築して検証する
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::parse_error("Failed to parse embedded config.toml", e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定値の整合性を検証 (Fail Fast)
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_upload(&self.upload)?;

        let sim = &self.simulation;
        // 進捗は 1 ステップごとに必ず増える必要がある
        if sim.steps == 0 || sim.steps > 100 {
            return Err(ConfigError::validation_error(format!(
                "simulation.steps must be between 1 and 100, got {}",
                sim.steps
            )));
        }
        if sim.min_step_delay_ms >= sim.max_step_delay_ms {
            return Err(ConfigError::validation_error(format!(
                "simulation.min_step_delay_ms ({}) must be less than max_step_delay_ms ({})",
                sim.min_step_delay_ms, sim.max_step_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&sim.failure_probability) {
            return Err(ConfigError::validation_error(format!(
                "simulation.failure_probability must be between 0 and 1, got {}",
                sim.failure_probability
            )));
        }
        if sim.history_capacity == 0 {
            return Err(ConfigError::validation_error(
                "simulation.history_capacity must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// アップロード制約を検証
///
/// ユーザー設定による上書き後にも呼び出されます。
pub fn validate_upload(upload: &UploadConfig) -> Result<(), ConfigError> {
    if upload.max_files == 0 {
        return Err(ConfigError::validation_error(
            "upload.max_files must be greater than 0",
        ));
    }
    if upload.max_file_size == 0 {
        return Err(ConfigError::validation_error(
            "upload.max_file_size must be greater than 0",
        ));
    }
    if let Some(bad) = upload.allowed_types.iter().find(|t| !t.contains('/')) {
        return Err(ConfigError::validation_error(format!(
            "Invalid MIME type '{}' in upload.allowed_types",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_config() {
        let config = AppConfig::load().expect("embedded config should be valid");
        assert_eq!(config.upload.max_files, 10);
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.simulation.steps, 100);
        assert_eq!(config.simulation.min_step_delay_ms, 50);
        assert_eq!(config.simulation.max_step_delay_ms, 150);
        assert_eq!(config.simulation.history_capacity, 10);
        assert_eq!(
            config.simulation.failure_message,
            "Upload failed due to network error"
        );
    }

    #[test]
    fn test_allows_type_empty_means_unrestricted() {
        let upload = UploadConfig {
            max_files: 1,
            max_file_size: 1,
            allowed_types: vec![],
        };
        assert!(upload.allows_type("application/x-anything"));
    }

    #[test]
    fn test_allows_type_restricted() {
        let upload = UploadConfig {
            max_files: 1,
            max_file_size: 1,
            allowed_types: vec!["image/png".to_string()],
        };
        assert!(upload.allows_type("image/png"));
        assert!(!upload.allows_type("image/jpeg"));
    }

    #[test]
    fn test_invalid_delay_range_rejected() {
        let mut config = AppConfig::load().expect("embedded config should be valid");
        config.simulation.min_step_delay_ms = 150;
        config.simulation.max_step_delay_ms = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_steps_out_of_range_rejected() {
        let mut config = AppConfig::load().expect("embedded config should be valid");
        config.simulation.steps = 101;
        assert!(config.validate().is_err());

        config.simulation.steps = 0;
        assert!(config.validate().is_err());

        config.simulation.steps = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut config = AppConfig::load().expect("embedded config should be valid");
        config.simulation.failure_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_mime_type_rejected() {
        let upload = UploadConfig {
            max_files: 1,
            max_file_size: 1,
            allowed_types: vec!["png".to_string()],
        };
        assert!(validate_upload(&upload).is_err());
    }
}
