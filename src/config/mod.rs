/// 設定管理モジュール
///
/// このモジュールは2層の設定構造を提供します:
/// 1. AppConfig - ビルド時に埋め込まれる静的設定（アップロード制約・擬似転送・ロギング）
/// 2. UserConfig - 実行時に読み込まれるアップロード制約の上書き
///
/// どちらもグローバル状態は持たず、コマンドの開始時に構築して下位層へ渡します。
///
/// # 使用例
///
/// ```rust,ignore
/// use crate::config::{AppConfig, UserConfig};
///
/// let app_config = AppConfig::load()?;
/// let upload = UserConfig::load()?.apply_to(&app_config.upload)?;
/// ```
pub mod app;
pub mod error;
pub mod user;

pub use app::{AppConfig, SimulationConfig, UploadConfig};
pub use user::UserConfig;

/// ビルド時設定とユーザー設定をマージした実効設定を構築する
pub fn effective_config(user_config: &UserConfig) -> Result<AppConfig, error::ConfigError> {
    let mut config = AppConfig::load()?;
    config.upload = user_config.apply_to(&config.upload)?;
    Ok(config)
}
