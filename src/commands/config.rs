/// 設定コマンド
///
/// アップロード制約の表示・上書き・初期化を行います。
use crate::commands::result::{CommandResult, ConfigAction, ConfigResult};
use crate::config::{self, UserConfig};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// 設定コマンドを実行
///
/// # Returns
/// 成功時はOk(CommandResult)、失敗時はエラー
pub async fn execute(action: ConfigAction) -> Result<CommandResult> {
    let path = UserConfig::config_path().context("Failed to locate configuration file")?;
    execute_at(&path, action)
}

/// 指定パスのユーザー設定に対して実行する
fn execute_at(path: &Path, action: ConfigAction) -> Result<CommandResult> {
    let mut user_config = match &action {
        // 壊れたファイルも reset で上書きできる
        ConfigAction::Reset => UserConfig::load_from(path).unwrap_or_default(),
        _ => UserConfig::load_from(path).context("Failed to load configuration file")?,
    };

    match &action {
        ConfigAction::Show => {}
        ConfigAction::Set { key, value } => {
            user_config
                .set(key, value)
                .with_context(|| format!("Failed to set '{}'", key))?;
        }
        ConfigAction::Reset => user_config.reset(),
    }

    // 不正な組み合わせは保存前に弾く
    let effective = config::effective_config(&user_config)
        .context("Configuration would be invalid; nothing was saved")?;

    if !matches!(action, ConfigAction::Show) {
        user_config
            .save_to(path)
            .context("Failed to save configuration file")?;
        info!(path = %path.display(), "user configuration saved");
    }

    Ok(CommandResult::Config(ConfigResult {
        action,
        effective,
        has_overrides: user_config.has_overrides(),
    }))
}
