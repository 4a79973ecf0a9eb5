/// コマンド実行結果を表す型
///
/// 各コマンドはこの型を返し、プレゼンテーション層で
/// 人間向けと機械向けの出力フォーマットを決定する。
use crate::config::{AppConfig, UploadConfig};
use crate::domain::history::{HistoryEntry, UploadStats};
use crate::domain::session::UploadSession;
use serde::Serialize;

/// コマンド実行結果の統一型
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandResult {
    Upload(UploadReport),
    Config(ConfigResult),
    Help,
}

/// アップロードコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    /// 受け付けられなかったファイルの違反メッセージ
    pub rejected: Vec<String>,
    pub completed: Vec<UploadSession>,
    pub failed: Vec<UploadSession>,
    pub cancelled: Vec<UploadSession>,
    /// 新しい順
    pub history: Vec<HistoryEntry>,
    pub stats: UploadStats,
}

impl UploadReport {
    pub fn all_succeeded(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty() && self.cancelled.is_empty()
    }
}

/// 設定コマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResult {
    pub action: ConfigAction,
    /// 実効設定
    pub effective: AppConfig,
    /// ユーザー設定で上書きされているか
    pub has_overrides: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigAction {
    Show,
    Set { key: String, value: String },
    Reset,
}

impl CommandResult {
    /// 成功メッセージを取得（人間向け出力用）
    pub fn success_message(&self) -> String {
        match self {
            CommandResult::Upload(r) => {
                if r.all_succeeded() {
                    "All uploads completed successfully!".to_string()
                } else {
                    format!(
                        "{} completed, {} failed, {} cancelled, {} rejected",
                        r.completed.len(),
                        r.failed.len(),
                        r.cancelled.len(),
                        r.rejected.len()
                    )
                }
            }
            CommandResult::Config(r) => match &r.action {
                ConfigAction::Show => "Current configuration".to_string(),
                ConfigAction::Set { key, value } => format!("Set {} = {}", key, value),
                ConfigAction::Reset => "Configuration overrides cleared.".to_string(),
            },
            CommandResult::Help => "".to_string(),
        }
    }
}

/// 上書き後のアップロード制約を要約する（人間向け）
pub fn describe_limits(upload: &UploadConfig) -> Vec<String> {
    let types = if upload.allowed_types.is_empty() {
        "any".to_string()
    } else {
        upload.allowed_types.join(", ")
    };
    vec![
        format!("Max files:      {}", upload.max_files),
        format!(
            "Max file size:  {}",
            crate::domain::formatter::format_file_size(upload.max_file_size)
        ),
        format!("Allowed types:  {}", types),
    ]
}
