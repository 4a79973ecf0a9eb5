/// ドメイン層のエラー定義
///
/// アップロード対象の読み込み、バッチ検証、セッション操作に関する
/// ビジネスルール違反を構造化して定義する。
///
/// 擬似転送失敗（10%の確率で発生する失敗）はここには含めない。
/// それはセッションの状態（`UploadStatus::Error`）として記録され、
/// 進捗イベントで通知される。
use crate::domain::session::{SessionId, UploadStatus};
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// ファイルが見つからない
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// ディレクトリが指定された（ファイルが期待される場所）
    #[error("'{path}' is a directory, not a file")]
    NotAFile { path: String },

    /// バッチ内のすべてのファイルが受け付けられなかった
    #[error("no files were admitted:\n{}", .violations.join("\n"))]
    BatchRejected { violations: Vec<String> },

    /// 登録されていないセッションIDが指定された
    #[error("upload not found: {id}")]
    SessionNotFound { id: SessionId },

    /// 終端状態ではないセッションの再試行
    #[error("upload {id} cannot be retried while {status}")]
    RetryNotAllowed { id: SessionId, status: UploadStatus },

    /// ステッピングタスクが終端イベントを送らずに異常終了した
    #[error("upload task aborted: {reason}")]
    TaskAborted { reason: String },
}

impl DomainError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn not_a_file(path: impl Into<String>) -> Self {
        Self::NotAFile { path: path.into() }
    }

    pub fn session_not_found(id: SessionId) -> Self {
        Self::SessionNotFound { id }
    }

    /// エラーの深刻度を返す
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::FileNotFound { .. }
            | Self::NotAFile { .. }
            | Self::BatchRejected { .. }
            | Self::SessionNotFound { .. }
            | Self::RetryNotAllowed { .. } => ErrorSeverity::UserError,
            Self::TaskAborted { .. } => ErrorSeverity::SystemError,
        }
    }

    /// ユーザー向けのヒントメッセージを返す
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::FileNotFound { .. } => {
                Some("Please check the file path and ensure the file exists.")
            }
            Self::NotAFile { .. } => Some("Please specify a file, not a directory."),
            Self::BatchRejected { .. } => Some(
                "Check the upload limits with 'upsim config' or adjust them with 'upsim config set'.",
            ),
            Self::SessionNotFound { .. } => {
                Some("The upload may have already finished or been cancelled.")
            }
            Self::RetryNotAllowed { .. } => {
                Some("Only failed or cancelled uploads can be retried.")
            }
            Self::TaskAborted { .. } => {
                Some("This is an internal error. Run again with RUST_LOG=debug for details.")
            }
        }
    }
}
