/// ドメイン層: アップロードセッション
///
/// 1ファイル分のアップロード試行を表す。状態遷移はセッションエンジンだけが行い、
/// 外部へは常にクローン（スナップショット）として渡される。
use crate::domain::file::CandidateFile;
use crate::domain::preview::PreviewHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// セッションID（UUID v4、再利用されない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// セッションの状態
///
/// ```text
/// Uploading ⇄ Paused
///     │          │
///     ├─→ Completed
///     ├─→ Error
///     └──────────┴─→ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Uploading,
    Paused,
    Completed,
    Error,
    Cancelled,
}

impl UploadStatus {
    /// 再試行の対象となる状態か
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uploading => "uploading",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// アップロードセッション
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSession {
    pub id: SessionId,
    pub name: String,
    /// バイト数
    pub size: u64,
    pub mime_type: String,
    pub status: UploadStatus,
    /// 0〜100 (%)
    pub progress: u8,
    /// bytes/sec
    pub upload_speed: f64,
    /// status が Error のときのみ Some
    pub error_message: Option<String>,
    /// 画像ファイルのときのみ Some
    pub preview: Option<PreviewHandle>,
    pub started_at: DateTime<Utc>,
    /// 再試行で作られたセッションの場合、元のセッションID
    pub retry_of: Option<SessionId>,
}

impl UploadSession {
    /// 受け付けたファイルから新しいセッションを作成
    pub(crate) fn admit(file: &CandidateFile, preview: Option<PreviewHandle>) -> Self {
        Self {
            id: SessionId::new(),
            name: file.name.clone(),
            size: file.size,
            mime_type: file.mime_type.clone(),
            status: UploadStatus::Uploading,
            progress: 0,
            upload_speed: 0.0,
            error_message: None,
            preview,
            started_at: Utc::now(),
            retry_of: None,
        }
    }

    /// スナップショットから同じ内容の候補ファイルを復元する（再試行用）
    pub fn to_candidate(&self) -> CandidateFile {
        CandidateFile::new(self.name.clone(), self.size, self.mime_type.clone())
    }

    pub(crate) fn advance(&mut self, progress: u8, elapsed: Duration) {
        self.progress = progress.min(100).max(self.progress);
        self.upload_speed = upload_speed(self.size, self.progress, elapsed);
    }

    pub(crate) fn complete(&mut self) {
        self.status = UploadStatus::Completed;
        self.progress = 100;
        self.error_message = None;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = UploadStatus::Error;
        self.error_message = Some(message.into());
    }

    pub(crate) fn cancel(&mut self) {
        self.status = UploadStatus::Cancelled;
        self.error_message = None;
    }
}

/// 転送済みバイト数 ÷ 経過秒数
///
/// 進捗が 0 または経過時間が 0 の場合は 0。
pub fn upload_speed(size: u64, progress: u8, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if progress == 0 || secs <= 0.0 {
        return 0.0;
    }
    size as f64 * (f64::from(progress) / 100.0) / secs
}
