use crate::domain::session::UploadSession;
use chrono::{DateTime, Utc};
use serde::Serialize;
/// ドメイン層: アップロード進捗イベント定義
///
/// セッションの状態が変わるたびにエンジンが発行するイベント。
/// プレゼンテーション層はチャネル経由でこれを受け取り、
/// 人間向けの進捗表示や機械向けの JSON 出力に使う。

/// イベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadEvent {
    /// 受け付け直後（progress = 0）
    Admitted,

    /// 再試行による新しいセッションの受け付け
    Retried,

    /// 1ステップ進んだ
    Progressed,

    Paused,

    Resumed,

    /// 100% 到達、成功
    Completed,

    /// 100% 到達、擬似転送失敗
    Failed,

    /// 利用者による中止
    Cancelled,
}

impl UploadEvent {
    /// このセッションに対する最後のイベントか
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// 進捗情報
///
/// `session` はイベント発生時点のスナップショットで、
/// 書き換えてもエンジンの状態には影響しない。
#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    pub event: UploadEvent,
    pub session: UploadSession,
    pub timestamp: DateTime<Utc>,
}

impl UploadProgress {
    pub fn new(event: UploadEvent, session: UploadSession) -> Self {
        Self {
            event,
            session,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::file::CandidateFile;

    #[test]
    fn test_terminal_events() {
        assert!(UploadEvent::Completed.is_terminal());
        assert!(UploadEvent::Failed.is_terminal());
        assert!(UploadEvent::Cancelled.is_terminal());
        assert!(!UploadEvent::Paused.is_terminal());
        assert!(!UploadEvent::Retried.is_terminal());
    }

    #[test]
    fn test_serializes_with_snake_case_event() {
        let session = UploadSession::admit(&CandidateFile::new("a.txt", 3, "text/plain"), None);
        let progress = UploadProgress::new(UploadEvent::Admitted, session);

        let json = serde_json::to_value(&progress).expect("serialize");
        assert_eq!(json["event"], "admitted");
        assert_eq!(json["session"]["status"], "uploading");
        assert_eq!(json["session"]["progress"], 0);
    }
}
