/// ドメイン層: アップロード履歴と集計
///
/// 完了したセッションのスナップショットを新しい順に保持する。
/// 容量を超えた場合は最も古いエントリを黙って捨てる。
/// 統計値は保存せず、履歴から都度計算する。
use crate::domain::session::{SessionId, UploadSession, UploadStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// 完了時点のセッションのスナップショット
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: SessionId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub status: UploadStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl From<&UploadSession> for HistoryEntry {
    fn from(session: &UploadSession) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            size: session.size,
            mime_type: session.mime_type.clone(),
            status: session.status,
            started_at: session.started_at,
            completed_at: Utc::now(),
        }
    }
}

/// 履歴から導出される統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    pub total_uploads: usize,
    pub successful_uploads: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone)]
pub struct UploadHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl UploadHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 先頭に追加し、容量超過分を返す
    pub fn record(&mut self, session: &UploadSession) -> Option<HistoryEntry> {
        self.entries.push_front(HistoryEntry::from(session));
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// 新しい順のコピー
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn stats(&self) -> UploadStats {
        compute_stats(self.entries.iter())
    }
}

/// 履歴エントリを集計する
pub fn compute_stats<'a>(entries: impl IntoIterator<Item = &'a HistoryEntry>) -> UploadStats {
    entries
        .into_iter()
        .fold(UploadStats::default(), |acc, entry| UploadStats {
            total_uploads: acc.total_uploads + 1,
            successful_uploads: acc.successful_uploads
                + usize::from(entry.status == UploadStatus::Completed),
            total_size: acc.total_size + entry.size,
        })
}
