/// プレゼンテーション層: アップロード進捗表示DTO
///
/// ドメイン層の`UploadProgress`を人間向けの1行表示に変換します。
///
/// # 設計方針
/// - `From<&UploadProgress>`で借用による変換（所有権を奪わない）
/// - `Option<DisplayProgress>`で表示抑制を明示的に表現
/// - ヘルパー関数で各イベントの変換ロジックを分離
use crate::domain::formatter::{format_file_size, format_upload_speed};
use crate::domain::progress::{UploadEvent, UploadProgress};
use crate::domain::session::UploadSession;

/// 進捗ティックを表示する間隔（%）
const PROGRESS_DISPLAY_INTERVAL: u8 = 10;

/// 進捗表示のカテゴリ
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressCategory {
    /// 受け付け・再試行
    Admission,
    /// アップロード中
    Upload,
    /// 一時停止・再開・中止
    Control,
    Completed,
    Failed,
}

/// プレゼンテーション層用の進捗情報
#[derive(Debug, Clone)]
pub struct DisplayProgress {
    pub message: String,
    pub category: ProgressCategory,
    /// 詳細情報（エラーメッセージなど）
    pub details: Option<String>,
}

impl DisplayProgress {
    pub fn new(message: String, category: ProgressCategory) -> Self {
        Self {
            message,
            category,
            details: None,
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

/// # 戻り値
/// - `Some(DisplayProgress)`: 表示すべき進捗情報
/// - `None`: 表示を抑制（10% 刻み以外の進捗ティック）
impl From<&UploadProgress> for Option<DisplayProgress> {
    fn from(progress: &UploadProgress) -> Self {
        let session = &progress.session;
        match progress.event {
            UploadEvent::Admitted => Some(format_admitted(session)),
            UploadEvent::Retried => Some(format_retried(session)),
            UploadEvent::Progressed => format_progressed(session),
            UploadEvent::Paused => Some(format_control(session, "Paused")),
            UploadEvent::Resumed => Some(format_control(session, "Resumed")),
            UploadEvent::Cancelled => Some(format_control(session, "Cancelled")),
            UploadEvent::Completed => Some(format_completed(session)),
            UploadEvent::Failed => Some(format_failed(session)),
        }
    }
}

fn format_admitted(session: &UploadSession) -> DisplayProgress {
    DisplayProgress::new(
        format!(
            "Started: {} ({}, {})",
            session.name,
            format_file_size(session.size),
            session.mime_type
        ),
        ProgressCategory::Admission,
    )
}

fn format_retried(session: &UploadSession) -> DisplayProgress {
    DisplayProgress::new(
        format!("Retrying: {} ({})", session.name, format_file_size(session.size)),
        ProgressCategory::Admission,
    )
}

fn format_progressed(session: &UploadSession) -> Option<DisplayProgress> {
    if session.progress == 0 || session.progress % PROGRESS_DISPLAY_INTERVAL != 0 {
        return None;
    }
    Some(DisplayProgress::new(
        format!(
            "{}: {:>3}% ({})",
            session.name,
            session.progress,
            format_upload_speed(session.upload_speed)
        ),
        ProgressCategory::Upload,
    ))
}

fn format_control(session: &UploadSession, action: &str) -> DisplayProgress {
    DisplayProgress::new(
        format!("{}: {} at {}%", action, session.name, session.progress),
        ProgressCategory::Control,
    )
}

fn format_completed(session: &UploadSession) -> DisplayProgress {
    DisplayProgress::new(
        format!(
            "Uploaded: {} ({})",
            session.name,
            format_file_size(session.size)
        ),
        ProgressCategory::Completed,
    )
}

fn format_failed(session: &UploadSession) -> DisplayProgress {
    let display = DisplayProgress::new(
        format!("Failed: {}", session.name),
        ProgressCategory::Failed,
    );
    match &session.error_message {
        Some(message) => display.with_details(message.clone()),
        None => display,
    }
}
