/// ドメイン層: アップロードセッションエンジン
///
/// セッションのレジストリ（ID → 状態）を唯一の共有可変リソースとして所有し、
/// セッションごとに1つのステッピングタスクを起動して擬似進捗を進める。
///
/// - 受け付け・一時停止・再開・中止・完了はすべてレジストリのロック下で行う。
///   ステッピングタスクも進捗を書き込む直前に同じロックで登録状態を確認する。
/// - 一時停止は watch チャネル、中止は CancellationToken で通知する。
///   どちらもポーリングではなく待機で扱う。
/// - 状態が変わるたびに `UploadProgress` をチャネルへ送る。
use crate::config::{SimulationConfig, UploadConfig};
use crate::domain::error::DomainError;
use crate::domain::file::CandidateFile;
use crate::domain::history::{HistoryEntry, UploadHistory, UploadStats};
use crate::domain::preview::PreviewStore;
use crate::domain::progress::{UploadEvent, UploadProgress};
use crate::domain::session::{SessionId, UploadSession, UploadStatus};
use crate::domain::simulation::SimulationStrategy;
use crate::domain::validator::{self, Violation};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// ステッピングタスクの最終結果
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Completed(UploadSession),
    Failed(UploadSession),
    Cancelled(SessionId),
}

impl UploadOutcome {
    pub fn id(&self) -> SessionId {
        match self {
            Self::Completed(session) | Self::Failed(session) => session.id,
            Self::Cancelled(id) => *id,
        }
    }
}

/// 受け付けられたアップロード
#[derive(Debug)]
pub struct AdmittedUpload {
    /// 受け付け時点のスナップショット
    pub session: UploadSession,
    pub task: JoinHandle<UploadOutcome>,
}

/// `submit_batch` の結果
#[derive(Debug, Default)]
pub struct BatchResult {
    pub admitted: Vec<AdmittedUpload>,
    pub violations: Vec<Violation>,
}

impl BatchResult {
    pub fn violation_messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

struct SessionEntry {
    session: UploadSession,
    /// 受け付け順
    seq: u64,
    paused: watch::Sender<bool>,
    cancel: CancellationToken,
}

struct Registry {
    sessions: HashMap<SessionId, SessionEntry>,
    next_seq: u64,
}

struct EngineInner {
    upload: UploadConfig,
    simulation: SimulationConfig,
    strategy: Arc<dyn SimulationStrategy>,
    registry: Mutex<Registry>,
    history: Mutex<UploadHistory>,
    previews: PreviewStore,
    events: mpsc::UnboundedSender<UploadProgress>,
}

/// ステップ1回分の結果
enum Step {
    Advanced,
    Cancelled,
}

/// アップロードセッションエンジン
///
/// 複製はすべて同じレジストリと履歴を共有する。
#[derive(Clone)]
pub struct UploadEngine {
    inner: Arc<EngineInner>,
}

impl UploadEngine {
    /// エンジンと進捗イベントの受信側を作成する
    pub fn new(
        upload: UploadConfig,
        simulation: SimulationConfig,
        strategy: Arc<dyn SimulationStrategy>,
    ) -> (Self, mpsc::UnboundedReceiver<UploadProgress>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let history = UploadHistory::new(simulation.history_capacity);
        let engine = Self {
            inner: Arc::new(EngineInner {
                upload,
                simulation,
                strategy,
                registry: Mutex::new(Registry {
                    sessions: HashMap::new(),
                    next_seq: 0,
                }),
                history: Mutex::new(history),
                previews: PreviewStore::new(),
                events,
            }),
        };
        (engine, receiver)
    }

    /// ファイルのバッチを検証し、有効なものを受け付けてアップロードを開始する
    ///
    /// 件数チェックと登録は同じロック下で行うため、並行したバッチが合わせて
    /// `max_files` を超えることはない。Tokio ランタイム内から呼び出すこと。
    pub fn submit_batch(&self, files: Vec<CandidateFile>) -> BatchResult {
        let mut registry = self.inner.registry.lock();
        let batch_size = files.len();
        let validation =
            validator::validate_batch(files, &self.inner.upload, registry.sessions.len());

        if !validation.violations.is_empty() {
            warn!(
                batch_size,
                rejected = validation.violations.len(),
                "batch validation reported violations"
            );
        }

        let admitted = validation
            .valid
            .into_iter()
            .map(|file| self.admit_locked(&mut registry, file, UploadEvent::Admitted, None))
            .collect();

        BatchResult {
            admitted,
            violations: validation.violations,
        }
    }

    /// アップロードを一時停止する
    ///
    /// 既に一時停止中の場合は何もせず現在のスナップショットを返す。
    pub fn pause(&self, id: SessionId) -> Result<UploadSession, DomainError> {
        let mut registry = self.inner.registry.lock();
        let entry = registry
            .sessions
            .get_mut(&id)
            .ok_or_else(|| DomainError::session_not_found(id))?;

        if entry.session.status == UploadStatus::Uploading {
            entry.session.status = UploadStatus::Paused;
            entry.paused.send_replace(true);
            self.inner.emit(UploadEvent::Paused, &entry.session);
            info!(%id, progress = entry.session.progress, "upload paused");
        }
        Ok(entry.session.clone())
    }

    /// 一時停止中のアップロードを再開する
    ///
    /// アップロード中の場合は何もせず現在のスナップショットを返す。
    pub fn resume(&self, id: SessionId) -> Result<UploadSession, DomainError> {
        let mut registry = self.inner.registry.lock();
        let entry = registry
            .sessions
            .get_mut(&id)
            .ok_or_else(|| DomainError::session_not_found(id))?;

        if entry.session.status == UploadStatus::Paused {
            entry.session.status = UploadStatus::Uploading;
            entry.paused.send_replace(false);
            self.inner.emit(UploadEvent::Resumed, &entry.session);
            info!(%id, progress = entry.session.progress, "upload resumed");
        }
        Ok(entry.session.clone())
    }

    /// アップロードを中止し、レジストリから外す
    ///
    /// ステッピングタスクは次の待機点で中止を検知して終了する。
    pub fn cancel(&self, id: SessionId) -> Result<UploadSession, DomainError> {
        let mut registry = self.inner.registry.lock();
        let entry = registry
            .sessions
            .remove(&id)
            .ok_or_else(|| DomainError::session_not_found(id))?;

        entry.cancel.cancel();
        let mut session = entry.session;
        self.inner.release_preview(&session);
        session.cancel();
        self.inner.emit(UploadEvent::Cancelled, &session);
        info!(%id, progress = session.progress, "upload cancelled");
        Ok(session)
    }

    /// 登録中のすべてのアップロードを中止する
    pub fn cancel_all(&self) -> Vec<UploadSession> {
        let ids: Vec<SessionId> = self.inner.registry.lock().sessions.keys().copied().collect();
        ids.into_iter()
            .filter_map(|id| self.cancel(id).ok())
            .collect()
    }

    /// 失敗または中止されたアップロードを新しいセッションとしてやり直す
    ///
    /// 元のセッションは破棄され、同じ名前・サイズ・MIME タイプのファイルが
    /// 新しいIDで progress = 0 から再開する。件数制約の検証は行わない。
    pub fn retry(&self, snapshot: &UploadSession) -> Result<AdmittedUpload, DomainError> {
        if !snapshot.status.is_retryable() {
            return Err(DomainError::RetryNotAllowed {
                id: snapshot.id,
                status: snapshot.status,
            });
        }

        let mut registry = self.inner.registry.lock();
        if let Some(stale) = registry.sessions.remove(&snapshot.id) {
            stale.cancel.cancel();
            self.inner.release_preview(&stale.session);
        }

        info!(previous = %snapshot.id, name = %snapshot.name, "retrying upload");
        Ok(self.admit_locked(
            &mut registry,
            snapshot.to_candidate(),
            UploadEvent::Retried,
            Some(snapshot.id),
        ))
    }

    /// 登録中のセッション（受け付け順）
    pub fn active_sessions(&self) -> Vec<UploadSession> {
        let registry = self.inner.registry.lock();
        let mut entries: Vec<&SessionEntry> = registry.sessions.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.session.clone()).collect()
    }

    pub fn session(&self, id: SessionId) -> Option<UploadSession> {
        self.inner
            .registry
            .lock()
            .sessions
            .get(&id)
            .map(|entry| entry.session.clone())
    }

    /// 履歴（新しい順）
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.history.lock().entries()
    }

    pub fn stats(&self) -> UploadStats {
        self.inner.history.lock().stats()
    }

    /// 解放されていないプレビューの数
    pub fn live_previews(&self) -> usize {
        self.inner.previews.live_count()
    }

    fn admit_locked(
        &self,
        registry: &mut Registry,
        file: CandidateFile,
        event: UploadEvent,
        retry_of: Option<SessionId>,
    ) -> AdmittedUpload {
        let preview = self.inner.previews.create_for(&file);
        let mut session = UploadSession::admit(&file, preview);
        session.retry_of = retry_of;
        let id = session.id;

        let (paused_tx, paused_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        let seq = registry.next_seq;
        registry.next_seq += 1;
        registry.sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                seq,
                paused: paused_tx,
                cancel: cancel.clone(),
            },
        );

        let delay = self.inner.strategy.step_delay();
        info!(
            %id,
            name = %session.name,
            size = session.size,
            delay_ms = delay.as_millis() as u64,
            "upload admitted"
        );
        self.inner.emit(event, &session);

        let task = tokio::spawn(run_session(
            Arc::clone(&self.inner),
            id,
            delay,
            paused_rx,
            cancel,
        ));

        AdmittedUpload { session, task }
    }
}

/// ステッピングタスク本体
///
/// `steps` 回、固定のステップ間隔だけ待ってから進捗を1段進める。
/// 各ステップの前に中止を確認し、一時停止中は再開か中止まで待機する。
async fn run_session(
    inner: Arc<EngineInner>,
    id: SessionId,
    delay: Duration,
    mut paused: watch::Receiver<bool>,
    cancel: CancellationToken,
) -> UploadOutcome {
    let started = Instant::now();
    let steps = u64::from(inner.simulation.steps);

    for step in 1..=steps {
        tokio::select! {
            _ = cancel.cancelled() => return UploadOutcome::Cancelled(id),
            _ = tokio::time::sleep(delay) => {}
        }

        let progress = (step * 100 / steps) as u8;
        if let Step::Cancelled = inner.advance(id, progress, started, &mut paused, &cancel).await {
            debug!(%id, "stepping stopped after cancellation");
            return UploadOutcome::Cancelled(id);
        }
    }

    let failed = inner.strategy.should_fail();
    loop {
        if let Some(outcome) = inner.finish(id, started, failed) {
            return outcome;
        }

        // 100% 到達直後に一時停止された
        tokio::select! {
            _ = cancel.cancelled() => return UploadOutcome::Cancelled(id),
            changed = paused.changed() => {
                if changed.is_err() {
                    return UploadOutcome::Cancelled(id);
                }
            }
        }
    }
}

impl EngineInner {
    fn emit(&self, event: UploadEvent, session: &UploadSession) {
        // 購読側が先に終了していても送信失敗は無視する
        let _ = self.events.send(UploadProgress::new(event, session.clone()));
    }

    fn release_preview(&self, session: &UploadSession) {
        if let Some(handle) = session.preview {
            self.previews.release(handle);
        }
    }

    /// 進捗を1段進める。一時停止中なら再開まで待つ
    async fn advance(
        &self,
        id: SessionId,
        progress: u8,
        started: Instant,
        paused: &mut watch::Receiver<bool>,
        cancel: &CancellationToken,
    ) -> Step {
        loop {
            {
                let mut registry = self.registry.lock();
                let Some(entry) = registry.sessions.get_mut(&id) else {
                    return Step::Cancelled;
                };
                if cancel.is_cancelled() {
                    return Step::Cancelled;
                }
                if !*entry.paused.borrow() {
                    entry.session.advance(progress, started.elapsed());
                    self.emit(UploadEvent::Progressed, &entry.session);
                    return Step::Advanced;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Step::Cancelled,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return Step::Cancelled;
                    }
                }
            }
        }
    }

    /// 100% 到達後の終端処理
    ///
    /// 一時停止中なら何もせず `None` を返す。
    fn finish(&self, id: SessionId, started: Instant, failed: bool) -> Option<UploadOutcome> {
        let mut registry = self.registry.lock();
        if registry
            .sessions
            .get(&id)
            .is_some_and(|entry| entry.session.status == UploadStatus::Paused)
        {
            return None;
        }
        let Some(entry) = registry.sessions.remove(&id) else {
            return Some(UploadOutcome::Cancelled(id));
        };
        let mut session = entry.session;
        self.release_preview(&session);

        if failed {
            session.fail(self.simulation.failure_message.clone());
            warn!(%id, name = %session.name, "simulated transfer failure");
            self.emit(UploadEvent::Failed, &session);
            return Some(UploadOutcome::Failed(session));
        }

        session.complete();
        if let Some(evicted) = self.history.lock().record(&session) {
            debug!(evicted = %evicted.id, "history entry evicted");
        }
        info!(
            %id,
            name = %session.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload completed"
        );
        self.emit(UploadEvent::Completed, &session);
        Some(UploadOutcome::Completed(session))
    }
}
