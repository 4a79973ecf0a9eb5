use crate::commands::result::{CommandResult, UploadReport};
use crate::config::{self, UserConfig};
use crate::domain::engine::{AdmittedUpload, UploadEngine, UploadOutcome};
use crate::domain::error::DomainError;
use crate::domain::file::CandidateFile;
use crate::domain::progress::{UploadEvent, UploadProgress};
use crate::domain::session::{SessionId, UploadSession};
use crate::domain::simulation::{RandomSimulation, SimulationStrategy};
use crate::presentation::input::{self, ControlCommand};
use crate::presentation::output;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// アップロードコマンドのオプション
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOptions {
    pub files: Vec<String>,
    /// 乱数シード（再現可能な実行用）
    pub seed: Option<u64>,
    /// stdin から pause/resume/cancel を受け付ける
    pub interactive: bool,
    /// 失敗したアップロードを1回だけ自動で再試行する
    pub retry_failed: bool,
}

/// アップロードコマンドを実行する
///
/// # 引数
/// * `options` - 対象ファイルと実行オプション
/// * `machine_output` - 進捗を JSON Lines で stdout に出力するか
///
/// # エラー
/// このレイヤーでは anyhow::Result を返し、
/// 設定層・ドメイン層のエラーを集約する。
pub async fn execute(options: UploadOptions, machine_output: bool) -> Result<CommandResult> {
    let user_config = UserConfig::load()
        .context("Failed to load user configuration. Please check your config.toml file.")?;
    let app_config =
        config::effective_config(&user_config).context("Failed to build upload configuration")?;

    let candidates = options
        .files
        .iter()
        .map(|path| CandidateFile::from_path(path))
        .collect::<Result<Vec<_>, DomainError>>()
        .context("Failed to read upload targets")?;

    let strategy: Arc<dyn SimulationStrategy> = match options.seed {
        Some(seed) => Arc::new(RandomSimulation::with_seed(&app_config.simulation, seed)),
        None => Arc::new(RandomSimulation::from_config(&app_config.simulation)),
    };
    let (engine, events) = UploadEngine::new(
        app_config.upload.clone(),
        app_config.simulation.clone(),
        strategy,
    );

    let batch = engine.submit_batch(candidates);
    let rejected = batch.violation_messages();
    if batch.admitted.is_empty() {
        return Err(DomainError::BatchRejected {
            violations: rejected,
        })
        .context("File validation failed");
    }
    if !machine_output {
        output::print_rejections(&rejected);
    }

    let mut run = UploadRun::new(
        engine.clone(),
        batch.admitted,
        options.retry_failed,
        machine_output,
    );
    run.drive(events, options.interactive).await?;

    info!(
        completed = run.completed.len(),
        failed = run.failed.len(),
        cancelled = run.cancelled.len(),
        live_previews = engine.live_previews(),
        "upload run finished"
    );

    Ok(CommandResult::Upload(UploadReport {
        rejected,
        completed: run.completed,
        failed: run.failed,
        cancelled: run.cancelled,
        history: engine.history(),
        stats: engine.stats(),
    }))
}

/// 1回のコマンド実行中のセッション追跡
struct UploadRun {
    engine: UploadEngine,
    /// 受け付け順の番号 → 現在のセッションID（再試行で差し替わる）
    slots: Vec<SessionId>,
    /// 終端イベント待ちのセッション数
    outstanding: usize,
    /// ステッピングタスクの監視（異常終了の検知用）
    tasks: JoinSet<Result<UploadOutcome, JoinError>>,
    retry_failed: bool,
    machine_output: bool,
    completed: Vec<UploadSession>,
    failed: Vec<UploadSession>,
    cancelled: Vec<UploadSession>,
}

impl UploadRun {
    fn new(
        engine: UploadEngine,
        admitted: Vec<AdmittedUpload>,
        retry_failed: bool,
        machine_output: bool,
    ) -> Self {
        let mut tasks = JoinSet::new();
        let slots = admitted
            .into_iter()
            .map(|upload| {
                tasks.spawn(upload.task);
                upload.session.id
            })
            .collect::<Vec<_>>();

        Self {
            engine,
            outstanding: slots.len(),
            tasks,
            slots,
            retry_failed,
            machine_output,
            completed: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    /// すべてのセッションが終端に達するまでイベントと操作を処理する
    async fn drive(
        &mut self,
        mut events: mpsc::UnboundedReceiver<UploadProgress>,
        interactive: bool,
    ) -> Result<()> {
        let mut controls = interactive.then(input::spawn_stdin_reader);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        while self.outstanding > 0 {
            tokio::select! {
                progress = events.recv() => {
                    let Some(progress) = progress else { break };
                    output::output_progress(&progress, self.machine_output)?;
                    self.on_progress(progress);
                }
                line = next_control(&mut controls) => match line {
                    Some(line) => self.on_control_line(&line),
                    None => controls = None,
                },
                joined = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Some(joined) = joined {
                        self.on_task_finished(joined)?;
                    }
                }
                _ = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    warn!("interrupted, cancelling active uploads");
                    self.engine.cancel_all();
                }
            }
        }
        Ok(())
    }

    /// 終端イベントを送らずに終わったタスクはエラーとして扱う
    fn on_task_finished(
        &mut self,
        joined: Result<Result<UploadOutcome, JoinError>, JoinError>,
    ) -> Result<()> {
        match joined {
            Ok(Ok(outcome)) => {
                debug!(id = %outcome.id(), "stepping task finished");
                Ok(())
            }
            Ok(Err(e)) | Err(e) => {
                warn!(error = %e, "stepping task aborted");
                Err(DomainError::TaskAborted {
                    reason: e.to_string(),
                })
                .context("An upload stopped unexpectedly")
            }
        }
    }

    fn on_progress(&mut self, progress: UploadProgress) {
        if progress.event.is_terminal() {
            self.outstanding -= 1;
        }

        let session = progress.session;
        match progress.event {
            UploadEvent::Completed => self.completed.push(session),
            UploadEvent::Cancelled => self.cancelled.push(session),
            UploadEvent::Failed => {
                // 自動再試行は元のセッションに対して1回だけ
                if self.retry_failed && session.retry_of.is_none() {
                    self.retry(session);
                } else {
                    self.failed.push(session);
                }
            }
            UploadEvent::Admitted
            | UploadEvent::Retried
            | UploadEvent::Progressed
            | UploadEvent::Paused
            | UploadEvent::Resumed => {}
        }
    }

    fn on_control_line(&mut self, line: &str) {
        let command = match input::parse_control_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                output::print_control_error(&e.to_string());
                return;
            }
        };

        let Some(index) = command.index() else {
            output::print_sessions(&self.engine.active_sessions());
            return;
        };
        let Some(&id) = self.slots.get(index - 1) else {
            output::print_control_error(&format!(
                "No upload #{} (there are {})",
                index,
                self.slots.len()
            ));
            return;
        };

        let result = match command {
            ControlCommand::Pause(_) => self.engine.pause(id).map(|_| ()),
            ControlCommand::Resume(_) => self.engine.resume(id).map(|_| ()),
            ControlCommand::Cancel(_) => self.engine.cancel(id).map(|_| ()),
            ControlCommand::Retry(_) => self.retry_finished(id),
            ControlCommand::List => Ok(()),
        };
        if let Err(e) = result {
            output::print_control_error(&e.to_string());
        }
    }

    /// 終端状態のセッションを利用者の指示で再試行する
    fn retry_finished(&mut self, id: SessionId) -> Result<(), DomainError> {
        let position = |list: &[UploadSession]| list.iter().position(|s| s.id == id);
        let session = if let Some(i) = position(&self.failed) {
            self.failed.remove(i)
        } else if let Some(i) = position(&self.cancelled) {
            self.cancelled.remove(i)
        } else {
            return match self.engine.session(id) {
                Some(active) => Err(DomainError::RetryNotAllowed {
                    id,
                    status: active.status,
                }),
                None => Err(DomainError::session_not_found(id)),
            };
        };
        self.retry(session);
        Ok(())
    }

    fn retry(&mut self, session: UploadSession) {
        match self.engine.retry(&session) {
            Ok(upload) => {
                if let Some(slot) = self.slots.iter_mut().find(|slot| **slot == session.id) {
                    *slot = upload.session.id;
                }
                self.tasks.spawn(upload.task);
                self.outstanding += 1;
            }
            Err(e) => {
                warn!(id = %session.id, error = %e, "retry rejected");
                self.failed.push(session);
            }
        }
    }
}

/// 操作チャネルの次の行。チャネルが無ければ永久に待つ
async fn next_control(controls: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match controls {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimulationConfig, UploadConfig};
    use crate::domain::session::UploadStatus;
    use crate::domain::simulation::testing::FixedSimulation;
    use std::time::Duration;

    /// 100% 到達時にパニックする戦略
    struct PanicOnFinish;

    impl SimulationStrategy for PanicOnFinish {
        fn step_delay(&self) -> Duration {
            Duration::from_millis(10)
        }

        fn should_fail(&self) -> bool {
            panic!("failure trial exploded");
        }
    }

    fn engine(
        strategy: impl SimulationStrategy + 'static,
    ) -> (UploadEngine, mpsc::UnboundedReceiver<UploadProgress>) {
        UploadEngine::new(
            UploadConfig {
                max_files: 5,
                max_file_size: 10_000,
                allowed_types: vec![],
            },
            SimulationConfig {
                steps: 10,
                min_step_delay_ms: 50,
                max_step_delay_ms: 150,
                failure_probability: 0.0,
                failure_message: "Upload failed due to network error".to_string(),
                history_capacity: 10,
            },
            Arc::new(strategy),
        )
    }

    fn files(n: usize) -> Vec<CandidateFile> {
        (1..=n)
            .map(|i| CandidateFile::new(format!("f{i}.txt"), 100, "text/plain"))
            .collect()
    }

    fn start(engine: &UploadEngine, n: usize, retry_failed: bool) -> UploadRun {
        let batch = engine.submit_batch(files(n));
        UploadRun::new(engine.clone(), batch.admitted, retry_failed, true)
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_task_ends_drive_with_system_error() {
        let (engine, events) = engine(PanicOnFinish);
        let mut run = start(&engine, 1, false);

        let err = tokio::time::timeout(Duration::from_secs(60), run.drive(events, false))
            .await
            .expect("drive should not hang")
            .unwrap_err();

        let domain = err
            .chain()
            .find_map(|c| c.downcast_ref::<DomainError>())
            .expect("domain error in chain");
        assert!(matches!(domain, DomainError::TaskAborted { .. }));
        assert_eq!(domain.severity(), crate::error_severity::ErrorSeverity::SystemError);
        assert_eq!(run.outstanding, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_collects_outcomes() {
        let strategy = FixedSimulation::scripted(
            Duration::from_millis(10),
            Vec::new(),
            vec![false, true],
        );
        let (engine, events) = engine(strategy);
        let mut run = start(&engine, 2, false);

        run.drive(events, false).await.expect("drive should succeed");

        assert_eq!(run.outstanding, 0);
        assert_eq!(run.completed.len(), 1);
        assert_eq!(run.failed.len(), 1);
        assert_eq!(run.failed[0].status, UploadStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_failed_retries_once() {
        let strategy =
            FixedSimulation::scripted(Duration::from_millis(10), Vec::new(), vec![true, true]);
        let (engine, events) = engine(strategy);
        let mut run = start(&engine, 1, true);
        let original = run.slots[0];

        run.drive(events, false).await.expect("drive should succeed");

        assert!(run.completed.is_empty());
        assert_eq!(run.failed.len(), 1);
        assert_eq!(run.failed[0].retry_of, Some(original));
        assert_ne!(run.slots[0], original);
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_lines_drive_engine() {
        let (engine, _events) = engine(FixedSimulation::succeeding(Duration::from_millis(10)));
        let mut run = start(&engine, 2, false);
        let first = run.slots[0];

        run.on_control_line("pause 1");
        assert_eq!(
            engine.session(first).map(|s| s.status),
            Some(UploadStatus::Paused)
        );

        run.on_control_line("resume 1");
        assert_eq!(
            engine.session(first).map(|s| s.status),
            Some(UploadStatus::Uploading)
        );

        run.on_control_line("cancel 1");
        assert!(engine.session(first).is_none());

        // 範囲外・不正な入力はエンジンの状態を変えない
        run.on_control_line("pause 9");
        run.on_control_line("bogus");
        assert_eq!(engine.active_sessions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_of_cancelled_upload() {
        let (engine, mut events) =
            engine(FixedSimulation::succeeding(Duration::from_millis(10)));
        let mut run = start(&engine, 1, false);
        let original = run.slots[0];

        run.on_control_line("cancel 1");
        while let Ok(progress) = events.try_recv() {
            run.on_progress(progress);
        }
        assert_eq!(run.cancelled.len(), 1);
        assert_eq!(run.outstanding, 0);

        run.on_control_line("retry 1");
        assert!(run.cancelled.is_empty());
        assert_eq!(run.outstanding, 1);
        assert_ne!(run.slots[0], original);

        run.drive(events, false).await.expect("drive should succeed");
        assert_eq!(run.completed.len(), 1);
    }
}
