/// プレゼンテーション層: コマンド結果の出力
///
/// コマンド実行結果をユーザー向け（人間可読）または
/// 機械向け（JSON）形式で出力する責務を担います。
/// CLI使用方法の表示もこのモジュールが担当します。
use crate::commands::result::{CommandResult, ConfigAction, describe_limits};
use crate::domain::formatter::{format_file_size, format_upload_speed};
use crate::domain::progress::UploadProgress;
use crate::domain::session::UploadSession;
use crate::presentation::progress::{DisplayProgress, ProgressCategory};
use anyhow::Result;

/// ヘルプテキスト（単一の情報源）
const HELP_TEXT: &str = "upsim
Simulate concurrent file uploads from the command line

Usage:
  upsim [--machine] <command> [args...]

Global Flags:
  --machine        - Output machine-readable JSON to stdout (for scripting)
                     Works for both success and error cases

Available commands:
  upload [--seed <n>] [--interactive] [--retry-failed] <file>...
                   - Validate the files and simulate uploading them concurrently
                     --seed: Make step delays and failures reproducible
                     --interactive: Read control commands from stdin
                                    pause <n> | resume <n> | cancel <n> | retry <n> | list
                     --retry-failed: Retry each failed upload once
  config           - Show the effective upload limits
  config set <key> <value>
                   - Override an upload limit
                     Keys: max-files, max-file-size (bytes), allowed-types (comma separated)
  config reset     - Remove all overrides
  help             - Display this help message

Machine-Readable Output:
  --machine upload a.png b.pdf   - JSON Lines progress events, then a JSON report
  --machine config               - JSON output of the effective configuration

Error Output:
  Normal mode:   Human-readable error messages to stderr
  --machine:     JSON error object with exit_code and hint fields

Logging:
  RUST_LOG=debug upsim upload ... - Diagnostic logs to stderr";

/// コマンド結果を適切な形式で出力する
///
/// # Arguments
/// * `result` - コマンド実行結果
/// * `machine_output` - 機械可読出力フラグ
///
/// # Output
/// * `machine_output = false`: 人間向けの詳細メッセージ（stderr）
/// * `machine_output = true`: 機械可読JSON（stdout）
pub fn output_result(result: &CommandResult, machine_output: bool) -> Result<()> {
    if machine_output {
        output_machine_readable(result)?;
    } else {
        output_human_readable(result);
    }

    Ok(())
}

/// 進捗イベントを出力する
///
/// 機械向けでは全イベントを JSON Lines で stdout へ、
/// 人間向けでは表示対象のイベントのみ stderr へ出力する。
pub fn output_progress(progress: &UploadProgress, machine_output: bool) -> Result<()> {
    if machine_output {
        println!("{}", serde_json::to_string(progress)?);
    } else if let Some(display) = Option::<DisplayProgress>::from(progress) {
        eprintln!("{}", render_progress(&display));
    }
    Ok(())
}

fn render_progress(display: &DisplayProgress) -> String {
    let marker = match display.category {
        ProgressCategory::Admission => "+",
        ProgressCategory::Upload => " ",
        ProgressCategory::Control => "~",
        ProgressCategory::Completed => "✓",
        ProgressCategory::Failed => "✗",
    };
    match &display.details {
        Some(details) => format!("{} {} ({})", marker, display.message, details),
        None => format!("{} {}", marker, display.message),
    }
}

/// 受け付けられなかったファイルを警告表示する
pub fn print_rejections(messages: &[String]) {
    if messages.is_empty() {
        return;
    }
    eprintln!("Some files were not accepted:");
    for message in messages {
        eprintln!("  - {}", message);
    }
    eprintln!();
}

/// 対話操作のエラーを表示する（アップロードは継続）
pub fn print_control_error(message: &str) {
    eprintln!("! {}", message);
}

/// 進行中のセッション一覧を表示する
pub fn print_sessions(sessions: &[UploadSession]) {
    if sessions.is_empty() {
        eprintln!("No active uploads.");
        return;
    }
    for session in sessions {
        eprintln!(
            "  {} {:<10} {:>3}% {:>10}  {}",
            session.id,
            session.status,
            session.progress,
            format_upload_speed(session.upload_speed),
            session.name
        );
    }
}

/// 人間向けの詳細メッセージを出力（stderr）
///
/// すべての出力はstderrに送られ、stdoutはパイプライン用に予約されます。
fn output_human_readable(result: &CommandResult) {
    match result {
        CommandResult::Upload(r) => {
            eprintln!();
            eprintln!("{}", result.success_message());
            eprintln!("---");
            for session in &r.completed {
                eprintln!(
                    "Uploaded:  {} ({})",
                    session.name,
                    format_file_size(session.size)
                );
            }
            for session in &r.failed {
                eprintln!(
                    "Failed:    {} ({})",
                    session.name,
                    session.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            for session in &r.cancelled {
                eprintln!("Cancelled: {} at {}%", session.name, session.progress);
            }
            for message in &r.rejected {
                eprintln!("Rejected:  {}", message);
            }

            if !r.history.is_empty() {
                eprintln!();
                eprintln!("Recent uploads:");
                for entry in &r.history {
                    eprintln!(
                        "  {}  {} ({})",
                        entry.completed_at.format("%H:%M:%S"),
                        entry.name,
                        format_file_size(entry.size)
                    );
                }
            }

            eprintln!("---");
            eprintln!(
                "Total: {} upload(s), {} successful, {}",
                r.stats.total_uploads,
                r.stats.successful_uploads,
                format_file_size(r.stats.total_size)
            );
        }
        CommandResult::Config(r) => {
            eprintln!();
            eprintln!("{}", result.success_message());
            if matches!(r.action, ConfigAction::Show) && r.has_overrides {
                eprintln!("(includes user overrides)");
            }
            eprintln!("---");
            for line in describe_limits(&r.effective.upload) {
                eprintln!("{}", line);
            }
            eprintln!("---");
        }
        CommandResult::Help => {
            eprintln!("{}", HELP_TEXT);
        }
    }
}

/// 機械可読JSONを出力（stdout）
fn output_machine_readable(result: &CommandResult) -> Result<()> {
    let mut json = serde_json::to_value(result)?;
    if let Some(object) = json.as_object_mut() {
        object.insert("success".to_string(), serde_json::Value::Bool(true));
    }

    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

/// エラーを機械可読JSONで出力（stdout）
pub fn output_machine_error(error: &str, exit_code: i32, hint: Option<&str>) {
    let json = serde_json::json!({
        "success": false,
        "error": error,
        "exit_code": exit_code,
        "hint": hint,
    });
    println!("{}", json);
}
