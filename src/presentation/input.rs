/// プレゼンテーション層: ユーザー入力処理
///
/// `upload --interactive` 実行中に stdin から操作コマンドを読み取り、
/// エンジン操作に変換できる形式にする。
///
/// 形式（番号は受け付け順の 1 始まり）:
///   pause <n> / resume <n> / cancel <n> / retry <n> / list
use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// stdin から受け取る操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause(usize),
    Resume(usize),
    Cancel(usize),
    Retry(usize),
    List,
}

impl ControlCommand {
    /// 対象のアップロード番号（`List` は対象なし）
    pub fn index(&self) -> Option<usize> {
        match *self {
            Self::Pause(n) | Self::Resume(n) | Self::Cancel(n) | Self::Retry(n) => Some(n),
            Self::List => None,
        }
    }
}

/// 1行を操作コマンドとして解釈する
///
/// 空行は `Ok(None)`。
pub fn parse_control_line(line: &str) -> Result<Option<ControlCommand>> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };

    if verb.eq_ignore_ascii_case("list") {
        return Ok(Some(ControlCommand::List));
    }

    let index = parts
        .next()
        .with_context(|| format!("'{}' requires an upload number, e.g. '{} 1'", verb, verb))?;
    let index: usize = index
        .parse()
        .with_context(|| format!("Invalid upload number: '{}'", index))?;
    if index == 0 {
        bail!("Upload numbers start at 1");
    }

    let command = match verb.to_ascii_lowercase().as_str() {
        "pause" | "p" => ControlCommand::Pause(index),
        "resume" | "r" => ControlCommand::Resume(index),
        "cancel" | "c" => ControlCommand::Cancel(index),
        "retry" => ControlCommand::Retry(index),
        _ => bail!(
            "Unknown control command: '{}'. Use pause, resume, cancel, retry or list.",
            verb
        ),
    };
    Ok(Some(command))
}

/// stdin の各行をチャネルへ流すタスクを起動する
///
/// stdin が閉じられるとチャネルも閉じる。
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
