use crate::commands::result::CommandResult;

/// ヘルプコマンドを実行
///
/// 表示そのものはプレゼンテーション層が `CommandResult::Help` を受けて行う。
pub async fn execute() -> anyhow::Result<CommandResult> {
    Ok(CommandResult::Help)
}
