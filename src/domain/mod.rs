/// ドメイン層
///
/// アップロードセッションの状態機械と、それを支える純粋なビジネスルール。
/// 設定・表示・入出力には依存せず、設定値は呼び出し側から受け取る。
///
/// # モジュール
/// - `validator`: 受け付け前の制約チェック
/// - `engine`: セッションのレジストリとステッピングタスク
/// - `history`: 完了履歴と統計
/// - `simulation`: ステップ間隔と失敗注入の戦略
pub mod engine;
pub mod error;
pub mod file;
pub mod formatter;
pub mod history;
pub mod preview;
pub mod progress;
pub mod session;
pub mod simulation;
pub mod validator;
