/// プレゼンテーション層モジュール
///
/// ドメイン層のアップロードエンジンとUI表示の橋渡しを行います。
/// プレゼンテーション層はドメイン層に依存しますが、その逆はありません。
///
/// # モジュール
/// - `input`: 対話モードの操作コマンド入力
/// - `output`: コマンド結果の出力（人間向け・機械向け）
/// - `progress`: アップロード進捗のDTO変換

pub mod input;
pub mod output;
pub mod progress;
