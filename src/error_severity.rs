//! プレゼンテーション層が使用するエラー深刻度
//!
//! 各層のエラー（domain, config）はこの分類に写像され、
//! `main` が終了コードと `--machine` 出力の `exit_code` を決める。
//!
//! このモジュールは他のモジュールに依存しない。

use serde::Serialize;
use std::fmt;

/// エラーの深刻度と対応する終了コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// ユーザーの入力エラー
    ///
    /// 制約違反のファイル、存在しないセッションIDの指定など。
    ///
    /// **Exit Code: 1**
    UserError,

    /// 設定エラー
    ///
    /// 設定ファイルの破損、不正な制約値など。
    ///
    /// **Exit Code: 2**
    ConfigError,

    /// システムエラー
    ///
    /// ファイルシステム障害、内部タスクの異常終了など。
    ///
    /// **Exit Code: 3**
    SystemError,
}

impl ErrorSeverity {
    /// 対応する Unix 終了コードを返す
    pub fn exit_code(self) -> i32 {
        match self {
            Self::UserError => 1,
            Self::ConfigError => 2,
            Self::SystemError => 3,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserError => write!(f, "user error"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::SystemError => write!(f, "system error"),
        }
    }
}
