/// ドメインサービス: ファイルバリデーション
///
/// 受け付け前の候補ファイルをアップロード制約に照らして検証する。
/// 副作用はなく、入力（候補ファイル、制約、現在のセッション数）だけで結果が決まる。
///
/// - 件数チェックはバッチ単位。超過した場合はバッチ全体を拒否し、違反は1件のみ。
/// - サイズ・MIME タイプは各ファイル独立に検証し、違反したファイルだけを除外する。
use crate::config::UploadConfig;
use crate::domain::file::CandidateFile;
use crate::domain::formatter::format_file_size;
use serde::Serialize;
use std::fmt;

/// 単一ファイルの制約違反
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileViolation {
    TooLarge { size: u64, max: u64 },
    TypeNotAllowed { mime_type: String },
}

impl fmt::Display for FileViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { max, .. } => {
                write!(f, "File size exceeds {} limit", format_file_size(*max))
            }
            Self::TypeNotAllowed { mime_type } => {
                write!(f, "File type {} is not allowed", mime_type)
            }
        }
    }
}

/// バッチ検証で報告される違反
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// 件数超過（バッチ全体を拒否）
    TooManyFiles { max: usize, current: usize },

    /// 個別ファイルの拒否
    FileRejected {
        name: String,
        reasons: Vec<FileViolation>,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyFiles { max, current } => write!(
                f,
                "Maximum {} files allowed. Currently have {} files.",
                max, current
            ),
            Self::FileRejected { name, reasons } => {
                let joined = reasons
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}: {}", name, joined)
            }
        }
    }
}

/// バッチ検証の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchValidation {
    /// 違反のないファイル（受け付け対象）
    pub valid: Vec<CandidateFile>,
    pub violations: Vec<Violation>,
}

/// 単一ファイルを検証し、違反の一覧を返す（空なら有効）
pub fn validate_file(file: &CandidateFile, config: &UploadConfig) -> Vec<FileViolation> {
    let mut violations = Vec::new();

    if file.size > config.max_file_size {
        violations.push(FileViolation::TooLarge {
            size: file.size,
            max: config.max_file_size,
        });
    }

    if !config.allows_type(&file.mime_type) {
        violations.push(FileViolation::TypeNotAllowed {
            mime_type: file.mime_type.clone(),
        });
    }

    violations
}

/// バッチを検証する
///
/// # 引数
/// * `files` - 候補ファイル
/// * `config` - アップロード制約
/// * `current_count` - 現在登録中のセッション数
pub fn validate_batch(
    files: Vec<CandidateFile>,
    config: &UploadConfig,
    current_count: usize,
) -> BatchValidation {
    if current_count + files.len() > config.max_files {
        return BatchValidation {
            valid: Vec::new(),
            violations: vec![Violation::TooManyFiles {
                max: config.max_files,
                current: current_count,
            }],
        };
    }

    let mut result = BatchValidation::default();
    for file in files {
        let reasons = validate_file(&file, config);
        if reasons.is_empty() {
            result.valid.push(file);
        } else {
            result.violations.push(Violation::FileRejected {
                name: file.name,
                reasons,
            });
        }
    }
    result
}
