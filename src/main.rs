mod cli;
mod commands;
mod config;
mod domain;
mod error_severity;
mod presentation;

use anyhow::Result;
use config::AppConfig;
use config::error::ConfigError;
use domain::error::DomainError;
use presentation::output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let machine_output = args.iter().skip(1).any(|a| a == "--machine");

    init_tracing();

    if let Err(e) = run(&args).await {
        handle_error(e, machine_output);
    }
}

/// アプリケーションのメイン処理
async fn run(args: &[String]) -> Result<()> {
    let cli = cli::parse_args(args)?;
    let machine_output = cli.machine_output;

    let result = cli::dispatch(cli).await?;
    output::output_result(&result, machine_output)
}

/// ロギングを初期化する
///
/// `RUST_LOG` が優先。無ければ埋め込み設定の `logging.level`。
/// ログは常に stderr へ出力し、stdout は機械可読出力のために空けておく。
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = AppConfig::load()
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "warn".to_string());
        EnvFilter::new(level)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// エラーハンドリングとユーザーへの表示
///
/// anyhow::Error から元のエラー型を downcast して、
/// エラーの種類に応じた exit code とメッセージを決定する。
fn handle_error(error: anyhow::Error, machine_output: bool) {
    let exit_code = determine_exit_code(&error);
    let hint = get_error_hint(&error);

    if machine_output {
        output::output_machine_error(&format!("{:#}", error), exit_code, hint.as_deref());
        std::process::exit(exit_code);
    }

    eprintln!("Error: {}", error);

    // エラーチェーンを辿って詳細を表示
    let chain: Vec<_> = error.chain().skip(1).collect();
    if !chain.is_empty() {
        eprintln!("\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            eprintln!("  {}: {}", i + 1, cause);
        }
    }

    // バッチ全体が拒否された場合は違反内容を列挙する
    if let Some(DomainError::BatchRejected { violations }) = find_domain_error(&error) {
        eprintln!();
        for violation in violations {
            eprintln!("  - {}", violation);
        }
    }

    if let Some(hint) = hint {
        eprintln!("\nHint: {}", hint);
    }

    std::process::exit(exit_code);
}

fn find_domain_error(error: &anyhow::Error) -> Option<&DomainError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<DomainError>())
}

/// エラーチェーンから適切な終了コードを決定
fn determine_exit_code(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(domain_err) = cause.downcast_ref::<DomainError>() {
            return domain_err.severity().exit_code();
        }

        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return config_err.severity().exit_code();
        }
    }

    // 引数エラーなど型を持たないエラー
    1
}

/// エラーに対するユーザー向けヒントを取得
fn get_error_hint(error: &anyhow::Error) -> Option<String> {
    for cause in error.chain() {
        if let Some(hint) = cause.downcast_ref::<DomainError>().and_then(|e| e.hint()) {
            return Some(hint.to_string());
        }

        if let Some(hint) = cause.downcast_ref::<ConfigError>().and_then(|e| e.hint()) {
            return Some(hint.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_from_config_error() {
        let error = Err::<(), _>(ConfigError::validation_error("bad"))
            .context("Config command failed")
            .unwrap_err();
        assert_eq!(determine_exit_code(&error), 2);
        assert!(get_error_hint(&error).is_some());
    }

    #[test]
    fn test_exit_code_from_domain_error() {
        let error = Err::<(), _>(DomainError::BatchRejected {
            violations: vec!["too many".to_string()],
        })
        .context("Upload command failed")
        .unwrap_err();
        assert_eq!(determine_exit_code(&error), 1);
        assert!(matches!(
            find_domain_error(&error),
            Some(DomainError::BatchRejected { .. })
        ));
    }

    #[test]
    fn test_untyped_error_defaults_to_one() {
        let error = anyhow::anyhow!("Unknown command");
        assert_eq!(determine_exit_code(&error), 1);
        assert!(get_error_hint(&error).is_none());
    }
}
