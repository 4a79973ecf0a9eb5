use crate::commands::{self, CommandResult};
use crate::commands::result::ConfigAction;
use crate::commands::upload::UploadOptions;
use anyhow::{Context, Result, bail};

/// 解析済みのコマンドライン
#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    /// `--machine`: 機械可読出力
    pub machine_output: bool,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Upload(UploadOptions),
    Config(ConfigAction),
    Help,
}

/// CLI引数を解析する
///
/// `args[0]` はプログラム名。グローバルフラグ `--machine` はコマンドより前に置く。
/// コマンドが無い場合はヘルプ扱い。
pub fn parse_args(args: &[String]) -> Result<Cli> {
    let mut rest = args.iter().skip(1).map(String::as_str).peekable();

    let mut machine_output = false;
    while let Some(&flag) = rest.peek() {
        match flag {
            "--machine" => {
                machine_output = true;
                rest.next();
            }
            _ => break,
        }
    }

    let command = match rest.next() {
        None | Some("help") | Some("--help") | Some("-h") => Command::Help,
        Some("upload") => Command::Upload(parse_upload(rest)?),
        Some("config") => Command::Config(parse_config(rest)?),
        Some(other) => bail!(
            "Unknown command: '{}'. Use 'help' to see available commands.",
            other
        ),
    };

    Ok(Cli {
        machine_output,
        command,
    })
}

fn parse_upload<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<UploadOptions> {
    let mut options = UploadOptions::default();

    while let Some(arg) = args.next() {
        match arg {
            "--seed" => {
                let value = args.next().context("--seed requires a number")?;
                let seed = value
                    .parse()
                    .with_context(|| format!("Invalid seed: '{}'", value))?;
                options.seed = Some(seed);
            }
            "--interactive" | "-i" => options.interactive = true,
            "--retry-failed" => options.retry_failed = true,
            flag if flag.starts_with("--") => bail!("Unknown upload option: '{}'", flag),
            path => options.files.push(path.to_string()),
        }
    }

    if options.files.is_empty() {
        bail!("Please specify at least one file for upload command");
    }
    Ok(options)
}

fn parse_config<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<ConfigAction> {
    let action = match args.next() {
        None | Some("show") => ConfigAction::Show,
        Some("set") => {
            let key = args
                .next()
                .context("Usage: config set <key> <value>")?
                .to_string();
            let value = args
                .next()
                .context("Usage: config set <key> <value>")?
                .to_string();
            ConfigAction::Set { key, value }
        }
        Some("reset") => ConfigAction::Reset,
        Some(other) => bail!(
            "Unknown config subcommand: '{}'. Use show, set or reset.",
            other
        ),
    };

    if let Some(extra) = args.next() {
        bail!("Unexpected argument: '{}'", extra);
    }
    Ok(action)
}

/// 解析済みのコマンドを実行する
pub async fn dispatch(cli: Cli) -> Result<CommandResult> {
    match cli.command {
        Command::Upload(options) => commands::upload::execute(options, cli.machine_output)
            .await
            .context("Upload command failed"),
        Command::Config(action) => commands::config::execute(action)
            .await
            .context("Config command failed"),
        Command::Help => commands::help::execute().await,
    }
}
