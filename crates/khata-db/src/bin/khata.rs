//! # khata - Ledger Operator Tool
//!
//! Maintenance commands against a ledger database.
//!
//! ## Usage
//! ```bash
//! # Create the schema and the system chart of accounts
//! cargo run -p khata-db --bin khata -- bootstrap
//!
//! # One reconciliation pass (exit code 2 when a cache drifted)
//! cargo run -p khata-db --bin khata -- reconcile
//!
//! # Reconcile every `reconciliation.interval_secs` until Ctrl+C
//! KHATA_RECONCILE_INTERVAL_SECS=60 cargo run -p khata-db --bin khata -- watch
//!
//! # Reports as JSON on stdout
//! cargo run -p khata-db --bin khata -- trial-balance --as-of 2024-03-31
//! cargo run -p khata-db --bin khata -- balance 1100
//!
//! # Explicit config file / database
//! cargo run -p khata-db --bin khata -- --config ./khata.toml --db ./dev.db reconcile
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use chrono::NaiveDate;
use khata_db::{Database, LedgerConfig};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

enum Command {
    Bootstrap,
    Reconcile,
    Watch,
    TrialBalance { as_of: Option<NaiveDate> },
    Balance { code: String },
}

struct Args {
    config: Option<PathBuf>,
    db: Option<PathBuf>,
    command: Command,
}

fn print_usage() {
    println!("khata - double-entry ledger operator tool");
    println!();
    println!("Usage: khata [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  bootstrap                         Run migrations and create the system chart");
    println!("  reconcile                         Compare balance caches with the entries");
    println!("  watch                             Reconcile periodically until Ctrl+C");
    println!("  trial-balance [--as-of YYYY-MM-DD]  Print the trial balance as JSON");
    println!("  balance <ACCOUNT_CODE>            Print one account's balance as JSON");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    Config file (default: platform config dir/khata.toml)");
    println!("  -d, --db <PATH>        Database file, overrides the config");
    println!("  -h, --help             Show this help message");
}

/// Returns `None` when help was requested.
fn parse_args(args: &[String]) -> CliResult<Option<Args>> {
    let mut config = None;
    let mut db = None;
    let mut as_of = None;
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                config = Some(PathBuf::from(value_of(args, i)?));
                i += 1;
            }
            "--db" | "-d" => {
                db = Some(PathBuf::from(value_of(args, i)?));
                i += 1;
            }
            "--as-of" => {
                let raw = value_of(args, i)?;
                as_of = Some(
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .map_err(|e| format!("invalid --as-of '{raw}': {e}"))?,
                );
                i += 1;
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with('-') => return Err(format!("unknown option '{other}'").into()),
            other => positional.push(other),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        ["bootstrap"] => Command::Bootstrap,
        ["reconcile"] => Command::Reconcile,
        ["watch"] => Command::Watch,
        ["trial-balance"] => Command::TrialBalance { as_of },
        ["balance", code] => Command::Balance {
            code: code.to_string(),
        },
        [] => return Ok(None),
        _ => return Err(format!("unrecognized command: {}", positional.join(" ")).into()),
    };

    Ok(Some(Args {
        config,
        db,
        command,
    }))
}

fn value_of(args: &[String], flag_index: usize) -> CliResult<&str> {
    args.get(flag_index + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", args[flag_index]).into())
}

/// Initializes the tracing subscriber for structured logging.
///
/// - `RUST_LOG=debug` - Show every repository statement
/// - Default: INFO level, sqlx at WARN
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,khata_db=info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> CliResult<ExitCode> {
    init_tracing();

    let raw: Vec<String> = env::args().collect();
    let Some(args) = parse_args(&raw)? else {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    };

    let mut config = LedgerConfig::load(args.config)?;
    if let Some(path) = args.db {
        config.database.path = path;
    }
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::open(&config).await?;
    let code = run(&db, &config, args.command).await;
    db.close().await;
    code
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping reconciler...");
}

async fn run(db: &Database, config: &LedgerConfig, command: Command) -> CliResult<ExitCode> {
    match command {
        Command::Bootstrap => {
            let created = db.chart().bootstrap().await?;
            info!(created, "Bootstrap complete");
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "accounts_created": created }))?
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Reconcile => {
            let report = db.reconciler().run_once().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(2))
            }
        }
        Command::Watch => {
            let every = config.reconciliation.interval();
            info!(interval_secs = every.as_secs(), "Reconciler started");
            let handle = db.reconciler().spawn(every);

            shutdown_signal().await;
            let last = handle.last_report().await;
            handle.shutdown().await;

            match last {
                Some(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    if report.is_clean() {
                        Ok(ExitCode::SUCCESS)
                    } else {
                        Ok(ExitCode::from(2))
                    }
                }
                None => Ok(ExitCode::SUCCESS),
            }
        }
        Command::TrialBalance { as_of } => {
            let tb = db.balances().trial_balance(as_of).await?;
            println!("{}", serde_json::to_string_pretty(&tb)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Balance { code } => {
            let account = db.chart().get_by_code(&code).await?;
            let balance = db.balances().account_balance(&account.id).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "code": account.code,
                    "name": account.name,
                    "account_type": account.account_type,
                    "balance": balance,
                    "cached": account.current_balance(),
                }))?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        std::iter::once("khata")
            .chain(parts.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_watch_with_config() {
        let args = parse_args(&argv(&["--config", "./khata.toml", "watch"]))
            .unwrap()
            .unwrap();

        assert!(matches!(args.command, Command::Watch));
        assert_eq!(args.config, Some(PathBuf::from("./khata.toml")));
        assert!(args.db.is_none());
    }

    #[test]
    fn test_parse_trial_balance_as_of() {
        let args = parse_args(&argv(&["-d", "dev.db", "trial-balance", "--as-of", "2024-03-31"]))
            .unwrap()
            .unwrap();

        assert_eq!(args.db, Some(PathBuf::from("dev.db")));
        assert!(matches!(
            args.command,
            Command::TrialBalance { as_of: Some(d) } if d == NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        ));
    }

    #[test]
    fn test_parse_help_and_errors() {
        assert!(parse_args(&argv(&[])).unwrap().is_none());
        assert!(parse_args(&argv(&["-h"])).unwrap().is_none());
        assert!(parse_args(&argv(&["watch", "now"])).is_err());
        assert!(parse_args(&argv(&["--as-of", "31/03/2024", "trial-balance"])).is_err());
        assert!(parse_args(&argv(&["--db"])).is_err());
    }

    #[tokio::test]
    async fn test_watch_interval_comes_from_config() {
        let mut config = LedgerConfig::default();
        config.reconciliation.interval_secs = 1;

        let db = Database::new(khata_db::DbConfig::in_memory()).await.unwrap();
        db.chart().bootstrap().await.unwrap();

        // the first tick fires immediately
        let handle = db.reconciler().spawn(config.reconciliation.interval());
        let mut report = None;
        for _ in 0..50 {
            report = handle.last_report().await;
            if report.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        handle.shutdown().await;

        assert!(report.unwrap().is_clean());
    }
}
