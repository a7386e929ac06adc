use std::io::{BufRead, Write};

use anyhow::Context;
use clap::{Parser, Subcommand};
use reconcile_engine::ledger::sync::{SyncRequest, SyncService};
use reconcile_engine::{Config, LedgerVerifier, open_ledger, setup_environment};
use shared::procurement::{CommandError, CommandErrorCode, CommandResponse, LedgerCommand};

/// Material request reconciliation engine
#[derive(Debug, Parser)]
#[command(name = "reconcile-engine", version, about)]
struct Cli {
    /// Override WORK_DIR
    #[arg(long, env = "WORK_DIR")]
    work_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute LedgerCommand JSON lines from stdin, one CommandResponse line each
    Exec,
    /// Print the reconciliation view of a request
    View { request_id: String },
    /// Replay the ledger and print the verification report
    Verify,
    /// Print the events (or full snapshot set) a client needs to catch up
    Sync {
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(work_dir) = cli.work_dir {
        config.work_dir = work_dir;
    }
    setup_environment(&config).context("failed to prepare work directory")?;

    let manager = open_ledger(&config)
        .with_context(|| format!("failed to open ledger at {}", config.db_path().display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Exec => {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("failed to read stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<LedgerCommand>(&line) {
                    Ok(cmd) => manager.execute_command(cmd),
                    Err(e) => {
                        tracing::warn!(error = %e, "Malformed command line");
                        CommandResponse::error(
                            String::new(),
                            CommandError::new(CommandErrorCode::ValidationFailed, e.to_string()),
                        )
                    }
                };
                writeln!(out, "{}", serde_json::to_string(&response)?)?;
            }
        }
        Command::View { request_id } => {
            let view = manager.request_view(&request_id)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
        }
        Command::Verify => {
            let report = LedgerVerifier::new(manager).verify()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            if !report.is_clean() {
                anyhow::bail!("ledger verification failed");
            }
        }
        Command::Sync { since } => {
            let service = SyncService::new(manager, config.sync_max_incremental_events);
            let response = service.sync(SyncRequest {
                since_sequence: since,
            })?;
            writeln!(out, "{}", serde_json::to_string(&response)?)?;
        }
    }

    Ok(())
}
