use anyhow::{Context, Result};
use cascade_common::observability::{LogConfig, LogFormat, init_logging};
use cascade_config::{CascadeConfig, CascadeConfigLoader};
use cascade_filters::{RunReport, RunSummary, collect, enumerate_chains, run_chains};
use clap::Parser;
use cli::{Cli, Commands, OptionsArgs};
use serde::Serialize;
use session::Session;
use std::process::ExitCode;
use tracing::{error, info};
mod cli;
mod session;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1) Load config (env wins over the file)
    let cfg: CascadeConfig = CascadeConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    // 2) Logging from the `logging` section
    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: LogFormat::from_json_flag(cfg.logging.json),
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    info!(target: "cascade.app", config = %cli.config.display(), log = %log_path.display(), "starting");

    // 3) Browser session, then the command
    let session = Session::open(&cfg).await?;
    let outcome = execute(&session, &cli).await;
    if let Err(e) = session.close().await {
        error!(target: "cascade.app", error = %e, "failed to close WebDriver session");
    }
    outcome
}

async fn execute(session: &Session, cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Options(args) => show_options(session, args, cli.json).await,
        Commands::Chains => {
            let chains = enumerate_chains(&session.page, &session.plan, &session.gate).await?;
            if cli.json {
                print_json(&chains)?;
            } else {
                for chain in &chains {
                    println!("{chain}");
                }
                println!("{} chain(s)", chains.len());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run => {
            let chains = enumerate_chains(&session.page, &session.plan, &session.gate).await?;
            if chains.is_empty() {
                error!(target: "cascade.app", "no complete filter chains to test");
            }
            let report = run_chains(&session.page, &chains, session.pages, &session.gate).await?;
            if cli.json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
            Ok(if run_succeeded(&report.summary) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn show_options(session: &Session, args: &OptionsArgs, json: bool) -> Result<ExitCode> {
    let selections = session.selections(&args.selections)?;
    let collected = collect(&session.page, &session.level_ids(), &selections, &session.gate).await?;
    if json {
        print_json(&collected)?;
    } else {
        for level in collected.levels() {
            println!("{}: {}", level.id, level.options.join(", "));
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// A run passes when at least one chain was verified and none failed.
fn run_succeeded(summary: &RunSummary) -> bool {
    summary.total > 0 && summary.failed == 0
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(report: &RunReport) {
    for outcome in &report.outcomes {
        let status = if outcome.passed() { "PASS" } else { "FAIL" };
        println!(
            "{status} {} ({} records, {} invalid)",
            outcome.chain,
            outcome.record_count,
            outcome.verification.invalid_records.len()
        );
        for invalid in &outcome.verification.invalid_records {
            for issue in &invalid.issues {
                println!("    {issue}");
            }
        }
    }
    for chain in &report.skipped {
        println!("SKIP {chain}");
    }
    let s = &report.summary;
    if s.total == 0 {
        println!("no filter chain could be verified");
    }
    println!(
        "{} tested, {} passed, {} failed, {} skipped ({:.1}% success)",
        s.total, s.passed, s.failed, s.skipped, s.success_rate
    );
}
