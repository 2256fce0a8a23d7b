//! Command-line front-end for the birthday notifier.
//!
//! # Responsibility
//! - Trigger the engine's check and reset operations and print results.
//! - Provide thin roster CRUD commands over the SQLite store.
//! - Run the daily scheduler (`watch`): guarded reset, then check, per tick.

use anyhow::{bail, Context, Result};
use birthday_core::db::open_db;
use birthday_core::{
    default_log_level, init_logging, AppConfig, CheckReport, DispatchOutcome, LogTransport,
    MessageTransport, NotificationEngine, PersonRecord, ResetOutcome, RosterService, SentGate,
    SmtpTransport, SqliteRosterStore,
};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sends one birthday greeting per person per day.
#[derive(Parser)]
#[command(name = "birthday", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Greet everyone whose birthday is today (or --date).
    Check {
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Log greetings instead of sending mail.
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Clear all sent-flags for a new day.
    Reset {
        /// Reset even if a reset was already recorded for the day.
        #[arg(long)]
        force: bool,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Run resets and checks on a fixed interval until interrupted.
    Watch {
        #[arg(long)]
        dry_run: bool,
    },
    /// Add a person to the roster.
    Add(PersonArgs),
    /// Replace a person's details by id.
    Update(PersonArgs),
    /// Remove a person by id.
    Delete { id: String },
    /// List the roster.
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct PersonArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    /// Birth date as YYYY-MM-DD.
    #[arg(long, value_parser = parse_date)]
    birth_date: NaiveDate,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
}

impl PersonArgs {
    fn into_record(self) -> PersonRecord {
        PersonRecord::with_id(self.id, self.name, self.birth_date, self.email).with_phone(self.phone)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    start_logging(&config)?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open roster `{}`", config.db_path.display()))?;

    match cli.command {
        Command::Check {
            date,
            dry_run,
            json,
        } => {
            let engine = build_engine(&conn, &config, dry_run)?;
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            let report = engine
                .check_and_notify_with_report(today, &CancellationToken::new())
                .await?;
            print_report(&report, json)
        }
        Command::Reset { force, date } => {
            let store = SqliteRosterStore::new(&conn);
            if force {
                let count = birthday_core::run_daily_reset(&store)?;
                println!("Reset sent-flags for {count} records.");
            } else {
                let today = date.unwrap_or_else(|| Local::now().date_naive());
                match birthday_core::run_daily_reset_for(&store, today)? {
                    ResetOutcome::Reset(count) => {
                        println!("Reset sent-flags for {count} records.")
                    }
                    ResetOutcome::AlreadyResetToday => {
                        println!("Already reset for {today}; use --force to reset again.")
                    }
                }
            }
            Ok(())
        }
        Command::Watch { dry_run } => {
            let engine = build_engine(&conn, &config, dry_run)?;
            watch(
                &engine,
                Duration::from_secs(config.schedule.check_interval_secs),
            )
            .await
        }
        Command::Add(args) => {
            let service = RosterService::new(SqliteRosterStore::new(&conn));
            let id = service.add_person(&args.into_record())?;
            println!("Added {id}.");
            Ok(())
        }
        Command::Update(args) => {
            let service = RosterService::new(SqliteRosterStore::new(&conn));
            let person = args.into_record();
            service.update_person(&person)?;
            println!("Updated {}.", person.id);
            Ok(())
        }
        Command::Delete { id } => {
            let service = RosterService::new(SqliteRosterStore::new(&conn));
            service.delete_person(&id)?;
            println!("Deleted {id}.");
            Ok(())
        }
        Command::List { json } => {
            let service = RosterService::new(SqliteRosterStore::new(&conn));
            let people = service.list_people()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&people)?);
            } else {
                for person in &people {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        person.id,
                        person.name,
                        person
                            .birth_date
                            .map(|date| date.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        person.contact_address,
                        if person.notified_today { "sent" } else { "" }
                    );
                }
            }
            Ok(())
        }
    }
}

type CliEngine<'conn> = NotificationEngine<SqliteRosterStore<'conn>, Box<dyn MessageTransport>>;

fn build_engine<'conn>(
    conn: &'conn Connection,
    config: &AppConfig,
    dry_run: bool,
) -> Result<CliEngine<'conn>> {
    let transport: Box<dyn MessageTransport> = if dry_run {
        Box::new(LogTransport)
    } else {
        let Some(smtp) = config.smtp.as_ref() else {
            bail!("no [smtp] section configured; pass --dry-run to only log greetings");
        };
        Box::new(SmtpTransport::from_config(smtp)?)
    };

    Ok(NotificationEngine::new(SqliteRosterStore::new(conn), transport)
        .with_greeting(config.greeting.clone()))
}

async fn watch(engine: &CliEngine<'_>, interval: Duration) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    info!(
        "event=watch_start module=cli status=ok interval_secs={}",
        interval.as_secs()
    );
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let today = Local::now().date_naive();
        if let Some(report) = watch_tick(engine, today, &cancel).await {
            if report.sent_count() > 0 {
                print_report(&report, false)?;
            }
        }
    }

    let last_reset = engine.store().last_reset_date()?;
    info!(
        "event=watch_stop module=cli status=ok last_reset={}",
        last_reset.map_or_else(|| "never".to_string(), |day| day.to_string())
    );
    Ok(())
}

/// One scheduler step for `today`: guarded reset, then check.
///
/// Returns `None` when the check itself failed; the failure is logged.
async fn watch_tick(
    engine: &CliEngine<'_>,
    today: NaiveDate,
    cancel: &CancellationToken,
) -> Option<CheckReport> {
    if let Err(err) = engine.run_daily_reset_for(today) {
        // A failed reset must not block greeting people not yet flagged.
        error!("event=watch_tick module=cli status=error stage=reset error={err}");
    }
    match engine.check_and_notify_with_report(today, cancel).await {
        Ok(report) => Some(report),
        Err(err) => {
            error!("event=watch_tick module=cli status=error stage=check error={err}");
            None
        }
    }
}

fn print_report(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        let outcomes: Vec<_> = report
            .matches
            .iter()
            .zip(&report.outcomes)
            .map(|(person, (_, outcome))| {
                serde_json::json!({
                    "person": person,
                    "outcome": outcome_label(outcome),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "date": report.reference_date,
                "matches": outcomes,
            }))?
        );
        return Ok(());
    }

    if report.matches.is_empty() {
        println!("No birthdays on {}.", report.reference_date);
        return Ok(());
    }

    println!(
        "{} birthday(s) on {}:",
        report.matches.len(),
        report.reference_date
    );
    for (person, (_, outcome)) in report.matches.iter().zip(&report.outcomes) {
        println!("- {} [{}]", person.name, outcome_label(outcome));
    }
    Ok(())
}

fn outcome_label(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Sent => "sent".to_string(),
        DispatchOutcome::AlreadySent => "already sent".to_string(),
        DispatchOutcome::InFlight => "in flight".to_string(),
        DispatchOutcome::Removed => "removed from roster".to_string(),
        DispatchOutcome::TransportFailed(err) => format!("send failed: {err}"),
        DispatchOutcome::SentButUnrecorded(err) => format!("sent, flag not saved: {err}"),
        DispatchOutcome::GateFailed(err) => format!("skipped: {err}"),
        DispatchOutcome::Cancelled => "cancelled".to_string(),
    }
}

fn start_logging(config: &AppConfig) -> Result<()> {
    let level = config.log_level.as_deref().unwrap_or(default_log_level());
    let log_dir = absolutize(&config.log_dir)?;
    init_logging(level, &log_dir)?;
    Ok(())
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(cwd.join(path))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD, got `{value}`: {err}"))
}
