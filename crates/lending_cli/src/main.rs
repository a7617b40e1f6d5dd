//! Operator CLI over the lending catalog store.
//!
//! # Responsibility
//! - Open the store named by flags or environment and run one operation.
//! - Print records and events in a stable, line-oriented format.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use lending_core::{
    default_log_level, init_logging, AuditPolicy, CatalogRecord, CatalogRepository,
    EventLogRepository, LendingService, LendingStatus, LifecycleEvent, RecordDraft, RecordId,
    Store, StoreCatalogRepository, StoreEventLog,
};
use std::path::{Path, PathBuf};

/// Manage a lending-library catalog stored in a single file.
#[derive(Parser)]
#[command(name = "lendingctl", version)]
struct Cli {
    /// Store file to open (created when missing).
    #[arg(long, env = "LENDING_DB_PATH", default_value = "lending.db")]
    db: PathBuf,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, env = "LENDING_LOG_DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "LENDING_LOG_LEVEL")]
    log_level: Option<String>,

    /// What to do when an event append fails: best-effort|required
    #[arg(long, env = "LENDING_AUDIT_POLICY", default_value = "best-effort")]
    audit: AuditPolicy,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Level from flags or environment, else the build-mode default.
    fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}

#[derive(Subcommand)]
enum Command {
    /// List every record, ascending by id
    List,
    /// Show one record
    Show { id: RecordId },
    /// Add a record
    Add(RecordFields),
    /// Change fields of an existing record
    Edit {
        id: RecordId,
        #[command(flatten)]
        fields: EditFields,
    },
    /// Remove a record
    Remove { id: RecordId },
    /// Mark a record as returned
    CheckIn { id: RecordId },
    /// Mark a record as lent out
    CheckOut { id: RecordId },
    /// Print the event log, or one record's history
    History { id: Option<RecordId> },
    /// Report records whose status flag disagrees with the event log
    Audit,
}

#[derive(Args)]
struct RecordFields {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    author: String,
    /// ISBN or other external identifier
    #[arg(long, default_value = "")]
    identifier: String,
    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Args)]
struct EditFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    identifier: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(cli.effective_log_level(), Path::new(log_dir))
            .map_err(|err| anyhow!(err))?;
    }

    let store = Store::open(&cli.db)
        .with_context(|| format!("cannot open store `{}`", cli.db.display()))?;
    let service = LendingService::with_policy(
        StoreCatalogRepository::try_new(&store)?,
        StoreEventLog::try_new(&store)?,
        cli.audit,
    );

    run(&service, cli.command)
}

fn run<C, E>(service: &LendingService<C, E>, command: Command) -> Result<()>
where
    C: CatalogRepository,
    E: EventLogRepository,
{
    match command {
        Command::List => {
            for record in service.list_records()? {
                println!("{}", record_line(&record));
            }
        }
        Command::Show { id } => {
            let record = service.get_record(id)?;
            println!("{}", record_line(&record));
            println!("  author: {}", record.author);
            println!("  identifier: {}", record.identifier);
            println!("  description: {}", record.description);
        }
        Command::Add(fields) => {
            let draft = RecordDraft::new(
                fields.title,
                fields.author,
                fields.identifier,
                fields.description,
            );
            let record = service.add_record(&draft)?;
            println!("added {}", record.id);
        }
        Command::Edit { id, fields } => {
            let mut record = service.get_record(id)?;
            if let Some(title) = fields.title {
                record.title = title;
            }
            if let Some(author) = fields.author {
                record.author = author;
            }
            if let Some(identifier) = fields.identifier {
                record.identifier = identifier;
            }
            if let Some(description) = fields.description {
                record.description = description;
            }
            service.edit_record(&record)?;
            println!("updated {id}");
        }
        Command::Remove { id } => {
            if service.remove_record(id)? {
                println!("removed {id}");
            } else {
                println!("no record {id}");
            }
        }
        Command::CheckIn { id } => {
            service.check_in(id)?;
            println!("checked in {id}");
        }
        Command::CheckOut { id } => {
            service.check_out(id)?;
            println!("checked out {id}");
        }
        Command::History { id } => {
            let events = match id {
                Some(id) => service.history(id)?,
                None => service.activity()?,
            };
            for event in &events {
                println!("{}", event_line(event));
            }
        }
        Command::Audit => {
            let drift = service.status_drift()?;
            for entry in &drift {
                println!(
                    "record {} flag={} log={} last_event={}",
                    entry.record_id,
                    entry.recorded.as_str(),
                    entry.audited.as_str(),
                    entry
                        .last_status_event
                        .map_or_else(|| "none".to_string(), |seq| seq.to_string())
                );
            }
            if drift.is_empty() {
                println!("no drift");
            }
        }
    }
    Ok(())
}

fn record_line(record: &CatalogRecord) -> String {
    format!(
        "{}\t{}\t{}",
        record.id,
        LendingStatus::of(record).as_str(),
        record.title
    )
}

fn event_line(event: &LifecycleEvent) -> String {
    format!(
        "{}\t{}\t{}\trecord={}\t{}",
        event.sequence,
        event.pretty_time(),
        event.kind,
        event.record_id,
        event.kind.title()
    )
}

#[cfg(test)]
mod tests {
    use super::{event_line, record_line, Cli, Command};
    use clap::Parser;
    use lending_core::{
        default_log_level, AuditPolicy, CatalogRecord, LifecycleEvent, LifecycleEventKind,
    };

    #[test]
    fn parses_subcommand_and_audit_policy() {
        let cli = Cli::try_parse_from([
            "lendingctl",
            "--db",
            "/tmp/x.db",
            "--audit",
            "required",
            "check-out",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.audit, AuditPolicy::Required);
        assert!(matches!(cli.command, Command::CheckOut { id: 4 }));
    }

    #[test]
    fn log_level_comes_from_flag_or_build_default() {
        let mut cli =
            Cli::try_parse_from(["lendingctl", "--log-level", "warn", "list"]).unwrap();
        assert_eq!(cli.effective_log_level(), "warn");

        cli.log_level = None;
        assert_eq!(cli.effective_log_level(), default_log_level());
    }

    #[test]
    fn rejects_unknown_audit_policy() {
        assert!(Cli::try_parse_from(["lendingctl", "--audit", "never", "list"]).is_err());
    }

    #[test]
    fn formats_record_and_event_lines() {
        let record = CatalogRecord {
            id: 3,
            title: "Beloved".to_string(),
            author: String::new(),
            identifier: String::new(),
            description: String::new(),
            checked_out: true,
        };
        assert_eq!(record_line(&record), "3\tchecked_out\tBeloved");

        let event = LifecycleEvent {
            sequence: 9,
            kind: LifecycleEventKind::CheckedIn,
            record_id: 3,
            recorded_at_ms: 1_000,
        };
        assert_eq!(
            event_line(&event),
            "9\tThu Jan  1 00:00:01 UTC 1970\tCHECKED_IN\trecord=3\tRecord checked in"
        );
    }
}
