use anyhow::Result;
use clap::{Args, Subcommand};

use crate::audit::AuditLog;
use crate::config::Config;

#[derive(Args)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommands,
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Show recent audit records, newest first
    List {
        /// Maximum records to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Verify the record hash chain end to end
    Verify,
}

pub async fn run(args: AuditArgs) -> Result<()> {
    let config = Config::load()?;
    let log = AuditLog::open(&config.paths.audit_db())?;

    match args.command {
        AuditCommands::List { limit } => list(&log, limit),
        AuditCommands::Verify => verify(&log),
    }
}

fn list(log: &AuditLog, limit: usize) -> Result<()> {
    let records = log.recent(limit)?;

    if records.is_empty() {
        println!("No audit records.");
        return Ok(());
    }

    for record in records {
        let rule = record
            .matched_rule
            .map(|r| format!(" [rule: {}]", r))
            .unwrap_or_default();
        let outcome = match (record.exit_code, record.timed_out, &record.spawn_error) {
            (_, _, Some(err)) => format!(" spawn failed: {}", err),
            (_, Some(true), _) => " timed out".to_string(),
            (Some(code), _, _) => format!(" exit {}", code),
            _ => String::new(),
        };
        println!(
            "{} {} session={} {:?} -> {}{}{}",
            record.id, record.ts, record.session_id, record.candidate, record.verdict, rule,
            outcome
        );
    }

    Ok(())
}

fn verify(log: &AuditLog) -> Result<()> {
    let broken = log.verify_chain()?;
    let total = log.count()?;

    if broken.is_empty() {
        println!("Audit chain intact ({} records).", total);
    } else {
        println!(
            "Audit chain BROKEN at record id(s) {:?} ({} records total).",
            broken, total
        );
        anyhow::bail!("audit chain verification failed");
    }

    Ok(())
}
