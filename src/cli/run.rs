use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::gatekeeper::{Gatekeeper, Submission};

#[derive(Args)]
pub struct RunArgs {
    /// Target OS: windows, macos, or linux (default: detected host)
    #[arg(short, long)]
    pub os: Option<String>,

    /// Session identifier recorded in the audit trail
    #[arg(short, long)]
    pub session: Option<String>,

    /// The candidate command
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = Config::load()?;
    let gatekeeper = Gatekeeper::new(&config)?;

    let os = super::resolve_os(args.os.as_deref())?;
    let session = args
        .session
        .unwrap_or_else(|| format!("cli-{}", uuid::Uuid::new_v4()));
    let candidate = args.command.join(" ");

    match gatekeeper.submit(&candidate, &os, &session).await? {
        Submission::Executed { command, report } => {
            print_report(&command, &report);
        }
        Submission::Rejected {
            reason_code,
            message,
        } => {
            println!("Rejected ({}): {}", reason_code, message);
        }
    }

    Ok(())
}

pub(crate) fn print_report(command: &str, report: &crate::gatekeeper::ExecutionReport) {
    println!("$ {}", command);

    if !report.stdout.is_empty() {
        println!("{}", report.stdout.trim_end());
        if report.stdout_truncated {
            println!("... (stdout truncated)");
        }
    }

    if !report.stderr.is_empty() {
        println!("STDERR:");
        println!("{}", report.stderr.trim_end());
        if report.stderr_truncated {
            println!("... (stderr truncated)");
        }
    }

    if report.timed_out {
        println!("(timed out after {} ms; partial output above)", report.duration_ms);
    } else {
        println!(
            "(exit: {}, {} ms)",
            report
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "killed".to_string()),
            report.duration_ms
        );
    }
}
