use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::gatekeeper::{CommandValidator, ProfileRegistry, Verdict};

#[derive(Args)]
pub struct CheckArgs {
    /// Target OS: windows, macos, or linux (default: detected host)
    #[arg(short, long)]
    pub os: Option<String>,

    /// The candidate command
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Dry-run validation: prints the verdict without executing or auditing.
pub async fn run(args: CheckArgs) -> Result<()> {
    let config = Config::load()?;
    let registry = ProfileRegistry::new();
    let validator = CommandValidator::new(config.gatekeeper.max_candidate_chars);

    let os = super::resolve_os(args.os.as_deref())?;
    let candidate = args.command.join(" ");

    let verdict = validator.validate(&candidate, &os, &registry)?;
    println!("{}", verdict.reason_code());
    println!("  {}", verdict.public_message());

    if let Verdict::Allowed { command, .. } = &verdict {
        println!("  would execute: {}", command);
    }

    Ok(())
}
