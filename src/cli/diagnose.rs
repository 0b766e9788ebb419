use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::gatekeeper::{Gatekeeper, OsKind, Submission};
use crate::presets::{self, Category};

#[derive(Args)]
pub struct DiagnoseArgs {
    /// Preset category: network, system, or storage
    pub category: String,

    /// Target OS: windows, macos, or linux (default: detected host)
    #[arg(short, long)]
    pub os: Option<String>,

    /// Session identifier recorded in the audit trail
    #[arg(short, long)]
    pub session: Option<String>,
}

/// Run every preset in a category through the gatekeeper, in order.
pub async fn run(args: DiagnoseArgs) -> Result<()> {
    let category = Category::parse(&args.category).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown category {:?}; expected network, system, or storage",
            args.category
        )
    })?;

    let os_id = super::resolve_os(args.os.as_deref())?;
    let os = OsKind::parse(&os_id)
        .ok_or_else(|| anyhow::anyhow!("Unsupported OS identifier: {:?}", os_id))?;

    let config = Config::load()?;
    let gatekeeper = Gatekeeper::new(&config)?;
    let session = args
        .session
        .unwrap_or_else(|| format!("diagnose-{}", uuid::Uuid::new_v4()));

    let selected = presets::presets_in(os, category);
    println!(
        "Running {} {} preset(s) for {}",
        selected.len(),
        category,
        os
    );

    for preset in selected {
        println!();
        println!("== {} (risk: {}) ==", preset.name, preset.risk);
        println!("   {}", preset.description);

        match gatekeeper.submit(preset.command, os.as_str(), &session).await {
            Ok(Submission::Executed { command, report }) => {
                super::run::print_report(&command, &report);
            }
            Ok(Submission::Rejected {
                reason_code,
                message,
            }) => {
                println!("Rejected ({}): {}", reason_code, message);
            }
            Err(e) => {
                // A missing diagnostic binary should not abort the rest of
                // the suite.
                println!("Failed: {}", e);
            }
        }
    }

    Ok(())
}
