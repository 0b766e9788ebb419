pub mod audit;
pub mod check;
pub mod config;
pub mod diagnose;
pub mod paths;
pub mod profiles;
pub mod run;
pub mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::gatekeeper::OsKind;

#[derive(Parser)]
#[command(name = "deskgate")]
#[command(author, version, about = "Command-execution gatekeeper for IT helpdesk assistants")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a command through the gatekeeper and execute it if allowed
    Run(run::RunArgs),

    /// Validate a command without executing it
    Check(check::CheckArgs),

    /// Run a category of diagnostic presets
    Diagnose(diagnose::DiagnoseArgs),

    /// Show per-OS whitelisted commands
    Profiles(profiles::ProfilesArgs),

    /// Audit trail operations
    Audit(audit::AuditArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Start the HTTP server for the chat front-end
    Serve,

    /// Show resolved XDG directory paths
    Paths,
}

/// Use the `--os` flag when given, otherwise the detected host platform.
pub(crate) fn resolve_os(flag: Option<&str>) -> Result<String> {
    match flag {
        Some(os) => Ok(os.to_string()),
        None => OsKind::host()
            .map(|kind| kind.as_str().to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not detect the host OS; pass --os explicitly")),
    }
}
