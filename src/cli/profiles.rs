use anyhow::Result;
use clap::Args;

use crate::gatekeeper::{OsKind, ProfileRegistry};

#[derive(Args)]
pub struct ProfilesArgs {
    /// Show a single platform (windows, macos, linux); default: all
    pub os: Option<String>,
}

pub async fn run(args: ProfilesArgs) -> Result<()> {
    let registry = ProfileRegistry::new();

    let targets: Vec<OsKind> = match args.os.as_deref() {
        Some(os_id) => {
            let profile = registry.lookup(os_id)?;
            vec![profile.os()]
        }
        None => OsKind::ALL.to_vec(),
    };

    for os in targets {
        let profile = registry.profile(os);
        let names = profile.command_names();
        println!("{} ({} commands):", os, names.len());
        for chunk in names.chunks(6) {
            println!("  {}", chunk.join(", "));
        }
        println!();
    }

    Ok(())
}
