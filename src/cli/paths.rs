//! CLI subcommand: `deskgate paths`
//!
//! Prints all resolved XDG-compliant paths for debugging and scripting.

use anyhow::Result;

use crate::paths::Paths;

pub fn run() -> Result<()> {
    let paths = Paths::resolve()?;

    println!("config:  {}", paths.config_dir.display());
    println!("data:    {}", paths.data_dir.display());
    println!("state:   {}", paths.state_dir.display());
    println!();
    println!("config file: {}", paths.config_file().display());
    println!("audit store: {}", paths.audit_db().display());
    println!("logs:        {}", paths.logs_dir().display());

    Ok(())
}
