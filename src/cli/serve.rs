use anyhow::Result;

use crate::config::Config;
use crate::server::Server;

pub async fn run() -> Result<()> {
    let config = Config::load()?;

    if !config.server.enabled {
        anyhow::bail!("Server is disabled; set server.enabled = true in config");
    }

    Server::new(&config).run().await
}
