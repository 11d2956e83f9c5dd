//! Panel server command: `callboard serve`.

use std::path::PathBuf;

use anyhow::Result;
use callboard::config::Config;
use callboard::panel::server::{ServerConfig, start_server};

pub async fn cmd_serve(
    host: String,
    port: u16,
    numbers_file: PathBuf,
    open: bool,
    dev: bool,
) -> Result<()> {
    // Browser open is spawned first; start_server blocks until shutdown.
    if open && !dev {
        let url = format!("http://localhost:{}", port);
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                eprintln!("Failed to open browser: {}", e);
            }
        });
    }

    start_server(
        ServerConfig {
            host,
            port,
            numbers_file,
            dev_mode: dev,
        },
        Config::from_env(),
    )
    .await
}
