//! Foreground batch: `callboard call`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use callboard::config::Config;
use callboard::panel::dialer::{Dialer, DialerSettings};
use callboard::panel::provider::TwilioClient;
use callboard::panel::relay::StatusSender;
use callboard::panel::store::StoreHandle;

pub async fn cmd_call(numbers_file: PathBuf) -> Result<()> {
    let config = Config::from_env()?;
    let provider = TwilioClient::new(&config).context("Failed to build provider client")?;
    let store = StoreHandle::open(numbers_file);
    let snapshot = store.list().await?;
    if snapshot.is_empty() {
        println!("No numbers to call.");
        return Ok(());
    }

    let dialer = Dialer::new(store, Arc::new(provider), DialerSettings::from(&config));
    let (status, mut rx) = StatusSender::detached();
    let batch = tokio::spawn(async move { dialer.run_batch(snapshot, status).await });

    while let Some(msg) = rx.recv().await {
        println!("{}", msg);
    }

    let summary = batch.await.context("Call batch task failed")?;
    println!(
        "Done: {} called, {} failed, {} skipped (of {})",
        summary.completed, summary.failed, summary.skipped, summary.total
    );
    if summary.failed > 0 {
        anyhow::bail!("{} call(s) failed", summary.failed);
    }
    Ok(())
}
