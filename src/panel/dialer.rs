use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::models::{BatchId, PhoneNumber, SkipReason, StatusMessage};
use super::provider::{CallProvider, CallRequest};
use super::relay::{StatusRelay, StatusSender};
use super::store::StoreHandle;
use crate::config::Config;
use crate::errors::StoreError;

/// Fixed parameters applied to every call a batch places.
#[derive(Debug, Clone)]
pub struct DialerSettings {
    pub caller_id: String,
    pub voice_url: String,
    /// Pause after a call is accepted, before the number is removed.
    pub call_delay: Duration,
}

impl From<&Config> for DialerSettings {
    fn from(config: &Config) -> Self {
        Self {
            caller_id: config.caller_id.clone(),
            voice_url: config.voice_url.clone(),
            call_delay: config.call_delay,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Runs calling batches over the number list.
///
/// Batches may overlap. Each number is claimed in a shared in-flight set
/// before it is dialed and re-checked against the live list, so overlapping
/// snapshots never produce two concurrent calls to the same number.
#[derive(Clone)]
pub struct Dialer {
    store: StoreHandle,
    provider: Arc<dyn CallProvider>,
    settings: Arc<DialerSettings>,
    in_flight: Arc<Mutex<HashSet<PhoneNumber>>>,
}

/// Releases a number's in-flight claim when dropped.
struct Claim {
    set: Arc<Mutex<HashSet<PhoneNumber>>>,
    number: PhoneNumber,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.number);
    }
}

impl Dialer {
    pub fn new(store: StoreHandle, provider: Arc<dyn CallProvider>, settings: DialerSettings) -> Self {
        Self {
            store,
            provider,
            settings: Arc::new(settings),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Snapshot the list and run a batch over it in a detached task.
    /// Progress is only observable through the relay feed for the returned id.
    pub async fn start_batch(&self, relay: &StatusRelay) -> Result<BatchId, StoreError> {
        let snapshot = self.store.list().await?;
        let status = relay.open_batch();
        let batch = status.batch();
        let dialer = self.clone();
        tokio::spawn(async move {
            dialer.run_batch(snapshot, status).await;
        });
        Ok(batch)
    }

    /// Dial every number in `snapshot` in order. A failed call is reported and
    /// the loop moves on; nothing aborts the batch.
    pub async fn run_batch(&self, snapshot: Vec<PhoneNumber>, status: StatusSender) -> BatchSummary {
        let batch = status.batch();
        let mut summary = BatchSummary {
            total: snapshot.len(),
            ..Default::default()
        };
        tracing::info!(%batch, numbers = snapshot.len(), "batch started");

        for number in snapshot {
            let Some(_claim) = self.claim(&number) else {
                status.emit(StatusMessage::Skipped {
                    number,
                    reason: SkipReason::InFlight,
                });
                summary.skipped += 1;
                continue;
            };

            match self.is_listed(&number).await {
                Ok(true) => {}
                Ok(false) => {
                    status.emit(StatusMessage::Skipped {
                        number,
                        reason: SkipReason::NoLongerListed,
                    });
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    // Unreadable list: dial from the snapshot anyway.
                    tracing::warn!(%batch, %number, error = %e, "could not re-check number list");
                }
            }

            if self.dial(&number, &status).await {
                summary.completed += 1;
            } else {
                summary.failed += 1;
            }
        }

        tracing::info!(
            %batch,
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        summary
    }

    /// Place one call and, on success, drop the number from the list.
    /// Returns whether the call was placed and the number is off the list.
    async fn dial(&self, number: &PhoneNumber, status: &StatusSender) -> bool {
        status.emit(StatusMessage::Calling {
            number: number.clone(),
        });

        let request = CallRequest {
            to: number.clone(),
            from: self.settings.caller_id.clone(),
            url: self.settings.voice_url.clone(),
        };
        let sid = match self.provider.create_call(&request).await {
            Ok(sid) => sid,
            Err(e) => {
                tracing::warn!(batch = %status.batch(), %number, error = %e, "call failed");
                status.emit(StatusMessage::Failed {
                    number: number.clone(),
                    error: e.to_string(),
                });
                return false;
            }
        };
        status.emit(StatusMessage::Started {
            number: number.clone(),
            sid,
        });

        if !self.settings.call_delay.is_zero() {
            tokio::time::sleep(self.settings.call_delay).await;
        }

        match self.store.remove(number.as_str()).await {
            Ok(true) => {
                status.emit(StatusMessage::Removed {
                    number: number.clone(),
                });
                true
            }
            Ok(false) => {
                // Taken off the list by someone else during the pause.
                tracing::debug!(batch = %status.batch(), %number, "number already gone after call");
                true
            }
            Err(e) => {
                tracing::error!(batch = %status.batch(), %number, error = %e, "call placed but number not removed");
                status.emit(StatusMessage::Failed {
                    number: number.clone(),
                    error: format!("call placed but removal failed: {}", e),
                });
                false
            }
        }
    }

    fn claim(&self, number: &PhoneNumber) -> Option<Claim> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(number.clone()) {
            return None;
        }
        Some(Claim {
            set: Arc::clone(&self.in_flight),
            number: number.clone(),
        })
    }

    async fn is_listed(&self, number: &PhoneNumber) -> Result<bool, StoreError> {
        Ok(self.store.list().await?.contains(number))
    }
}
