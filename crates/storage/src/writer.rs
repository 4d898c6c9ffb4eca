//! Single-writer persistence task
//!
//! Every file write goes through one task fed by a bounded channel, so two
//! saves never race on the same file.

use crate::manager::{SaveReport, StorageManager};
use crate::StorageError;
use alerting::{SaveTrigger, SharedAlertManager};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Requests understood by the writer
#[derive(Debug)]
pub enum WriteCommand {
    /// Fire-and-forget save of the current file
    SaveCurrent,
    /// Save current file and today's partition
    Save {
        reply: oneshot::Sender<Result<SaveReport, StorageError>>,
    },
    /// Archive the in-memory set, then empty it and the current file
    ArchiveAndClear {
        reply: oneshot::Sender<Result<usize, StorageError>>,
    },
    /// Final save and archive, then stop
    Shutdown {
        reply: oneshot::Sender<Result<SaveReport, StorageError>>,
    },
}

/// Cloneable sender side of the writer
#[derive(Debug, Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<WriteCommand>,
}

impl WriterHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, StorageError>>) -> WriteCommand,
    ) -> Result<T, StorageError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| StorageError::WriterClosed)?;
        rx.await.map_err(|_| StorageError::WriterClosed)?
    }

    pub async fn save(&self) -> Result<SaveReport, StorageError> {
        self.request(|reply| WriteCommand::Save { reply }).await
    }

    /// Returns the number of alerts archived
    pub async fn archive_and_clear(&self) -> Result<usize, StorageError> {
        self.request(|reply| WriteCommand::ArchiveAndClear { reply })
            .await
    }

    pub async fn shutdown(&self) -> Result<SaveReport, StorageError> {
        self.request(|reply| WriteCommand::Shutdown { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Save trigger for the alert manager. It does not keep the writer
    /// alive: once every handle is dropped the writer stops.
    pub fn save_trigger(&self) -> WeakSaveTrigger {
        WeakSaveTrigger {
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning sender used by the alert manager to request saves
#[derive(Debug, Clone)]
pub struct WeakSaveTrigger {
    tx: mpsc::WeakSender<WriteCommand>,
}

impl SaveTrigger for WeakSaveTrigger {
    fn request_save(&self) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.try_send(WriteCommand::SaveCurrent).is_ok(),
            None => false,
        }
    }
}

/// Owns all writes to the alerts directory
pub struct StorageWriter {
    storage: StorageManager,
    alerts: SharedAlertManager,
    receiver: mpsc::Receiver<WriteCommand>,
}

impl StorageWriter {
    pub const CHANNEL_CAPACITY: usize = 32;

    /// Create a writer and its handle
    pub fn channel(storage: StorageManager, alerts: SharedAlertManager) -> (WriterHandle, Self) {
        let (tx, receiver) = mpsc::channel(Self::CHANNEL_CAPACITY);
        (
            WriterHandle { tx },
            Self {
                storage,
                alerts,
                receiver,
            },
        )
    }

    /// Create a writer and run it on a new task
    pub fn spawn(storage: StorageManager, alerts: SharedAlertManager) -> (WriterHandle, JoinHandle<()>) {
        let (handle, writer) = Self::channel(storage, alerts);
        (handle, tokio::spawn(writer.run()))
    }

    /// Run the writer loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        let config = self.storage.config().clone();
        let period = Duration::from_millis(config.save_interval_ms.max(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Storage writer started (auto-save: {}, every {} ms)",
            config.auto_save, config.save_interval_ms
        );

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(WriteCommand::SaveCurrent) => {
                        if let Err(e) = self.storage.save_current(&self.alerts).await {
                            error!("Save after urgent alert failed: {}", e);
                        }
                    }
                    Some(WriteCommand::Save { reply }) => {
                        let _ = reply.send(self.storage.save_all(&self.alerts).await);
                    }
                    Some(WriteCommand::ArchiveAndClear { reply }) => {
                        let _ = reply.send(self.archive_and_clear().await);
                    }
                    Some(WriteCommand::Shutdown { reply }) => {
                        let _ = reply.send(self.final_save().await);
                        break;
                    }
                    None => {
                        debug!("All writer handles dropped");
                        break;
                    }
                },
                _ = ticker.tick(), if config.auto_save => {
                    match self.storage.save_all(&self.alerts).await {
                        Ok(report) => debug!("Auto-save wrote {} alerts", report.saved),
                        Err(e) => error!("Auto-save failed: {}", e),
                    }
                }
            }
        }

        info!("Storage writer stopped");
    }

    /// Alerts are taken under the write lock before archiving, so anything
    /// created meanwhile stays in memory. A failed archive puts them back.
    async fn archive_and_clear(&self) -> Result<usize, StorageError> {
        let alerts = self.alerts.write().await.take_alerts();
        if let Err(e) = self.storage.archive(&alerts).await {
            error!("Archive before clear failed, restoring alerts: {}", e);
            self.alerts.write().await.restore_front(alerts);
            return Err(e);
        }

        let remaining = self.alerts.read().await.alerts().to_vec();
        self.storage.write_current(&remaining).await?;
        info!("Cleared {} alerts after archiving", alerts.len());
        Ok(alerts.len())
    }

    async fn final_save(&self) -> Result<SaveReport, StorageError> {
        let report = self.storage.save_all(&self.alerts).await?;
        let alerts = self.alerts.read().await.alerts().to_vec();
        self.storage.archive(&alerts).await?;
        Ok(report)
    }
}
