//! # Block Monitor
//!
//! ```text
//! loop {
//!     latest = latest_block_number()
//!     for n in watermark+1 ..= latest {
//!         block(n) → for each tx not stored → receipt → insert_if_absent
//!         watermark = n
//!     }
//!     sleep(poll_interval | backoff) or stop
//! }
//! ```

use std::sync::Arc;

use dl_02_ledger_client::LedgerClient;
use dl_04_transaction_tracker::{receipt_from_rpc, ReceiptStore};
use shared_types::to_prefixed_hex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{MonitorConfig, MonitorError, PollReport, StartPoint};

pub struct BlockMonitor {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn ReceiptStore>,
    config: MonitorConfig,
    watermark: Option<u64>,
    initialized: bool,
}

impl BlockMonitor {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn ReceiptStore>,
        config: MonitorConfig,
    ) -> Self {
        let watermark = match config.start {
            StartPoint::Block(n) => n.checked_sub(1),
            StartPoint::Latest => None,
        };
        Self {
            ledger,
            store,
            initialized: matches!(config.start, StartPoint::Block(_)),
            config,
            watermark,
        }
    }

    /// Last fully processed block.
    pub fn watermark(&self) -> Option<u64> {
        self.watermark
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Process every block between the watermark and the current head.
    ///
    /// With [`StartPoint::Latest`] the first call only records the head.
    pub async fn poll_once(&mut self) -> Result<PollReport, MonitorError> {
        let latest = self.ledger.latest_block_number().await?;

        if !self.initialized {
            self.initialized = true;
            self.watermark = Some(latest);
            info!(block = latest, "[dl-05] Monitoring from head");
            return Ok(self.report(0, 0));
        }

        let from = self.watermark.map_or(0, |w| w + 1);
        let mut blocks = 0;
        let mut persisted = 0;

        for number in from..=latest {
            persisted += self.process_block(number).await?;
            self.watermark = Some(number);
            blocks += 1;
        }

        if blocks > 0 {
            debug!(
                blocks,
                receipts = persisted,
                watermark = ?self.watermark,
                "[dl-05] Poll complete"
            );
        }
        Ok(self.report(blocks, persisted))
    }

    fn report(&self, blocks_processed: u64, receipts_persisted: u64) -> PollReport {
        PollReport {
            blocks_processed,
            receipts_persisted,
            watermark: self.watermark,
        }
    }

    async fn process_block(&self, number: u64) -> Result<u64, MonitorError> {
        let block = self
            .ledger
            .block(number, true)
            .await?
            .ok_or(MonitorError::MissingBlock(number))?;

        let mut persisted = 0;
        for tx_hash in block.transactions.hashes() {
            if self.store.contains(&tx_hash)? {
                continue;
            }
            let rpc = self
                .ledger
                .receipt(&tx_hash)
                .await?
                .ok_or_else(|| MonitorError::MissingReceipt {
                    block: number,
                    tx_hash: to_prefixed_hex(&tx_hash),
                })?;

            let receipt = receipt_from_rpc(&rpc, block.timestamp);
            if self.store.insert_if_absent(&receipt)? {
                persisted += 1;
                info!(
                    tx_hash = %receipt.tx_hash_hex(),
                    block = number,
                    status = %receipt.status,
                    "[dl-05] Receipt recorded"
                );
            }
        }
        Ok(persisted)
    }

    /// Poll until `shutdown` turns `true` or its sender is dropped.
    /// Failures are logged and retried with backoff.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_ms = self.config.poll_interval.as_millis() as u64,
            start = ?self.config.start,
            "[dl-05] Block monitor started"
        );
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.poll_once().await {
                Ok(_) => {
                    failures = 0;
                    self.config.poll_interval
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.backoff_delay(failures);
                    match &e {
                        MonitorError::Store(_) => error!(
                            error = %e,
                            failures,
                            retry_ms = delay.as_millis() as u64,
                            "[dl-05] Poll failed"
                        ),
                        _ => warn!(
                            error = %e,
                            failures,
                            retry_ms = delay.as_millis() as u64,
                            "[dl-05] Poll failed"
                        ),
                    }
                    delay
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(watermark = ?self.watermark, "[dl-05] Block monitor stopped");
    }

    /// Run on a tokio task.
    pub fn spawn(mut self) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(stop_rx).await;
            self
        });
        MonitorHandle { stop_tx, task }
    }
}

/// A running monitor task.
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<BlockMonitor>,
}

impl MonitorHandle {
    /// Ask the task to exit at the next poll boundary.
    pub fn stop(&self) {
        if self.stop_tx.send(true).is_err() {
            debug!("[dl-05] Monitor already stopped");
        }
    }

    /// Stop and wait for the task. Returns the monitor with its watermark.
    pub async fn shutdown(self) -> Result<BlockMonitor, MonitorError> {
        self.stop();
        self.task
            .await
            .map_err(|e| MonitorError::Task(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
