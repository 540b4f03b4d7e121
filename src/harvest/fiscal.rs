// src/harvest/fiscal.rs
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexSet;
use tokio::sync::watch;

use super::FiscalSummary;
use crate::api::model::{KeyRef, PageKeys};
use crate::api::ReceiptApi;
use crate::config::options::HarvestOptions;
use crate::errors::{HarvestError, LogError};
use crate::progress::Progress;
use crate::store::AppendLog;

/// Every receipt key in the receipts log, in first-seen order, without repeats.
pub fn receipt_keys(receipts: &AppendLog) -> Result<IndexSet<String>, LogError> {
    let mut keys = IndexSet::new();
    for page in receipts.read_all::<PageKeys>()? {
        keys.extend(page?.receipts.into_iter().map(|r| r.key).filter(|k| !k.is_empty()));
    }
    Ok(keys)
}

/// Keys that already have a fiscal record.
pub fn fetched_keys(fiscal: &AppendLog) -> Result<HashSet<String>, LogError> {
    fiscal.read_all::<KeyRef>()?.map(|r| r.map(|k| k.key)).collect()
}

/// Discovered keys minus fetched keys, keeping discovery order.
pub fn anti_join<I>(discovered: I, fetched: &HashSet<String>) -> IndexSet<String>
where
    I: IntoIterator<Item = String>,
{
    discovered.into_iter().filter(|k| !fetched.contains(k)).collect()
}

/// What still needs fetching, recomputed from both logs.
pub fn pending_keys(receipts: &AppendLog, fiscal: &AppendLog) -> Result<IndexSet<String>, LogError> {
    let fetched = fetched_keys(fiscal)?;
    Ok(anti_join(receipt_keys(receipts)?, &fetched))
}

/// Incremental fetch of fiscal detail for every receipt key not yet in the
/// fiscal log.
///
/// Nothing is remembered between passes: each pass re-reads both logs, so a
/// growing receipts log and a restarted process are handled the same way.
pub struct FiscalHarvester {
    api: Arc<dyn ReceiptApi>,
    receipts: AppendLog,
    fiscal: AppendLog,
    options: HarvestOptions,
    progress: Arc<dyn Progress>,
}

impl FiscalHarvester {
    pub fn new(api: Arc<dyn ReceiptApi>, options: HarvestOptions, progress: Arc<dyn Progress>) -> Self {
        Self {
            api,
            receipts: AppendLog::new(options.receipts_path()),
            fiscal: AppendLog::new(options.fiscal_path()),
            options,
            progress,
        }
    }

    /// Run passes until one that started after `receipts_done` was raised
    /// has finished.
    ///
    /// Failed keys are logged and left for the next pass. Only log I/O
    /// errors end the harvester.
    pub async fn run(&self, mut receipts_done: watch::Receiver<bool>) -> Result<FiscalSummary, HarvestError> {
        let mut summary = FiscalSummary::default();
        loop {
            // sampled before reading the logs: if set, this pass sees every page
            let last_pass = *receipts_done.borrow_and_update();

            if !self.receipts.exists() {
                if last_pass {
                    logf!("Receipts finished without a log; no fiscal data to fetch");
                    break;
                }
                self.idle(&mut receipts_done).await;
                continue;
            }

            summary.passes += 1;
            let pending = self.pending().await?;
            let total = pending.len();
            self.progress.pass_begin(summary.passes, total);
            logf!("Pass {}: need fiscal data for {total} receipts", summary.passes);

            for (i, key) in pending.iter().enumerate() {
                logd!("Fetching fiscal data {}/{total} for key: {key}", i + 1);
                match self.api.fetch_fiscal_data(key).await {
                    Ok(record) => {
                        self.fiscal.append(&record.with_key(key))?;
                        summary.fetched += 1;
                        self.progress.fiscal_done(key);
                    }
                    Err(e) => {
                        loge!("Failed to fetch fiscal data for key {key}: {e}");
                        summary.failed += 1;
                        self.progress.fiscal_failed(key, &e.to_string());
                    }
                }
                if !(last_pass && i + 1 == total) {
                    tokio::time::sleep(self.options.request_interval).await;
                }
            }

            if last_pass {
                break;
            }
            if pending.is_empty() {
                self.idle(&mut receipts_done).await;
            }
        }

        logf!(
            "Fiscal done: {} passes, {} fetched, {} failed",
            summary.passes, summary.fetched, summary.failed
        );
        Ok(summary)
    }

    /// [`pending_keys`] on the blocking pool; a pass decodes both logs in full.
    async fn pending(&self) -> Result<IndexSet<String>, HarvestError> {
        let (receipts, fiscal) = (self.receipts.clone(), self.fiscal.clone());
        let pending = tokio::task::spawn_blocking(move || pending_keys(&receipts, &fiscal)).await??;
        Ok(pending)
    }

    /// Wait for the receipts side to make progress, at most one poll interval.
    async fn idle(&self, receipts_done: &mut watch::Receiver<bool>) {
        let poll = self.options.poll_interval;
        tokio::select! {
            changed = receipts_done.changed() => {
                if changed.is_err() {
                    // sender gone without finishing; don't spin
                    tokio::time::sleep(poll).await;
                }
            }
            _ = tokio::time::sleep(poll) => {}
        }
    }
}
