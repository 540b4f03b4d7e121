// src/harvest/receipts.rs
use std::sync::Arc;

use tokio::sync::watch;

use super::ReceiptSummary;
use crate::api::ReceiptApi;
use crate::config::options::{HarvestOptions, ReceiptLogMode};
use crate::errors::HarvestError;
use crate::progress::Progress;
use crate::store::AppendLog;

/// Full paginated dump of the receipt listing, one log line per page.
pub struct ReceiptHarvester {
    api: Arc<dyn ReceiptApi>,
    log: AppendLog,
    options: HarvestOptions,
    progress: Arc<dyn Progress>,
}

impl ReceiptHarvester {
    pub fn new(api: Arc<dyn ReceiptApi>, options: HarvestOptions, progress: Arc<dyn Progress>) -> Self {
        Self { api, log: AppendLog::new(options.receipts_path()), options, progress }
    }

    /// Fetch pages until the service says there are no more, then raise `done`.
    ///
    /// Any request or write failure ends the dump; `done` is left unset.
    pub async fn run(&self, done: &watch::Sender<bool>) -> Result<ReceiptSummary, HarvestError> {
        if self.options.receipt_log_mode == ReceiptLogMode::Fresh {
            self.log.truncate()?;
            logf!("Starting fresh receipts log at {}", self.log.path().display());
        }

        let mut summary = ReceiptSummary::default();
        let mut page_index = 0u32;
        loop {
            logf!("Fetching receipts page {page_index}");
            let page = self.api.fetch_receipts_page(page_index).await?;
            self.log.append(&page)?;

            let count = page.receipts().len();
            summary.pages += 1;
            summary.receipts += count;
            self.progress.page_done(page_index, count);
            logf!("Scraped {count} receipts from page {page_index}");

            page_index += 1;
            if !page.has_more() {
                break;
            }
            tokio::time::sleep(self.options.request_interval).await;
        }

        done.send_replace(true);
        logf!("Receipts done: {} pages, {} receipts", summary.pages, summary.receipts);
        Ok(summary)
    }
}
