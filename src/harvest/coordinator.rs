// src/harvest/coordinator.rs
use std::sync::Arc;

use tokio::sync::watch;

use super::{FiscalHarvester, HarvestSummary, ReceiptHarvester};
use crate::api::ReceiptApi;
use crate::config::options::HarvestOptions;
use crate::errors::HarvestError;
use crate::progress::{NullProgress, Progress};

/// Runs the receipts dump and the fiscal fetch concurrently.
///
/// Both run inside one `try_join!`: the first error drops the other
/// harvester at its next await point and fails the harvest. Success means
/// both finished.
pub struct HarvestCoordinator {
    api: Arc<dyn ReceiptApi>,
    options: HarvestOptions,
    progress: Arc<dyn Progress>,
}

impl HarvestCoordinator {
    pub fn new(api: Arc<dyn ReceiptApi>, options: HarvestOptions) -> Self {
        Self { api, options, progress: Arc::new(NullProgress) }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self) -> Result<HarvestSummary, HarvestError> {
        let (done_tx, done_rx) = watch::channel(false);

        let receipts = ReceiptHarvester::new(Arc::clone(&self.api), self.options.clone(), Arc::clone(&self.progress));
        let fiscal = FiscalHarvester::new(Arc::clone(&self.api), self.options.clone(), Arc::clone(&self.progress));

        let (receipts, fiscal) = tokio::try_join!(receipts.run(&done_tx), fiscal.run(done_rx))?;
        Ok(HarvestSummary { receipts, fiscal })
    }
}
