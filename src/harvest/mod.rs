// src/harvest/mod.rs
//! The two harvesters and the coordinator that runs them side by side.
//!
//! The receipts harvester dumps the listing page by page into its log and
//! raises a one-shot "receipts done" signal (a `watch` channel) when the
//! last page is in. The fiscal harvester keeps re-deriving what is missing
//! from the two logs until it has done a full pass that started after that
//! signal.

mod coordinator;
mod fiscal;
mod receipts;

pub use coordinator::HarvestCoordinator;
pub use fiscal::{anti_join, fetched_keys, pending_keys, receipt_keys, FiscalHarvester};
pub use receipts::ReceiptHarvester;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub pages: u32,
    pub receipts: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FiscalSummary {
    pub passes: usize,
    pub fetched: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub receipts: ReceiptSummary,
    pub fiscal: FiscalSummary,
}
