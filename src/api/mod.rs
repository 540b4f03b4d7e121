// src/api/mod.rs
use async_trait::async_trait;

use crate::errors::ApiError;

pub mod client;
pub mod model;

pub use client::ApiClient;
pub use model::{FiscalRecord, ReceiptsPage};

/// The two calls the harvesters make. [`ApiClient`] is the real thing.
#[async_trait]
pub trait ReceiptApi: Send + Sync {
    /// Zero-based page of the receipt listing.
    async fn fetch_receipts_page(&self, page_index: u32) -> Result<ReceiptsPage, ApiError>;

    /// Provider's fiscal detail for `key`, as sent. The caller attaches the key.
    async fn fetch_fiscal_data(&self, key: &str) -> Result<FiscalRecord, ApiError>;
}
