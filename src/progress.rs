// src/progress.rs
/// Lightweight progress reporting for a harvest run.
/// Frontends implement this to surface status to users. Both harvesters
/// report through the same sink concurrently, hence `&self` and `Sync`.
pub trait Progress: Send + Sync {
    /// Free-form status line for human eyes.
    fn log(&self, _msg: &str) {}

    /// A receipts page was persisted.
    fn page_done(&self, _page_index: u32, _receipts: usize) {}

    /// A fiscal pass starts with this many pending keys.
    fn pass_begin(&self, _pass: usize, _pending: usize) {}

    /// A fiscal record was persisted.
    fn fiscal_done(&self, _key: &str) {}

    /// A fiscal fetch failed; the key stays pending for the next pass.
    fn fiscal_failed(&self, _key: &str, _reason: &str) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
