//! Stage-processor contract and the cooperative cancellation signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::block_result::BlockResult;

/// A pipeline stage instance.
///
/// Contract:
/// - exactly `workers` concurrent writers call `write_block`, each with a
///   fixed `worker_id` in `0..workers`;
/// - callers must not retain references into the block past the return of
///   `write_block`;
/// - `flush` is called exactly once, after all writers have returned, and
///   never concurrently with writes. Implementations must cascade: fire the
///   cancel signal and flush the downstream stage before returning.
pub trait PipeProcessor: Send + Sync {
    /// Write one block of rows on behalf of `worker_id`.
    fn write_block(&self, worker_id: usize, block: &BlockResult);

    /// Flush accumulated state downstream.
    fn flush(&self);
}

/// A one-way cooperative flag shared across threads.
///
/// Two instances flow through every pipeline: `stop` (the runtime wants the
/// query dead; long loops poll it every iteration) and `cancel` (a stage
/// downstream needs no more data; upstream writers check it before doing more
/// work).
#[derive(Clone, Debug, Default)]
pub struct Signal {
    fired: Arc<AtomicBool>,
}

impl Signal {
    /// A fresh, unfired signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn fire(&self) {
        self.fired.store(true, Ordering::Release);
    }

    /// Whether the signal has fired.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
