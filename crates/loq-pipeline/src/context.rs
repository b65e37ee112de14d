//! Per-query context shared by every stage processor.

use std::sync::Arc;

use loq_common::{MemoryTracker, MetricsRegistry};

use crate::processor::Signal;

/// Everything a stage needs besides its own definition: worker count, the
/// stop/cancel signals, the memory budget tracker, and the metrics registry.
#[derive(Clone, Debug)]
pub struct PipeContext {
    /// Number of concurrent writers; also the stats shard count.
    pub workers: usize,
    /// Runtime-level "abandon the query" signal, polled by long loops.
    pub stop: Signal,
    /// "No more data wanted" signal, fired by limit stages and at flush time,
    /// checked by upstream writers.
    pub cancel: Signal,
    /// Aggregation-state budget for this query.
    pub tracker: Arc<MemoryTracker>,
    /// Engine metrics sink.
    pub metrics: MetricsRegistry,
}

impl PipeContext {
    /// Fresh context with unfired signals.
    pub fn new(workers: usize, tracker: Arc<MemoryTracker>, metrics: MetricsRegistry) -> Self {
        Self {
            workers,
            stop: Signal::new(),
            cancel: Signal::new(),
            tracker,
            metrics,
        }
    }
}
