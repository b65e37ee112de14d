//! The `head` stage: keep the first `n` rows, then cancel upstream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use loq_common::MetricsRegistry;
use loq_query::HeadPipe;

use crate::block_result::BlockResult;
use crate::context::PipeContext;
use crate::processor::{PipeProcessor, Signal};

/// Forwards rows until the limit is met. The counter is shared across
/// workers; the block that crosses the limit is truncated and the cancel
/// signal is fired so upstream writers stop producing.
pub struct HeadProcessor {
    hp: HeadPipe,
    cancel: Signal,
    metrics: MetricsRegistry,
    next: Arc<dyn PipeProcessor>,
    rows_written: AtomicU64,
}

impl HeadProcessor {
    /// Build the stage. `head 0` wants no data at all, so it cancels
    /// immediately.
    pub fn new(hp: HeadPipe, ctx: &PipeContext, next: Arc<dyn PipeProcessor>) -> Self {
        if hp.n == 0 {
            ctx.cancel.fire();
        }
        Self {
            hp,
            cancel: ctx.cancel.clone(),
            metrics: ctx.metrics.clone(),
            next,
            rows_written: AtomicU64::new(0),
        }
    }
}

impl PipeProcessor for HeadProcessor {
    fn write_block(&self, worker_id: usize, block: &BlockResult) {
        let n_rows = block.n_rows() as u64;
        self.metrics.record_stage_block("head", n_rows);

        let written = self.rows_written.fetch_add(n_rows, Ordering::AcqRel) + n_rows;
        if written <= self.hp.n {
            // Fast path - the whole block fits under the limit.
            self.next.write_block(worker_id, block);
            return;
        }

        let before = written - n_rows;
        if before >= self.hp.n {
            // The limit was already met; another worker has fired cancel.
            return;
        }

        // This block crosses the limit: forward the remainder and cancel.
        let remaining = (self.hp.n - before) as usize;
        let truncated = block.slice_rows(0, remaining);
        self.next.write_block(worker_id, &truncated);
        self.cancel.fire();
    }

    fn flush(&self) {
        self.cancel.fire();
        self.next.flush();
    }
}

#[cfg(test)]
mod tests {
    use loq_common::{MemoryTracker, MetricsRegistry};

    use super::*;
    use crate::block::Block;
    use crate::runtime::Collector;

    fn context() -> PipeContext {
        PipeContext::new(1, MemoryTracker::new(usize::MAX), MetricsRegistry::new())
    }

    fn block(values: &[&str]) -> BlockResult {
        let rows: Vec<Vec<(&str, &str)>> = values.iter().map(|v| vec![("a", *v)]).collect();
        let rows: Vec<&[(&str, &str)]> = rows.iter().map(Vec::as_slice).collect();
        BlockResult::from_block(&Block::from_rows(&rows))
    }

    #[test]
    fn passes_blocks_until_the_limit_then_truncates_and_cancels() {
        let ctx = context();
        let collector = Arc::new(Collector::new());
        let stage = HeadProcessor::new(HeadPipe { n: 3 }, &ctx, collector.clone());

        stage.write_block(0, &block(&["r0", "r1"]));
        assert!(!ctx.cancel.is_fired());
        stage.write_block(0, &block(&["r2", "r3", "r4"]));
        assert!(ctx.cancel.is_fired());
        // Limit already met: further blocks are dropped entirely.
        stage.write_block(0, &block(&["r5"]));
        stage.flush();

        let rows: Vec<String> = collector
            .take_blocks()
            .iter()
            .flat_map(|b| b.columns[0].values.clone())
            .collect();
        assert_eq!(rows, vec!["r0", "r1", "r2"]);
    }

    #[test]
    fn head_zero_cancels_at_construction() {
        let ctx = context();
        let collector = Arc::new(Collector::new());
        let _stage = HeadProcessor::new(HeadPipe { n: 0 }, &ctx, collector);
        assert!(ctx.cancel.is_fired());
    }
}
