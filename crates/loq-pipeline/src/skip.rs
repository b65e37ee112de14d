//! The `skip` stage: drop the first `n` rows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use loq_common::MetricsRegistry;
use loq_query::SkipPipe;

use crate::block_result::BlockResult;
use crate::context::PipeContext;
use crate::processor::{PipeProcessor, Signal};

/// Swallows rows until `n` have been seen across all workers, trimming the
/// block that straddles the boundary.
pub struct SkipProcessor {
    sp: SkipPipe,
    cancel: Signal,
    metrics: MetricsRegistry,
    next: Arc<dyn PipeProcessor>,
    rows_seen: AtomicU64,
}

impl SkipProcessor {
    /// Build the stage.
    pub fn new(sp: SkipPipe, ctx: &PipeContext, next: Arc<dyn PipeProcessor>) -> Self {
        Self {
            sp,
            cancel: ctx.cancel.clone(),
            metrics: ctx.metrics.clone(),
            next,
            rows_seen: AtomicU64::new(0),
        }
    }
}

impl PipeProcessor for SkipProcessor {
    fn write_block(&self, worker_id: usize, block: &BlockResult) {
        let n_rows = block.n_rows() as u64;
        self.metrics.record_stage_block("skip", n_rows);

        let seen = self.rows_seen.fetch_add(n_rows, Ordering::AcqRel) + n_rows;
        if seen <= self.sp.n {
            // Still inside the skipped prefix.
            return;
        }

        let before = seen - n_rows;
        if before >= self.sp.n {
            // Fast path - the prefix was consumed by earlier blocks.
            self.next.write_block(worker_id, block);
            return;
        }

        let drop_rows = (self.sp.n - before) as usize;
        let trimmed = block.slice_rows(drop_rows, block.n_rows());
        self.next.write_block(worker_id, &trimmed);
    }

    fn flush(&self) {
        self.cancel.fire();
        self.next.flush();
    }
}
