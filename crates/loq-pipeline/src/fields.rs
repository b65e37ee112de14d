//! The `fields` stage: column projection.

use std::sync::Arc;

use loq_common::MetricsRegistry;
use loq_query::FieldsPipe;

use crate::block_result::{BlockResult, Column};
use crate::context::PipeContext;
use crate::processor::{PipeProcessor, Signal};

/// Projects each block down to the named columns, preserving their physical
/// representation. Missing columns project as const-empty.
pub struct FieldsProcessor {
    fp: FieldsPipe,
    cancel: Signal,
    metrics: MetricsRegistry,
    next: Arc<dyn PipeProcessor>,
}

impl FieldsProcessor {
    /// Build the stage.
    pub fn new(fp: FieldsPipe, ctx: &PipeContext, next: Arc<dyn PipeProcessor>) -> Self {
        Self {
            fp,
            cancel: ctx.cancel.clone(),
            metrics: ctx.metrics.clone(),
            next,
        }
    }

    fn is_passthrough(&self, block: &BlockResult) -> bool {
        if self.fp.fields.iter().any(|f| f == "*") {
            return true;
        }
        block.columns().len() == self.fp.fields.len()
            && block
                .columns()
                .iter()
                .zip(self.fp.fields.iter())
                .all(|(c, f)| c.name() == f)
    }
}

impl PipeProcessor for FieldsProcessor {
    fn write_block(&self, worker_id: usize, block: &BlockResult) {
        self.metrics
            .record_stage_block("fields", block.n_rows() as u64);

        if self.is_passthrough(block) {
            // Fast path - the block already has exactly the requested shape.
            self.next.write_block(worker_id, block);
            return;
        }

        let columns = self
            .fp
            .fields
            .iter()
            .map(|f| match block.column_index(f) {
                Some(i) => block.columns()[i].clone(),
                None => Column::const_str(f.clone(), ""),
            })
            .collect();
        let projected = BlockResult::new(block.timestamps().to_vec(), columns);
        self.next.write_block(worker_id, &projected);
    }

    fn flush(&self) {
        self.cancel.fire();
        self.next.flush();
    }
}
