//! Pipeline assembly and the worker fan-out loop.

use std::sync::Arc;
use std::thread;

use loq_query::Pipe;
use parking_lot::Mutex;
use tracing::debug;

use crate::block::Block;
use crate::block_result::BlockResult;
use crate::context::PipeContext;
use crate::fields::FieldsProcessor;
use crate::head::HeadProcessor;
use crate::processor::PipeProcessor;
use crate::skip::SkipProcessor;
use crate::stats::StatsProcessor;

/// Terminal sink that accumulates every block it receives, decoded to the
/// public boundary shape.
#[derive(Default)]
pub struct Collector {
    blocks: Mutex<Vec<Block>>,
}

impl Collector {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the collected blocks.
    pub fn take_blocks(&self) -> Vec<Block> {
        std::mem::take(&mut *self.blocks.lock())
    }
}

impl PipeProcessor for Collector {
    fn write_block(&self, _worker_id: usize, block: &BlockResult) {
        self.blocks.lock().push(block.to_block());
    }

    fn flush(&self) {}
}

/// Chain stage processors for `pipes` bottom-up onto `sink`, returning the
/// head of the chain.
pub fn build_pipeline(
    pipes: &[Pipe],
    ctx: &PipeContext,
    sink: Arc<dyn PipeProcessor>,
) -> Arc<dyn PipeProcessor> {
    let mut next = sink;
    for pipe in pipes.iter().rev() {
        next = match pipe {
            Pipe::Fields(fp) => Arc::new(FieldsProcessor::new(fp.clone(), ctx, next)),
            Pipe::Stats(sp) => Arc::new(StatsProcessor::new(sp.clone(), ctx, next)),
            Pipe::Head(hp) => Arc::new(HeadProcessor::new(hp.clone(), ctx, next)),
            Pipe::Skip(sp) => Arc::new(SkipProcessor::new(sp.clone(), ctx, next)),
        };
    }
    next
}

/// Stream `input` through the pipeline with `ctx.workers` writer threads,
/// then flush the chain in order.
///
/// Blocks travel through a bounded channel: a slow pipeline blocks the source
/// rather than buffering without limit. Each worker owns a fixed worker id
/// and stops pulling as soon as the stop or cancel signal fires; the source
/// likewise stops feeding, so cancellation drains promptly.
pub fn run_pipeline(
    head: &Arc<dyn PipeProcessor>,
    ctx: &PipeContext,
    channel_blocks: usize,
    input: Vec<BlockResult>,
) {
    debug!(
        workers = ctx.workers,
        blocks = input.len(),
        "starting pipeline run"
    );

    let (tx, rx) = crossbeam_channel::bounded::<BlockResult>(channel_blocks.max(1));
    thread::scope(|scope| {
        for worker_id in 0..ctx.workers {
            let rx = rx.clone();
            let head = Arc::clone(head);
            let stop = ctx.stop.clone();
            let cancel = ctx.cancel.clone();
            scope.spawn(move || {
                for block in rx {
                    if stop.is_fired() || cancel.is_fired() {
                        break;
                    }
                    head.write_block(worker_id, &block);
                }
            });
        }
        drop(rx);

        for block in input {
            if ctx.stop.is_fired() || ctx.cancel.is_fired() {
                break;
            }
            if tx.send(block).is_err() {
                break;
            }
        }
        drop(tx);
    });

    // All writers have returned; flush cascades down the chain exactly once.
    head.flush();
    debug!("pipeline run complete");
}
