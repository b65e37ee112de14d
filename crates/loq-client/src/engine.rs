//! The embedded query engine.

use std::sync::Arc;
use std::time::Instant;

use loq_common::{EngineConfig, LoqError, MemoryTracker, MetricsRegistry, Result};
use loq_pipeline::{build_pipeline, run_pipeline, Block, BlockResult, Collector, PipeContext};
use loq_query::{parse_pipes, Pipe};
use tracing::{debug, info_span};

/// Executes query pipelines over caller-provided blocks.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    metrics: MetricsRegistry,
}

impl Engine {
    /// Create an engine. Worker count and channel capacity must be non-zero.
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(LoqError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if config.source_channel_blocks == 0 {
            return Err(LoqError::InvalidConfig(
                "source channel capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            config,
            metrics: MetricsRegistry::new(),
        })
    }

    /// Parse `query`, build its stage chain, stream `input` through it with
    /// the configured worker count, and collect the output rows.
    ///
    /// Output ordering is unspecified. A crossed memory budget yields
    /// [`LoqError::ResourceExhausted`] with no partial results.
    pub fn run_query(&self, query: &str, input: Vec<BlockResult>) -> Result<QueryResult> {
        let pipes = parse_pipes(query)?;

        let tracker = MemoryTracker::new(self.config.mem_budget_bytes);
        let ctx = PipeContext::new(self.config.workers, tracker.clone(), self.metrics.clone());
        let collector = Arc::new(Collector::new());
        let head = build_pipeline(&pipes, &ctx, collector.clone());

        let span = info_span!("query", workers = self.config.workers);
        let _guard = span.enter();
        if let Some(Pipe::Stats(sp)) = pipes.first() {
            debug!(fields = ?sp.needed_fields(), "stats stage source fields");
        }

        let rows_in: u64 = input.iter().map(|b| b.n_rows() as u64).sum();
        let blocks_in = input.len() as u64;
        let started = Instant::now();

        run_pipeline(&head, &ctx, self.config.source_channel_blocks, input);

        if tracker.is_exceeded() {
            self.metrics.record_query_failure();
            return Err(LoqError::ResourceExhausted(format!(
                "aggregation state reached {} bytes; budget is {}",
                tracker.used_bytes(),
                tracker.budget_bytes()
            )));
        }

        let blocks = collector.take_blocks();
        let rows_out: u64 = blocks.iter().map(|b| b.n_rows() as u64).sum();
        self.metrics
            .record_query(rows_in, blocks_in, rows_out, started.elapsed().as_secs_f64());

        Ok(QueryResult { blocks })
    }

    /// All engine metrics in Prometheus text exposition format.
    pub fn prometheus_metrics(&self) -> String {
        self.metrics.render_prometheus()
    }
}

/// Output of one query run.
#[derive(Debug)]
pub struct QueryResult {
    /// Collected output blocks in arrival order.
    pub blocks: Vec<Block>,
}

impl QueryResult {
    /// All output rows flattened to `(column, value)` pairs in column order.
    pub fn rows(&self) -> Vec<Vec<(String, String)>> {
        self.blocks.iter().flat_map(Block::rows).collect()
    }
}
