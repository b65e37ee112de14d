use serde::{Deserialize, Serialize};

/// Global engine/session configuration shared across parser/runtime layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of worker threads writing blocks into the pipeline. Each worker
    /// owns a fixed worker id in `0..workers` for the lifetime of a query.
    pub workers: usize,

    /// Hard per-query budget for aggregation state, in bytes. Crossing it
    /// cancels the query. `usize::MAX` disables the budget.
    pub mem_budget_bytes: usize,

    /// Capacity of the bounded source channel feeding worker threads. A full
    /// channel blocks the source, which is how back-pressure propagates.
    #[serde(default = "default_source_channel_blocks")]
    pub source_channel_blocks: usize,
}

fn default_source_channel_blocks() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            mem_budget_bytes: 512 * 1024 * 1024, // 512MB
            source_channel_blocks: default_source_channel_blocks(),
        }
    }
}
