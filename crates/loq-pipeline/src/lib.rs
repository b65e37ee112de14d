//! Columnar block model and streaming stage processors for loq queries.
//!
//! Blocks flow through a chain of stage processors; each worker thread calls
//! [`PipeProcessor::write_block`] with its fixed worker id, and the runtime
//! calls [`PipeProcessor::flush`] once after all writers have returned. The
//! `stats` stage aggregates into worker-local shards and reconciles them at
//! flush time.

pub mod bitmap;
pub mod block;
pub mod block_result;
pub mod context;
pub mod encoding;
pub mod fields;
pub mod head;
pub mod processor;
pub mod runtime;
pub mod skip;
pub mod stats;
pub mod stats_count;
pub mod stats_uniq;

// Re-export only what you want at the crate root (no globs).
pub use block::{Block, BlockColumn};
pub use block_result::{BlockResult, Column, ValueType};
pub use context::PipeContext;
pub use processor::{PipeProcessor, Signal};
pub use runtime::{build_pipeline, run_pipeline, Collector};
