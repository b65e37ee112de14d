//! Shared helpers for engine integration tests.

use std::collections::BTreeMap;

use loq_client::QueryResult;
use loq_pipeline::{Block, BlockResult};

/// Build one input block from per-row `(field, value)` lists.
pub fn block_of(rows: &[&[(&str, &str)]]) -> BlockResult {
    BlockResult::from_block(&Block::from_rows(rows))
}

/// Flatten a query result to sorted rows for order-insensitive assertions.
pub fn sorted_rows(result: &QueryResult) -> Vec<BTreeMap<String, String>> {
    let mut rows: Vec<BTreeMap<String, String>> = result
        .rows()
        .into_iter()
        .map(|row| row.into_iter().collect())
        .collect();
    rows.sort();
    rows
}

/// Shorthand for a single expected row.
pub fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
