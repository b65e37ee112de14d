//! End-to-end stats scenarios through the embedded engine.

use loq_client::Engine;
use loq_common::EngineConfig;

#[path = "support/mod.rs"]
mod support;

use support::{block_of, row, sorted_rows};

fn engine(workers: usize) -> Engine {
    let config = EngineConfig {
        workers,
        ..EngineConfig::default()
    };
    Engine::new(config).expect("engine")
}

#[test]
fn count_star_counts_all_rows() {
    let input = vec![block_of(&[&[("a", "x")], &[("a", "y")], &[]])];
    let result = engine(2).run_query("stats count(*)", input).expect("query");
    assert_eq!(sorted_rows(&result), vec![row(&[("count", "3")])]);
}

#[test]
fn count_field_skips_empty_and_missing_values() {
    let input = vec![block_of(&[&[("a", "x")], &[("a", "")], &[("b", "y")]])];
    let result = engine(2).run_query("stats count(a)", input).expect("query");
    assert_eq!(sorted_rows(&result), vec![row(&[("count", "1")])]);
}

#[test]
fn count_star_grouped_by_field() {
    let input = vec![block_of(&[
        &[("a", "x")],
        &[("a", "x")],
        &[("a", "y")],
        &[("a", "")],
    ])];
    let result = engine(2)
        .run_query("stats by (a) count(*)", input)
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![
            row(&[("a", ""), ("count", "1")]),
            row(&[("a", "x"), ("count", "2")]),
            row(&[("a", "y"), ("count", "1")]),
        ]
    );
}

#[test]
fn uniq_field_skips_empty_values() {
    let input = vec![block_of(&[
        &[("a", "x")],
        &[("a", "x")],
        &[("a", "y")],
        &[("a", "")],
    ])];
    let result = engine(2).run_query("stats uniq(a)", input).expect("query");
    assert_eq!(sorted_rows(&result), vec![row(&[("uniq", "2")])]);
}

#[test]
fn uniq_star_dedups_whole_rows_and_skips_empty_rows() {
    let input = vec![block_of(&[
        &[("a", "x"), ("b", "1")],
        &[("a", "x"), ("b", "1")],
        &[("a", "x"), ("b", "2")],
        &[],
    ])];
    let result = engine(2).run_query("stats uniq(*)", input).expect("query");
    assert_eq!(sorted_rows(&result), vec![row(&[("uniq", "2")])]);
}

#[test]
fn grouped_uniq_and_count_evaluate_per_group() {
    let input = vec![block_of(&[
        &[("a", "1"), ("b", "p"), ("c", "x")],
        &[("a", "1"), ("b", "p"), ("c", "")],
        &[("a", "1"), ("b", "q"), ("c", "x")],
        &[("a", "2"), ("b", "p"), ("c", "")],
    ])];
    let result = engine(2)
        .run_query("stats by (a) uniq(b), count(c)", input)
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![
            row(&[("a", "1"), ("uniq", "2"), ("count", "2")]),
            row(&[("a", "2"), ("uniq", "1"), ("count", "0")]),
        ]
    );
}

#[test]
fn empty_input_with_by_fields_emits_no_rows() {
    let result = engine(2)
        .run_query("stats by (a) count(*)", Vec::new())
        .expect("query");
    assert!(sorted_rows(&result).is_empty());
}

#[test]
fn empty_input_without_by_fields_emits_a_zero_row() {
    let result = engine(2)
        .run_query("stats count(*)", Vec::new())
        .expect("query");
    assert_eq!(sorted_rows(&result), vec![row(&[("count", "0")])]);
}

#[test]
fn uniq_over_all_empty_rows_is_zero() {
    let input = vec![block_of(&[&[("a", "")], &[("a", "")]])];
    let result = engine(2).run_query("stats uniq(a)", input).expect("query");
    assert_eq!(sorted_rows(&result), vec![row(&[("uniq", "0")])]);
}

#[test]
fn as_name_renames_result_columns() {
    let input = vec![block_of(&[&[("a", "x")], &[("a", "y")]])];
    let result = engine(2)
        .run_query("stats count(*) as hits, uniq(a) as distinct_a", input)
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![row(&[("hits", "2"), ("distinct_a", "2")])]
    );
}

#[test]
fn multiple_input_blocks_aggregate_together() {
    let input = vec![
        block_of(&[&[("k", "p")], &[("k", "q")]]),
        block_of(&[&[("k", "p")]]),
        block_of(&[&[("k", "r")], &[("k", "p")]]),
    ];
    let result = engine(3)
        .run_query("stats by (k) count(*)", input)
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![
            row(&[("k", "p"), ("count", "3")]),
            row(&[("k", "q"), ("count", "1")]),
            row(&[("k", "r"), ("count", "1")]),
        ]
    );
}

#[test]
fn worker_count_does_not_change_results() {
    let input_rows: Vec<Vec<(&str, &str)>> = (0..50)
        .map(|i| {
            vec![
                ("k", ["p", "q", "r", "s"][i % 4]),
                ("v", ["1", "2", "3"][i % 3]),
            ]
        })
        .collect();

    let mut results = Vec::new();
    for workers in [1, 4] {
        let input: Vec<_> = input_rows
            .chunks(7)
            .map(|chunk| {
                let rows: Vec<&[(&str, &str)]> = chunk.iter().map(Vec::as_slice).collect();
                block_of(&rows)
            })
            .collect();
        let result = engine(workers)
            .run_query("stats by (k) count(*) as hits, uniq(v) as vs", input)
            .expect("query");
        results.push(sorted_rows(&result));
    }
    assert_eq!(results[0], results[1]);
}
