//! Pipe chains and representation-aware inputs through the engine.

use std::net::Ipv4Addr;

use loq_client::Engine;
use loq_common::EngineConfig;
use loq_pipeline::{BlockResult, Column};

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
fn head_truncates_total_output_rows() {
    let input = vec![
        block_of(&[&[("a", "r0")], &[("a", "r1")]]),
        block_of(&[&[("a", "r2")], &[("a", "r3")]]),
        block_of(&[&[("a", "r4")]]),
    ];
    let result = engine(1).run_query("head 3", input).expect("query");
    assert_eq!(result.rows().len(), 3);
}

#[test]
fn skip_drops_the_leading_rows() {
    let input = vec![
        block_of(&[&[("a", "r0")], &[("a", "r1")]]),
        block_of(&[&[("a", "r2")], &[("a", "r3")]]),
    ];
    let result = engine(1).run_query("skip 3", input).expect("query");
    assert_eq!(result.rows().len(), 1);
}

#[test]
fn fields_then_stats_chains() {
    let input = vec![block_of(&[
        &[("host", "web-1"), ("msg", "a")],
        &[("host", "web-2"), ("msg", "b")],
        &[("host", "web-1"), ("msg", "c")],
    ])];
    let result = engine(2)
        .run_query("fields host | stats by (host) count(*)", input)
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![
            row(&[("host", "web-1"), ("count", "2")]),
            row(&[("host", "web-2"), ("count", "1")]),
        ]
    );
}

#[test]
fn stats_then_head_limits_group_rows() {
    let input = vec![block_of(&[
        &[("k", "a")],
        &[("k", "b")],
        &[("k", "c")],
        &[("k", "d")],
    ])];
    let result = engine(1)
        .run_query("stats by (k) count(*) | head 2", input)
        .expect("query");
    assert_eq!(result.rows().len(), 2);
}

#[test]
fn stats_over_const_time_and_dict_columns() {
    // A reader-shaped block: const host, synthetic time, dict level, plain
    // numeric bytes.
    let input = vec![BlockResult::new(
        vec![100, 100, 200, 300],
        vec![
            Column::const_str("host", "web-1"),
            Column::time("_time"),
            Column::dict(
                "level",
                vec![String::new(), "info".to_string(), "warn".to_string()],
                vec![1, 2, 1, 0],
            ),
            Column::u64s("bytes", &[10, 10, 20, 30]),
        ],
    )];

    let engine = engine(1);
    let result = engine
        .run_query(
            "stats uniq(host) as hosts, uniq(_time) as times, \
             uniq(level) as levels, count(level) as leveled, count(bytes) as sized",
            input,
        )
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![row(&[
            ("hosts", "1"),
            ("times", "3"),
            ("levels", "2"),
            ("leveled", "3"),
            ("sized", "4"),
        ])]
    );
}

#[test]
fn grouping_by_dict_column_uses_decoded_values() {
    let input = vec![BlockResult::new(
        vec![0, 1, 2],
        vec![
            Column::dict(
                "level",
                vec!["info".to_string(), "warn".to_string()],
                vec![0, 1, 0],
            ),
            Column::ipv4s(
                "ip",
                &[
                    Ipv4Addr::new(10, 0, 0, 1),
                    Ipv4Addr::new(10, 0, 0, 2),
                    Ipv4Addr::new(10, 0, 0, 1),
                ],
            ),
        ],
    )];
    let result = engine(2)
        .run_query("stats by (level) uniq(ip) as ips", input)
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![
            row(&[("level", "info"), ("ips", "1")]),
            row(&[("level", "warn"), ("ips", "1")]),
        ]
    );
}

#[test]
fn uniq_of_ipv4_column_renders_through_grouping() {
    // The same ip value in plain string form and ipv4 form lands in the same
    // group when used as a by-field, because grouping decodes to text.
    let string_block = block_of(&[&[("ip", "10.0.0.1")]]);
    let ipv4_block = BlockResult::new(
        vec![0],
        vec![Column::ipv4s("ip", &[Ipv4Addr::new(10, 0, 0, 1)])],
    );
    let result = engine(1)
        .run_query("stats by (ip) count(*)", vec![string_block, ipv4_block])
        .expect("query");
    assert_eq!(
        sorted_rows(&result),
        vec![row(&[("ip", "10.0.0.1"), ("count", "2")])]
    );
}
