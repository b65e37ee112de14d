use std::sync::Arc;

use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Engine-level metrics registry.
///
/// Cloning is cheap; all clones share the same underlying registry.
#[derive(Clone, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    registry: Registry,
    queries_total: IntCounter,
    queries_failed_total: IntCounter,
    query_rows_in: Counter,
    query_blocks_in: Counter,
    query_rows_out: Counter,
    query_time_seconds: Histogram,
    stage_blocks_in: IntCounterVec,
    stage_rows_in: IntCounterVec,
}

impl MetricsRegistry {
    /// Create a registry with all metric families registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::new()),
        }
    }

    /// Record one completed query run.
    pub fn record_query(&self, rows_in: u64, blocks_in: u64, rows_out: u64, secs: f64) {
        self.inner.queries_total.inc();
        self.inner.query_rows_in.inc_by(rows_in as f64);
        self.inner.query_blocks_in.inc_by(blocks_in as f64);
        self.inner.query_rows_out.inc_by(rows_out as f64);
        self.inner.query_time_seconds.observe(secs.max(0.0));
    }

    /// Record one failed query run.
    pub fn record_query_failure(&self) {
        self.inner.queries_failed_total.inc();
    }

    /// Record a block arriving at a named pipeline stage.
    pub fn record_stage_block(&self, stage: &str, rows: u64) {
        self.inner.stage_blocks_in.with_label_values(&[stage]).inc();
        self.inner
            .stage_rows_in
            .with_label_values(&[stage])
            .inc_by(rows);
    }

    /// Render all registered metric families in Prometheus text exposition
    /// format.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let metric_families = self.inner.registry.gather();
        let mut out = Vec::new();
        let enc = TextEncoder::new();
        if enc.encode(&metric_families, &mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsInner {
    fn new() -> Self {
        let registry = Registry::new();

        let queries_total = int_counter(&registry, "loq_queries_total", "Queries executed");
        let queries_failed_total = int_counter(
            &registry,
            "loq_queries_failed_total",
            "Queries that returned an error",
        );
        let query_rows_in = counter(
            &registry,
            "loq_query_rows_in_total",
            "Input rows fed into query pipelines",
        );
        let query_blocks_in = counter(
            &registry,
            "loq_query_blocks_in_total",
            "Input blocks fed into query pipelines",
        );
        let query_rows_out = counter(
            &registry,
            "loq_query_rows_out_total",
            "Output rows produced by query pipelines",
        );
        let query_time_seconds = histogram(
            &registry,
            "loq_query_time_seconds",
            "Wall-clock time per query run",
        );
        let stage_blocks_in = int_counter_vec(
            &registry,
            "loq_stage_blocks_in_total",
            "Blocks written into each pipeline stage",
            &["stage"],
        );
        let stage_rows_in = int_counter_vec(
            &registry,
            "loq_stage_rows_in_total",
            "Rows written into each pipeline stage",
            &["stage"],
        );

        Self {
            registry,
            queries_total,
            queries_failed_total,
            query_rows_in,
            query_blocks_in,
            query_rows_out,
            query_time_seconds,
            stage_blocks_in,
            stage_rows_in,
        }
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> Counter {
    let c = Counter::with_opts(Opts::new(name, help)).expect("counter");
    registry
        .register(Box::new(c.clone()))
        .expect("register counter");
    c
}

fn int_counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let c = IntCounter::with_opts(Opts::new(name, help)).expect("int counter");
    registry
        .register(Box::new(c.clone()))
        .expect("register int counter");
    c
}

fn int_counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let c = IntCounterVec::new(Opts::new(name, help), labels).expect("int counter vec");
    registry
        .register(Box::new(c.clone()))
        .expect("register int counter vec");
    c
}

fn histogram(registry: &Registry, name: &str, help: &str) -> Histogram {
    let h = Histogram::with_opts(HistogramOpts::new(name, help)).expect("histogram");
    registry
        .register(Box::new(h.clone()))
        .expect("register histogram");
    h
}
