//! The `stats` stage: per-worker sharded partial aggregation with a
//! merge-and-emit flush.

use std::sync::Arc;

use crossbeam_utils::CachePadded;
use hashbrown::hash_map::{Entry, EntryRef};
use hashbrown::HashMap;
use loq_common::{MemoryTracker, MetricsRegistry};
use loq_query::{StatsFunc, StatsPipe};
use parking_lot::Mutex;
use tracing::debug;

use crate::block_result::{BlockResult, Column};
use crate::context::PipeContext;
use crate::encoding::{marshal_bytes, unmarshal_bytes};
use crate::processor::{PipeProcessor, Signal};
use crate::stats_count::CountState;
use crate::stats_uniq::UniqState;

/// Per-group accumulator, one variant per stats function. Dispatch is a
/// match: the function set is closed.
#[derive(Debug)]
pub enum StatsState {
    /// Accumulator for `count(...)`.
    Count(CountState),
    /// Accumulator for `uniq(...)`.
    Uniq(UniqState),
}

impl StatsState {
    /// Fresh state for one group of `func`.
    pub fn new(func: &StatsFunc) -> Self {
        match func {
            StatsFunc::Count(_) => StatsState::Count(CountState::default()),
            StatsFunc::Uniq(_) => StatsState::Uniq(UniqState::default()),
        }
    }

    /// Fold every row of the block; returns the state-size increase in bytes.
    pub fn update_all(&mut self, func: &StatsFunc, br: &BlockResult) -> usize {
        match (self, func) {
            (StatsState::Count(st), StatsFunc::Count(sc)) => st.update_all(sc, br),
            (StatsState::Uniq(st), StatsFunc::Uniq(su)) => st.update_all(su, br),
            _ => panic!("BUG: stats state does not match its function variant"),
        }
    }

    /// Fold one row of the block; returns the state-size increase in bytes.
    pub fn update_row(&mut self, func: &StatsFunc, br: &BlockResult, row: usize) -> usize {
        match (self, func) {
            (StatsState::Count(st), StatsFunc::Count(sc)) => st.update_row(sc, br, row),
            (StatsState::Uniq(st), StatsFunc::Uniq(su)) => st.update_row(su, br, row),
            _ => panic!("BUG: stats state does not match its function variant"),
        }
    }

    /// Absorb another state of the same variant.
    pub fn merge(&mut self, other: StatsState) {
        match (self, other) {
            (StatsState::Count(dst), StatsState::Count(src)) => dst.merge(src),
            (StatsState::Uniq(dst), StatsState::Uniq(src)) => dst.merge(src),
            _ => panic!("BUG: cannot merge stats states of different variants"),
        }
    }

    /// Render the aggregate as a decimal string.
    pub fn finalize(&self) -> String {
        match self {
            StatsState::Count(st) => st.finalize(),
            StatsState::Uniq(st) => st.finalize(),
        }
    }
}

/// One accumulator bucket: a state per configured function, in `funcs` order.
#[derive(Debug)]
struct StatsGroup {
    states: Vec<StatsState>,
}

impl StatsGroup {
    fn new(funcs: &[StatsFunc]) -> Self {
        Self {
            states: funcs.iter().map(StatsState::new).collect(),
        }
    }

    /// Approximate heap cost of a fresh group stored under `key_len` bytes.
    fn entry_size(funcs: &[StatsFunc], key_len: usize) -> usize {
        key_len
            + std::mem::size_of::<Vec<u8>>()
            + std::mem::size_of::<StatsGroup>()
            + funcs.len() * std::mem::size_of::<StatsState>()
    }
}

/// Worker-local aggregation state. One writer mutates it during the write
/// phase; the flush thread owns it afterwards.
#[derive(Debug, Default)]
struct StatsShard {
    groups: HashMap<Vec<u8>, StatsGroup>,
    key_buf: Vec<u8>,
    column_idxs: Vec<Option<usize>>,
}

/// The `stats` stage processor.
///
/// Rows land in the shard of the calling worker, so the same group key may
/// exist in several shards; `flush` reconciles them into shard 0, emits one
/// single-row block per group, then cancels upstream and flushes downstream.
pub struct StatsProcessor {
    sp: StatsPipe,
    stop: Signal,
    cancel: Signal,
    tracker: Arc<MemoryTracker>,
    metrics: MetricsRegistry,
    next: Arc<dyn PipeProcessor>,
    shards: Vec<CachePadded<Mutex<StatsShard>>>,
}

impl StatsProcessor {
    /// Build the stage with one shard per worker.
    pub fn new(sp: StatsPipe, ctx: &PipeContext, next: Arc<dyn PipeProcessor>) -> Self {
        let shards = (0..ctx.workers)
            .map(|_| CachePadded::new(Mutex::new(StatsShard::default())))
            .collect();
        Self {
            sp,
            stop: ctx.stop.clone(),
            cancel: ctx.cancel.clone(),
            tracker: ctx.tracker.clone(),
            metrics: ctx.metrics.clone(),
            next,
            shards,
        }
    }

    fn flush_inner(&self) {
        // Merge states across shards into shard 0. The maps may be large;
        // poll the stop signal every iteration instead of burning CPU on a
        // dead query. The merge need not be atomic on early return: the
        // downstream has been signalled too.
        let mut target = self.shards[0].lock();
        for shard in &self.shards[1..] {
            let groups = std::mem::take(&mut shard.lock().groups);
            for (key, group) in groups {
                if self.stop.is_fired() {
                    return;
                }
                match target.groups.entry(key) {
                    Entry::Occupied(e) => {
                        let dst = e.into_mut();
                        for (d, s) in dst.states.iter_mut().zip(group.states) {
                            d.merge(s);
                        }
                    }
                    Entry::Vacant(v) => {
                        v.insert(group);
                    }
                }
            }
        }

        if self.sp.by_fields.is_empty() && target.groups.is_empty() {
            // Zero matching rows: `count()` still emits a single zero row.
            target
                .groups
                .insert(Vec::new(), StatsGroup::new(&self.sp.funcs));
        }

        let mut values: Vec<String> = Vec::new();
        for (key, group) in &target.groups {
            if self.stop.is_fired() {
                return;
            }

            // Decode the by-field values back out of the group key.
            values.clear();
            let mut buf = key.as_slice();
            while !buf.is_empty() {
                let Some((tail, v)) = unmarshal_bytes(buf) else {
                    panic!("BUG: cannot unmarshal value from group key {key:?}");
                };
                values.push(String::from_utf8_lossy(v).into_owned());
                buf = tail;
            }
            if values.len() != self.sp.by_fields.len() {
                panic!(
                    "BUG: unexpected number of values decoded from group key; got {}; want {}",
                    values.len(),
                    self.sp.by_fields.len()
                );
            }

            let mut columns = Vec::with_capacity(self.sp.by_fields.len() + self.sp.funcs.len());
            for (field, value) in self.sp.by_fields.iter().zip(values.iter()) {
                columns.push(Column::strings(field.clone(), vec![value.clone()]));
            }
            for (func, state) in self.sp.funcs.iter().zip(group.states.iter()) {
                columns.push(Column::strings(
                    func.result_name().to_string(),
                    vec![state.finalize()],
                ));
            }

            // Stats output has no natural timestamp.
            let out = BlockResult::new(vec![0], columns);
            self.next.write_block(0, &out);
        }
        debug!(groups = target.groups.len(), "stats flush complete");
    }
}

impl PipeProcessor for StatsProcessor {
    fn write_block(&self, worker_id: usize, block: &BlockResult) {
        self.metrics
            .record_stage_block("stats", block.n_rows() as u64);

        let mut grown = 0;
        {
            let mut shard = self.shards[worker_id].lock();
            let StatsShard {
                groups,
                key_buf,
                column_idxs,
            } = &mut *shard;

            if self.sp.by_fields.is_empty() {
                // Fast path - all rows feed a single group under the empty key.
                let empty_key: &[u8] = &[];
                let group = match groups.entry_ref(empty_key) {
                    EntryRef::Occupied(e) => e.into_mut(),
                    EntryRef::Vacant(e) => {
                        grown += StatsGroup::entry_size(&self.sp.funcs, 0);
                        e.insert(StatsGroup::new(&self.sp.funcs))
                    }
                };
                for (func, state) in self.sp.funcs.iter().zip(group.states.iter_mut()) {
                    grown += state.update_all(func, block);
                }
            } else {
                // Slow path - group per row. Column indexes are resolved once
                // per block to keep the per-row loop free of name lookups.
                column_idxs.clear();
                column_idxs.extend(self.sp.by_fields.iter().map(|f| block.column_index(f)));

                for row in 0..block.n_rows() {
                    key_buf.clear();
                    for idx in column_idxs.iter() {
                        let v = idx.map_or("", |j| block.columns()[j].value_at_row(block, row));
                        marshal_bytes(key_buf, v.as_bytes());
                    }

                    let group = match groups.entry_ref(key_buf.as_slice()) {
                        EntryRef::Occupied(e) => e.into_mut(),
                        EntryRef::Vacant(e) => {
                            grown += StatsGroup::entry_size(&self.sp.funcs, key_buf.len());
                            e.insert(StatsGroup::new(&self.sp.funcs))
                        }
                    };
                    for (func, state) in self.sp.funcs.iter().zip(group.states.iter_mut()) {
                        grown += state.update_row(func, block, row);
                    }
                }
            }
        }

        if grown > 0 && !self.tracker.grow(grown) {
            // Budget crossed: kill the query rather than keep accumulating.
            debug!(
                used = self.tracker.used_bytes(),
                budget = self.tracker.budget_bytes(),
                "stats state exceeded the memory budget; cancelling"
            );
            self.stop.fire();
            self.cancel.fire();
        }
    }

    fn flush(&self) {
        self.flush_inner();
        self.cancel.fire();
        self.next.flush();
    }
}
