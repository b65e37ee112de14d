//! Per-group accumulator for `uniq(...)`.

use hashbrown::HashSet;
use loq_query::StatsUniq;

use crate::block_result::{BlockResult, ColumnData, ValueType};
use crate::encoding::{marshal_bytes, marshal_i64};

/// Key-header tag for values originating from the time column.
const KEY_TAG_TIME: u8 = 1;
/// Key-header tag for values carrying an explicit value type.
const KEY_TAG_TYPED: u8 = 0;

/// Approximate per-entry bookkeeping cost of the key set, on top of the key
/// bytes themselves.
const ENTRY_OVERHEAD: usize = std::mem::size_of::<Vec<u8>>();

/// Exact distinct-value counter over the named fields.
///
/// The state is a set of canonical byte keys. Single-column fast paths prefix
/// each key with `[1]` (time) or `[0, value_type]` so values from different
/// physical representations cannot collide even when their decoded text
/// matches. Multi-column paths decode to text, which is what keeps keys
/// consistent across blocks with different physical types for the same field.
#[derive(Debug, Default)]
pub struct UniqState {
    set: HashSet<Vec<u8>>,
    key_buf: Vec<u8>,
}

impl UniqState {
    /// Fold every row of the block. Returns the approximate state-size
    /// increase in bytes.
    pub fn update_all(&mut self, su: &StatsUniq, br: &BlockResult) -> usize {
        let mut grown = 0;

        if su.contains_star {
            // Count unique rows across all columns. Column names go into the
            // key: blocks may carry different column sets under `*`.
            let columns = br.columns();
            for i in 0..br.n_rows() {
                let seen = i > 0
                    && columns
                        .iter()
                        .all(|c| c.values(br)[i - 1] == c.values(br)[i]);
                if seen {
                    continue;
                }

                let mut all_empty = true;
                self.key_buf.clear();
                for c in columns {
                    let v = c.value_at_row(br, i);
                    if !v.is_empty() {
                        all_empty = false;
                    }
                    marshal_bytes(&mut self.key_buf, c.name().as_bytes());
                    marshal_bytes(&mut self.key_buf, v.as_bytes());
                }
                if all_empty {
                    continue;
                }
                grown += insert_key(&mut self.set, &self.key_buf);
            }
            return grown;
        }

        if let [field] = su.fields.as_slice() {
            // Fast path for a single column, specialized by representation.
            match br.column_by_name(field).data() {
                ColumnData::Time => {
                    let timestamps = br.timestamps();
                    for (i, &ts) in timestamps.iter().enumerate() {
                        if i > 0 && timestamps[i - 1] == ts {
                            // Run of equal timestamps: one probe is enough.
                            continue;
                        }
                        self.key_buf.clear();
                        self.key_buf.push(KEY_TAG_TIME);
                        marshal_i64(&mut self.key_buf, ts);
                        grown += insert_key(&mut self.set, &self.key_buf);
                    }
                }
                ColumnData::Const { value } => {
                    if value.is_empty() {
                        // Do not count empty values.
                        return 0;
                    }
                    self.key_buf.clear();
                    self.key_buf
                        .extend_from_slice(&[KEY_TAG_TYPED, ValueType::String.tag()]);
                    self.key_buf.extend_from_slice(value.as_bytes());
                    grown += insert_key(&mut self.set, &self.key_buf);
                }
                ColumnData::Dict { dict_values, .. } => {
                    // Enumerate the dictionary instead of the rows: the
                    // producer guarantees every entry is referenced by some
                    // row in this block.
                    for (idx, v) in dict_values.iter().enumerate() {
                        if v.is_empty() {
                            continue;
                        }
                        self.key_buf.clear();
                        self.key_buf.extend_from_slice(&[
                            KEY_TAG_TYPED,
                            ValueType::Dict.tag(),
                            idx as u8,
                        ]);
                        grown += insert_key(&mut self.set, &self.key_buf);
                    }
                }
                ColumnData::Plain {
                    value_type,
                    encoded,
                } => {
                    let is_string = *value_type == ValueType::String;
                    for (i, v) in encoded.iter().enumerate() {
                        if is_string && v.is_empty() {
                            continue;
                        }
                        if i > 0 && encoded[i - 1] == *v {
                            continue;
                        }
                        self.key_buf.clear();
                        self.key_buf
                            .extend_from_slice(&[KEY_TAG_TYPED, value_type.tag()]);
                        self.key_buf.extend_from_slice(v);
                        grown += insert_key(&mut self.set, &self.key_buf);
                    }
                }
            }
            return grown;
        }

        // Slow path for multiple columns: decoded values, consecutive equal
        // rows collapsed.
        let column_values: Vec<&[String]> = su
            .fields
            .iter()
            .map(|f| br.column_by_name(f).values(br))
            .collect();

        for i in 0..br.n_rows() {
            let seen = i > 0 && column_values.iter().all(|vals| vals[i - 1] == vals[i]);
            if seen {
                continue;
            }

            let mut all_empty = true;
            self.key_buf.clear();
            for vals in &column_values {
                let v = &vals[i];
                if !v.is_empty() {
                    all_empty = false;
                }
                marshal_bytes(&mut self.key_buf, v.as_bytes());
            }
            if all_empty {
                continue;
            }
            grown += insert_key(&mut self.set, &self.key_buf);
        }
        grown
    }

    /// Fold the row at `row`. Returns the approximate state-size increase.
    pub fn update_row(&mut self, su: &StatsUniq, br: &BlockResult, row: usize) -> usize {
        if su.contains_star {
            let mut all_empty = true;
            self.key_buf.clear();
            for c in br.columns() {
                let v = c.value_at_row(br, row);
                if !v.is_empty() {
                    all_empty = false;
                }
                marshal_bytes(&mut self.key_buf, c.name().as_bytes());
                marshal_bytes(&mut self.key_buf, v.as_bytes());
            }
            if all_empty {
                return 0;
            }
            return insert_key(&mut self.set, &self.key_buf);
        }

        if let [field] = su.fields.as_slice() {
            match br.column_by_name(field).data() {
                ColumnData::Time => {
                    self.key_buf.clear();
                    self.key_buf.push(KEY_TAG_TIME);
                    marshal_i64(&mut self.key_buf, br.timestamps()[row]);
                    return insert_key(&mut self.set, &self.key_buf);
                }
                ColumnData::Const { value } => {
                    if value.is_empty() {
                        return 0;
                    }
                    self.key_buf.clear();
                    self.key_buf
                        .extend_from_slice(&[KEY_TAG_TYPED, ValueType::String.tag()]);
                    self.key_buf.extend_from_slice(value.as_bytes());
                    return insert_key(&mut self.set, &self.key_buf);
                }
                ColumnData::Dict {
                    dict_values,
                    indexes,
                } => {
                    let idx = indexes[row];
                    if dict_values[idx as usize].is_empty() {
                        return 0;
                    }
                    self.key_buf.clear();
                    self.key_buf
                        .extend_from_slice(&[KEY_TAG_TYPED, ValueType::Dict.tag(), idx]);
                    return insert_key(&mut self.set, &self.key_buf);
                }
                ColumnData::Plain {
                    value_type,
                    encoded,
                } => {
                    let v = &encoded[row];
                    if *value_type == ValueType::String && v.is_empty() {
                        return 0;
                    }
                    self.key_buf.clear();
                    self.key_buf
                        .extend_from_slice(&[KEY_TAG_TYPED, value_type.tag()]);
                    self.key_buf.extend_from_slice(v);
                    return insert_key(&mut self.set, &self.key_buf);
                }
            }
        }

        // Slow path for multiple columns.
        let mut all_empty = true;
        self.key_buf.clear();
        for field in &su.fields {
            let v = br.column_by_name(field).value_at_row(br, row);
            if !v.is_empty() {
                all_empty = false;
            }
            marshal_bytes(&mut self.key_buf, v.as_bytes());
        }
        if all_empty {
            return 0;
        }
        insert_key(&mut self.set, &self.key_buf)
    }

    /// Absorb another uniq state. Keys are byte-identical across states, so
    /// this folds the smaller set into the larger one.
    pub fn merge(&mut self, mut other: UniqState) {
        if self.set.len() < other.set.len() {
            std::mem::swap(&mut self.set, &mut other.set);
        }
        for key in other.set.drain() {
            self.set.insert(key);
        }
    }

    /// Render the cardinality as a decimal string.
    pub fn finalize(&self) -> String {
        self.set.len().to_string()
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> &HashSet<Vec<u8>> {
        &self.set
    }
}

/// Insert `key` if unseen, reporting the byte growth. Lookups borrow the
/// scratch buffer; only a genuinely new entry clones it.
fn insert_key(set: &mut HashSet<Vec<u8>>, key: &[u8]) -> usize {
    if set.contains(key) {
        return 0;
    }
    set.insert(key.to_vec());
    key.len() + ENTRY_OVERHEAD
}

#[cfg(test)]
mod tests {
    use loq_query::StatsUniq;

    use super::*;
    use crate::block_result::Column;

    fn uniq(fields: &[&str]) -> StatsUniq {
        StatsUniq {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            result_name: "uniq".to_string(),
            contains_star: fields.contains(&"*"),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn run_all(su: &StatsUniq, br: &BlockResult) -> u64 {
        let mut state = UniqState::default();
        state.update_all(su, br);
        state.finalize().parse().expect("decimal")
    }

    fn run_rows(su: &StatsUniq, br: &BlockResult) -> u64 {
        let mut state = UniqState::default();
        for row in 0..br.n_rows() {
            state.update_row(su, br, row);
        }
        state.finalize().parse().expect("decimal")
    }

    #[test]
    fn single_string_column_skips_empties_and_dedups() {
        let br = BlockResult::new(
            vec![0, 1, 2, 3],
            vec![Column::strings("a", strings(&["x", "x", "y", ""]))],
        );
        let su = uniq(&["a"]);
        assert_eq!(run_all(&su, &br), 2);
        assert_eq!(run_rows(&su, &br), 2);
    }

    #[test]
    fn run_collapse_does_not_lose_values() {
        // Interleaved runs: x x y y x. Collapse skips duplicates inside runs
        // but the set still ends at {x, y}.
        let br = BlockResult::new(
            vec![0, 1, 2, 3, 4],
            vec![Column::strings("a", strings(&["x", "x", "y", "y", "x"]))],
        );
        let su = uniq(&["a"]);
        assert_eq!(run_all(&su, &br), 2);
        assert_eq!(run_rows(&su, &br), 2);
    }

    #[test]
    fn time_column_counts_distinct_timestamps() {
        let br = BlockResult::new(vec![5, 5, 6, 7, 7], vec![Column::time("_time")]);
        let su = uniq(&["_time"]);
        assert_eq!(run_all(&su, &br), 3);
        assert_eq!(run_rows(&su, &br), 3);
    }

    #[test]
    fn const_column_contributes_one_value() {
        let br = BlockResult::new(vec![0, 1, 2], vec![Column::const_str("host", "web-1")]);
        let su = uniq(&["host"]);
        assert_eq!(run_all(&su, &br), 1);
        assert_eq!(run_rows(&su, &br), 1);

        let empty = BlockResult::new(vec![0, 1], vec![Column::const_str("host", "")]);
        assert_eq!(run_all(&su, &empty), 0);
        assert_eq!(run_rows(&su, &empty), 0);
    }

    #[test]
    fn dict_column_enumerates_the_dictionary() {
        let br = BlockResult::new(
            vec![0, 1, 2, 3],
            vec![Column::dict(
                "level",
                strings(&["", "info", "warn"]),
                vec![1, 2, 1, 0],
            )],
        );
        let su = uniq(&["level"]);
        assert_eq!(run_all(&su, &br), 2);
        assert_eq!(run_rows(&su, &br), 2);
    }

    #[test]
    fn numeric_column_counts_distinct_encodings() {
        let br = BlockResult::new(vec![0, 1, 2, 3], vec![Column::u64s("n", &[7, 7, 8, 7])]);
        let su = uniq(&["n"]);
        assert_eq!(run_all(&su, &br), 2);
        assert_eq!(run_rows(&su, &br), 2);
    }

    #[test]
    fn keys_do_not_collide_across_physical_types() {
        // A timestamp of 7 and a u64 of 7 decode differently, but even equal
        // payload bytes must stay distinct thanks to the key header.
        let su = uniq(&["v"]);
        let mut state = UniqState::default();

        let time_block = BlockResult::new(vec![7], vec![Column::time("v")]);
        state.update_all(&su, &time_block);
        let u64_block = BlockResult::new(vec![0], vec![Column::u64s("v", &[7])]);
        state.update_all(&su, &u64_block);

        assert_eq!(state.finalize(), "2");
        // Same story for a dict index byte versus a u8 payload.
        let dict_block = BlockResult::new(
            vec![0],
            vec![Column::dict("v", strings(&["", "x"]), vec![1])],
        );
        state.update_all(&su, &dict_block);
        let u8_block = BlockResult::new(vec![0], vec![Column::u8s("v", &[1])]);
        state.update_all(&su, &u8_block);
        assert_eq!(state.finalize(), "4");
    }

    #[test]
    fn multi_field_counts_distinct_tuples_and_skips_all_empty() {
        let br = BlockResult::new(
            vec![0, 1, 2, 3],
            vec![
                Column::strings("a", strings(&["x", "x", "y", ""])),
                Column::strings("b", strings(&["1", "1", "1", ""])),
            ],
        );
        let su = uniq(&["a", "b"]);
        assert_eq!(run_all(&su, &br), 2);
        assert_eq!(run_rows(&su, &br), 2);
    }

    #[test]
    fn multi_field_missing_column_reads_as_empty() {
        // ("x", "") and ("x") must not be confused, and a row that is empty
        // in both fields is not counted.
        let br = BlockResult::new(
            vec![0, 1],
            vec![Column::strings("a", strings(&["x", ""]))],
        );
        let su = uniq(&["a", "b"]);
        assert_eq!(run_all(&su, &br), 1);
        assert_eq!(run_rows(&su, &br), 1);
    }

    #[test]
    fn star_keys_include_column_names() {
        let su = uniq(&["*"]);
        let mut state = UniqState::default();
        // Same value under different column names: two distinct rows.
        let a = BlockResult::new(vec![0], vec![Column::strings("a", strings(&["x"]))]);
        let b = BlockResult::new(vec![0], vec![Column::strings("b", strings(&["x"]))]);
        state.update_all(&su, &a);
        state.update_all(&su, &b);
        assert_eq!(state.finalize(), "2");
    }

    #[test]
    fn star_skips_all_empty_rows_and_collapses_duplicates() {
        let br = BlockResult::new(
            vec![0, 1, 2, 3],
            vec![
                Column::strings("a", strings(&["x", "x", "x", ""])),
                Column::strings("b", strings(&["1", "1", "2", ""])),
            ],
        );
        let su = uniq(&["*"]);
        assert_eq!(run_all(&su, &br), 2);
        assert_eq!(run_rows(&su, &br), 2);
    }

    #[test]
    fn merge_unions_and_reports_byte_identical_keys() {
        let su = uniq(&["a"]);
        let br1 = BlockResult::new(
            vec![0, 1],
            vec![Column::strings("a", strings(&["x", "y"]))],
        );
        let br2 = BlockResult::new(
            vec![0, 1],
            vec![Column::strings("a", strings(&["y", "z"]))],
        );

        let mut left = UniqState::default();
        left.update_all(&su, &br1);
        let mut right = UniqState::default();
        right.update_all(&su, &br2);

        // The same decoded value produces the same key bytes in both states.
        assert_eq!(left.keys().intersection(right.keys()).count(), 1);

        left.merge(right);
        assert_eq!(left.finalize(), "3");
    }

    #[test]
    fn growth_is_reported_only_for_new_keys() {
        let su = uniq(&["a"]);
        let br = BlockResult::new(
            vec![0, 1],
            vec![Column::strings("a", strings(&["x", "x"]))],
        );
        let mut state = UniqState::default();
        let first = state.update_all(&su, &br);
        assert!(first > 0);
        let second = state.update_all(&su, &br);
        assert_eq!(second, 0);
    }
}
