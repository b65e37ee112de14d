//! Per-group accumulator for `count(...)`.

use loq_query::StatsCount;

use crate::bitmap::Bitmap;
use crate::block_result::{BlockResult, ColumnData, ValueType};

/// Counts rows with at least one non-empty value among the named fields.
/// With `*` or no fields, counts all rows. Numeric, IPv4, timestamp, and
/// time columns are always present, so they count unconditionally.
#[derive(Debug, Default)]
pub struct CountState {
    rows: u64,
}

impl CountState {
    /// Fold every row of the block. Returns the state-size increase (always
    /// zero: a counter does not grow).
    pub fn update_all(&mut self, sc: &StatsCount, br: &BlockResult) -> usize {
        let n = br.n_rows() as u64;
        if sc.contains_star || sc.fields.is_empty() {
            // Fast path - unconditionally count all the rows.
            self.rows += n;
            return 0;
        }

        if let [field] = sc.fields.as_slice() {
            // Fast path for count(single_column).
            match br.column_by_name(field).data() {
                ColumnData::Const { value } => {
                    if !value.is_empty() {
                        self.rows += n;
                    }
                }
                ColumnData::Time => self.rows += n,
                ColumnData::Dict {
                    dict_values,
                    indexes,
                } => match dict_values.iter().position(String::is_empty) {
                    None => self.rows += n,
                    Some(empty_idx) => {
                        self.rows += indexes.iter().filter(|&&i| i as usize != empty_idx).count()
                            as u64;
                    }
                },
                ColumnData::Plain {
                    value_type: ValueType::String,
                    encoded,
                } => {
                    self.rows += encoded.iter().filter(|v| !v.is_empty()).count() as u64;
                }
                ColumnData::Plain { .. } => self.rows += n,
            }
            return 0;
        }

        // Slow path - count rows with at least one non-empty value among the
        // named fields. A bit stays set while the row is empty in every field
        // processed so far; always-present fields short-circuit to "all rows
        // count".
        let mut bm = Bitmap::new(br.n_rows());
        bm.set_all();
        for field in &sc.fields {
            match br.column_by_name(field).data() {
                ColumnData::Const { value } => {
                    if !value.is_empty() {
                        self.rows += n;
                        return 0;
                    }
                    // Empty const contributes nothing to any row.
                }
                ColumnData::Time => {
                    self.rows += n;
                    return 0;
                }
                ColumnData::Dict {
                    dict_values,
                    indexes,
                } => {
                    if !dict_values.iter().any(String::is_empty) {
                        self.rows += n;
                        return 0;
                    }
                    bm.for_each_set_bit(|i| dict_values[indexes[i] as usize].is_empty());
                }
                ColumnData::Plain {
                    value_type: ValueType::String,
                    encoded,
                } => {
                    bm.for_each_set_bit(|i| encoded[i].is_empty());
                }
                ColumnData::Plain { .. } => {
                    self.rows += n;
                    return 0;
                }
            }
        }
        self.rows += n - bm.count_ones() as u64;
        0
    }

    /// Fold the row at `row`. Returns the state-size increase (always zero).
    pub fn update_row(&mut self, sc: &StatsCount, br: &BlockResult, row: usize) -> usize {
        if sc.contains_star || sc.fields.is_empty() {
            self.rows += 1;
            return 0;
        }

        if let [field] = sc.fields.as_slice() {
            match br.column_by_name(field).data() {
                ColumnData::Const { value } => {
                    if !value.is_empty() {
                        self.rows += 1;
                    }
                }
                ColumnData::Time => self.rows += 1,
                ColumnData::Dict {
                    dict_values,
                    indexes,
                } => {
                    if !dict_values[indexes[row] as usize].is_empty() {
                        self.rows += 1;
                    }
                }
                ColumnData::Plain {
                    value_type: ValueType::String,
                    encoded,
                } => {
                    if !encoded[row].is_empty() {
                        self.rows += 1;
                    }
                }
                ColumnData::Plain { .. } => self.rows += 1,
            }
            return 0;
        }

        // Slow path - the row counts if any named field is non-empty there.
        for field in &sc.fields {
            if !br.column_by_name(field).value_at_row(br, row).is_empty() {
                self.rows += 1;
                return 0;
            }
        }
        0
    }

    /// Absorb another count state.
    pub fn merge(&mut self, other: CountState) {
        self.rows += other.rows;
    }

    /// Render the counter as a decimal string.
    pub fn finalize(&self) -> String {
        self.rows.to_string()
    }
}
