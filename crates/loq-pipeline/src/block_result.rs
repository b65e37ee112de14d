//! Read-only columnar view over a block, as produced by a block reader.
//!
//! Columns carry their physical representation (const, time, dict, or plain
//! typed values) so aggregation stages can pick representation-aware fast
//! paths. Every accessor is pure: repeated calls yield identical results, and
//! decoded values are materialized lazily at most once.

use std::net::Ipv4Addr;

use chrono::{DateTime, SecondsFormat};
use once_cell::unsync::OnceCell;

use crate::block::{Block, BlockColumn};

/// Physical value type of a plain or dict column. The `u8` tags are stable:
/// they participate in uniqueness-key encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Raw UTF-8 bytes; the empty string means "no value".
    String = 1,
    /// Per-row byte indexes into a per-block dictionary.
    Dict = 2,
    /// One byte per row.
    Uint8 = 3,
    /// Two big-endian bytes per row.
    Uint16 = 4,
    /// Four big-endian bytes per row.
    Uint32 = 5,
    /// Eight big-endian bytes per row.
    Uint64 = 6,
    /// Eight big-endian bytes per row (IEEE 754 bit pattern).
    Float64 = 7,
    /// Four bytes per row, network order.
    Ipv4 = 8,
    /// Eight big-endian bytes per row: nanoseconds since the epoch.
    TimestampIso8601 = 9,
}

impl ValueType {
    /// Byte tag used inside uniqueness keys.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Fixed per-row encoded width, or `None` for variable-width types.
    fn fixed_width(self) -> Option<usize> {
        match self {
            ValueType::String | ValueType::Dict => None,
            ValueType::Uint8 => Some(1),
            ValueType::Uint16 => Some(2),
            ValueType::Uint32 => Some(4),
            ValueType::Uint64 | ValueType::Float64 | ValueType::TimestampIso8601 => Some(8),
            ValueType::Ipv4 => Some(4),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ColumnData {
    /// A single scalar applying to every row; empty means "no value".
    Const { value: String },
    /// Synthetic column backed by the block's timestamps.
    Time,
    /// Up to 256 distinct strings plus one byte index per row.
    Dict {
        dict_values: Vec<String>,
        indexes: Vec<u8>,
    },
    /// Type-tagged encoded values, one entry per row.
    Plain {
        value_type: ValueType,
        encoded: Vec<Vec<u8>>,
    },
}

/// A named column inside a [`BlockResult`].
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    data: ColumnData,
    decoded: OnceCell<Vec<String>>,
}

impl Column {
    fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
            decoded: OnceCell::new(),
        }
    }

    /// A column whose every row carries the same scalar.
    pub fn const_str(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            name,
            ColumnData::Const {
                value: value.into(),
            },
        )
    }

    /// The synthetic time column; row values render the block's timestamps.
    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, ColumnData::Time)
    }

    /// A dictionary-encoded column. Every index must point into
    /// `dict_values`, and the producer must not ship dead dictionary entries.
    pub fn dict(name: impl Into<String>, dict_values: Vec<String>, indexes: Vec<u8>) -> Self {
        assert!(
            dict_values.len() <= 256,
            "BUG: dict column with {} entries; the index array is one byte per row",
            dict_values.len()
        );
        assert!(
            indexes.iter().all(|&i| (i as usize) < dict_values.len()),
            "BUG: dict index out of range"
        );
        Self::new(
            name,
            ColumnData::Dict {
                dict_values,
                indexes,
            },
        )
    }

    /// A plain typed column from raw encoded values.
    pub fn plain(name: impl Into<String>, value_type: ValueType, encoded: Vec<Vec<u8>>) -> Self {
        assert!(
            value_type != ValueType::Dict,
            "BUG: dict columns are constructed via Column::dict"
        );
        if let Some(width) = value_type.fixed_width() {
            assert!(
                encoded.iter().all(|v| v.len() == width),
                "BUG: {value_type:?} column entry width != {width}"
            );
        }
        Self::new(
            name,
            ColumnData::Plain {
                value_type,
                encoded,
            },
        )
    }

    /// A plain string column.
    pub fn strings(name: impl Into<String>, values: Vec<String>) -> Self {
        let encoded = values.into_iter().map(String::into_bytes).collect();
        Self::plain(name, ValueType::String, encoded)
    }

    /// A plain `u64` column.
    pub fn u64s(name: impl Into<String>, values: &[u64]) -> Self {
        let encoded = values.iter().map(|v| v.to_be_bytes().to_vec()).collect();
        Self::plain(name, ValueType::Uint64, encoded)
    }

    /// A plain `u8` column.
    pub fn u8s(name: impl Into<String>, values: &[u8]) -> Self {
        let encoded = values.iter().map(|v| vec![*v]).collect();
        Self::plain(name, ValueType::Uint8, encoded)
    }

    /// A plain `f64` column.
    pub fn f64s(name: impl Into<String>, values: &[f64]) -> Self {
        let encoded = values
            .iter()
            .map(|v| v.to_bits().to_be_bytes().to_vec())
            .collect();
        Self::plain(name, ValueType::Float64, encoded)
    }

    /// A plain IPv4 column.
    pub fn ipv4s(name: impl Into<String>, values: &[Ipv4Addr]) -> Self {
        let encoded = values.iter().map(|v| v.octets().to_vec()).collect();
        Self::plain(name, ValueType::Ipv4, encoded)
    }

    /// A plain ISO 8601 timestamp column from epoch nanoseconds.
    pub fn iso_timestamps(name: impl Into<String>, nanos: &[i64]) -> Self {
        let encoded = nanos
            .iter()
            .map(|v| (*v as u64).to_be_bytes().to_vec())
            .collect();
        Self::plain(name, ValueType::TimestampIso8601, encoded)
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a const column.
    pub fn is_const(&self) -> bool {
        matches!(self.data, ColumnData::Const { .. })
    }

    /// Whether this is the synthetic time column.
    pub fn is_time(&self) -> bool {
        matches!(self.data, ColumnData::Time)
    }

    /// Physical value type for dict/plain columns; `None` for const/time.
    pub fn value_type(&self) -> Option<ValueType> {
        match &self.data {
            ColumnData::Const { .. } | ColumnData::Time => None,
            ColumnData::Dict { .. } => Some(ValueType::Dict),
            ColumnData::Plain { value_type, .. } => Some(*value_type),
        }
    }

    /// Dictionary entries for dict columns; empty otherwise.
    pub fn dict_values(&self) -> &[String] {
        match &self.data {
            ColumnData::Dict { dict_values, .. } => dict_values,
            _ => &[],
        }
    }

    pub(crate) fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of physically stored rows; const/time columns defer to the
    /// block's row count.
    fn stored_rows(&self) -> Option<usize> {
        match &self.data {
            ColumnData::Const { .. } | ColumnData::Time => None,
            ColumnData::Dict { indexes, .. } => Some(indexes.len()),
            ColumnData::Plain { encoded, .. } => Some(encoded.len()),
        }
    }

    /// All decoded row values, materialized lazily on first call.
    pub fn values<'a>(&'a self, br: &'a BlockResult) -> &'a [String] {
        self.decoded.get_or_init(|| match &self.data {
            ColumnData::Const { value } => vec![value.clone(); br.n_rows()],
            ColumnData::Time => br
                .timestamps()
                .iter()
                .map(|&ts| format_timestamp_nanos(ts))
                .collect(),
            ColumnData::Dict {
                dict_values,
                indexes,
            } => indexes
                .iter()
                .map(|&i| dict_values[i as usize].clone())
                .collect(),
            ColumnData::Plain {
                value_type,
                encoded,
            } => encoded
                .iter()
                .map(|v| decode_plain_value(*value_type, v))
                .collect(),
        })
    }

    /// Decoded value at one row.
    pub fn value_at_row<'a>(&'a self, br: &'a BlockResult, row: usize) -> &'a str {
        &self.values(br)[row]
    }
}

/// Decode one encoded plain value into its textual form.
fn decode_plain_value(value_type: ValueType, encoded: &[u8]) -> String {
    match value_type {
        ValueType::String => String::from_utf8_lossy(encoded).into_owned(),
        ValueType::Dict => panic!("BUG: dict values are decoded through the dictionary"),
        ValueType::Uint8 => encoded[0].to_string(),
        ValueType::Uint16 => u16::from_be_bytes(fixed(encoded)).to_string(),
        ValueType::Uint32 => u32::from_be_bytes(fixed(encoded)).to_string(),
        ValueType::Uint64 => u64::from_be_bytes(fixed(encoded)).to_string(),
        ValueType::Float64 => f64::from_bits(u64::from_be_bytes(fixed(encoded))).to_string(),
        ValueType::Ipv4 => Ipv4Addr::from(fixed::<4>(encoded)).to_string(),
        ValueType::TimestampIso8601 => {
            format_timestamp_nanos(u64::from_be_bytes(fixed(encoded)) as i64)
        }
    }
}

fn fixed<const N: usize>(encoded: &[u8]) -> [u8; N] {
    encoded.try_into().unwrap_or_else(|_| {
        panic!(
            "BUG: expected {}-byte encoded value, got {}",
            N,
            encoded.len()
        )
    })
}

/// Render epoch nanoseconds as RFC 3339 with nanosecond precision, UTC.
pub fn format_timestamp_nanos(nanos: i64) -> String {
    DateTime::from_timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Read-only columnar batch flowing between stage processors.
#[derive(Debug)]
pub struct BlockResult {
    timestamps: Vec<i64>,
    columns: Vec<Column>,
    empty_column: Column,
}

impl BlockResult {
    /// Assemble a block result. Column row counts must match the timestamp
    /// count; this is the producer's contract.
    pub fn new(timestamps: Vec<i64>, columns: Vec<Column>) -> Self {
        let n = timestamps.len();
        for c in &columns {
            if let Some(stored) = c.stored_rows() {
                assert!(
                    stored == n,
                    "BUG: column `{}` has {stored} rows; block has {n}",
                    c.name()
                );
            }
        }
        Self {
            timestamps,
            columns,
            empty_column: Column::const_str("", ""),
        }
    }

    /// Build from the public boundary shape: every column plain strings.
    pub fn from_block(block: &Block) -> Self {
        let columns = block
            .columns
            .iter()
            .map(|c| Column::strings(c.name.clone(), c.values.clone()))
            .collect();
        Self::new(block.timestamps.clone(), columns)
    }

    /// Decode into the public boundary shape.
    pub fn to_block(&self) -> Block {
        Block {
            timestamps: self.timestamps.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| BlockColumn {
                    name: c.name().to_string(),
                    values: c.values(self).to_vec(),
                })
                .collect(),
        }
    }

    /// Row timestamps.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.timestamps.len()
    }

    /// All columns, in producer order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Index of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// The named column. Absent names resolve to a synthesized const-empty
    /// column so callers stay branchless with respect to presence.
    pub fn column_by_name(&self, name: &str) -> &Column {
        match self.column_index(name) {
            Some(i) => &self.columns[i],
            None => &self.empty_column,
        }
    }

    /// A sub-range of rows as a new block result. Const and time columns keep
    /// their representation; dict and plain columns are re-materialized as
    /// plain strings, since slicing an index array could orphan dictionary
    /// entries the producer guaranteed to be live.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| match c.data() {
                ColumnData::Const { value } => Column::const_str(c.name(), value.clone()),
                ColumnData::Time => Column::time(c.name()),
                ColumnData::Dict { .. } | ColumnData::Plain { .. } => {
                    Column::strings(c.name(), c.values(self)[start..end].to_vec())
                }
            })
            .collect();
        Self::new(self.timestamps[start..end].to_vec(), columns)
    }
}
