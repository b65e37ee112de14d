//! Public block shape at stage boundaries: decoded string columns.

/// One named column of decoded values at the public boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockColumn {
    /// Column name, unique within its block.
    pub name: String,
    /// One decoded value per row; the empty string means "no value".
    pub values: Vec<String>,
}

/// An immutable batch of rows in column-major form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// One timestamp per row, in nanoseconds.
    pub timestamps: Vec<i64>,
    /// Columns addressable by name.
    pub columns: Vec<BlockColumn>,
}

impl Block {
    /// Number of rows in the block.
    pub fn n_rows(&self) -> usize {
        self.timestamps.len()
    }

    /// Build a block from per-row `(field, value)` lists. Fields appear as
    /// columns in first-seen order; rows missing a field get the empty
    /// string. Timestamps default to the row index.
    pub fn from_rows(rows: &[&[(&str, &str)]]) -> Self {
        let mut names: Vec<&str> = Vec::new();
        for row in rows {
            for (name, _) in *row {
                if !names.contains(name) {
                    names.push(name);
                }
            }
        }

        let columns = names
            .iter()
            .map(|&name| BlockColumn {
                name: name.to_string(),
                values: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .find(|(f, _)| *f == name)
                            .map(|(_, v)| (*v).to_string())
                            .unwrap_or_default()
                    })
                    .collect(),
            })
            .collect();

        Self {
            timestamps: (0..rows.len() as i64).collect(),
            columns,
        }
    }

    /// Rows as `(field, value)` pairs in column order, one `Vec` per row.
    pub fn rows(&self) -> Vec<Vec<(String, String)>> {
        (0..self.n_rows())
            .map(|i| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[i].clone()))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_fills_missing_fields_with_empty() {
        let block = Block::from_rows(&[&[("a", "x"), ("b", "1")], &[("b", "2")], &[]]);
        assert_eq!(block.n_rows(), 3);
        assert_eq!(block.timestamps, vec![0, 1, 2]);
        assert_eq!(block.columns.len(), 2);
        assert_eq!(block.columns[0].name, "a");
        assert_eq!(block.columns[0].values, vec!["x", "", ""]);
        assert_eq!(block.columns[1].values, vec!["1", "2", ""]);
    }

    #[test]
    fn rows_round_trip() {
        let block = Block::from_rows(&[&[("a", "x")], &[("a", "y")]]);
        let rows = block.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![("a".to_string(), "y".to_string())]);
    }
}
