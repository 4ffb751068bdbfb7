//! Study × cluster contribution tables

use crate::clusters::Tail;
use crate::error::{DiagnosticError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;

/// One study's contributions, aligned with [`ContributionTable::columns`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRow {
    /// Study id
    pub id: String,
    /// One cell per column; `None` when the column belongs to another tail
    /// or the study was never filled in
    pub values: Vec<Option<f64>>,
}

/// Contribution of each study to each cluster
///
/// Rows are study ids, columns are cluster labels prefixed by tail
/// (`PosTail N` / `NegTail N`). Two-sided results stack the tail tables
/// row-wise, so each study appears once per tail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionTable {
    /// Data column names (the `id` column is implicit)
    pub columns: Vec<String>,
    /// Rows in study order
    pub rows: Vec<ContributionRow>,
}

impl ContributionTable {
    /// One row per study and no data columns
    pub fn empty_for<S: AsRef<str>>(ids: &[S]) -> Self {
        Self {
            columns: Vec::new(),
            rows: ids
                .iter()
                .map(|id| ContributionRow {
                    id: id.as_ref().to_string(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Unfilled table for one tail: a row per study, a column per cluster id
    pub fn for_tail<S: AsRef<str>>(ids: &[S], tail: Tail, cluster_ids: &[u32]) -> Self {
        let columns: Vec<String> = cluster_ids.iter().map(|&c| tail.column_name(c)).collect();
        let width = columns.len();
        Self {
            columns,
            rows: ids
                .iter()
                .map(|id| ContributionRow {
                    id: id.as_ref().to_string(),
                    values: vec![None; width],
                })
                .collect(),
        }
    }

    /// Fill the row of study `id`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the study has no row, `ShapeMismatch` if the number of
    /// values differs from the number of columns
    pub fn set_row(&mut self, id: &str, values: &[f64]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(DiagnosticError::ShapeMismatch(format!(
                "Row for study '{}' has {} values, table has {} columns",
                id,
                values.len(),
                self.columns.len()
            )));
        }
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DiagnosticError::InvalidInput(format!("No row for study '{}'", id)))?;
        row.values = values.iter().map(|&v| Some(v)).collect();
        Ok(())
    }

    /// Stack tables row-wise
    ///
    /// Columns are the union of all input columns in first-seen order. Cells
    /// of columns a source table lacks are `None`.
    pub fn concat(tables: Vec<ContributionTable>) -> ContributionTable {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for col in &table.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }
        let position: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut rows = Vec::new();
        for table in &tables {
            for row in &table.rows {
                let mut values = vec![None; columns.len()];
                for (col, value) in table.columns.iter().zip(&row.values) {
                    values[position[col.as_str()]] = *value;
                }
                rows.push(ContributionRow {
                    id: row.id.clone(),
                    values,
                });
            }
        }

        ContributionTable { columns, rows }
    }

    /// True when the table has no data columns (no clusters were characterized)
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Study ids in row order
    pub fn ids(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.id.as_str()).collect()
    }

    /// First non-missing cell for `(id, column)`
    pub fn get(&self, id: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .filter(|r| r.id == id)
            .find_map(|r| r.values.get(col).copied().flatten())
    }

    /// Write as tab-separated values; missing cells are written as `n/a`
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push("id".to_string());
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.id.clone());
            record.extend(row.values.iter().map(|v| match v {
                Some(v) => v.to_string(),
                None => "n/a".to_string(),
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_row_by_id_any_order() {
        let mut table = ContributionTable::for_tail(&["a", "b"], Tail::Positive, &[1, 2]);
        assert_eq!(table.columns, vec!["PosTail 1", "PosTail 2"]);
        table.set_row("b", &[0.5, 0.25]).unwrap();
        table.set_row("a", &[0.0, 1.0]).unwrap();
        assert_eq!(table.get("a", "PosTail 2"), Some(1.0));
        assert_eq!(table.get("b", "PosTail 1"), Some(0.5));
        assert!(table.set_row("zzz", &[0.0, 0.0]).is_err());
        assert!(table.set_row("a", &[0.0]).is_err());
    }

    #[test]
    fn test_concat_stacks_rows() {
        let mut pos = ContributionTable::for_tail(&["a", "b"], Tail::Positive, &[1]);
        pos.set_row("a", &[0.1]).unwrap();
        pos.set_row("b", &[0.2]).unwrap();
        let mut neg = ContributionTable::for_tail(&["a", "b"], Tail::Negative, &[1, 2]);
        neg.set_row("a", &[0.3, 0.4]).unwrap();
        neg.set_row("b", &[0.5, 0.6]).unwrap();

        let both = ContributionTable::concat(vec![pos, neg]);
        assert_eq!(both.columns, vec!["PosTail 1", "NegTail 1", "NegTail 2"]);
        assert_eq!(both.n_rows(), 4);
        assert_eq!(both.ids(), vec!["a", "b", "a", "b"]);
        assert_eq!(both.rows[0].values, vec![Some(0.1), None, None]);
        assert_eq!(both.rows[3].values, vec![None, Some(0.5), Some(0.6)]);
        assert_eq!(both.get("a", "NegTail 2"), Some(0.4));
    }

    #[test]
    fn test_empty_for_has_rows_but_no_columns() {
        let table = ContributionTable::empty_for(&["a", "b", "c"]);
        assert!(table.is_empty());
        assert_eq!(table.n_rows(), 3);

        let mut buf = Vec::new();
        table.write_tsv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "id\na\nb\nc\n");
    }

    #[test]
    fn test_write_tsv_marks_missing() {
        let pos = ContributionTable::for_tail(&["a"], Tail::Positive, &[1]);
        let mut buf = Vec::new();
        pos.write_tsv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "id\tPosTail 1\na\tn/a\n");
    }
}
