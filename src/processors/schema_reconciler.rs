use crate::error::{ProcessingError, Result};
use crate::models::{Cell, ColumnDescriptor, ColumnSet, RawBatch, RawColumn, StationTable};
use rayon::prelude::*;
use tracing::debug;

/// Merges per-file batches with differing column sets into one table whose
/// column order is exactly the catalog's.
pub struct SchemaReconciler {
    dataset: String,
}

impl SchemaReconciler {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
        }
    }

    pub fn reconcile(&self, mut batches: Vec<RawBatch>, columns: &ColumnSet) -> Result<StationTable> {
        batches.sort_by(|a, b| a.source.cmp(&b.source));

        let aligned: Vec<Vec<Vec<Option<Cell>>>> = batches
            .par_iter()
            .map(|batch| self.align_batch(batch, columns))
            .collect::<Result<_>>()?;

        let row_count: usize = batches.iter().map(|b| b.row_count).sum();
        let mut table_columns: Vec<RawColumn> = columns
            .iter()
            .map(|descriptor| {
                let mut column = RawColumn::new(&descriptor.name, descriptor.storage_kind);
                column.cells.reserve(row_count);
                column
            })
            .collect();

        for batch_columns in aligned {
            for (column, cells) in table_columns.iter_mut().zip(batch_columns) {
                column.cells.extend(cells);
            }
        }

        debug!(
            "Reconciled {} rows from {} sources into {} columns for {}",
            row_count,
            batches.len(),
            table_columns.len(),
            self.dataset
        );

        Ok(StationTable {
            columns: table_columns,
            row_count,
            source_count: batches.len(),
        })
    }

    /// One batch's cells in canonical order; absent columns become typed nulls
    fn align_batch(&self, batch: &RawBatch, columns: &ColumnSet) -> Result<Vec<Vec<Option<Cell>>>> {
        if let Some(unknown) = batch.headers.iter().find(|h| !columns.contains(h)) {
            return Err(ProcessingError::UnexpectedColumn {
                column: unknown.clone(),
                source_href: batch.source.clone(),
                dataset: self.dataset.clone(),
            });
        }

        Ok(columns
            .iter()
            .map(|descriptor| match batch.column(&descriptor.name) {
                Some(values) => coerce_values(values, descriptor),
                None => vec![None; batch.row_count],
            })
            .collect())
    }
}

fn coerce_values(values: &[Option<String>], descriptor: &ColumnDescriptor) -> Vec<Option<Cell>> {
    values
        .iter()
        .map(|value| {
            value
                .as_deref()
                .map(|raw| Cell::parse(raw, descriptor.storage_kind))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Literal, StorageKind};
    use pretty_assertions::assert_eq;

    fn batch(source: &str, headers: &[&str], rows: &[&[&str]]) -> RawBatch {
        let columns = (0..headers.len())
            .map(|i| {
                rows.iter()
                    .map(|row| {
                        let value = row[i];
                        (!value.is_empty()).then(|| value.to_string())
                    })
                    .collect()
            })
            .collect();
        RawBatch {
            source: source.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            columns,
            row_count: rows.len(),
        }
    }

    fn abc_columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::new("a", StorageKind::Integer),
            ColumnDescriptor::new("b", StorageKind::Text),
            ColumnDescriptor::new("c", StorageKind::Integer),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_column_filled_with_nulls() -> Result<()> {
        let batches = vec![
            batch("1.csv", &["a", "b", "c"], &[&["1", "x", "3"]]),
            batch("2.csv", &["a", "b"], &[&["2", "y"]]),
        ];

        let table = SchemaReconciler::new("test").reconcile(batches, &abc_columns())?;

        assert_eq!(table.row_count, 2);
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        let c = table.column("c").unwrap();
        assert_eq!(c.cells[0].as_ref().unwrap().literal, Literal::Integer(3));
        assert_eq!(c.cells[1], None);
        Ok(())
    }

    #[test]
    fn test_catalog_order_independent_of_file_order() -> Result<()> {
        let batches = vec![batch("1.csv", &["c", "a", "b"], &[&["3", "1", "x"]])];
        let table = SchemaReconciler::new("test").reconcile(batches, &abc_columns())?;

        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(
            table.column("a").unwrap().cells[0].as_ref().unwrap().raw,
            "1"
        );
        Ok(())
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let batches = vec![batch("drift.csv", &["a", "b", "z"], &[&["1", "x", "9"]])];
        let result = SchemaReconciler::new("monthly_1991-2020").reconcile(batches, &abc_columns());

        match result {
            Err(ProcessingError::UnexpectedColumn {
                column,
                source_href,
                ..
            }) => {
                assert_eq!(column, "z");
                assert_eq!(source_href, "drift.csv");
            }
            other => panic!("expected UnexpectedColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_rows_concatenated_in_source_order() -> Result<()> {
        let batches = vec![
            batch("b.csv", &["a"], &[&["3"], &["4"]]),
            batch("a.csv", &["a"], &[&["1"], &["2"]]),
        ];
        let table = SchemaReconciler::new("test").reconcile(batches, &abc_columns())?;

        let raws: Vec<&str> = table
            .column("a")
            .unwrap()
            .cells
            .iter()
            .map(|c| c.as_ref().unwrap().raw.as_str())
            .collect();
        assert_eq!(raws, vec!["1", "2", "3", "4"]);
        assert_eq!(table.source_count, 2);
        Ok(())
    }

    #[test]
    fn test_empty_cells_are_nulls() -> Result<()> {
        let batches = vec![batch("1.csv", &["a", "b"], &[&["", "x"]])];
        let table = SchemaReconciler::new("test").reconcile(batches, &abc_columns())?;
        assert_eq!(table.column("a").unwrap().cells[0], None);
        Ok(())
    }
}
