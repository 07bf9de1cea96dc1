use std::collections::{BTreeSet, HashSet};

use rayon::prelude::*;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::{
    is_flag_column, Cell, ColumnData, ColumnSet, Literal, LiteralKind, NormalizedColumn,
    NormalizedTable, RawColumn, StationTable, StorageKind,
};

/// Resolves each reconciled column to one storage type
pub struct TypeNormalizer<'a> {
    columns: &'a ColumnSet,
}

impl<'a> TypeNormalizer<'a> {
    pub fn new(columns: &'a ColumnSet) -> Self {
        Self { columns }
    }

    pub fn normalize(&self, table: StationTable) -> Result<NormalizedTable> {
        let columns: Vec<NormalizedColumn> = table
            .columns
            .par_iter()
            .map(|column| self.normalize_column(column))
            .collect::<Result<_>>()?;

        Ok(NormalizedTable {
            columns,
            row_count: table.row_count,
            source_count: table.source_count,
        })
    }

    pub fn normalize_column(&self, column: &RawColumn) -> Result<NormalizedColumn> {
        let fixed_categories = self
            .columns
            .get(&column.name)
            .and_then(|descriptor| descriptor.category_values.as_deref());

        let data = if column.declared == StorageKind::Categorical || is_flag_column(&column.name) {
            categorical(column, fixed_categories)?
        } else {
            match resolve_kind(column)? {
                LiteralKind::Text => ColumnData::Text(raw_values(&column.cells)),
                LiteralKind::Integer => ColumnData::Integer(
                    column
                        .cells
                        .iter()
                        .map(|cell| match cell.as_ref().map(|c| c.literal) {
                            Some(Literal::Integer(value)) => Some(value),
                            _ => None,
                        })
                        .collect(),
                ),
                LiteralKind::Float => ColumnData::Float(
                    column
                        .cells
                        .iter()
                        .map(|cell| cell.as_ref().and_then(|c| c.literal.as_f64()))
                        .collect(),
                ),
                LiteralKind::Boolean => ColumnData::Boolean(
                    column
                        .cells
                        .iter()
                        .map(|cell| match cell.as_ref().map(|c| c.literal) {
                            Some(Literal::Boolean(value)) => Some(value),
                            _ => None,
                        })
                        .collect(),
                ),
            }
        };

        Ok(NormalizedColumn {
            name: column.name.clone(),
            data,
        })
    }
}

/// Single storage kind for a column from the literal kinds it contains
pub fn resolve_kind(column: &RawColumn) -> Result<LiteralKind> {
    let kinds: BTreeSet<LiteralKind> = column
        .cells
        .iter()
        .flatten()
        .map(|cell| cell.literal.kind())
        .collect();

    if kinds.is_empty() {
        return Ok(match column.declared {
            StorageKind::Integer => LiteralKind::Integer,
            StorageKind::Float => LiteralKind::Float,
            StorageKind::Text | StorageKind::Categorical => LiteralKind::Text,
        });
    }

    if kinds.len() == 1 {
        return Ok(*kinds.iter().next().unwrap_or(&LiteralKind::Text));
    }

    if kinds.contains(&LiteralKind::Text) {
        debug!(
            "Widening column {} to text (observed kinds: {:?})",
            column.name, kinds
        );
        return Ok(LiteralKind::Text);
    }

    let numeric: BTreeSet<LiteralKind> = [LiteralKind::Integer, LiteralKind::Float].into();
    if kinds == numeric {
        return Ok(LiteralKind::Float);
    }

    Err(ProcessingError::UnresolvableColumnType {
        column: column.name.clone(),
        kinds: kinds.iter().map(|kind| kind.to_string()).collect(),
    })
}

fn raw_values(cells: &[Option<Cell>]) -> Vec<Option<String>> {
    cells
        .iter()
        .map(|cell| cell.as_ref().map(|c| c.raw.clone()))
        .collect()
}

fn categorical(column: &RawColumn, fixed: Option<&[String]>) -> Result<ColumnData> {
    let values = raw_values(&column.cells);

    let categories = match fixed {
        Some(fixed) => {
            let allowed: HashSet<&str> = fixed.iter().map(String::as_str).collect();
            if let Some(value) = values.iter().flatten().find(|v| !allowed.contains(v.as_str())) {
                return Err(ProcessingError::UnexpectedCategory {
                    column: column.name.clone(),
                    value: value.clone(),
                });
            }
            fixed.to_vec()
        }
        None => values
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect(),
    };

    Ok(ColumnData::Categorical { values, categories })
}
