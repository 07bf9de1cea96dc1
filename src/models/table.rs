use std::fmt;

use crate::models::column::StorageKind;

/// Run-time kind of a single parsed cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiteralKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LiteralKind::Integer => "integer",
            LiteralKind::Float => "float",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Text => "text",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text,
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Integer(_) => LiteralKind::Integer,
            Literal::Float(_) => LiteralKind::Float,
            Literal::Boolean(_) => LiteralKind::Boolean,
            Literal::Text => LiteralKind::Text,
        }
    }

    /// Parse a raw CSV value against the declared storage kind.
    ///
    /// Numeric columns fall back to boolean and then text, so a placeholder
    /// such as `M` survives as a text literal for the normalizer to resolve.
    pub fn coerce(raw: &str, declared: StorageKind) -> Self {
        let trimmed = raw.trim();
        match declared {
            StorageKind::Integer => trimmed
                .parse::<i64>()
                .ok()
                .map(Literal::Integer)
                .or_else(|| parse_finite(trimmed))
                .or_else(|| parse_boolean(trimmed))
                .unwrap_or(Literal::Text),
            StorageKind::Float => parse_finite(trimmed)
                .or_else(|| parse_boolean(trimmed))
                .unwrap_or(Literal::Text),
            StorageKind::Text | StorageKind::Categorical => Literal::Text,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Literal::Integer(value) => Some(value as f64),
            Literal::Float(value) => Some(value),
            _ => None,
        }
    }
}

// `NaN` and `inf` stay text so the written literal is kept
fn parse_finite(value: &str) -> Option<Literal> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Literal::Float)
}

fn parse_boolean(value: &str) -> Option<Literal> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(Literal::Boolean(true)),
        "false" => Some(Literal::Boolean(false)),
        _ => None,
    }
}

/// A non-null cell: the literal as written in the source plus its parsed form
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub raw: String,
    pub literal: Literal,
}

impl Cell {
    pub fn parse(raw: &str, declared: StorageKind) -> Self {
        Self {
            raw: raw.to_string(),
            literal: Literal::coerce(raw, declared),
        }
    }

    pub fn text(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            literal: Literal::Text,
        }
    }
}

/// Untyped contents of a single source file, column-major
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub source: String,
    pub headers: Vec<String>,
    pub columns: Vec<Vec<Option<String>>>,
    pub row_count: usize,
}

impl RawBatch {
    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|i| self.columns[i].as_slice())
    }
}

/// A reconciled column: declared kind plus coerced cells, `None` for nulls
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub declared: StorageKind,
    pub cells: Vec<Option<Cell>>,
}

impl RawColumn {
    pub fn new(name: &str, declared: StorageKind) -> Self {
        Self {
            name: name.to_string(),
            declared,
            cells: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Station records from every source file under one canonical column order
#[derive(Debug, Clone, PartialEq)]
pub struct StationTable {
    pub columns: Vec<RawColumn>,
    pub row_count: usize,
    pub source_count: usize,
}

impl StationTable {
    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Final typed values of a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Categorical {
        values: Vec<Option<String>>,
        categories: Vec<String>,
    },
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Categorical { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric value at `row`, if the column is numeric and the cell is set
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnData::Integer(v) => v.get(row).copied().flatten().map(|x| x as f64),
            ColumnData::Float(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    /// Contiguous row range `[start, end)` as a new column
    pub fn slice(&self, start: usize, end: usize) -> ColumnData {
        match self {
            ColumnData::Integer(v) => ColumnData::Integer(v[start..end].to_vec()),
            ColumnData::Float(v) => ColumnData::Float(v[start..end].to_vec()),
            ColumnData::Boolean(v) => ColumnData::Boolean(v[start..end].to_vec()),
            ColumnData::Text(v) => ColumnData::Text(v[start..end].to_vec()),
            ColumnData::Categorical { values, categories } => ColumnData::Categorical {
                values: values[start..end].to_vec(),
                categories: categories.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedColumn {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub columns: Vec<NormalizedColumn>,
    pub row_count: usize,
    pub source_count: usize,
}

impl NormalizedTable {
    pub fn column(&self, name: &str) -> Option<&NormalizedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integer_column() {
        assert_eq!(Literal::coerce("5", StorageKind::Integer), Literal::Integer(5));
        assert_eq!(Literal::coerce(" -7777 ", StorageKind::Integer), Literal::Integer(-7777));
        assert_eq!(Literal::coerce("5.5", StorageKind::Integer), Literal::Float(5.5));
        assert_eq!(Literal::coerce("TRUE", StorageKind::Integer), Literal::Boolean(true));
        assert_eq!(Literal::coerce("M", StorageKind::Integer), Literal::Text);
    }

    #[test]
    fn test_coerce_float_and_text_columns() {
        assert_eq!(Literal::coerce("5", StorageKind::Float), Literal::Float(5.0));
        assert_eq!(Literal::coerce("S", StorageKind::Float), Literal::Text);
        assert_eq!(Literal::coerce("42", StorageKind::Text), Literal::Text);
        assert_eq!(Literal::coerce("C", StorageKind::Categorical), Literal::Text);
    }

    #[test]
    fn test_non_finite_numbers_are_text() {
        assert_eq!(Literal::coerce("NaN", StorageKind::Integer), Literal::Text);
        assert_eq!(Literal::coerce("inf", StorageKind::Float), Literal::Text);
        assert_eq!(Literal::coerce("-Infinity", StorageKind::Float), Literal::Text);
    }

    #[test]
    fn test_cell_keeps_raw_literal() {
        let cell = Cell::parse("007", StorageKind::Integer);
        assert_eq!(cell.raw, "007");
        assert_eq!(cell.literal, Literal::Integer(7));
    }

    #[test]
    fn test_column_data_slice() {
        let data = ColumnData::Integer(vec![Some(1), None, Some(3), Some(4)]);
        assert_eq!(data.slice(1, 3), ColumnData::Integer(vec![None, Some(3)]));
        assert_eq!(data.f64_at(2), Some(3.0));
        assert_eq!(data.f64_at(1), None);
    }
}
