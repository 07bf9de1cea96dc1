use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    COMPLETENESS_FLAG_MARKERS, DIRECTIONAL_FLAG_MARKERS, MEASUREMENT_FLAG_MARKER,
};

/// Declared storage type of a column in the column-metadata catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Text,
    Integer,
    Float,
    Categorical,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Text => "text",
            StorageKind::Integer => "integer",
            StorageKind::Float => "float",
            StorageKind::Categorical => "categorical",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub storage_kind: StorageKind,
    pub category_values: Option<Vec<String>>,
}

impl ColumnDescriptor {
    pub fn new(name: &str, storage_kind: StorageKind) -> Self {
        Self {
            name: name.to_lowercase(),
            description: None,
            unit: None,
            storage_kind,
            category_values: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.storage_kind = StorageKind::Categorical;
        self.category_values = Some(categories.iter().map(|c| c.to_string()).collect());
        self
    }
}

/// Flag columns carry a small vocabulary of codes and are always categorical,
/// whatever values a given file happens to contain.
pub fn is_flag_column(name: &str) -> bool {
    COMPLETENESS_FLAG_MARKERS
        .iter()
        .chain(std::iter::once(&MEASUREMENT_FLAG_MARKER))
        .chain(DIRECTIONAL_FLAG_MARKERS.iter())
        .any(|marker| name.contains(marker))
}

/// Ordered set of column descriptors for one dataset variant.
///
/// Order is the catalog's key order and defines the output schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
    index: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        let mut normalized = Vec::with_capacity(columns.len());

        for mut column in columns {
            column.name = column.name.trim().to_lowercase();
            if index.insert(column.name.clone(), normalized.len()).is_some() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Duplicate column '{}' in column metadata",
                    column.name
                )));
            }
            normalized.push(column);
        }

        Ok(Self {
            columns: normalized,
            index,
        })
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.index
            .get(&name.to_lowercase())
            .map(|&position| &self.columns[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_column_patterns() {
        assert!(is_flag_column("comp_flag_mly-tavg-normal"));
        assert!(is_flag_column("meas_flag_mly-prcp-normal"));
        assert!(is_flag_column("mly-tavg-normal_attributes"));
        assert!(is_flag_column("hly-wind-1stdir"));
        assert!(is_flag_column("hly-wind-2nddir"));
        assert!(!is_flag_column("years_mly-tavg-normal"));
        assert!(!is_flag_column("hly-wind-avgspd"));
    }

    #[test]
    fn test_column_set_normalizes_names() {
        let set = ColumnSet::new(vec![
            ColumnDescriptor::new("STATION", StorageKind::Text),
            ColumnDescriptor::new("Latitude", StorageKind::Float),
        ])
        .unwrap();

        assert_eq!(set.names(), vec!["station", "latitude"]);
        assert!(set.contains("LATITUDE"));
        assert_eq!(set.get("Station").unwrap().storage_kind, StorageKind::Text);
    }

    #[test]
    fn test_column_set_rejects_duplicates() {
        let result = ColumnSet::new(vec![
            ColumnDescriptor::new("name", StorageKind::Text),
            ColumnDescriptor::new("NAME", StorageKind::Text),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_declared_categories_force_categorical() {
        let column = ColumnDescriptor::new("state", StorageKind::Text).with_categories(&["A", "B"]);
        assert_eq!(column.storage_kind, StorageKind::Categorical);
    }
}
