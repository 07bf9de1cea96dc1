use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::catalog::source::{CatalogSource, DirectoryCatalogSource};
use crate::error::{ProcessingError, Result};
use crate::models::{ColumnDescriptor, ColumnSet, DatasetKey, Frequency, Period, StorageKind};

#[derive(Debug, Deserialize)]
struct ColumnEntry {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    storage_kind: StorageKind,
    #[serde(default)]
    category_values: Option<Vec<String>>,
}

/// Read-only registry of expected columns per dataset variant.
///
/// Documents are parsed on first use and cached; lookups are safe from
/// multiple threads.
pub struct ColumnMetadataCatalog {
    source: Box<dyn CatalogSource>,
    cache: RwLock<HashMap<DatasetKey, Arc<ColumnSet>>>,
}

impl ColumnMetadataCatalog {
    pub fn new(source: Box<dyn CatalogSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Catalog over a directory of `{frequency}_{period}.json` documents
    pub fn from_dir(root: &Path) -> Self {
        Self::new(Box::new(DirectoryCatalogSource::new(root)))
    }

    /// Column descriptors for `(frequency, period)`, in catalog order
    pub fn lookup(&self, frequency: Frequency, period: Period) -> Result<Arc<ColumnSet>> {
        let key = DatasetKey::new(frequency, period);

        if let Some(columns) = self.read_cache()?.get(&key) {
            return Ok(Arc::clone(columns));
        }

        let document = self
            .source
            .read(&key)?
            .ok_or_else(|| ProcessingError::MetadataNotFound {
                frequency: frequency.to_string(),
                period: period.to_string(),
            })?;

        let columns = Arc::new(parse_document(&key, &document)?);
        debug!(
            "Loaded {} column descriptors for {} from {}",
            columns.len(),
            key,
            self.source.describe()
        );

        let mut cache = self
            .cache
            .write()
            .map_err(|_| ProcessingError::Config("Column metadata cache poisoned".to_string()))?;
        Ok(Arc::clone(cache.entry(key).or_insert(columns)))
    }

    fn read_cache(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<DatasetKey, Arc<ColumnSet>>>> {
        self.cache
            .read()
            .map_err(|_| ProcessingError::Config("Column metadata cache poisoned".to_string()))
    }
}

fn parse_document(key: &DatasetKey, document: &str) -> Result<ColumnSet> {
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(document)
        .map_err(|e| {
            ProcessingError::InvalidFormat(format!("Column metadata {} is malformed: {}", key, e))
        })?;

    let mut descriptors = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        let entry: ColumnEntry = serde_json::from_value(value).map_err(|e| {
            ProcessingError::InvalidFormat(format!(
                "Column metadata {} has an invalid entry for '{}': {}",
                key, name, e
            ))
        })?;

        let storage_kind = if entry.category_values.is_some() {
            StorageKind::Categorical
        } else {
            entry.storage_kind
        };

        descriptors.push(ColumnDescriptor {
            name,
            description: entry.description.filter(|d| !d.trim().is_empty()),
            unit: entry.unit.filter(|u| !u.trim().is_empty()),
            storage_kind,
            category_values: entry.category_values,
        });
    }

    ColumnSet::new(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::source::InMemoryCatalogSource;
    use pretty_assertions::assert_eq;

    fn fixture_catalog() -> ColumnMetadataCatalog {
        let key = DatasetKey::new(Frequency::Monthly, Period::Period1991To2020);
        let source = InMemoryCatalogSource::new().with_document(
            key,
            r#"{
                "STATION": {"description": "Station identification code", "storage_kind": "text"},
                "mly-tavg-normal": {"description": "Average temperature", "unit": "degree_Fahrenheit", "storage_kind": "float"},
                "comp_flag_mly-tavg-normal": {"storage_kind": "text", "category_values": ["S", "R"]},
                "latitude": {"description": "", "storage_kind": "float"}
            }"#,
        );
        ColumnMetadataCatalog::new(Box::new(source))
    }

    #[test]
    fn test_lookup_preserves_document_order() -> Result<()> {
        let catalog = fixture_catalog();
        let columns = catalog.lookup(Frequency::Monthly, Period::Period1991To2020)?;

        assert_eq!(
            columns.names(),
            vec![
                "station",
                "mly-tavg-normal",
                "comp_flag_mly-tavg-normal",
                "latitude"
            ]
        );
        assert_eq!(
            columns.get("mly-tavg-normal").unwrap().unit.as_deref(),
            Some("degree_Fahrenheit")
        );
        Ok(())
    }

    #[test]
    fn test_category_values_imply_categorical() -> Result<()> {
        let catalog = fixture_catalog();
        let columns = catalog.lookup(Frequency::Monthly, Period::Period1991To2020)?;
        let flag = columns.get("comp_flag_mly-tavg-normal").unwrap();

        assert_eq!(flag.storage_kind, StorageKind::Categorical);
        assert_eq!(
            flag.category_values,
            Some(vec!["S".to_string(), "R".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_blank_description_is_absent() -> Result<()> {
        let catalog = fixture_catalog();
        let columns = catalog.lookup(Frequency::Monthly, Period::Period1991To2020)?;
        assert_eq!(columns.get("latitude").unwrap().description, None);
        Ok(())
    }

    #[test]
    fn test_missing_variant_is_fatal() {
        let catalog = fixture_catalog();
        let result = catalog.lookup(Frequency::Hourly, Period::Period1981To2010);
        assert!(matches!(
            result,
            Err(ProcessingError::MetadataNotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_is_cached() -> Result<()> {
        let catalog = fixture_catalog();
        let first = catalog.lookup(Frequency::Monthly, Period::Period1991To2020)?;
        let second = catalog.lookup(Frequency::Monthly, Period::Period1991To2020)?;
        assert!(Arc::ptr_eq(&first, &second));
        Ok(())
    }

    #[test]
    fn test_fixture_documents_parse() -> Result<()> {
        let catalog = ColumnMetadataCatalog::from_dir(
            &Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/column_metadata"),
        );
        for frequency in Frequency::ALL {
            for period in Period::ALL {
                match catalog.lookup(frequency, period) {
                    Ok(columns) => {
                        assert!(columns.contains("latitude"));
                        assert!(columns.contains("longitude"));
                        assert!(columns.contains("elevation"));
                    }
                    Err(ProcessingError::MetadataNotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}
