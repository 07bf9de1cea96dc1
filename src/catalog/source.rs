use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::DatasetKey;

/// Where column-metadata documents come from.
///
/// Returns `Ok(None)` when the dataset variant has no document.
pub trait CatalogSource: Send + Sync {
    fn read(&self, key: &DatasetKey) -> Result<Option<String>>;

    fn describe(&self) -> String;
}

/// Documents stored as `{root}/{frequency}_{period}.json`
#[derive(Debug, Clone)]
pub struct DirectoryCatalogSource {
    root: PathBuf,
}

impl DirectoryCatalogSource {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn document_path(&self, key: &DatasetKey) -> PathBuf {
        self.root.join(format!("{}.json", key.catalog_key()))
    }
}

impl CatalogSource for DirectoryCatalogSource {
    fn read(&self, key: &DatasetKey) -> Result<Option<String>> {
        let path = self.document_path(key);
        match std::fs::read_to_string(&path) {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("column metadata directory {}", self.root.display())
    }
}

/// Documents held in memory, keyed by catalog key
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogSource {
    documents: HashMap<String, String>,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, key: DatasetKey, document: &str) -> Self {
        self.documents.insert(key.catalog_key(), document.to_string());
        self
    }
}

impl CatalogSource for InMemoryCatalogSource {
    fn read(&self, key: &DatasetKey) -> Result<Option<String>> {
        Ok(self.documents.get(&key.catalog_key()).cloned())
    }

    fn describe(&self) -> String {
        format!("{} in-memory column metadata documents", self.documents.len())
    }
}
