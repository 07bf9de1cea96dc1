use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::info;

use crate::error::Result;

/// Header occurrence counts across a set of CSV files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaCensus {
    pub file_count: usize,
    pub header_counts: BTreeMap<String, usize>,
    pub distinct_schemas: usize,
    pub files_without_header: Vec<PathBuf>,
}

impl SchemaCensus {
    /// Survey every `*.csv` file directly under `dir`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
            })
            .collect();
        files.sort();
        Self::from_files(&files)
    }

    pub fn from_files(files: &[PathBuf]) -> Result<Self> {
        let headers: Vec<Vec<String>> = files
            .par_iter()
            .map(|path| read_headers(path))
            .collect::<Result<_>>()?;

        let mut census = SchemaCensus {
            file_count: files.len(),
            ..Default::default()
        };
        let mut schemas = BTreeSet::new();

        for (path, file_headers) in files.iter().zip(headers) {
            if file_headers.is_empty() {
                census.files_without_header.push(path.clone());
                continue;
            }
            for header in &file_headers {
                *census.header_counts.entry(header.clone()).or_insert(0) += 1;
            }
            schemas.insert(file_headers);
        }
        census.distinct_schemas = schemas.len();

        info!(
            "Surveyed {} files: {} distinct headers, {} distinct schemas",
            census.file_count,
            census.header_counts.len(),
            census.distinct_schemas
        );
        Ok(census)
    }

    pub fn is_uniform(&self) -> bool {
        self.distinct_schemas <= 1 && self.files_without_header.is_empty()
    }

    /// Headers missing from at least one file that has a header row
    pub fn partial_headers(&self) -> Vec<(&str, usize)> {
        let with_header = self.file_count - self.files_without_header.len();
        self.header_counts
            .iter()
            .filter(|(_, &count)| count < with_header)
            .map(|(name, &count)| (name.as_str(), count))
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Schema Census:".to_string(),
            format!("- Files: {}", self.file_count),
            format!("- Distinct headers: {}", self.header_counts.len()),
            format!("- Distinct schemas: {}", self.distinct_schemas),
            format!("- Files without header: {}", self.files_without_header.len()),
        ];
        if self.is_uniform() {
            lines.push("All files share one schema".to_string());
        } else {
            for (name, count) in self.partial_headers() {
                lines.push(format!("  {}: {}/{} files", name, count, self.file_count));
            }
            for path in &self.files_without_header {
                lines.push(format!("  no header: {}", path.display()));
            }
        }
        lines.join("\n")
    }
}

fn read_headers(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(File::open(path)?);
    Ok(reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_census_counts_headers() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("a.csv"), "STATION,DATE,MLY-TAVG-NORMAL\nX,01,1\n")?;
        std::fs::write(dir.path().join("b.csv"), "STATION,DATE\nY,01\n")?;
        std::fs::write(dir.path().join("c.csv"), "")?;
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;

        let census = SchemaCensus::from_dir(dir.path())?;

        assert_eq!(census.file_count, 3);
        assert_eq!(census.header_counts.get("station"), Some(&2));
        assert_eq!(census.distinct_schemas, 2);
        assert_eq!(census.files_without_header.len(), 1);
        assert!(!census.is_uniform());
        assert_eq!(census.partial_headers(), vec![("mly-tavg-normal", 1)]);
        Ok(())
    }

    #[test]
    fn test_uniform_census() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("a.csv"), "station,date\nX,01\n")?;
        std::fs::write(dir.path().join("b.csv"), "STATION,DATE\nY,02\n")?;

        let census = SchemaCensus::from_dir(dir.path())?;
        assert!(census.is_uniform());
        assert!(census.summary().contains("All files share one schema"));
        Ok(())
    }
}
