use crate::error::{ProcessingError, Result};
use crate::models::RawBatch;
use crate::readers::href::{modify_href, HrefModifier};
use crate::readers::StationCsvReader;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

pub struct ConcurrentReader {
    max_workers: usize,
    use_mmap: bool,
    href_modifier: Option<HrefModifier>,
}

impl ConcurrentReader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            use_mmap: false,
            href_modifier: None,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_href_modifier(mut self, modifier: Option<HrefModifier>) -> Self {
        self.href_modifier = modifier;
        self
    }

    /// Sort locators lexicographically; this order defines output row order
    pub fn ordered_sources(hrefs: &[String]) -> Vec<String> {
        let mut sorted = hrefs.to_vec();
        sorted.sort();
        sorted
    }

    /// Read every source in parallel, returning batches in sorted-locator order
    pub fn read_all(
        &self,
        hrefs: &[String],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<RawBatch>> {
        let sources = Self::ordered_sources(hrefs);
        let completed = AtomicUsize::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        debug!(
            "Reading {} CSV sources with {} workers",
            sources.len(),
            self.max_workers
        );

        pool.install(|| {
            sources
                .par_iter()
                .map(|href| {
                    let batch = self.read_one(href);

                    let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    batch
                })
                .collect()
        })
    }

    fn read_one(&self, href: &str) -> Result<RawBatch> {
        let reader = StationCsvReader::with_mmap(self.use_mmap);
        let resolved = modify_href(href, self.href_modifier.as_ref());
        let mut batch = reader.read(&resolved)?;
        // Report the caller's locator, not a possibly signed URL
        batch.source = href.to_string();
        Ok(batch)
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_read_all_in_sorted_order() -> Result<()> {
        let dir = TempDir::new()?;
        let b = dir.path().join("b.csv");
        let a = dir.path().join("a.csv");
        std::fs::write(&b, "station\nB1\nB2\n")?;
        std::fs::write(&a, "station\nA1\n")?;

        let hrefs = vec![
            b.to_string_lossy().to_string(),
            a.to_string_lossy().to_string(),
        ];
        let batches = ConcurrentReader::new(2).read_all(&hrefs, None)?;

        assert_eq!(batches.len(), 2);
        assert!(batches[0].source.ends_with("a.csv"));
        assert_eq!(batches[0].row_count, 1);
        assert_eq!(batches[1].row_count, 2);
        Ok(())
    }

    #[test]
    fn test_href_modifier_applied_before_open() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("real.csv"), "station\nX\n")?;

        let root = dir.path().to_path_buf();
        let modifier: HrefModifier =
            Arc::new(move |href: &str| root.join(href).to_string_lossy().to_string());

        let batches = ConcurrentReader::new(1)
            .with_href_modifier(Some(modifier))
            .read_all(&["real.csv".to_string()], None)?;

        assert_eq!(batches[0].source, "real.csv");
        assert_eq!(batches[0].row_count, 1);
        Ok(())
    }

    #[test]
    fn test_missing_source_fails() {
        let result = ConcurrentReader::new(1).read_all(&["/no/such/file.csv".to_string()], None);
        assert!(matches!(result, Err(ProcessingError::Io(_))));
    }
}
