use crate::error::{ProcessingError, Result};
use crate::models::RawBatch;
use crate::readers::href::is_remote;
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use memmap2::Mmap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// Reads one station CSV into an untyped, column-major batch
pub struct StationCsvReader {
    use_mmap: bool,
}

impl StationCsvReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read a CSV from a local path or an http(s) URL
    pub fn read(&self, href: &str) -> Result<RawBatch> {
        if is_remote(href) {
            self.read_remote(href)
        } else if self.use_mmap {
            self.read_mmap(Path::new(href), href)
        } else {
            let file = File::open(href)?;
            let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
            self.read_from(reader, href)
        }
    }

    fn read_remote(&self, url: &str) -> Result<RawBatch> {
        let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
        self.read_from(Cursor::new(bytes), url)
    }

    fn read_mmap(&self, path: &Path, source: &str) -> Result<RawBatch> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return self.read_from(std::io::empty(), source);
        }
        let mmap = unsafe { Mmap::map(&file)? };
        self.read_from(&mmap[..], source)
    }

    /// Parse CSV content; headers are trimmed and lower-cased, empty cells become nulls
    pub fn read_from<R: Read>(&self, reader: R, source: &str) -> Result<RawBatch> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let mut seen = HashSet::with_capacity(headers.len());
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Duplicate column '{}' in {}",
                    header, source
                )));
            }
        }

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut row_count = 0;

        for record in csv_reader.records() {
            let record = record?;
            for (column, value) in columns.iter_mut().zip(record.iter()) {
                if value.trim().is_empty() {
                    column.push(None);
                } else {
                    column.push(Some(value.to_string()));
                }
            }
            row_count += 1;
        }

        Ok(RawBatch {
            source: source.to_string(),
            headers,
            columns,
            row_count,
        })
    }
}

impl Default for StationCsvReader {
    fn default() -> Self {
        Self::new()
    }
}
