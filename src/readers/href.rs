use std::path::Path;
use std::sync::Arc;

use crate::error::{ProcessingError, Result};

/// Rewrites a source locator before it is opened, e.g. to sign a URL
pub type HrefModifier = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub fn modify_href(href: &str, modifier: Option<&HrefModifier>) -> String {
    match modifier {
        Some(modify) => modify(href),
        None => href.to_string(),
    }
}

pub fn is_remote(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Read a text file holding one CSV locator per line
pub fn read_file_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let hrefs: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if hrefs.is_empty() {
        return Err(ProcessingError::MissingData(format!(
            "File list {} contains no CSV locators",
            path.display()
        )));
    }

    Ok(hrefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_modify_href() {
        let modifier: HrefModifier = Arc::new(|href: &str| format!("{}?token=abc", href));
        assert_eq!(
            modify_href("https://example.com/a.csv", Some(&modifier)),
            "https://example.com/a.csv?token=abc"
        );
        assert_eq!(modify_href("a.csv", None), "a.csv");
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("HTTPS://example.com/a.csv"));
        assert!(is_remote("http://example.com/a.csv"));
        assert!(!is_remote("/data/normals/USW00013740.csv"));
    }

    #[test]
    fn test_read_file_list() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "data/USW00013740.csv")?;
        writeln!(file)?;
        writeln!(file, "  data/USW00094765.csv  ")?;

        let hrefs = read_file_list(file.path())?;
        assert_eq!(hrefs, vec!["data/USW00013740.csv", "data/USW00094765.csv"]);
        Ok(())
    }

    #[test]
    fn test_empty_file_list() -> Result<()> {
        let file = NamedTempFile::new()?;
        assert!(read_file_list(file.path()).is_err());
        Ok(())
    }
}
