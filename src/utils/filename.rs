use std::path::{Path, PathBuf};

use crate::models::DatasetKey;
use crate::utils::constants::PARQUET_EXTENSION;

/// Artifact path for a dataset: `{destination}/{period}-{frequency}.parquet`
pub fn artifact_path(destination: &Path, key: &DatasetKey) -> PathBuf {
    destination.join(format!("{}.{}", key.id(), PARQUET_EXTENSION))
}

/// File name of the `index`-th partition inside a partitioned artifact
pub fn partition_file_name(index: usize) -> String {
    format!("part.{}.{}", index, PARQUET_EXTENSION)
}

/// Parquet files of an artifact in partition order.
///
/// A single-file artifact yields itself; a directory yields its
/// `part.{i}.parquet` members sorted by partition index.
pub fn artifact_files(artifact: &Path) -> std::io::Result<Vec<PathBuf>> {
    if artifact.is_file() {
        return Ok(vec![artifact.to_path_buf()]);
    }

    let mut parts: Vec<(usize, PathBuf)> = std::fs::read_dir(artifact)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| {
            let index = path
                .file_name()?
                .to_str()?
                .strip_prefix("part.")?
                .strip_suffix(&format!(".{}", PARQUET_EXTENSION))?
                .parse::<usize>()
                .ok()?;
            Some((index, path))
        })
        .collect();

    parts.sort_by_key(|(index, _)| *index);
    Ok(parts.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, Period};
    use tempfile::TempDir;

    #[test]
    fn test_artifact_path() {
        let key = DatasetKey::new(Frequency::Monthly, Period::Period1991To2020);
        let path = artifact_path(Path::new("output"), &key);
        assert_eq!(path, PathBuf::from("output/1991_2020-monthly.parquet"));
    }

    #[test]
    fn test_artifact_files_sorted_numerically() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        for index in [10, 2, 0, 1] {
            std::fs::write(dir.path().join(partition_file_name(index)), b"")?;
        }
        std::fs::write(dir.path().join("_SUCCESS"), b"")?;

        let names: Vec<String> = artifact_files(dir.path())?
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();

        assert_eq!(
            names,
            vec!["part.0.parquet", "part.1.parquet", "part.2.parquet", "part.10.parquet"]
        );
        Ok(())
    }
}
