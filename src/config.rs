use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::processors::geometry::EnvelopePolicy;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    CONFIG_ENV_PREFIX, DEFAULT_PARTITION_COUNT, DEFAULT_ROW_GROUP_SIZE,
};

/// Settings for one pipeline run.
///
/// Loaded from built-in defaults, then an optional config file, then
/// `NORMALS_*` environment variables; command-line flags override last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// Requested number of output partitions; clamped to 1 when too large
    pub partition_count: usize,

    pub envelope: EnvelopePolicy,

    #[validate(custom(function = "validate_compression"))]
    pub compression: String,

    #[validate(range(min = 1))]
    pub row_group_size: usize,

    #[validate(range(min = 1, max = 1024))]
    pub max_workers: usize,

    /// Directory of `{frequency}_{period}.json` column metadata; required for a run
    pub metadata_dir: Option<PathBuf>,

    pub use_mmap: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            envelope: EnvelopePolicy::default(),
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            max_workers: num_cpus::get(),
            metadata_dir: None,
            use_mmap: false,
        }
    }
}

impl PipelineConfig {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(CONFIG_ENV_PREFIX).try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn validate_compression(compression: &str) -> std::result::Result<(), ValidationError> {
    match compression.to_lowercase().as_str() {
        COMPRESSION_SNAPPY | COMPRESSION_GZIP | COMPRESSION_LZ4 | COMPRESSION_ZSTD
        | COMPRESSION_NONE => Ok(()),
        _ => Err(ValidationError::new("unsupported_compression")),
    }
}
