use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::catalog::ColumnMetadataCatalog;
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, ProcessingWarning, Result};
use crate::models::{DatasetKey, Frequency, Period, TableAsset};
use crate::processors::geometry::GeometryDeriver;
use crate::processors::metadata_projector::{MetadataProjector, Projection};
use crate::processors::schema_reconciler::SchemaReconciler;
use crate::processors::type_normalizer::TypeNormalizer;
use crate::readers::{ConcurrentReader, HrefModifier};
use crate::utils::filename::artifact_path;
use crate::utils::progress::ProgressReporter;
use crate::writers::{GeoParquetArtifact, GeoParquetWriter};

/// Outcome of one `(frequency, period)` run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub asset: TableAsset,
    pub artifact: GeoParquetArtifact,
    pub source_count: usize,
    pub null_geometry_count: usize,
    pub warnings: Vec<ProcessingWarning>,
}

impl PipelineReport {
    pub fn summary(&self) -> String {
        format!(
            "GeoParquet Summary:\n\
            - Artifact: {}\n\
            - Sources: {}\n\
            - Rows: {}\n\
            - Columns: {}\n\
            - Partitions: {}\n\
            - Rows without coordinates: {}\n\
            - Bbox: [{:.4}, {:.4}, {:.4}, {:.4}]\n\
            - Warnings: {}",
            self.artifact.path.display(),
            self.source_count,
            self.asset.row_count,
            self.asset.columns.len(),
            self.artifact.partitions.len(),
            self.null_geometry_count,
            self.asset.bbox[0],
            self.asset.bbox[1],
            self.asset.bbox[2],
            self.asset.bbox[3],
            self.warnings.len()
        )
    }
}

/// CSV station files to GeoParquet plus catalog-ready column metadata
pub struct TabularPipeline {
    catalog: Arc<ColumnMetadataCatalog>,
    config: PipelineConfig,
    href_modifier: Option<HrefModifier>,
}

impl TabularPipeline {
    pub fn new(catalog: Arc<ColumnMetadataCatalog>, config: PipelineConfig) -> Self {
        Self {
            catalog,
            config,
            href_modifier: None,
        }
    }

    /// Pipeline whose catalog is read from `metadata_dir`
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let dir = config.metadata_dir.as_deref().ok_or_else(|| {
            ProcessingError::Config(
                "No column metadata directory configured; set metadata_dir or NORMALS_METADATA_DIR"
                    .to_string(),
            )
        })?;
        let catalog = ColumnMetadataCatalog::from_dir(dir);
        Ok(Self::new(Arc::new(catalog), config))
    }

    pub fn with_href_modifier(mut self, modifier: Option<HrefModifier>) -> Self {
        self.href_modifier = modifier;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build `{destination}/{id}.parquet` from `hrefs` and describe it
    pub fn create_geoparquet(
        &self,
        hrefs: &[String],
        frequency: Frequency,
        period: Period,
        destination: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<PipelineReport> {
        let key = DatasetKey::new(frequency, period);

        // Unsupported variants fail here, before any source is opened
        let columns = self.catalog.lookup(frequency, period)?;

        if hrefs.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No CSV sources given for {}",
                key
            )));
        }

        if let Some(p) = progress {
            p.set_message(&format!("Reading {} CSV files...", hrefs.len()));
        }
        let reader = ConcurrentReader::new(self.config.max_workers)
            .with_mmap(self.config.use_mmap)
            .with_href_modifier(self.href_modifier.clone());
        let batches = reader.read_all(hrefs, progress)?;

        if let Some(p) = progress {
            p.set_message("Reconciling schemas...");
        }
        let table = SchemaReconciler::new(&key.catalog_key()).reconcile(batches, &columns)?;

        if let Some(p) = progress {
            p.set_message("Normalizing column types...");
        }
        let table = TypeNormalizer::new(&columns).normalize(table)?;

        let geometry = GeometryDeriver::default()
            .with_policy(self.config.envelope)
            .derive(&table)?;

        if let Some(p) = progress {
            p.set_message("Writing GeoParquet...");
        }
        let writer = GeoParquetWriter::new()
            .with_compression(&self.config.compression)?
            .with_row_group_size(self.config.row_group_size);
        let artifact = writer.write(
            &table,
            &geometry,
            &artifact_path(destination, &key),
            self.config.partition_count,
        )?;

        let projection = self.projector().project(&artifact.path, frequency, period)?;

        let mut warnings = artifact.warnings.clone();
        warnings.extend(projection.warnings.iter().cloned());

        if let Some(p) = progress {
            p.finish_with_message(&format!("Wrote {} rows", projection.row_count));
        }

        info!(
            "{}: {} rows from {} sources, {} warnings",
            key,
            projection.row_count,
            table.source_count,
            warnings.len()
        );

        Ok(PipelineReport {
            asset: self.asset(&artifact.path, key, projection),
            artifact,
            source_count: table.source_count,
            null_geometry_count: geometry.null_count,
            warnings,
        })
    }

    /// Describe an artifact written by an earlier run without rebuilding it
    pub fn describe_existing(
        &self,
        artifact: &Path,
        frequency: Frequency,
        period: Period,
    ) -> Result<(TableAsset, Vec<ProcessingWarning>)> {
        if !artifact.exists() {
            return Err(ProcessingError::MissingData(format!(
                "GeoParquet artifact {} does not exist",
                artifact.display()
            )));
        }

        let key = DatasetKey::new(frequency, period);
        let projection = self.projector().project(artifact, frequency, period)?;
        let warnings = projection.warnings.clone();
        Ok((self.asset(artifact, key, projection), warnings))
    }

    fn projector(&self) -> MetadataProjector {
        MetadataProjector::new(self.catalog.clone()).with_policy(self.config.envelope)
    }

    fn asset(&self, path: &Path, key: DatasetKey, projection: Projection) -> TableAsset {
        TableAsset::new(
            path.to_string_lossy().to_string(),
            key,
            projection.columns,
            projection.row_count,
            projection.envelope.geometry,
            projection.envelope.bbox,
        )
    }
}
