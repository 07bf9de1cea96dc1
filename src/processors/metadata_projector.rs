use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, BinaryArray};
use arrow::datatypes::{DataType, SchemaRef};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use parquet::file::reader::{FileReader, SerializedFileReader};
use tracing::{debug, warn};

use crate::catalog::ColumnMetadataCatalog;
use crate::error::{ProcessingError, ProcessingWarning, Result};
use crate::models::{ColumnDescriptor, ColumnSummary, DatasetKey, Frequency, Period};
use crate::processors::geometry::{Envelope, EnvelopePolicy};
use crate::utils::constants::{
    COMPLETENESS_FLAG_DESCRIPTION, COMPLETENESS_FLAG_MARKERS, GEOMETRY_DESCRIPTION,
    MEASUREMENT_FLAG_DESCRIPTION, MEASUREMENT_FLAG_MARKER, PARQUET_GEOMETRY_COL,
    YEARS_USED_DESCRIPTION, YEARS_USED_MARKER,
};
use crate::utils::coordinates::wkb_to_point;
use crate::utils::filename::artifact_files;

/// Column descriptors, row count and envelope read back from a written artifact
#[derive(Debug, Clone)]
pub struct Projection {
    pub columns: Vec<ColumnSummary>,
    pub row_count: i64,
    pub envelope: Envelope,
    pub warnings: Vec<ProcessingWarning>,
}

pub struct MetadataProjector {
    catalog: Arc<ColumnMetadataCatalog>,
    policy: EnvelopePolicy,
}

impl MetadataProjector {
    pub fn new(catalog: Arc<ColumnMetadataCatalog>) -> Self {
        Self {
            catalog,
            policy: EnvelopePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EnvelopePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn project(&self, artifact: &Path, frequency: Frequency, period: Period) -> Result<Projection> {
        let key = DatasetKey::new(frequency, period);
        let columns = self.catalog.lookup(frequency, period)?;

        let files = artifact_files(artifact)?;
        if files.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No parquet files found in {}",
                artifact.display()
            )));
        }

        let schema = read_schema(&files[0])?;
        let row_count = files
            .iter()
            .map(|f| read_row_count(f))
            .sum::<Result<i64>>()?;

        let mut warnings = Vec::new();
        let summaries = schema
            .fields()
            .iter()
            .map(|field| {
                let physical_type = physical_type_name(field.name(), field.data_type());
                let (description, unit) = describe(field.name(), columns.get(field.name()));
                if description.is_none() {
                    let warning = ProcessingWarning::DocumentationMissing {
                        dataset: key.catalog_key(),
                        column: field.name().clone(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                }
                ColumnSummary {
                    name: field.name().clone(),
                    physical_type,
                    description,
                    unit,
                }
            })
            .collect();

        let envelope = self.read_envelope(&files, &schema)?;

        debug!(
            "Projected {} columns and {} rows from {}",
            schema.fields().len(),
            row_count,
            artifact.display()
        );

        Ok(Projection {
            columns: summaries,
            row_count,
            envelope,
            warnings,
        })
    }

    /// Envelope recomputed from the persisted geometry column only
    fn read_envelope(&self, files: &[PathBuf], schema: &SchemaRef) -> Result<Envelope> {
        let index = schema.index_of(PARQUET_GEOMETRY_COL)?;
        let mut points = Vec::new();

        for path in files {
            let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
            let mask = ProjectionMask::roots(builder.parquet_schema(), [index]);
            let reader = builder.with_projection(mask).build()?;

            for batch in reader {
                let batch = batch?;
                let geometries = batch
                    .column(0)
                    .as_any()
                    .downcast_ref::<BinaryArray>()
                    .ok_or_else(|| {
                        ProcessingError::InvalidFormat(format!(
                            "Column '{}' in {} is not binary",
                            PARQUET_GEOMETRY_COL,
                            path.display()
                        ))
                    })?;

                for i in 0..geometries.len() {
                    if geometries.is_valid(i) {
                        points.push(wkb_to_point(geometries.value(i))?.xy());
                    }
                }
            }
        }

        Envelope::from_points(&points, self.policy)
    }
}

fn read_schema(path: &Path) -> Result<SchemaRef> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    Ok(builder.schema().clone())
}

fn read_row_count(path: &Path) -> Result<i64> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    Ok(reader.metadata().file_metadata().num_rows())
}

/// Storage type name as persisted, independent of the declared kind
pub fn physical_type_name(name: &str, data_type: &DataType) -> String {
    if name == PARQUET_GEOMETRY_COL {
        return "geometry".to_string();
    }
    match data_type {
        DataType::Int64 => "int64".to_string(),
        DataType::Float64 => "float64".to_string(),
        DataType::Boolean => "boolean".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "string".to_string(),
        DataType::Dictionary(_, _) => "category".to_string(),
        other => other.to_string().to_lowercase(),
    }
}

/// Description and unit from the catalog, else from name patterns
pub fn describe(name: &str, descriptor: Option<&ColumnDescriptor>) -> (Option<String>, Option<String>) {
    if name == PARQUET_GEOMETRY_COL {
        return (Some(GEOMETRY_DESCRIPTION.to_string()), None);
    }

    let unit = descriptor.and_then(|d| d.unit.clone());
    let description = descriptor
        .and_then(|d| d.description.clone())
        .or_else(|| fallback_description(name).map(str::to_string));

    (description, unit)
}

fn fallback_description(name: &str) -> Option<&'static str> {
    if COMPLETENESS_FLAG_MARKERS.iter().any(|m| name.contains(m)) {
        Some(COMPLETENESS_FLAG_DESCRIPTION)
    } else if name.contains(MEASUREMENT_FLAG_MARKER) {
        Some(MEASUREMENT_FLAG_DESCRIPTION)
    } else if name.starts_with(YEARS_USED_MARKER) {
        Some(YEARS_USED_DESCRIPTION)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StorageKind;

    #[test]
    fn test_fallback_descriptions() {
        assert_eq!(
            describe("comp_flag_mly-tavg-normal", None).0.as_deref(),
            Some(COMPLETENESS_FLAG_DESCRIPTION)
        );
        assert_eq!(
            describe("mly-tavg-normal_attributes", None).0.as_deref(),
            Some(COMPLETENESS_FLAG_DESCRIPTION)
        );
        assert_eq!(
            describe("meas_flag_mly-tavg-normal", None).0.as_deref(),
            Some(MEASUREMENT_FLAG_DESCRIPTION)
        );
        assert_eq!(
            describe("years_mly-tavg-normal", None).0.as_deref(),
            Some(YEARS_USED_DESCRIPTION)
        );
        assert_eq!(describe("mystery", None), (None, None));
    }

    #[test]
    fn test_catalog_description_wins() {
        let descriptor = ColumnDescriptor::new("mly-tavg-normal", StorageKind::Float)
            .with_description("Long-term averages of monthly average temperature")
            .with_unit("degrees Fahrenheit");
        let (description, unit) = describe("mly-tavg-normal", Some(&descriptor));
        assert_eq!(
            description.as_deref(),
            Some("Long-term averages of monthly average temperature")
        );
        assert_eq!(unit.as_deref(), Some("degrees Fahrenheit"));
    }

    #[test]
    fn test_geometry_description() {
        assert_eq!(
            describe(PARQUET_GEOMETRY_COL, None).0.as_deref(),
            Some(GEOMETRY_DESCRIPTION)
        );
    }

    #[test]
    fn test_physical_type_names() {
        assert_eq!(physical_type_name("a", &DataType::Int64), "int64");
        assert_eq!(physical_type_name("a", &DataType::Utf8), "string");
        assert_eq!(
            physical_type_name(
                "a",
                &DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
            ),
            "category"
        );
        assert_eq!(physical_type_name("geometry", &DataType::Binary), "geometry");
    }
}
