use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Float64Array, Int64Array, StringArray,
    StringDictionaryBuilder,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, ProcessingWarning, Result};
use crate::models::{ColumnData, NormalizedTable, StationPoint};
use crate::processors::geometry::DerivedGeometry;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    CRS_EPSG_CODE, DEFAULT_ROW_GROUP_SIZE, GEOPARQUET_VERSION, GEO_METADATA_KEY,
    PARQUET_GEOMETRY_COL,
};
use crate::utils::coordinates::{geometry_type_name, point_to_wkb};
use crate::utils::filename::partition_file_name;

/// Handle to a written GeoParquet artifact
#[derive(Debug, Clone)]
pub struct GeoParquetArtifact {
    /// `{id}.parquet`: a file when unpartitioned, otherwise a directory of parts
    pub path: PathBuf,
    pub partitions: Vec<PathBuf>,
    pub row_count: usize,
    pub warnings: Vec<ProcessingWarning>,
}

impl GeoParquetArtifact {
    pub fn is_partitioned(&self) -> bool {
        self.path.is_dir()
    }
}

pub struct GeoParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl GeoParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write `table` plus its geometry to `destination`.
    ///
    /// Output is staged in a temporary sibling directory and moved into place
    /// only once every partition has been written.
    pub fn write(
        &self,
        table: &NormalizedTable,
        geometry: &DerivedGeometry,
        destination: &Path,
        partition_count: usize,
    ) -> Result<GeoParquetArtifact> {
        if geometry.points.len() != table.row_count {
            return Err(ProcessingError::InvalidFormat(format!(
                "Geometry has {} rows but table has {}",
                geometry.points.len(),
                table.row_count
            )));
        }

        let mut warnings = Vec::new();
        let applied = effective_partition_count(partition_count, table.row_count, table.source_count);
        if applied != partition_count {
            let warning = ProcessingWarning::PartitionCountAdjusted {
                requested: partition_count,
                applied,
                rows: table.row_count,
                sources: table.source_count,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let file_name = destination.file_name().ok_or_else(|| {
            ProcessingError::Config(format!("Invalid destination: {}", destination.display()))
        })?;
        let staging = tempfile::Builder::new()
            .prefix(".normals-staging-")
            .tempdir_in(&parent)?;
        let staged = staging.path().join(file_name);

        let schema = arrow_schema(table);
        let ranges = partition_ranges(table.row_count, applied);

        let staged_files: Vec<PathBuf> = if applied == 1 {
            self.write_partition(table, geometry, &schema, 0..table.row_count, &staged)?;
            vec![staged.clone()]
        } else {
            std::fs::create_dir(&staged)?;
            ranges
                .par_iter()
                .enumerate()
                .map(|(index, range)| {
                    let part = staged.join(partition_file_name(index));
                    self.write_partition(table, geometry, &schema, range.clone(), &part)?;
                    Ok(part)
                })
                .collect::<Result<_>>()?
        };

        // The previous artifact is parked in the staging dir and dropped with it
        let previous = staging
            .path()
            .join(format!("{}.previous", file_name.to_string_lossy()));
        replace_path(&staged, destination, &previous)?;

        let partitions = staged_files
            .iter()
            .map(|p| match p.strip_prefix(&staged) {
                Ok(rel) if !rel.as_os_str().is_empty() => destination.join(rel),
                _ => destination.to_path_buf(),
            })
            .collect();

        info!(
            "Wrote {} rows in {} partition(s) to {}",
            table.row_count,
            applied,
            destination.display()
        );

        Ok(GeoParquetArtifact {
            path: destination.to_path_buf(),
            partitions,
            row_count: table.row_count,
            warnings,
        })
    }

    fn write_partition(
        &self,
        table: &NormalizedTable,
        geometry: &DerivedGeometry,
        schema: &SchemaRef,
        rows: Range<usize>,
        path: &Path,
    ) -> Result<()> {
        let points = &geometry.points[rows.clone()];
        let batch = record_batch(table, points, schema.clone(), rows)?;

        let geo = geo_metadata(points, &geometry.crs);
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_key_value_metadata(Some(vec![KeyValue::new(
                GEO_METADATA_KEY.to_string(),
                Some(geo.to_string()),
            )]))
            .build();

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        debug!("Wrote partition {} ({} rows)", path.display(), batch.num_rows());
        Ok(())
    }
}

impl Default for GeoParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Requested partition count, or 1 when it would produce an empty partition
pub fn effective_partition_count(requested: usize, rows: usize, sources: usize) -> usize {
    if requested == 0 || requested > rows || requested > sources {
        1
    } else {
        requested
    }
}

/// Contiguous row ranges whose sizes differ by at most one
pub fn partition_ranges(rows: usize, partitions: usize) -> Vec<Range<usize>> {
    let partitions = partitions.max(1);
    let base = rows / partitions;
    let extra = rows % partitions;

    let mut start = 0;
    (0..partitions)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

fn arrow_type(data: &ColumnData) -> DataType {
    match data {
        ColumnData::Integer(_) => DataType::Int64,
        ColumnData::Float(_) => DataType::Float64,
        ColumnData::Boolean(_) => DataType::Boolean,
        ColumnData::Text(_) => DataType::Utf8,
        ColumnData::Categorical { .. } => {
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
        }
    }
}

pub fn arrow_schema(table: &NormalizedTable) -> SchemaRef {
    let mut fields: Vec<Field> = table
        .columns
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(&c.data), true))
        .collect();
    fields.push(Field::new(PARQUET_GEOMETRY_COL, DataType::Binary, true));
    Arc::new(Schema::new(fields))
}

fn column_array(data: &ColumnData) -> Result<ArrayRef> {
    Ok(match data {
        ColumnData::Integer(v) => Arc::new(Int64Array::from(v.clone())),
        ColumnData::Float(v) => Arc::new(Float64Array::from(v.clone())),
        ColumnData::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
        ColumnData::Text(v) => Arc::new(StringArray::from(
            v.iter().map(|s| s.as_deref()).collect::<Vec<_>>(),
        )),
        ColumnData::Categorical { values, categories } => {
            let dictionary = StringArray::from(
                categories.iter().map(String::as_str).collect::<Vec<_>>(),
            );
            let mut builder =
                StringDictionaryBuilder::<Int32Type>::new_with_dictionary(values.len(), &dictionary)?;
            for value in values {
                match value {
                    Some(v) => {
                        builder.append(v)?;
                    }
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    })
}

fn record_batch(
    table: &NormalizedTable,
    points: &[Option<StationPoint>],
    schema: SchemaRef,
    rows: Range<usize>,
) -> Result<RecordBatch> {
    let mut arrays = table
        .columns
        .iter()
        .map(|c| column_array(&c.data.slice(rows.start, rows.end)))
        .collect::<Result<Vec<ArrayRef>>>()?;

    let wkb: Vec<Option<Vec<u8>>> = points.iter().map(|p| p.as_ref().map(point_to_wkb)).collect();
    arrays.push(Arc::new(BinaryArray::from(
        wkb.iter().map(|g| g.as_deref()).collect::<Vec<_>>(),
    )));

    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// File-level `geo` metadata for the points in one file
pub fn geo_metadata(points: &[Option<StationPoint>], crs: &str) -> Value {
    let mut geometry_types: Vec<&str> = points
        .iter()
        .flatten()
        .map(geometry_type_name)
        .collect();
    geometry_types.sort_unstable();
    geometry_types.dedup();

    let mut column = json!({
        "encoding": "WKB",
        "geometry_types": geometry_types,
        "crs": projjson(crs),
    });

    let mut coords = points.iter().flatten().map(StationPoint::xy);
    if let Some((x0, y0)) = coords.next() {
        let bbox = coords.fold([x0, y0, x0, y0], |b, (x, y)| {
            [b[0].min(x), b[1].min(y), b[2].max(x), b[3].max(y)]
        });
        column["bbox"] = json!(bbox);
    }

    json!({
        "version": GEOPARQUET_VERSION,
        "primary_column": PARQUET_GEOMETRY_COL,
        "columns": { PARQUET_GEOMETRY_COL: column },
    })
}

/// PROJJSON for an `EPSG:{code}` identifier; the full definition is carried for NAD83
fn projjson(crs: &str) -> Value {
    let code = crs
        .strip_prefix("EPSG:")
        .and_then(|c| c.parse::<u32>().ok());

    match code {
        Some(CRS_EPSG_CODE) => json!({
            "$schema": "https://proj.org/schemas/v0.7/projjson.schema.json",
            "type": "GeographicCRS",
            "name": "NAD83",
            "datum": {
                "type": "GeodeticReferenceFrame",
                "name": "North American Datum 1983",
                "ellipsoid": {
                    "name": "GRS 1980",
                    "semi_major_axis": 6378137,
                    "inverse_flattening": 298.257222101
                }
            },
            "coordinate_system": {
                "subtype": "ellipsoidal",
                "axis": [
                    {"name": "Geodetic latitude", "abbreviation": "Lat", "direction": "north", "unit": "degree"},
                    {"name": "Geodetic longitude", "abbreviation": "Lon", "direction": "east", "unit": "degree"}
                ]
            },
            "id": {"authority": "EPSG", "code": CRS_EPSG_CODE}
        }),
        Some(other) => json!({"id": {"authority": "EPSG", "code": other}}),
        None => Value::Null,
    }
}

/// Swaps `staged` into `destination`, restoring the old artifact if the swap fails
fn replace_path(staged: &Path, destination: &Path, previous: &Path) -> Result<()> {
    let had_previous = destination.exists();
    if had_previous {
        std::fs::rename(destination, previous)?;
    }

    if let Err(e) = std::fs::rename(staged, destination) {
        if had_previous {
            std::fs::rename(previous, destination)?;
        }
        return Err(e.into());
    }
    Ok(())
}
