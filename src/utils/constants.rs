/// Coordinate reference system of every station point
pub const CRS: &str = "EPSG:4269";
pub const CRS_EPSG_CODE: u32 = 4269;

/// GeoParquet asset properties
pub const PARQUET_MEDIA_TYPE: &str = "application/x-parquet";
pub const PARQUET_GEOMETRY_COL: &str = "geometry";
pub const PARQUET_ASSET_TITLE: &str = "GeoParquet for all stations";
pub const PARQUET_ASSET_ROLES: [&str; 2] = ["data", "cloud-optimized"];
pub const PARQUET_EXTENSION: &str = "parquet";
pub const GEOPARQUET_VERSION: &str = "1.0.0";
pub const GEO_METADATA_KEY: &str = "geo";

/// Source columns holding station coordinates
pub const LONGITUDE_COL: &str = "longitude";
pub const LATITUDE_COL: &str = "latitude";
pub const ELEVATION_COL: &str = "elevation";

/// Column-name markers for flag columns
pub const COMPLETENESS_FLAG_MARKERS: [&str; 2] = ["_attributes", "comp_flag_"];
pub const MEASUREMENT_FLAG_MARKER: &str = "meas_flag";
pub const DIRECTIONAL_FLAG_MARKERS: [&str; 2] = ["wind-1stdir", "wind-2nddir"];
pub const YEARS_USED_MARKER: &str = "years_";

/// Fallback column descriptions
pub const COMPLETENESS_FLAG_DESCRIPTION: &str = "Data record completeness flag";
pub const MEASUREMENT_FLAG_DESCRIPTION: &str = "Data record measurement flag";
pub const YEARS_USED_DESCRIPTION: &str = "Number of years used";
pub const GEOMETRY_DESCRIPTION: &str = "Station location";

/// Processing defaults
pub const DEFAULT_PARTITION_COUNT: usize = 1;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

/// Configuration
pub const CONFIG_ENV_PREFIX: &str = "NORMALS";
