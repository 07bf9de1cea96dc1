use serde::{Deserialize, Serialize};

use crate::models::dataset::DatasetKey;
use crate::utils::constants::{
    PARQUET_ASSET_ROLES, PARQUET_ASSET_TITLE, PARQUET_GEOMETRY_COL, PARQUET_MEDIA_TYPE,
};

/// One entry of the `table:columns` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub physical_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// GeoParquet asset description handed to the catalog Item builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAsset {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub title: String,
    #[serde(rename = "table:primary_geometry")]
    pub primary_geometry: String,
    #[serde(rename = "table:columns")]
    pub columns: Vec<ColumnSummary>,
    #[serde(rename = "table:row_count")]
    pub row_count: i64,
    pub roles: Vec<String>,
    pub geometry: serde_json::Value,
    pub bbox: [f64; 4],
    #[serde(rename = "noaa-climate-normals:frequency")]
    pub frequency: String,
    #[serde(rename = "noaa-climate-normals:period")]
    pub period: String,
    pub start_datetime: String,
    pub end_datetime: String,
}

impl TableAsset {
    pub fn new(
        href: String,
        key: DatasetKey,
        columns: Vec<ColumnSummary>,
        row_count: i64,
        geometry: serde_json::Value,
        bbox: [f64; 4],
    ) -> Self {
        let (start, end) = key.period.datetime_range();
        Self {
            href,
            media_type: PARQUET_MEDIA_TYPE.to_string(),
            title: PARQUET_ASSET_TITLE.to_string(),
            primary_geometry: PARQUET_GEOMETRY_COL.to_string(),
            columns,
            row_count,
            roles: PARQUET_ASSET_ROLES.iter().map(|r| r.to_string()).collect(),
            geometry,
            bbox,
            frequency: key.frequency.to_string(),
            period: key.period.to_string(),
            start_datetime: start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            end_datetime: end.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}
