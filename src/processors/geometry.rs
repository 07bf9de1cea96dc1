use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::{ColumnData, NormalizedTable, StationPoint};
use crate::utils::constants::{CRS, ELEVATION_COL, LATITUDE_COL, LONGITUDE_COL};
use crate::utils::coordinates::parse_coordinate;

/// Shape used to summarize the spatial extent of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopePolicy {
    #[default]
    ConvexHull,
    BoundingBox,
}

impl fmt::Display for EnvelopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopePolicy::ConvexHull => write!(f, "convex_hull"),
            EnvelopePolicy::BoundingBox => write!(f, "bounding_box"),
        }
    }
}

impl FromStr for EnvelopePolicy {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "convex_hull" | "hull" => Ok(EnvelopePolicy::ConvexHull),
            "bounding_box" | "bbox" => Ok(EnvelopePolicy::BoundingBox),
            other => Err(ProcessingError::Config(format!(
                "Unknown envelope policy '{}'. Expected convex_hull or bounding_box",
                other
            ))),
        }
    }
}

/// Spatial extent of a point set: GeoJSON geometry plus `[minx, miny, maxx, maxy]`
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub geometry: Value,
    pub bbox: [f64; 4],
}

impl Envelope {
    pub fn from_points(points: &[(f64, f64)], policy: EnvelopePolicy) -> Result<Self> {
        let bbox = bounding_box(points).ok_or(ProcessingError::NoStationCoordinates { rows: 0 })?;

        let geometry = match policy {
            EnvelopePolicy::ConvexHull => ring_geometry(convex_hull(points)),
            EnvelopePolicy::BoundingBox => {
                let [minx, miny, maxx, maxy] = bbox;
                let corners = vec![(minx, miny), (maxx, miny), (maxx, maxy), (minx, maxy)];
                let mut distinct = corners.clone();
                distinct.dedup();
                if distinct.len() == corners.len() {
                    ring_geometry(corners)
                } else {
                    ring_geometry(convex_hull(&corners))
                }
            }
        };

        Ok(Self { geometry, bbox })
    }
}

fn bounding_box(points: &[(f64, f64)]) -> Option<[f64; 4]> {
    let (first, rest) = points.split_first()?;
    let mut bbox = [first.0, first.1, first.0, first.1];
    for &(x, y) in rest {
        bbox[0] = bbox[0].min(x);
        bbox[1] = bbox[1].min(y);
        bbox[2] = bbox[2].max(x);
        bbox[3] = bbox[3].max(y);
    }
    Some(bbox)
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Monotone-chain hull, counter-clockwise, without the closing vertex.
/// Collinear points are dropped.
pub fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// GeoJSON for a hull: Point, LineString or closed Polygon by vertex count
fn ring_geometry(vertices: Vec<(f64, f64)>) -> Value {
    match vertices.as_slice() {
        [] => Value::Null,
        [(x, y)] => json!({"type": "Point", "coordinates": [x, y]}),
        [a, b] => json!({"type": "LineString", "coordinates": [[a.0, a.1], [b.0, b.1]]}),
        _ => {
            let mut ring: Vec<[f64; 2]> = vertices.iter().map(|&(x, y)| [x, y]).collect();
            ring.push(ring[0]);
            json!({"type": "Polygon", "coordinates": [ring]})
        }
    }
}

/// Per-row station points plus the envelope of the non-null ones
#[derive(Debug, Clone)]
pub struct DerivedGeometry {
    pub points: Vec<Option<StationPoint>>,
    pub envelope: Envelope,
    pub crs: String,
    pub null_count: usize,
}

/// Builds station points from the canonical (post-normalization) table
pub struct GeometryDeriver {
    longitude_col: String,
    latitude_col: String,
    elevation_col: String,
    crs: String,
    policy: EnvelopePolicy,
}

impl GeometryDeriver {
    pub fn new(longitude_col: &str, latitude_col: &str, elevation_col: &str, crs: &str) -> Self {
        Self {
            longitude_col: longitude_col.to_string(),
            latitude_col: latitude_col.to_string(),
            elevation_col: elevation_col.to_string(),
            crs: crs.to_string(),
            policy: EnvelopePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EnvelopePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn derive(&self, table: &NormalizedTable) -> Result<DerivedGeometry> {
        let longitude = self.required(table, &self.longitude_col)?;
        let latitude = self.required(table, &self.latitude_col)?;
        let elevation = table.column(&self.elevation_col).map(|c| &c.data);

        let mut points = Vec::with_capacity(table.row_count);
        let mut null_count = 0;

        for row in 0..table.row_count {
            let (Some(lon), Some(lat)) = (coordinate_at(longitude, row), coordinate_at(latitude, row))
            else {
                null_count += 1;
                points.push(None);
                continue;
            };

            let point = StationPoint::new(lon, lat, elevation.and_then(|e| coordinate_at(e, row)));
            point.validate()?;
            points.push(Some(point));
        }

        if null_count > 0 {
            warn!(
                "{} of {} rows have no coordinates; their geometry is null",
                null_count, table.row_count
            );
        }

        let xy: Vec<(f64, f64)> = points.iter().flatten().map(StationPoint::xy).collect();
        if xy.is_empty() {
            return Err(ProcessingError::NoStationCoordinates {
                rows: table.row_count,
            });
        }
        let envelope = Envelope::from_points(&xy, self.policy)?;

        debug!(
            "Derived {} points in {} with {} envelope {:?}",
            xy.len(),
            self.crs,
            self.policy,
            envelope.bbox
        );

        Ok(DerivedGeometry {
            points,
            envelope,
            crs: self.crs.clone(),
            null_count,
        })
    }

    fn required<'t>(&self, table: &'t NormalizedTable, name: &str) -> Result<&'t ColumnData> {
        table.column(name).map(|c| &c.data).ok_or_else(|| {
            ProcessingError::MissingData(format!("Coordinate column '{}' not found", name))
        })
    }
}

impl Default for GeometryDeriver {
    fn default() -> Self {
        Self::new(LONGITUDE_COL, LATITUDE_COL, ELEVATION_COL, CRS)
    }
}

fn coordinate_at(data: &ColumnData, row: usize) -> Option<f64> {
    match data {
        ColumnData::Text(values) => values.get(row)?.as_deref().and_then(parse_coordinate),
        other => other.f64_at(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedColumn;
    use pretty_assertions::assert_eq;

    fn table(lon: Vec<Option<f64>>, lat: Vec<Option<f64>>, elev: Vec<Option<f64>>) -> NormalizedTable {
        let row_count = lon.len();
        NormalizedTable {
            columns: vec![
                NormalizedColumn {
                    name: "latitude".to_string(),
                    data: ColumnData::Float(lat),
                },
                NormalizedColumn {
                    name: "longitude".to_string(),
                    data: ColumnData::Float(lon),
                },
                NormalizedColumn {
                    name: "elevation".to_string(),
                    data: ColumnData::Float(elev),
                },
            ],
            row_count,
            source_count: 1,
        }
    }

    #[test]
    fn test_two_points_bbox_is_exact() -> Result<()> {
        let table = table(
            vec![Some(-77.3197), Some(-157.9436)],
            vec![Some(37.5052), Some(21.3245)],
            vec![Some(50.0), None],
        );
        let derived = GeometryDeriver::default().derive(&table)?;

        assert_eq!(derived.envelope.bbox, [-157.9436, 21.3245, -77.3197, 37.5052]);
        assert_eq!(derived.envelope.geometry["type"], "LineString");
        assert!(derived.points[0].unwrap().has_elevation());
        assert!(!derived.points[1].unwrap().has_elevation());
        Ok(())
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let points = [(0.0, 0.0), (2.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.0, 2.0)];
        let hull = convex_hull(&points);
        assert_eq!(hull, vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
    }

    #[test]
    fn test_hull_polygon_is_closed() -> Result<()> {
        let points = [(0.0, 0.0), (3.0, 0.0), (0.0, 4.0)];
        let envelope = Envelope::from_points(&points, EnvelopePolicy::ConvexHull)?;
        let ring = envelope.geometry["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
        Ok(())
    }

    #[test]
    fn test_bounding_box_policy() -> Result<()> {
        let points = [(0.0, 0.0), (3.0, 1.0), (1.0, 4.0)];
        let envelope = Envelope::from_points(&points, EnvelopePolicy::BoundingBox)?;
        assert_eq!(
            envelope.geometry,
            json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [3.0, 0.0], [3.0, 4.0], [0.0, 4.0], [0.0, 0.0]]]})
        );
        Ok(())
    }

    #[test]
    fn test_single_station_is_point() -> Result<()> {
        let envelope = Envelope::from_points(&[(1.0, 2.0), (1.0, 2.0)], EnvelopePolicy::BoundingBox)?;
        assert_eq!(envelope.geometry, json!({"type": "Point", "coordinates": [1.0, 2.0]}));
        Ok(())
    }

    #[test]
    fn test_null_coordinates_excluded_from_envelope() -> Result<()> {
        let table = table(
            vec![Some(1.0), None, Some(3.0)],
            vec![Some(1.0), Some(50.0), Some(3.0)],
            vec![None, None, None],
        );
        let derived = GeometryDeriver::default().derive(&table)?;
        assert_eq!(derived.null_count, 1);
        assert!(derived.points[1].is_none());
        assert_eq!(derived.envelope.bbox, [1.0, 1.0, 3.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_no_coordinates_is_fatal() {
        let table = table(vec![None, None], vec![Some(1.0), None], vec![None, None]);
        let result = GeometryDeriver::default().derive(&table);
        assert!(matches!(
            result,
            Err(ProcessingError::NoStationCoordinates { rows: 2 })
        ));

        let empty = self::table(vec![], vec![], vec![]);
        assert!(matches!(
            GeometryDeriver::default().derive(&empty),
            Err(ProcessingError::NoStationCoordinates { rows: 0 })
        ));
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let table = table(vec![Some(1.0)], vec![Some(95.0)], vec![None]);
        let result = GeometryDeriver::default().derive(&table);
        assert!(matches!(result, Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn test_envelope_policy_parsing() -> Result<()> {
        assert_eq!("bbox".parse::<EnvelopePolicy>()?, EnvelopePolicy::BoundingBox);
        assert_eq!("convex-hull".parse::<EnvelopePolicy>()?, EnvelopePolicy::ConvexHull);
        assert!("circle".parse::<EnvelopePolicy>().is_err());
        Ok(())
    }
}
