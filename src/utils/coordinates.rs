use crate::error::{ProcessingError, Result};
use crate::models::StationPoint;

const WKB_LITTLE_ENDIAN: u8 = 1;
const WKB_POINT: u32 = 1;
const WKB_POINT_Z: u32 = 1001;

/// Parse a coordinate stored as text, e.g. a column widened by a sentinel
pub fn parse_coordinate(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Encode a station as little-endian ISO WKB: `Point Z` with elevation, `Point` without
pub fn point_to_wkb(point: &StationPoint) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(29);
    buffer.push(WKB_LITTLE_ENDIAN);
    match point.elevation {
        Some(z) => {
            buffer.extend_from_slice(&WKB_POINT_Z.to_le_bytes());
            buffer.extend_from_slice(&point.longitude.to_le_bytes());
            buffer.extend_from_slice(&point.latitude.to_le_bytes());
            buffer.extend_from_slice(&z.to_le_bytes());
        }
        None => {
            buffer.extend_from_slice(&WKB_POINT.to_le_bytes());
            buffer.extend_from_slice(&point.longitude.to_le_bytes());
            buffer.extend_from_slice(&point.latitude.to_le_bytes());
        }
    }
    buffer
}

/// Decode an ISO WKB point. Both byte orders are accepted; other geometry
/// types are rejected.
pub fn wkb_to_point(bytes: &[u8]) -> Result<StationPoint> {
    let invalid = |reason: &str| ProcessingError::InvalidFormat(format!("Invalid WKB point: {}", reason));

    let (&order, rest) = bytes.split_first().ok_or_else(|| invalid("empty buffer"))?;
    let little_endian = match order {
        0 => false,
        1 => true,
        other => return Err(invalid(&format!("unknown byte order {}", other))),
    };

    let read_u32 = |slice: &[u8]| -> Result<u32> {
        let raw: [u8; 4] = slice
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| invalid("truncated geometry type"))?;
        Ok(if little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    };
    let read_f64 = |slice: &[u8], index: usize| -> Result<f64> {
        let start = 4 + index * 8;
        let raw: [u8; 8] = slice
            .get(start..start + 8)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| invalid("truncated coordinates"))?;
        Ok(if little_endian {
            f64::from_le_bytes(raw)
        } else {
            f64::from_be_bytes(raw)
        })
    };

    match read_u32(rest)? {
        WKB_POINT => Ok(StationPoint::new(read_f64(rest, 0)?, read_f64(rest, 1)?, None)),
        WKB_POINT_Z => Ok(StationPoint::new(
            read_f64(rest, 0)?,
            read_f64(rest, 1)?,
            Some(read_f64(rest, 2)?),
        )),
        other => Err(invalid(&format!("unsupported geometry type {}", other))),
    }
}

/// GeoParquet geometry type name of an encoded point
pub fn geometry_type_name(point: &StationPoint) -> &'static str {
    if point.has_elevation() {
        "Point Z"
    } else {
        "Point"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_z_layout() {
        let wkb = point_to_wkb(&StationPoint::new(-77.3197, 37.5052, Some(50.0)));
        assert_eq!(wkb.len(), 29);
        assert_eq!(wkb[0], 1);
        assert_eq!(&wkb[1..5], &1001u32.to_le_bytes());
        assert_eq!(&wkb[5..13], &(-77.3197f64).to_le_bytes());
    }

    #[test]
    fn test_point_without_elevation() -> Result<()> {
        let point = StationPoint::new(-157.9436, 21.3245, None);
        let wkb = point_to_wkb(&point);
        assert_eq!(wkb.len(), 21);
        assert_eq!(wkb_to_point(&wkb)?, point);
        assert_eq!(geometry_type_name(&point), "Point");
        Ok(())
    }

    #[test]
    fn test_big_endian_point() -> Result<()> {
        let mut wkb = vec![0u8];
        wkb.extend_from_slice(&1u32.to_be_bytes());
        wkb.extend_from_slice(&10.5f64.to_be_bytes());
        wkb.extend_from_slice(&(-20.25f64).to_be_bytes());

        let point = wkb_to_point(&wkb)?;
        assert_eq!(point.xy(), (10.5, -20.25));
        Ok(())
    }

    #[test]
    fn test_rejects_truncated_and_foreign_geometries() {
        assert!(wkb_to_point(&[]).is_err());
        assert!(wkb_to_point(&[1, 1, 0, 0, 0, 0]).is_err());

        let mut line = vec![1u8];
        line.extend_from_slice(&2u32.to_le_bytes());
        assert!(wkb_to_point(&line).is_err());
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate(" 37.5052 "), Some(37.5052));
        assert_eq!(parse_coordinate("M"), None);
        assert_eq!(parse_coordinate("NaN"), None);
    }
}
