use serde::{Deserialize, Serialize};
use validator::Validate;

/// Location of a single station row, in the dataset's geographic CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationPoint {
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    pub elevation: Option<f64>,
}

impl StationPoint {
    pub fn new(longitude: f64, latitude: f64, elevation: Option<f64>) -> Self {
        Self {
            longitude,
            latitude,
            elevation,
        }
    }

    pub fn has_elevation(&self) -> bool {
        self.elevation.is_some()
    }

    /// Planar (longitude, latitude) pair
    pub fn xy(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }
}
