use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

/// Temporal resolution of a normals record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
    Monthly,
    AnnualSeasonal,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Monthly,
        Frequency::AnnualSeasonal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
            Frequency::AnnualSeasonal => "annualseasonal",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Frequency::Hourly => "Hourly",
            Frequency::Daily => "Daily",
            Frequency::Monthly => "Monthly",
            Frequency::AnnualSeasonal => "Annual/Seasonal",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ProcessingError::InvalidFormat(format!("Unknown frequency: '{}'", s)))
    }
}

/// Historical range over which the normals were computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1981-2010")]
    Period1981To2010,
    #[serde(rename = "1991-2020")]
    Period1991To2020,
    #[serde(rename = "2006-2020")]
    Period2006To2020,
}

impl Period {
    pub const ALL: [Period; 3] = [
        Period::Period1981To2010,
        Period::Period1991To2020,
        Period::Period2006To2020,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Period1981To2010 => "1981-2010",
            Period::Period1991To2020 => "1991-2020",
            Period::Period2006To2020 => "2006-2020",
        }
    }

    pub fn start_year(&self) -> i32 {
        match self {
            Period::Period1981To2010 => 1981,
            Period::Period1991To2020 => 1991,
            Period::Period2006To2020 => 2006,
        }
    }

    pub fn end_year(&self) -> i32 {
        match self {
            Period::Period1981To2010 => 2010,
            Period::Period1991To2020 | Period::Period2006To2020 => 2020,
        }
    }

    /// First and last instant covered by the period, in UTC
    pub fn datetime_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc
            .with_ymd_and_hms(self.start_year(), 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        let end = Utc
            .with_ymd_and_hms(self.end_year(), 12, 31, 23, 59, 59)
            .single()
            .unwrap_or_default();
        (start, end)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| ProcessingError::InvalidFormat(format!("Unknown period: '{}'", s)))
    }
}

/// A single (frequency, period) dataset variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetKey {
    pub frequency: Frequency,
    pub period: Period,
}

impl DatasetKey {
    pub fn new(frequency: Frequency, period: Period) -> Self {
        Self { frequency, period }
    }

    /// Key of the column-metadata document, e.g. `monthly_1991-2020`
    pub fn catalog_key(&self) -> String {
        format!("{}_{}", self.frequency, self.period)
    }

    /// Identifier used for the output artifact, e.g. `1991_2020-monthly`
    pub fn id(&self) -> String {
        format!("{}-{}", self.period.as_str().replace('-', "_"), self.frequency)
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.catalog_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_round_trip() {
        for frequency in Frequency::ALL {
            assert_eq!(frequency.as_str().parse::<Frequency>().unwrap(), frequency);
        }
        assert_eq!("Monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert!("weekly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_period_parse() {
        assert_eq!(
            "1991-2020".parse::<Period>().unwrap(),
            Period::Period1991To2020
        );
        assert!("1991-2010".parse::<Period>().is_err());
    }

    #[test]
    fn test_dataset_identifiers() {
        let key = DatasetKey::new(Frequency::AnnualSeasonal, Period::Period1981To2010);
        assert_eq!(key.catalog_key(), "annualseasonal_1981-2010");
        assert_eq!(key.id(), "1981_2010-annualseasonal");
    }

    #[test]
    fn test_period_datetime_range() {
        let (start, end) = Period::Period2006To2020.datetime_range();
        assert_eq!(start.to_rfc3339(), "2006-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2020-12-31T23:59:59+00:00");
    }
}
