//! Value parsers for command-line arguments.

use std::str::FromStr;

use hubroute_lib::{DetourTolerance, Point, PointRole};

/// A point written as `LAT,LON` or `LAT,LON,LABEL`.
///
/// Labels may contain commas; everything after the second comma is the label.
#[derive(Debug, Clone, PartialEq)]
pub struct PointArg {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl PointArg {
    pub fn into_point(self, role: PointRole) -> Point {
        Point::new(self.latitude, self.longitude, self.label, role)
    }
}

impl FromStr for PointArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ',');
        let latitude = parse_coordinate(parts.next(), "latitude", s)?;
        let longitude = parse_coordinate(parts.next(), "longitude", s)?;
        let label = parts.next().map(|l| l.trim().to_string()).unwrap_or_default();
        Ok(Self {
            latitude,
            longitude,
            label,
        })
    }
}

fn parse_coordinate(part: Option<&str>, name: &str, whole: &str) -> Result<f64, String> {
    let part = part.ok_or_else(|| format!("expected LAT,LON[,LABEL], got '{whole}'"))?;
    part.trim()
        .parse::<f64>()
        .map_err(|_| {
            format!(
                "invalid {name} '{}' in '{whole}', expected LAT,LON[,LABEL]",
                part.trim()
            )
        })
}

/// Clap value parser for `--tolerance`.
pub fn parse_tolerance(s: &str) -> Result<DetourTolerance, String> {
    DetourTolerance::parse(s).map_err(|e| e.to_string())
}
