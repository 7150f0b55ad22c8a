//! Great-circle geometry on geographic points.
//!
//! [`distance_km`] is the canonical distance metric for the whole crate: hub
//! selection, cost, risk and the consolidation scanner all measure with it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Role a point plays within a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointRole {
    Origin,
    Destination,
    Hub,
}

impl fmt::Display for PointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PointRole::Origin => "origin",
            PointRole::Destination => "destination",
            PointRole::Hub => "hub",
        };
        f.write_str(value)
    }
}

/// A labelled geographic location in decimal degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    latitude: f64,
    longitude: f64,
    label: String,
    role: PointRole,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64, label: impl Into<String>, role: PointRole) -> Self {
        Self {
            latitude,
            longitude,
            label: label.into(),
            role,
        }
    }

    pub fn origin(latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self::new(latitude, longitude, label, PointRole::Origin)
    }

    pub fn destination(latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self::new(latitude, longitude, label, PointRole::Destination)
    }

    pub fn hub(latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self::new(latitude, longitude, label, PointRole::Hub)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> PointRole {
        self.role
    }

    /// Copy of this point carrying a different role.
    pub fn with_role(&self, role: PointRole) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    /// Exact coordinate equality, ignoring label and role.
    pub fn same_location(&self, other: &Point) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }

    /// Reject NaN, infinite and out-of-range coordinates.
    ///
    /// `field` prefixes the error so callers can tell which point was bad
    /// (e.g. `"origin"` yields `invalid origin.latitude: ...`).
    pub fn validate(&self, field: &str) -> Result<()> {
        check_coordinate(self.latitude, 90.0, &format!("{field}.latitude"))?;
        check_coordinate(self.longitude, 180.0, &format!("{field}.longitude"))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
        } else {
            write!(
                f,
                "{} ({:.4}, {:.4})",
                self.label, self.latitude, self.longitude
            )
        }
    }
}

fn check_coordinate(value: f64, bound: f64, field: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::validation(
            field,
            format!("must be a finite number, got {value}"),
        ));
    }
    if !(-bound..=bound).contains(&value) {
        return Err(Error::validation(
            field,
            format!("must be within [-{bound}, {bound}], got {value}"),
        ));
    }
    Ok(())
}

/// Great-circle distance between two points using the haversine formula.
pub fn distance_km(a: &Point, b: &Point) -> f64 {
    if a.same_location(b) {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial great-circle bearing from `a` towards `b`, in degrees within `[0, 360)`.
pub fn initial_bearing_deg(a: &Point, b: &Point) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Total length of a polyline visiting `points` in order.
pub fn path_distance_km(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_km(&pair[0], &pair[1]))
        .sum()
}
