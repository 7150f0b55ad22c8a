//! Content-addressed cache keys for optimisation requests.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::geo::Point;
use crate::optimizer::OptimizationRequest;

/// Prefix shared by every route result key.
pub const ROUTE_KEY_PREFIX: &str = "route:";

/// Deterministic key for a request: `route:` followed by the hex SHA-256 of
/// its canonical form. Requests that differ in any field that affects the
/// result get different keys; field order in memory is irrelevant.
pub fn cache_key(request: &OptimizationRequest) -> String {
    let digest = Sha256::digest(canonical_form(request).as_bytes());
    format!("{ROUTE_KEY_PREFIX}{}", hex::encode(digest))
}

pub(crate) fn canonical_form(request: &OptimizationRequest) -> String {
    let mut out = String::from("v2");
    let _ = write!(out, "|o:{}", point_form(&request.origin));
    let _ = write!(out, "|d:{}", point_form(&request.destination));
    let _ = write!(out, "|veh:{}", request.vehicle.as_str());

    out.push_str("|hubs:");
    for hub in &request.candidate_hubs {
        out.push_str(&point_form(hub));
        out.push(';');
    }

    let c = &request.constraints;
    let _ = write!(out, "|max_d:{}", optional(c.max_distance_km));
    let _ = write!(out, "|max_t:{}", optional(c.max_duration_min));
    let _ = write!(out, "|tolls:{}", u8::from(c.avoid_tolls));
    let _ = write!(out, "|hw:{}", u8::from(c.avoid_highways));
    match request.departure {
        Some(date) => {
            let _ = write!(out, "|dep:{}", date.format("%Y-%m-%d"));
        }
        None => out.push_str("|dep:-"),
    }
    out
}

// `{:?}` prints the shortest decimal that round-trips, so distinct
// coordinates never share a form. Labels are length-prefixed so separator
// characters inside them cannot forge another request's layout.
fn point_form(point: &Point) -> String {
    format!(
        "{:?},{:?},{}:{}",
        point.latitude(),
        point.longitude(),
        point.label().len(),
        point.label()
    )
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:?}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::cost::VehicleClass;
    use crate::optimizer::RouteConstraints;

    fn request() -> OptimizationRequest {
        OptimizationRequest::new(
            Point::origin(10.8231, 106.6297, "Ho Chi Minh City"),
            Point::destination(21.0285, 105.8542, "Hanoi"),
            VehicleClass::Truck,
        )
    }

    #[test]
    fn canonical_form_layout() {
        let req = request()
            .with_hubs([Point::hub(18.6796, 105.6813, "Vinh")])
            .with_departure(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(
            canonical_form(&req),
            "v2|o:10.8231,106.6297,16:Ho Chi Minh City|d:21.0285,105.8542,5:Hanoi\
             |veh:truck|hubs:18.6796,105.6813,4:Vinh;|max_d:-|max_t:-|tolls:0|hw:0|dep:2025-10-01"
        );
    }

    #[test]
    fn key_is_stable_and_prefixed() {
        let a = cache_key(&request());
        let b = cache_key(&request());
        assert_eq!(a, b);
        assert!(a.starts_with(ROUTE_KEY_PREFIX));
        assert_eq!(a.len(), ROUTE_KEY_PREFIX.len() + 64);
    }

    #[test]
    fn any_relevant_field_changes_the_key() {
        let base = cache_key(&request());
        let mut van = request();
        van.vehicle = VehicleClass::Van;
        let tolls = request().with_constraints(RouteConstraints {
            avoid_tolls: true,
            ..RouteConstraints::default()
        });
        let hubbed = request().with_hubs([Point::hub(16.0544, 108.2022, "Da Nang")]);
        for other in [van, tolls, hubbed] {
            assert_ne!(cache_key(&other), base);
        }
    }

    #[test]
    fn sub_micro_degree_moves_change_the_key() {
        let a = OptimizationRequest::new(
            Point::origin(10.0, 106.0, ""),
            Point::destination(21.0, 105.0, ""),
            VehicleClass::Truck,
        );
        let mut b = a.clone();
        b.origin = Point::origin(10.000_000_4, 106.0, "");
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn separators_inside_labels_cannot_collide() {
        let split = request().with_hubs([
            Point::hub(18.0, 105.0, "A"),
            Point::hub(17.0, 106.0, "B"),
        ]);
        let forged = request().with_hubs([Point::hub(18.0, 105.0, "A;17.0,106.0,B")]);
        assert_ne!(canonical_form(&split), canonical_form(&forged));
        assert_ne!(cache_key(&split), cache_key(&forged));

        let piped = OptimizationRequest::new(
            Point::origin(10.8231, 106.6297, "x|d:1.0,2.0,y"),
            Point::destination(21.0285, 105.8542, "Hanoi"),
            VehicleClass::Truck,
        );
        assert_ne!(cache_key(&piped), cache_key(&request()));
    }
}
