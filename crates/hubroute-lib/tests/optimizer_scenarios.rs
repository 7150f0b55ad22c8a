mod common;

use chrono::NaiveDate;
use hubroute_lib::{
    cost_of, distance_km, CostTable, DetourTolerance, OptimizationRequest, OptimizerConfig,
    PointRole, RiskLevel, RouteConstraints, RouteOptimizer, VehicleClass,
};

use common::*;

#[test]
fn direct_north_south_route() {
    let result = RouteOptimizer::with_defaults()
        .optimize(&north_south_request())
        .expect("route computes");

    assert!(
        (1130.0..=1160.0).contains(&result.distance_km()),
        "distance {}",
        result.distance_km()
    );
    assert_eq!(result.waypoints().len(), 2);
    assert!(!result.hub_used());
    assert_eq!(result.risk_level(), RiskLevel::High);

    let cost = result.cost();
    assert!((cost.total - (cost.fuel + cost.tolls + cost.labor)).abs() < 1e-6);
    assert!((result.duration_min() - result.distance_km() / 50.0 * 60.0).abs() < 1e-6);
    assert!(result
        .recommendations()
        .iter()
        .any(|r| r.starts_with("Plan 3 refuelling stops")));
}

#[test]
fn best_hub_within_tolerance_is_used() {
    let request = north_south_request().with_hubs([da_nang(), vinh()]);
    let result = RouteOptimizer::with_defaults().optimize(&request).unwrap();

    assert!(result.hub_used());
    let hub = result.hub().unwrap();
    assert_eq!(hub.label(), "Vinh");
    assert_eq!(hub.role(), PointRole::Hub);
    assert!(result.distance_km() > result.direct_distance_km());
    assert!(result.distance_km() <= result.direct_distance_km() * 1.15);
    assert!(result
        .recommendations()
        .iter()
        .any(|r| r.starts_with("Route via hub Vinh")));

    let direct = RouteOptimizer::with_defaults()
        .optimize(&north_south_request())
        .unwrap();
    // hub handling time on top of the longer drive
    assert!(result.duration_min() > direct.duration_min() + 45.0);
}

#[test]
fn tolerance_preset_decides_borderline_hub() {
    let request = north_south_request().with_hubs([nha_trang()]);

    let strict = RouteOptimizer::with_defaults().optimize(&request).unwrap();
    assert!(!strict.hub_used());

    let relaxed = RouteOptimizer::new(
        OptimizerConfig {
            detour_tolerance: DetourTolerance::RELAXED,
            ..OptimizerConfig::default()
        },
        CostTable::default(),
    )
    .unwrap()
    .optimize(&request)
    .unwrap();
    assert!(relaxed.hub_used());
    assert_eq!(relaxed.hub().unwrap().label(), "Nha Trang");
}

#[test]
fn truck_cost_for_one_hundred_km() {
    let cost = cost_of(100.0, VehicleClass::Truck, &CostTable::default());
    assert_eq!(cost.fuel, 600_000.0);
    assert_eq!(cost.tolls, 150_000.0);
    assert_eq!(cost.labor, 250_000.0);
    assert_eq!(cost.total, 1_000_000.0);
}

#[test]
fn typhoon_season_departure_adds_advisory_and_risk() {
    let short = OptimizationRequest::new(hanoi_as_origin(), hai_phong(), VehicleClass::Van);
    let calm = RouteOptimizer::with_defaults().optimize(&short).unwrap();
    assert_eq!(calm.risk_level(), RiskLevel::Low);

    let stormy = RouteOptimizer::with_defaults()
        .optimize(&short.with_departure(NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()))
        .unwrap();
    assert_eq!(stormy.risk_level(), RiskLevel::Medium);
    assert!(stormy.quality_score() < calm.quality_score());
    assert!(stormy
        .recommendations()
        .iter()
        .any(|r| r.starts_with("Weather advisory")));
}

#[test]
fn limits_are_soft() {
    let request = north_south_request().with_constraints(RouteConstraints {
        max_distance_km: Some(800.0),
        ..RouteConstraints::default()
    });
    let result = RouteOptimizer::with_defaults().optimize(&request).unwrap();
    assert!(result.is_unreachable());
    assert_eq!(result.unreachable().len(), 1);
    assert!(result.unreachable()[0].actual > 800.0);
    assert!(result.quality_score() < 75.0);
}

#[test]
fn same_origin_and_destination_is_zero_route() {
    let request = OptimizationRequest::new(hcmc(), hcmc(), VehicleClass::Car);
    let result = RouteOptimizer::with_defaults().optimize(&request).unwrap();
    assert_eq!(result.distance_km(), 0.0);
    assert_eq!(result.cost().total, 0.0);
    assert_eq!(result.quality_score(), 100.0);
    assert_eq!(result.risk_level(), RiskLevel::Low);
    assert_eq!(result.waypoints().len(), 2);
}

#[test]
fn out_of_range_coordinates_fail_validation() {
    let mut request = north_south_request();
    request.destination = hubroute_lib::Point::destination(21.0, 181.0, "bad");
    let err = RouteOptimizer::with_defaults().optimize(&request).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("destination.longitude"));
}

#[test]
fn route_invariants_hold_across_city_pairs() {
    let cities = [hcmc(), hanoi(), vinh(), da_nang(), hue(), nha_trang(), can_tho(), hai_phong()];
    let hubs = [vinh(), da_nang(), hue()];
    let optimizer = RouteOptimizer::with_defaults();

    for origin in &cities {
        for destination in &cities {
            let there = distance_km(origin, destination);
            let back = distance_km(destination, origin);
            assert!((there - back).abs() < 1e-9);

            let request = OptimizationRequest::new(
                origin.with_role(PointRole::Origin),
                destination.with_role(PointRole::Destination),
                VehicleClass::Truck,
            )
            .with_hubs(hubs.clone());
            let result = optimizer.optimize(&request).unwrap();

            let waypoints = result.waypoints();
            assert!(waypoints.first().unwrap().same_location(origin));
            assert!(waypoints.last().unwrap().same_location(destination));
            assert!(result.distance_km() >= 0.0);
            assert!((0.0..=100.0).contains(&result.quality_score()));
            let cost = result.cost();
            assert!((cost.total - (cost.fuel + cost.tolls + cost.labor)).abs() < 1e-6);
        }
    }
}

fn hanoi_as_origin() -> hubroute_lib::Point {
    hanoi().with_role(PointRole::Origin)
}
