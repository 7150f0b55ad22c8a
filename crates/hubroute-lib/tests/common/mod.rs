//! Shared fixtures for integration tests.
//!
//! Coordinates are city centres in Vietnam; distances quoted in tests are the
//! haversine values for these exact points.

use hubroute_lib::{OptimizationRequest, Point, VehicleClass};

#[allow(dead_code)]
pub fn hcmc() -> Point {
    Point::origin(10.8231, 106.6297, "Ho Chi Minh City")
}

#[allow(dead_code)]
pub fn hanoi() -> Point {
    Point::destination(21.0285, 105.8542, "Hanoi")
}

#[allow(dead_code)]
pub fn vinh() -> Point {
    Point::hub(18.6796, 105.6813, "Vinh")
}

#[allow(dead_code)]
pub fn da_nang() -> Point {
    Point::hub(16.0544, 108.2022, "Da Nang")
}

#[allow(dead_code)]
pub fn hue() -> Point {
    Point::hub(16.4637, 107.5909, "Hue")
}

#[allow(dead_code)]
pub fn nha_trang() -> Point {
    Point::hub(12.2388, 109.1967, "Nha Trang")
}

#[allow(dead_code)]
pub fn can_tho() -> Point {
    Point::origin(10.0452, 105.7469, "Can Tho")
}

#[allow(dead_code)]
pub fn hai_phong() -> Point {
    Point::destination(20.8449, 106.6881, "Hai Phong")
}

/// Truck from Ho Chi Minh City to Hanoi with no hubs or constraints.
#[allow(dead_code)]
pub fn north_south_request() -> OptimizationRequest {
    OptimizationRequest::new(hcmc(), hanoi(), VehicleClass::Truck)
}

/// Poll `condition` until it holds or five seconds pass.
#[allow(dead_code)]
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    condition()
}
