//! Distance helpers for location-aware ranking.

use serde::{Deserialize, Serialize};

use crate::types::{Coordinates, Service};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radii (km) reported as "Within N km" reasons, smallest first.
pub const DISTANCE_BANDS_KM: [u32; 4] = [1, 5, 10, 25];

/// Great-circle distance in kilometres.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Distance from the user to a service; `None` when either side has no
/// usable coordinates.
pub fn service_distance_km(user: &Coordinates, service: &Service) -> Option<f64> {
    let theirs = service.coordinates.as_ref()?;
    if !user.is_valid() || !theirs.is_valid() {
        return None;
    }
    Some(haversine_km(user, theirs))
}

/// Smallest band that contains `km`.
pub fn distance_band(km: f64) -> Option<u32> {
    DISTANCE_BANDS_KM.iter().copied().find(|&band| km <= f64::from(band))
}

/// Linear falloff from `weight` at 0 km to 0 at `radius_km`.
pub fn proximity_bonus(km: f64, radius_km: f64, weight: f32) -> f32 {
    if radius_km <= 0.0 {
        return 0.0;
    }
    let closeness = 1.0 - (km.min(radius_km) / radius_km);
    (closeness as f32) * weight
}

/// Explicit geographic restriction requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScopeFilter {
    /// Drop services known to be farther than `radius_km`. Services without
    /// usable coordinates are kept.
    LocalOnly { radius_km: f64 },
}

impl ScopeFilter {
    pub fn admits(&self, distance_km: Option<f64>) -> bool {
        match (self, distance_km) {
            (ScopeFilter::LocalOnly { radius_km }, Some(d)) => d <= *radius_km,
            (ScopeFilter::LocalOnly { .. }, None) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // Ottawa -> Montreal is roughly 166 km.
        let ottawa = Coordinates::new(45.4215, -75.6972);
        let montreal = Coordinates::new(45.5019, -73.5674);
        let d = haversine_km(&ottawa, &montreal);
        assert!((d - 166.0).abs() < 3.0, "d={d}");
        assert!(haversine_km(&ottawa, &ottawa) < 1e-9);
    }

    #[test]
    fn bands_and_bonus() {
        assert_eq!(distance_band(0.4), Some(1));
        assert_eq!(distance_band(4.9), Some(5));
        assert_eq!(distance_band(30.0), None);
        assert!((proximity_bonus(0.0, 25.0, 10.0) - 10.0).abs() < 1e-6);
        assert_eq!(proximity_bonus(50.0, 25.0, 10.0), 0.0);
    }

    #[test]
    fn invalid_coordinates_have_no_distance() {
        let mut s = Service::new("s", "Somewhere", crate::types::Category::Food);
        s.coordinates = Some(Coordinates::new(123.0, 0.0));
        assert!(service_distance_km(&Coordinates::new(45.0, -75.0), &s).is_none());
    }
}
