//! Great-circle distance between two stations.
//!
//! Haversine formula, after https://www.movable-type.co.uk/scripts/latlong.html.
//! No coordinate validation: NaN in, NaN out.

use serde::Serialize;

const EARTH_RADIUS_MILES: f64 = 3963.1;
const EARTH_RADIUS_KM: f64 = 6378.137;

/// Unit for reported distances, selecting the earth radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RadiusMode {
    #[default]
    Miles,
    Kilometers,
}

impl RadiusMode {
    pub fn radius(&self) -> f64 {
        match self {
            RadiusMode::Miles => EARTH_RADIUS_MILES,
            RadiusMode::Kilometers => EARTH_RADIUS_KM,
        }
    }

    /// Short unit label for display.
    pub fn unit(&self) -> &'static str {
        match self {
            RadiusMode::Miles => "miles",
            RadiusMode::Kilometers => "km",
        }
    }
}

impl std::str::FromStr for RadiusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(RadiusMode::Miles),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                Ok(RadiusMode::Kilometers)
            }
            other => Err(format!("unknown distance unit: {other}")),
        }
    }
}

/// Haversine trig function: sin^2(theta / 2).
fn hav(theta: f64) -> f64 {
    (1.0 - theta.cos()) / 2.0
}

/// Great-circle distance between two lat/lon points, in `mode` units.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, mode: RadiusMode) -> f64 {
    let dlat = (lat2 - lat1).abs().to_radians();
    let dlon = (lon2 - lon1).abs().to_radians();

    let theta = hav(dlat) + lat1.to_radians().cos() * lat2.to_radians().cos() * hav(dlon);

    mode.radius() * 2.0 * theta.sqrt().atan2((1.0 - theta).sqrt())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_la_to_nyc_miles() {
        let d = haversine_distance(34.0594, 118.2426, 40.7128, 74.0060, RadiusMode::Miles);
        assert!((d - 2447.982251179628).abs() < 1e-9, "LA->NYC = {d}");
    }

    #[test]
    fn test_dc_to_paris_km() {
        let d = haversine_distance(38.898, 77.037, 48.858, -2.294, RadiusMode::Kilometers);
        assert!((d - 6168.34).abs() < 0.01, "DC->Paris = {d}");
    }

    #[test]
    fn test_same_point() {
        let d = haversine_distance(47.1313, 121.5061, 47.1313, 121.5061, RadiusMode::Miles);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            (34.0594, 118.2426, 40.7128, 74.0060),
            (47.1313, 121.5061, 47.6, 122.3),
            (-33.86, 151.21, 51.5, -0.12),
        ];
        for (a, b, c, d) in pairs {
            let there = haversine_distance(a, b, c, d, RadiusMode::Kilometers);
            let back = haversine_distance(c, d, a, b, RadiusMode::Kilometers);
            assert!((there - back).abs() < 1e-9, "{there} != {back}");
        }
    }

    #[test]
    fn test_nan_propagates() {
        let d = haversine_distance(f64::NAN, 0.0, 10.0, 10.0, RadiusMode::Miles);
        assert!(d.is_nan());
    }

    #[test]
    fn test_radius_mode_parse() {
        assert_eq!("miles".parse::<RadiusMode>(), Ok(RadiusMode::Miles));
        assert_eq!("KM".parse::<RadiusMode>(), Ok(RadiusMode::Kilometers));
        assert!("furlongs".parse::<RadiusMode>().is_err());
        assert_eq!(RadiusMode::default(), RadiusMode::Miles);
    }
}
