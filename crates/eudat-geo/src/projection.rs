//! Offline projection between WGS84 and spherical Web Mercator.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;

use eudat_model::ServiceError;

use crate::service::{Coordinates, ProjectionService};

const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Latitude beyond which Web Mercator is undefined.
const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Coordinate reference systems known to [`BuiltinProjection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    Wgs84,
    WebMercator,
}

impl Crs {
    /// Recognises common spellings: names, EPSG codes and proj4 strings.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let code = normalized.strip_prefix("epsg:").unwrap_or(&normalized);
        match code {
            "wgs84" | "wgs 84" | "4326" | "latlon" | "longlat" => Some(Crs::Wgs84),
            "3857" | "900913" | "3785" | "webmercator" | "web mercator" | "pseudo-mercator" => {
                Some(Crs::WebMercator)
            }
            proj4 if proj4.starts_with("+proj=longlat") => Some(Crs::Wgs84),
            proj4 if proj4.starts_with("+proj=merc") => Some(Crs::WebMercator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Crs::Wgs84 => "WGS84",
            Crs::WebMercator => "EPSG:3857",
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether two projection labels name the same system.
pub fn same_projection(a: &str, b: &str) -> bool {
    match (Crs::parse(a), Crs::parse(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

/// Projection service for WGS84 and Web Mercator, needing no network.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProjection;

impl BuiltinProjection {
    fn to_mercator(point: Coordinates) -> Result<Coordinates, ServiceError> {
        if point.lat.abs() > MERCATOR_MAX_LAT || point.lon.abs() > 180.0 {
            return Err(ServiceError::Rejected(format!(
                "({}, {}) is outside the web mercator domain",
                point.lat, point.lon
            )));
        }
        let x = EARTH_RADIUS_M * point.lon.to_radians();
        let y = EARTH_RADIUS_M * (FRAC_PI_4 + point.lat.to_radians() / 2.0).tan().ln();
        Ok(Coordinates::new(y, x))
    }

    fn from_mercator(point: Coordinates) -> Coordinates {
        let lon = (point.lon / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (point.lat / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
        Coordinates::new(lat, lon)
    }
}

impl ProjectionService for BuiltinProjection {
    fn transform(&self, point: Coordinates, from: &str, to: &str) -> Result<Coordinates, ServiceError> {
        let source = Crs::parse(from)
            .ok_or_else(|| ServiceError::Rejected(format!("unsupported projection '{from}'")))?;
        let target = Crs::parse(to)
            .ok_or_else(|| ServiceError::Rejected(format!("unsupported projection '{to}'")))?;
        match (source, target) {
            (a, b) if a == b => Ok(point),
            (Crs::Wgs84, Crs::WebMercator) => Self::to_mercator(point),
            (Crs::WebMercator, Crs::Wgs84) => Ok(Self::from_mercator(point)),
            _ => Err(ServiceError::Rejected(format!(
                "no transformation from '{from}' to '{to}'"
            ))),
        }
    }
}
