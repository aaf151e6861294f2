//! External geocoding and projection services.

use eudat_model::ServiceError;
use serde::{Deserialize, Serialize};

/// Label of the projection geocoders return coordinates in by default.
pub const WGS84: &str = "WGS84";

/// A point. In projected systems `lat` holds the northing and `lon` the
/// easting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Turns a free-text place into coordinates.
pub trait GeocodingService {
    /// Returns `Ok(None)` when the service knows no location for `place`.
    fn locate(&self, place: &str) -> Result<Option<Coordinates>, ServiceError>;

    /// Projection of the coordinates returned by [`Self::locate`].
    fn projection(&self) -> &str {
        WGS84
    }
}

/// Reprojects coordinates between named projections.
pub trait ProjectionService {
    fn transform(&self, point: Coordinates, from: &str, to: &str) -> Result<Coordinates, ServiceError>;
}
