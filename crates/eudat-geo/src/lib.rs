//! Location resolution.
//!
//! Every harmonised record ends up with latitude and longitude columns,
//! taken from a combined coordinate column, from two separate columns, or
//! geocoded from an address assembled out of place components. Coordinates
//! are then projected into the requested output projection.

pub mod projection;
pub mod quality;
pub mod resolver;
pub mod service;

pub use projection::{BuiltinProjection, Crs};
pub use quality::GeoQuality;
pub use resolver::{
    CoordinateOrder, LocateOptions, LocateStrategy, LocationOutcome, LocationResolver,
};
pub use service::{Coordinates, GeocodingService, ProjectionService, WGS84};
