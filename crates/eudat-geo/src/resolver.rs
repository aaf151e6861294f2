//! Resolution of the geographic fields of a dataset.
//!
//! Strategies are tried in a fixed order:
//!
//! 1. one column nominated for both `lat` and `lon`, split into two;
//! 2. two columns nominated for `lat` and `lon`, renamed;
//! 3. a place string assembled from address components, geocoded row by
//!    row.
//!
//! Coordinates are then projected when the input and output projections
//! differ, and cast to the types the target schema declares.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use eudat_map::{ColumnCatalog, ColumnMatcher, MatchOptions, Translator};
use eudat_model::{
    ColumnRef, DEFAULT_PLACE_COMPONENTS, FieldKey, HarmonizeError, Issue, IssueKind, LanguageCode,
    ResolutionMap, Result, RetryPolicy, SemanticType, TargetSchema, keys,
};
use eudat_transform::values::parse_f64;
use eudat_transform::{DatetimeFormats, cast_column, column_names, column_values, has_column, join_place};
use polars::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::projection::same_projection;
use crate::quality::GeoQuality;
use crate::service::{Coordinates, GeocodingService, ProjectionService, WGS84};

const PLACE_SEPARATOR: &str = ", ";

/// Order of the two halves of a combined coordinate value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinateOrder {
    /// `"lL"`: latitude first.
    #[default]
    LatLon,
    /// `"Ll"`: longitude first.
    LonLat,
}

impl CoordinateOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateOrder::LatLon => "lL",
            CoordinateOrder::LonLat => "Ll",
        }
    }
}

impl fmt::Display for CoordinateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordinateOrder {
    type Err = HarmonizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "lL" => Ok(CoordinateOrder::LatLon),
            "Ll" => Ok(CoordinateOrder::LonLat),
            other => Err(HarmonizeError::InvalidCoordinateOrder(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocateOptions {
    pub order: CoordinateOrder,
    /// Field keys concatenated, in order, into the place string.
    pub place_components: Vec<FieldKey>,
    /// Projection of coordinates found in the dataset.
    pub input_projection: Option<String>,
    pub output_projection: Option<String>,
    pub output_language: LanguageCode,
    /// Explicit `(lat, lon)` columns, bypassing field resolution. Both may
    /// name the same column.
    pub coordinates: Option<(String, String)>,
    /// Translate missing output-language labels once before matching.
    pub prepare_labels: bool,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            order: CoordinateOrder::default(),
            place_components: DEFAULT_PLACE_COMPONENTS
                .iter()
                .filter_map(|key| FieldKey::new(*key).ok())
                .collect(),
            input_projection: None,
            output_projection: None,
            output_language: LanguageCode::english(),
            coordinates: None,
            prepare_labels: true,
        }
    }
}

/// Which strategy produced the coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateStrategy {
    SplitColumn { column: String },
    SeparateColumns { lat: String, lon: String },
    Geocoded { place: String },
}

#[derive(Debug, Clone)]
pub struct LocationOutcome {
    pub strategy: LocateStrategy,
    pub quality: GeoQuality,
    /// Geographic fields mapped onto their canonical output columns.
    pub resolution: ResolutionMap,
    /// Projection the coordinates are expressed in, when known.
    pub projection: Option<String>,
    pub issues: Vec<Issue>,
}

enum Lookup {
    Found(Coordinates),
    NotFound,
    Failed,
}

/// Builds canonical latitude and longitude columns.
pub struct LocationResolver<'a> {
    schema: &'a TargetSchema,
    geocoder: Option<&'a dyn GeocodingService>,
    projector: Option<&'a dyn ProjectionService>,
    translator: Option<&'a dyn Translator>,
    retry: RetryPolicy,
}

impl<'a> LocationResolver<'a> {
    pub fn new(schema: &'a TargetSchema) -> Self {
        Self {
            schema,
            geocoder: None,
            projector: None,
            translator: None,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Option<&'a dyn GeocodingService>) -> Self {
        self.geocoder = geocoder;
        self
    }

    #[must_use]
    pub fn with_projector(mut self, projector: Option<&'a dyn ProjectionService>) -> Self {
        self.projector = projector;
        self
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Option<&'a dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Adds canonical `lat`/`lon` columns to `df`.
    ///
    /// # Errors
    ///
    /// - [`HarmonizeError::NoLocationSource`] when neither coordinates nor
    ///   place components can be found
    /// - [`HarmonizeError::ProjectionFailed`] when coordinates cannot be
    ///   brought into the output projection
    ///
    /// Geocoding failures and failed casts are returned as issues.
    pub fn resolve(
        &self,
        df: &mut DataFrame,
        catalog: &mut ColumnCatalog,
        hints: &ResolutionMap,
        options: &LocateOptions,
    ) -> Result<LocationOutcome> {
        let span = info_span!("locate", rows = df.height());
        let _guard = span.enter();

        let lat_name = self.schema.output_name(keys::LAT).to_string();
        let lon_name = self.schema.output_name(keys::LON).to_string();
        let mut issues = Vec::new();
        let mut resolution = ResolutionMap::new();

        if options.coordinates.is_none()
            && options.prepare_labels
            && let Some(issue) =
                catalog.ensure_language(options.output_language, self.translator, &self.retry, false)
        {
            issues.push(issue);
        }

        let sources = match &options.coordinates {
            Some((lat, lon)) => {
                for column in [lat, lon] {
                    if !has_column(df, column) {
                        return Err(HarmonizeError::NoLocationSource(format!(
                            "coordinate column '{column}' not in dataset"
                        )));
                    }
                }
                Some((lat.clone(), lon.clone()))
            }
            None => self.match_coordinates(df, catalog, hints, options, &mut issues)?,
        };

        let (strategy, quality, input_projection) = match sources {
            Some((lat, lon)) if lat == lon => {
                self.split_column(df, &lat, &lat_name, &lon_name, options.order, &mut issues)?;
                (
                    LocateStrategy::SplitColumn { column: lat },
                    GeoQuality::Direct,
                    options.input_projection.clone(),
                )
            }
            Some((lat, lon)) => {
                rename_pair(df, (lat.as_str(), lon.as_str()), (lat_name.as_str(), lon_name.as_str()))?;
                (
                    LocateStrategy::SeparateColumns { lat, lon },
                    GeoQuality::Direct,
                    options.input_projection.clone(),
                )
            }
            None => {
                let place = self.build_place(df, catalog, hints, options, &mut issues)?;
                let place_key = FieldKey::new(keys::PLACE)?;
                resolution.set(place_key, Some(ColumnRef::single(place.as_str())));
                let places = column_values(df, &place)?;
                let (lats, lons) = self.geocode(&places, &mut issues);
                df.with_column(Series::new(lat_name.as_str().into(), lats))?;
                df.with_column(Series::new(lon_name.as_str().into(), lons))?;
                let projection = self
                    .geocoder
                    .map_or(WGS84, |geocoder| geocoder.projection())
                    .to_string();
                (
                    LocateStrategy::Geocoded { place },
                    GeoQuality::GeocodedUnscored,
                    Some(projection),
                )
            }
        };
        debug!(strategy = ?strategy, "coordinates located");

        let geo_qual_name = self.schema.output_name(keys::GEO_QUAL).to_string();
        match quality.flag() {
            Some(flag) => {
                df.with_column(Series::new(geo_qual_name.as_str().into(), vec![flag; df.height()]))?;
                resolution.set(FieldKey::new(keys::GEO_QUAL)?, Some(ColumnRef::single(geo_qual_name)));
            }
            None if self.schema.contains(keys::GEO_QUAL) => {
                let nulls = Series::full_null(geo_qual_name.as_str().into(), df.height(), &DataType::Int64);
                df.with_column(nulls)?;
                resolution.set(FieldKey::new(keys::GEO_QUAL)?, Some(ColumnRef::single(geo_qual_name)));
            }
            None => {}
        }

        let projection = self.project(
            df,
            (lat_name.as_str(), lon_name.as_str()),
            input_projection,
            options.output_projection.as_deref(),
        )?;

        for (key, name) in [(keys::LAT, &lat_name), (keys::LON, &lon_name)] {
            let semantic = self
                .schema
                .get(key)
                .map_or(SemanticType::Float, |spec| spec.semantic);
            if let Some(issue) = cast_column(df, key, name, semantic, &DatetimeFormats::default())? {
                issues.push(issue);
            }
            resolution.set(FieldKey::new(key)?, Some(ColumnRef::single(name.as_str())));
        }

        info!(
            strategy = ?strategy,
            quality = %quality,
            projection = projection.as_deref().unwrap_or("unknown"),
            issues = issues.len(),
            "location resolved"
        );
        Ok(LocationOutcome {
            strategy,
            quality,
            resolution,
            projection,
            issues,
        })
    }

    fn match_coordinates(
        &self,
        df: &DataFrame,
        catalog: &mut ColumnCatalog,
        hints: &ResolutionMap,
        options: &LocateOptions,
        issues: &mut Vec<Issue>,
    ) -> Result<Option<(String, String)>> {
        let requested = [FieldKey::new(keys::LAT)?, FieldKey::new(keys::LON)?];
        let result = ColumnMatcher::new(catalog, self.schema)
            .with_translator(self.translator)
            .with_retry(self.retry)
            .resolve(
                Some(&requested),
                hints,
                &column_names(df),
                &MatchOptions {
                    force_keep: false,
                    output_language: options.output_language,
                    prepare_labels: false,
                },
            )?;
        issues.extend(
            result
                .issues
                .iter()
                .filter(|issue| issue.kind != IssueKind::ColumnNotFound)
                .cloned(),
        );
        Ok(match (result.column(keys::LAT), result.column(keys::LON)) {
            (Some(lat), Some(lon)) => Some((lat.to_string(), lon.to_string())),
            _ => None,
        })
    }

    fn split_column(
        &self,
        df: &mut DataFrame,
        source: &str,
        lat_name: &str,
        lon_name: &str,
        order: CoordinateOrder,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        let values = column_values(df, source)?;
        let mut lats = Vec::with_capacity(values.len());
        let mut lons = Vec::with_capacity(values.len());
        let mut malformed = 0;
        for value in &values {
            let pair = value.as_deref().and_then(split_pair);
            if value.as_deref().is_some_and(|v| !v.trim().is_empty()) && pair.is_none() {
                malformed += 1;
            }
            let (lat, lon) = match (pair, order) {
                (Some((first, second)), CoordinateOrder::LatLon) => (Some(first), Some(second)),
                (Some((first, second)), CoordinateOrder::LonLat) => (Some(second), Some(first)),
                (None, _) => (None, None),
            };
            lats.push(lat);
            lons.push(lon);
        }
        df.with_column(Series::new(lat_name.into(), lats))?;
        df.with_column(Series::new(lon_name.into(), lons))?;
        if malformed > 0 {
            warn!(column = source, malformed, "values without a coordinate pair left empty");
            issues.push(
                Issue::for_field(
                    keys::LAT,
                    IssueKind::CastFailed,
                    format!("{malformed} value(s) in column '{source}' are not coordinate pairs"),
                )
                .with_count(malformed),
            );
        }
        Ok(())
    }

    /// Returns the name of the place column, creating it when needed.
    fn build_place(
        &self,
        df: &mut DataFrame,
        catalog: &mut ColumnCatalog,
        hints: &ResolutionMap,
        options: &LocateOptions,
        issues: &mut Vec<Issue>,
    ) -> Result<String> {
        let place_name = self.schema.output_name(keys::PLACE).to_string();
        if has_column(df, &place_name) {
            debug!(column = %place_name, "reusing existing place column");
            return Ok(place_name);
        }

        let components: Vec<String> = match hints.get(keys::PLACE) {
            Some(ColumnRef::Single(column)) if has_column(df, column) => vec![column.clone()],
            Some(ColumnRef::Multiple(columns)) if columns.iter().any(|c| has_column(df, c)) => {
                columns
                    .iter()
                    .filter(|c| has_column(df, c))
                    .cloned()
                    .collect()
            }
            _ => {
                let result = ColumnMatcher::new(catalog, self.schema)
                    .with_translator(self.translator)
                    .with_retry(self.retry)
                    .resolve(
                        Some(&options.place_components),
                        hints,
                        &column_names(df),
                        &MatchOptions {
                            force_keep: false,
                            output_language: options.output_language,
                            prepare_labels: false,
                        },
                    )?;
                issues.extend(
                    result
                        .issues
                        .iter()
                        .filter(|issue| issue.kind != IssueKind::ColumnNotFound)
                        .cloned(),
                );
                options
                    .place_components
                    .iter()
                    .filter_map(|key| result.column(key.as_str()))
                    .map(ToString::to_string)
                    .collect()
            }
        };
        if components.is_empty() {
            return Err(HarmonizeError::NoLocationSource(
                "no coordinate columns and no place components found".into(),
            ));
        }
        debug!(components = ?components, "building place column");

        let parts = components
            .iter()
            .map(|c| column_values(df, c))
            .collect::<Result<Vec<_>>>()?;
        let places: Vec<Option<String>> = (0..df.height())
            .map(|row| {
                let row_parts: Vec<Option<&str>> = parts.iter().map(|p| p[row].as_deref()).collect();
                join_place(&row_parts, PLACE_SEPARATOR)
            })
            .collect();
        df.with_column(Series::new(place_name.as_str().into(), places))?;
        Ok(place_name)
    }

    fn geocode(&self, places: &[Option<String>], issues: &mut Vec<Issue>) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
        let Some(geocoder) = self.geocoder else {
            warn!("no geocoder configured, coordinates left empty");
            issues.push(Issue::for_field(
                keys::LAT,
                IssueKind::ServiceUnavailable,
                "no geocoding service available, coordinates left empty",
            ));
            return (vec![None; places.len()], vec![None; places.len()]);
        };

        let mut cache: HashMap<&str, Lookup> = HashMap::new();
        let (mut not_found, mut failed) = (0, 0);
        let mut lats = Vec::with_capacity(places.len());
        let mut lons = Vec::with_capacity(places.len());
        for place in places {
            let Some(place) = place.as_deref() else {
                not_found += 1;
                lats.push(None);
                lons.push(None);
                continue;
            };
            let lookup = cache.entry(place).or_insert_with(|| {
                match self.retry.run("geocode", || geocoder.locate(place)) {
                    Ok(Some(point)) => Lookup::Found(point),
                    Ok(None) => Lookup::NotFound,
                    Err(err) => {
                        warn!(place, error = %err, "geocoding failed");
                        Lookup::Failed
                    }
                }
            });
            match lookup {
                Lookup::Found(point) => {
                    lats.push(Some(point.lat));
                    lons.push(Some(point.lon));
                    continue;
                }
                Lookup::NotFound => not_found += 1,
                Lookup::Failed => failed += 1,
            }
            lats.push(None);
            lons.push(None);
        }

        info!(
            rows = places.len(),
            lookups = cache.len(),
            not_found,
            failed,
            "geocoding complete"
        );
        if not_found > 0 {
            issues.push(
                Issue::for_field(
                    keys::LAT,
                    IssueKind::GeocodeNotFound,
                    format!("{not_found} row(s) could not be geocoded"),
                )
                .with_count(not_found),
            );
        }
        if failed > 0 {
            issues.push(
                Issue::for_field(
                    keys::LAT,
                    IssueKind::ServiceUnavailable,
                    format!("geocoding service failed for {failed} row(s)"),
                )
                .with_count(failed),
            );
        }
        (lats, lons)
    }

    /// Projects the coordinate columns and returns the resulting projection.
    fn project(
        &self,
        df: &mut DataFrame,
        (lat_name, lon_name): (&str, &str),
        from: Option<String>,
        to: Option<&str>,
    ) -> Result<Option<String>> {
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) if !same_projection(&from, to) => (from, to),
            (from, _) => return Ok(from),
        };
        let Some(projector) = self.projector else {
            return Err(HarmonizeError::ProjectionFailed {
                from,
                to: to.to_string(),
                reason: "no projection service available".into(),
            });
        };

        let lats = column_values(df, lat_name)?;
        let lons = column_values(df, lon_name)?;
        let mut out_lat = Vec::with_capacity(lats.len());
        let mut out_lon = Vec::with_capacity(lons.len());
        for (lat, lon) in lats.iter().zip(&lons) {
            let point = match (
                lat.as_deref().and_then(parse_f64),
                lon.as_deref().and_then(parse_f64),
            ) {
                (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
                _ => {
                    out_lat.push(None);
                    out_lon.push(None);
                    continue;
                }
            };
            let projected = projector.transform(point, &from, to).map_err(|err| {
                HarmonizeError::ProjectionFailed {
                    from: from.clone(),
                    to: to.to_string(),
                    reason: err.to_string(),
                }
            })?;
            out_lat.push(Some(projected.lat));
            out_lon.push(Some(projected.lon));
        }
        df.with_column(Series::new(lat_name.into(), out_lat))?;
        df.with_column(Series::new(lon_name.into(), out_lon))?;
        info!(from = %from, to, "coordinates projected");
        Ok(Some(to.to_string()))
    }
}

/// Splits a combined coordinate value on its first whitespace run.
fn split_pair(value: &str) -> Option<(String, String)> {
    let mut parts = value.split_whitespace();
    let first = parts.next()?.trim_end_matches([',', ';']);
    let second = parts.next()?;
    if parts.next().is_some() || first.is_empty() {
        return None;
    }
    Some((first.to_string(), second.to_string()))
}

/// Moves the source columns onto the canonical names.
fn rename_pair(df: &mut DataFrame, (lat, lon): (&str, &str), (lat_name, lon_name): (&str, &str)) -> Result<()> {
    let lat_column = df.column(lat)?.clone().with_name(lat_name.into());
    let lon_column = df.column(lon)?.clone().with_name(lon_name.into());
    df.with_column(lat_column)?;
    df.with_column(lon_column)?;
    for source in [lat, lon] {
        if source != lat_name && source != lon_name && has_column(df, source) {
            df.drop_in_place(source)?;
        }
    }
    Ok(())
}
