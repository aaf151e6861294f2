//! End-to-end harmonisation runs with stubbed collaborators.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use eudat_core::{FormatRequest, Harmonizer, PersistenceMode, harmonizer};
use eudat_geo::{Coordinates, GeoQuality, GeocodingService, LocateStrategy};
use eudat_map::Translator;
use eudat_model::{
    DatasetMetadata, FieldKey, IssueKind, LanguageCode, SchemaConfig, ServiceError,
};
use eudat_transform::KeepColumns;
use polars::prelude::*;
use tempfile::TempDir;

/// Translator answering from a fixed table, counting batch calls.
struct CountingTranslator {
    calls: Cell<usize>,
    table: HashMap<&'static str, &'static str>,
    online: bool,
}

impl CountingTranslator {
    fn new(entries: &[(&'static str, &'static str)]) -> Self {
        Self {
            calls: Cell::new(0),
            table: entries.iter().copied().collect(),
            online: true,
        }
    }

    fn offline() -> Self {
        Self {
            online: false,
            ..Self::new(&[])
        }
    }
}

impl Translator for CountingTranslator {
    fn detect_language(&self, _texts: &[String]) -> Result<String, ServiceError> {
        Ok("fr".to_string())
    }

    fn translate(
        &self,
        texts: &[String],
        _from: LanguageCode,
        _to: LanguageCode,
    ) -> Result<Vec<String>, ServiceError> {
        self.calls.set(self.calls.get() + 1);
        if !self.online {
            return Err(ServiceError::Unavailable("translator offline".into()));
        }
        Ok(texts
            .iter()
            .map(|t| self.table.get(t.as_str()).map_or_else(|| t.clone(), ToString::to_string))
            .collect())
    }
}

/// Shares a stub with the harmonizer while the test keeps a handle.
struct Shared<T>(Rc<T>);

struct StubGeocoder {
    calls: Cell<usize>,
    known: HashMap<&'static str, Coordinates>,
}

impl GeocodingService for StubGeocoder {
    fn locate(&self, place: &str) -> Result<Option<Coordinates>, ServiceError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.known.get(place).copied())
    }
}

fn config(index: &str) -> SchemaConfig {
    SchemaConfig::from_json_str(&format!(r#"{{"index": {index}, "options": {{"lang": "en"}}}}"#))
        .unwrap()
}

fn frame(columns: &[(&str, &[&str])]) -> DataFrame {
    DataFrame::new(
        columns
            .iter()
            .map(|(name, values)| Series::new((*name).into(), values.to_vec()).into())
            .collect(),
    )
    .unwrap()
}

fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name).unwrap().f64().unwrap().into_iter().collect()
}

const GEO_INDEX: &str = r#"{
    "name": {"name": "name", "type": "str"},
    "street": {"name": "street", "type": "str"},
    "postcode": {"name": "postcode", "type": "str"},
    "city": {"name": "city", "type": "str"},
    "place": {"name": "place", "type": "str"},
    "lat": {"name": "lat", "type": "float"},
    "lon": {"name": "lon", "type": "float"},
    "geo_qual": {"name": "geo_qual", "type": "int"}
}"#;

#[test]
fn english_headers_under_french_metadata_need_one_translation() {
    let translator = Rc::new(CountingTranslator::new(&[("Lat", "lat"), ("Lon", "lon"), ("nom", "name")]));
    let metadata = DatasetMetadata::from_json_str(r#"{"lang": "fr"}"#).unwrap();
    let mut h = harmonizer(
        config(
            r#"{"name": {"name": "name", "type": "str"},
                "lat": {"name": "lat", "type": "float"},
                "lon": {"name": "lon", "type": "float"}}"#,
        ),
        metadata,
        PersistenceMode::Disabled,
    )
    .unwrap()
    .with_translator(Box::new(Shared(Rc::clone(&translator))));
    h.load(frame(&[
        ("nom", &["A", "B"]),
        ("Lat", &["48.85", "45.76"]),
        ("Lon", &["2.35", "4.83"]),
    ]))
    .unwrap();

    let report = h.format(&FormatRequest::default()).unwrap();
    assert_eq!(translator.calls.get(), 1);
    assert_eq!(report.resolved_count(), 3);
    assert!(report.unresolved.is_empty());
    assert_eq!(floats(h.data().unwrap(), "lat"), vec![Some(48.85), Some(45.76)]);

    // cached labels are reused by later runs
    h.format(&FormatRequest::default()).unwrap();
    assert_eq!(translator.calls.get(), 1);
}

#[test]
fn address_columns_are_geocoded_into_coordinates() {
    let translator = Rc::new(CountingTranslator::new(&[
        ("nom", "name"),
        ("adresse", "street"),
        ("code_postal", "postcode"),
        ("ville", "city"),
    ]));
    let geocoder = Rc::new(StubGeocoder {
        calls: Cell::new(0),
        known: HashMap::from([("1 rue A, 75001, Paris", Coordinates::new(48.86, 2.34))]),
    });
    let metadata = DatasetMetadata::from_json_str(
        r#"{"lang": "fr", "place": ["street", "postcode", "city"]}"#,
    )
    .unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled)
        .unwrap()
        .with_translator(Box::new(Shared(Rc::clone(&translator))))
        .with_geocoder(Box::new(Shared(Rc::clone(&geocoder))));
    h.load(frame(&[
        ("nom", &["A", "B"]),
        ("adresse", &["1 rue A", "2 rue B"]),
        ("code_postal", &["75001", "69001"]),
        ("ville", &["Paris", "Lyon"]),
    ]))
    .unwrap();

    let report = h
        .format(&FormatRequest {
            locate: true,
            ..FormatRequest::default()
        })
        .unwrap();
    let df = h.data().unwrap();

    let location = report.location.as_ref().unwrap();
    assert_eq!(location.quality, GeoQuality::GeocodedUnscored);
    assert!(matches!(location.strategy, LocateStrategy::Geocoded { .. }));
    assert_eq!(geocoder.calls.get(), 2);
    assert_eq!(
        df.column("place").unwrap().str().unwrap().get(0),
        Some("1 rue A, 75001, Paris")
    );
    assert_eq!(floats(df, "lat"), vec![Some(48.86), None]);
    assert_eq!(floats(df, "lon"), vec![Some(2.34), None]);
    assert_eq!(df.column("geo_qual").unwrap().null_count(), 2);
    let not_found: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::GeocodeNotFound)
        .collect();
    assert_eq!(not_found.len(), 1);
    assert_eq!(translator.calls.get(), 1);
}

#[test]
fn direct_coordinates_win_over_geocoding() {
    let geocoder = Rc::new(StubGeocoder {
        calls: Cell::new(0),
        known: HashMap::new(),
    });
    let metadata = DatasetMetadata::from_json_str(
        r#"{"lang": "en", "index": {"lat": "y", "lon": "x", "street": "addr", "city": "town"}}"#,
    )
    .unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled)
        .unwrap()
        .with_geocoder(Box::new(Shared(Rc::clone(&geocoder))));
    h.load(frame(&[
        ("addr", &["1 Main St"]),
        ("town", &["Dublin"]),
        ("y", &["53.35"]),
        ("x", &["-6.26"]),
    ]))
    .unwrap();

    let report = h
        .format(&FormatRequest {
            locate: true,
            ..FormatRequest::default()
        })
        .unwrap();
    assert_eq!(geocoder.calls.get(), 0);
    assert_eq!(report.location.unwrap().quality, GeoQuality::Direct);
    let df = h.data().unwrap();
    assert_eq!(floats(df, "lat"), vec![Some(53.35)]);
    assert_eq!(floats(df, "lon"), vec![Some(-6.26)]);
    assert_eq!(df.column("geo_qual").unwrap().i64().unwrap().get(0), Some(1));
}

#[test]
fn combined_coordinate_column_is_split() {
    let metadata =
        DatasetMetadata::from_json_str(r#"{"lang": "en", "index": {"lat": "coord", "lon": "coord"}}"#)
            .unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled).unwrap();
    h.load(frame(&[("coord", &["48.85 2.35"])])).unwrap();
    let report = h
        .format(&FormatRequest {
            locate: true,
            keep: KeepColumns::Resolved,
            ..FormatRequest::default()
        })
        .unwrap();
    let df = h.data().unwrap();
    assert_eq!(floats(df, "lat"), vec![Some(48.85)]);
    assert_eq!(floats(df, "lon"), vec![Some(2.35)]);
    assert_eq!(df.column("geo_qual").unwrap().i64().unwrap().get(0), Some(1));
    assert!(!report.columns.contains(&"coord".to_string()));
}

#[test]
fn formatting_twice_changes_nothing() {
    let metadata = DatasetMetadata::from_json_str(
        r#"{"lang": "en", "index": {"name": "Facility", "lat": "Y", "lon": "X"}}"#,
    )
    .unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled).unwrap();
    h.load(frame(&[
        ("Facility", &["A", "B"]),
        ("Y", &["48.85", "bad"]),
        ("X", &["2.35", "4.83"]),
    ]))
    .unwrap();
    h.format(&FormatRequest::default()).unwrap();
    let first = h.data().unwrap().clone();

    let report = h.format(&FormatRequest::default()).unwrap();
    assert!(h.data().unwrap().equals_missing(&first));
    assert!(report.created.is_empty());
    assert!(report.dropped.is_empty());
}

#[test]
fn forced_fields_become_typed_null_columns() {
    let metadata = DatasetMetadata::from_json_str(r#"{"lang": "en"}"#).unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled).unwrap();
    h.load(frame(&[("name", &["A", "B"])])).unwrap();
    let report = h
        .format(&FormatRequest {
            force: true,
            ..FormatRequest::default()
        })
        .unwrap();
    let df = h.data().unwrap();
    assert_eq!(df.column("lat").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("geo_qual").unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column("lat").unwrap().null_count(), 2);
    assert!(report.unresolved.iter().all(|u| u.kept));
    assert_eq!(report.resolved_count(), 1);
}

#[test]
fn requesting_one_field_does_not_resolve_its_alias_sibling() {
    let metadata = DatasetMetadata::from_json_str(
        r#"{"lang": "en", "columns": [{"en": "town"}], "index": {"city": "town", "place": "town"}}"#,
    )
    .unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled).unwrap();
    h.load(frame(&[("town", &["Cork"])])).unwrap();
    let result = h
        .resolve(Some(&[FieldKey::new("city").unwrap()]), false)
        .unwrap();
    assert_eq!(result.column("city"), Some("town"));
    assert!(result.outcome("place").is_none());
    assert_eq!(result.resolution.len(), 1);
}

#[test]
fn snapshot_carries_translations_and_last_resolution() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metadata.json");
    let translator = Rc::new(CountingTranslator::new(&[("nom", "name"), ("ville", "city")]));
    let metadata = DatasetMetadata::from_json_str(
        r#"{"country": "FR", "lang": "fr", "provider": "ministry", "index": {"extra": {"name": "extra", "type": "str"}}}"#,
    )
    .unwrap();
    let mut h: Harmonizer =
        harmonizer(config(GEO_INDEX), metadata, PersistenceMode::File(path.clone()))
            .unwrap()
            .with_translator(Box::new(Shared(Rc::clone(&translator))));
    h.load(frame(&[("nom", &["A"]), ("ville", &["Paris"])])).unwrap();
    h.format(&FormatRequest::default()).unwrap();

    let snapshot = h.snapshot().unwrap();
    let saved = DatasetMetadata::from_json_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved, snapshot);
    assert_eq!(saved.provider.as_deref(), Some("ministry"));
    let ville = saved
        .columns
        .iter()
        .find(|set| set.values().any(|l| l == "ville"))
        .unwrap();
    assert_eq!(ville.get(&LanguageCode::english()).map(String::as_str), Some("city"));

    let index = serde_json::to_value(&saved.index).unwrap();
    insta::assert_snapshot!(
        index.to_string(),
        @r#"{"extra":{"name":"extra","type":"str"},"name":"nom","city":"ville"}"#
    );
}

#[test]
fn translation_outage_is_reported_once_per_run() {
    let translator = Rc::new(CountingTranslator::offline());
    let metadata =
        DatasetMetadata::from_json_str(r#"{"lang": "fr", "index": {"lat": "y", "lon": "x"}}"#)
            .unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled)
        .unwrap()
        .with_translator(Box::new(Shared(Rc::clone(&translator))));
    h.load(frame(&[("nom", &["A"]), ("y", &["48.85"]), ("x", &["2.35"])]))
        .unwrap();

    let report = h
        .format(&FormatRequest {
            locate: true,
            ..FormatRequest::default()
        })
        .unwrap();
    assert_eq!(translator.calls.get(), 1);
    let unavailable = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::ServiceUnavailable)
        .count();
    assert_eq!(unavailable, 1);
    assert_eq!(report.location.unwrap().quality, GeoQuality::Direct);
}

#[test]
fn specific_labels_are_translated_on_demand() {
    let translator = Rc::new(CountingTranslator::new(&[("nom", "name"), ("ville", "city")]));
    let metadata = DatasetMetadata::from_json_str(r#"{"lang": "fr"}"#).unwrap();
    let mut h = harmonizer(config(GEO_INDEX), metadata, PersistenceMode::Disabled)
        .unwrap()
        .with_translator(Box::new(Shared(Rc::clone(&translator))));
    h.load(frame(&[("nom", &["A"]), ("ville", &["Paris"])])).unwrap();
    let french = LanguageCode::parse("fr").unwrap();
    let english = LanguageCode::english();

    let (labels, issue) = h.translate_labels(&["ville"], french, english).unwrap();
    assert_eq!(labels, vec![Some("city".to_string())]);
    assert!(issue.is_none());
    assert_eq!(translator.calls.get(), 1);

    // only the label without a cached translation is sent
    let (labels, _) = h.translate_labels(&["ville", "nom"], french, english).unwrap();
    assert_eq!(labels, vec![Some("city".to_string()), Some("name".to_string())]);
    assert_eq!(translator.calls.get(), 2);

    let (all, _) = h.labels(english).unwrap();
    assert_eq!(all, vec![Some("name".to_string()), Some("city".to_string())]);
    assert_eq!(translator.calls.get(), 2);

    let (unknown, _) = h.translate_labels(&["town"], english, french).unwrap();
    assert_eq!(unknown, vec![None]);
    assert_eq!(translator.calls.get(), 2);
}

impl<T: Translator> Translator for Shared<T> {
    fn detect_language(&self, texts: &[String]) -> Result<String, ServiceError> {
        self.0.detect_language(texts)
    }

    fn translate(
        &self,
        texts: &[String],
        from: LanguageCode,
        to: LanguageCode,
    ) -> Result<Vec<String>, ServiceError> {
        self.0.translate(texts, from, to)
    }
}

impl<T: GeocodingService> GeocodingService for Shared<T> {
    fn locate(&self, place: &str) -> Result<Option<Coordinates>, ServiceError> {
        self.0.locate(place)
    }
}
