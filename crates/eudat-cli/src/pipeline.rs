//! One harmonisation run from files to files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use eudat_core::{FormatRequest, HarmonizeReport, PersistenceMode, harmonizer};
use eudat_geo::{BuiltinProjection, CoordinateOrder};
use eudat_ingest::{
    CsvOptions, FileSink, FileSource, TabularFormat, TabularSink, TabularSource, load_config,
    load_metadata,
};
use eudat_map::GlossaryTranslator;
use eudat_model::{Country, LanguageCode, keys};
use eudat_transform::KeepColumns;
use tracing::{info, info_span};

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone, Default)]
pub struct HarmonizeJob {
    pub input: PathBuf,
    pub config: PathBuf,
    pub meta: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<TabularFormat>,
    pub delimiter: Option<u8>,
    pub glossary: Option<PathBuf>,
    pub output_language: Option<String>,
    pub order: Option<String>,
    pub keep: KeepColumns,
    pub force: bool,
    pub locate: bool,
    pub snapshot: Option<PathBuf>,
    pub input_datetime_format: Option<String>,
    pub output_datetime_format: Option<String>,
}

#[derive(Debug)]
pub struct HarmonizeRun {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: TabularFormat,
    pub rows: usize,
    pub input_language: Option<LanguageCode>,
    pub country: Option<Country>,
    pub report: HarmonizeReport,
    pub snapshot: Option<PathBuf>,
}

/// Parses `all`, `resolved` or a comma-separated column list.
pub fn parse_keep(value: &str) -> KeepColumns {
    match value.trim() {
        v if v.eq_ignore_ascii_case("all") => KeepColumns::All,
        v if v.eq_ignore_ascii_case("resolved") => KeepColumns::Resolved,
        v => KeepColumns::Explicit(
            v.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(ToString::to_string)
                .collect(),
        ),
    }
}

/// `<dir>/<stem>.harmonized.<ext>` next to the input.
pub fn default_output_path(input: &Path, format: TabularFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    input.with_file_name(format!("{stem}.harmonized.{}", format.as_str()))
}

fn output_target(job: &HarmonizeJob) -> Result<(PathBuf, TabularFormat)> {
    match (&job.output, job.format) {
        (Some(path), Some(format)) => Ok((path.clone(), format)),
        (Some(path), None) => {
            let format = TabularFormat::from_path(path)
                .with_context(|| format!("cannot tell the output format of {}", path.display()))?;
            Ok((path.clone(), format))
        }
        (None, format) => {
            let format = format.unwrap_or(TabularFormat::Csv);
            Ok((default_output_path(&job.input, format), format))
        }
    }
}

pub fn run_harmonize(job: &HarmonizeJob) -> Result<HarmonizeRun> {
    let span = info_span!("run", input = %job.input.display());
    let _guard = span.enter();
    let start = Instant::now();

    let config = load_config(&job.config).context("load configuration")?;
    let metadata = load_metadata(&job.meta).context("load metadata")?;
    let (output, format) = output_target(job)?;
    if output == job.input {
        bail!("output {} would overwrite the input", output.display());
    }

    let persistence = job
        .snapshot
        .clone()
        .map_or(PersistenceMode::Disabled, PersistenceMode::File);
    let mut h = harmonizer(config, metadata, persistence)
        .context("configure harmonizer")?
        .with_projector(Box::new(BuiltinProjection));
    if let Some(path) = &job.glossary {
        let glossary = GlossaryTranslator::from_path(path)
            .with_context(|| format!("load glossary {}", path.display()))?;
        h = h.with_translator(Box::new(glossary));
    }
    if let Some(lang) = &job.output_language {
        h = h.with_output_language(LanguageCode::parse(lang).context("output language")?);
    }
    {
        let options = h.options_mut();
        if let Some(order) = &job.order {
            options.order = order.parse::<CoordinateOrder>().context("coordinate order")?;
        }
        if job.input_datetime_format.is_some() {
            options.input_datetime_format.clone_from(&job.input_datetime_format);
        }
        if let Some(fmt) = &job.output_datetime_format {
            options.output_datetime_format.clone_from(fmt);
        }
    }

    let mut source = FileSource::new(&job.input)
        .with_context(|| format!("open {}", job.input.display()))?;
    if let Some(delimiter) = job.delimiter {
        source = source.with_csv_options(CsvOptions::with_delimiter(delimiter));
    }
    let df = source
        .load()
        .with_context(|| format!("read {}", job.input.display()))?;
    h.load(df).context("load dataset")?;

    let report = h
        .format(&FormatRequest {
            force: job.force,
            keep: job.keep.clone(),
            locate: job.locate,
            ..FormatRequest::default()
        })
        .context("harmonise dataset")?;

    if job.snapshot.is_some() {
        h.snapshot().context("write metadata snapshot")?;
    }

    let lat = h.schema().output_name(keys::LAT).to_string();
    let lon = h.schema().output_name(keys::LON).to_string();
    let Some(mut df) = h.take_data() else {
        bail!("harmonizer returned no dataset");
    };
    FileSink::new(&output, format)
        .with_coordinates(lat, lon)
        .write(&mut df)
        .with_context(|| format!("write {}", output.display()))?;

    info!(
        rows = df.height(),
        columns = df.width(),
        issues = report.issues.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "run complete"
    );
    Ok(HarmonizeRun {
        input: job.input.clone(),
        output,
        format,
        rows: df.height(),
        input_language: h.input_language(),
        country: h.country(),
        report,
        snapshot: job.snapshot.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_values() {
        assert_eq!(parse_keep("ALL"), KeepColumns::All);
        assert_eq!(parse_keep("resolved"), KeepColumns::Resolved);
        assert_eq!(
            parse_keep(" name, lat ,,lon"),
            KeepColumns::Explicit(vec!["name".into(), "lat".into(), "lon".into()])
        );
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("data/fr/hospitals.csv"), TabularFormat::GeoJson),
            PathBuf::from("data/fr/hospitals.harmonized.geojson")
        );
    }
}
