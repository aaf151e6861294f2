use anyhow::{Result, bail};
use comfy_table::Table;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use eudat_cli::pipeline::{HarmonizeJob, HarmonizeRun, parse_keep, run_harmonize as run_job};
use eudat_ingest::TabularFormat;
use eudat_model::{countries, languages};

use crate::cli::{HarmonizeArgs, OutputFormatArg};

pub fn run_harmonize(args: &HarmonizeArgs) -> Result<HarmonizeRun> {
    let delimiter = match args.delimiter {
        Some(c) if c.is_ascii() => Some(c as u8),
        Some(c) => bail!("delimiter '{c}' is not a single-byte character"),
        None => None,
    };
    let job = HarmonizeJob {
        input: args.input.clone(),
        config: args.config.clone(),
        meta: args.meta.clone(),
        output: args.output.clone(),
        format: args.format.map(|f| match f {
            OutputFormatArg::Csv => TabularFormat::Csv,
            OutputFormatArg::Json => TabularFormat::Json,
            OutputFormatArg::Geojson => TabularFormat::GeoJson,
        }),
        delimiter,
        glossary: args.glossary.clone(),
        output_language: args.olang.clone(),
        order: args.order.clone(),
        keep: parse_keep(&args.keep),
        force: args.force,
        locate: args.locate,
        snapshot: args.snapshot.clone(),
        input_datetime_format: args.dtfmt_in.clone(),
        output_datetime_format: args.dtfmt_out.clone(),
    };
    run_job(&job)
}

pub fn run_languages() {
    let mut table = registry_table();
    table.set_header(vec!["Code", "Language"]);
    for lang in languages() {
        table.add_row(vec![lang.as_str(), lang.name()]);
    }
    println!("{table}");
}

pub fn run_countries() {
    let mut table = registry_table();
    table.set_header(vec!["Code", "Country"]);
    for country in countries() {
        table.add_row(vec![country.code(), country.name()]);
    }
    println!("{table}");
}

fn registry_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}
