use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use eudat_cli::pipeline::HarmonizeRun;
use eudat_core::HarmonizeReport;
use eudat_map::{FieldOutcome, MatchSource};
use eudat_model::{Issue, IssueKind};

pub fn print_summary(run: &HarmonizeRun) {
    println!("Input: {}", run.input.display());
    println!("Output: {} ({}, {} rows)", run.output.display(), run.format, run.rows);
    if let Some(lang) = run.input_language {
        println!("Language: {} ({})", lang.name(), lang.as_str());
    }
    if let Some(country) = run.country {
        println!("Country: {country}");
    }
    if let Some(location) = &run.report.location {
        println!("Coordinates: {} ({:?})", location.quality, location.strategy);
    }
    if let Some(path) = &run.snapshot {
        println!("Metadata snapshot: {}", path.display());
    }
    println!("{}", field_table(&run.report));
    if !run.report.issues.is_empty() {
        println!();
        println!("Issues:");
        println!("{}", issue_table(&run.report.issues));
    }
}

pub fn field_table(report: &HarmonizeReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Column"),
        header_cell("Status"),
        header_cell("Matched by"),
    ]);
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    for entry in &report.fields {
        let (column, status, detail) = match &entry.outcome {
            FieldOutcome::Resolved { column, source } => (
                Cell::new(column.columns().join(" + ")),
                Cell::new("resolved").fg(Color::Green),
                Cell::new(source_label(source)),
            ),
            FieldOutcome::Placeholder { suggestions } => (
                dim_cell("-"),
                Cell::new("empty").fg(Color::Yellow),
                suggestion_cell(suggestions),
            ),
            FieldOutcome::Dropped { suggestions } => (
                dim_cell("-"),
                Cell::new("dropped").fg(Color::Red),
                suggestion_cell(suggestions),
            ),
        };
        table.add_row(vec![
            Cell::new(entry.field.as_str()).add_attribute(Attribute::Bold),
            column,
            status,
            detail,
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(format!("{} columns", report.columns.len())),
        Cell::new(format!("{}/{}", report.resolved_count(), report.fields.len()))
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    table
}

pub fn issue_table(issues: &[Issue]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Kind"),
        header_cell("Count"),
        header_cell("Message"),
    ]);
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    if let Some(column) = table.column_mut(2) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    for issue in issues {
        table.add_row(vec![
            Cell::new(issue.field.as_deref().unwrap_or("-")),
            kind_cell(issue.kind),
            issue.count.map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&issue.message),
        ]);
    }
    table
}

fn source_label(source: &MatchSource) -> String {
    match source {
        MatchSource::Hint => "metadata hint".to_string(),
        MatchSource::PrimaryAlias { label } => format!("label '{label}'"),
        MatchSource::SecondaryAlias { label } => format!("alternate label '{label}'"),
        MatchSource::Propagated { from } => format!("synonym of {from}"),
    }
}

fn suggestion_cell(suggestions: &[String]) -> Cell {
    if suggestions.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(format!("did you mean: {}", suggestions.join(", "))).fg(Color::DarkGrey)
    }
}

fn kind_cell(kind: IssueKind) -> Cell {
    let color = match kind {
        IssueKind::ColumnNotFound | IssueKind::TranslationIncomplete => Color::Yellow,
        IssueKind::CastFailed | IssueKind::GeocodeNotFound => Color::Magenta,
        IssueKind::ServiceUnavailable => Color::Red,
    };
    Cell::new(kind.as_str()).fg(color)
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold).fg(Color::Cyan)
}

fn dim_cell<T: ToString>(text: T) -> Cell {
    Cell::new(text.to_string()).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use eudat_map::FieldResolution;
    use eudat_model::{ColumnRef, FieldKey};

    use super::*;

    fn report() -> HarmonizeReport {
        HarmonizeReport {
            fields: vec![
                FieldResolution {
                    field: FieldKey::new("name").unwrap(),
                    outcome: FieldOutcome::Resolved {
                        column: ColumnRef::single("nom"),
                        source: MatchSource::PrimaryAlias { label: "name".into() },
                    },
                },
                FieldResolution {
                    field: FieldKey::new("beds").unwrap(),
                    outcome: FieldOutcome::Dropped {
                        suggestions: vec!["lits".into()],
                    },
                },
            ],
            columns: vec!["name".into()],
            ..HarmonizeReport::default()
        }
    }

    #[test]
    fn field_table_lists_every_field_and_a_total() {
        let table = field_table(&report());
        assert_eq!(table.row_count(), 3);
        let rendered = table.to_string();
        assert!(rendered.contains("label 'name'"));
        assert!(rendered.contains("did you mean: lits"));
        assert!(rendered.contains("1/2"));
    }

    #[test]
    fn issue_counts_are_optional() {
        let issues = vec![
            Issue::for_field("lat", IssueKind::CastFailed, "2 values are not numbers").with_count(2),
            Issue::new(IssueKind::ServiceUnavailable, "translator offline"),
        ];
        let table = issue_table(&issues);
        assert_eq!(table.row_count(), 2);
        assert!(table.to_string().contains("service unavailable"));
    }
}
