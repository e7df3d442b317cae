//! Tabular report generation.
//!
//! Reports are built as a [`Table`] (header plus typed cells) and rendered
//! to delimited text, Markdown or JSON. Rows are always ordered by key.

use crate::analysis::{Accumulator, ReconciliationResult};
use crate::cli::OutputFormat;
use crate::models::{AggregateRecord, Metric};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A single report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Count(u64),
    /// Rendered with the configured precision.
    Decimal(f64),
    /// Rendered joined by the list separator.
    List(Vec<String>),
}

/// What a column shows for each aggregated key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// The key itself.
    Key,
    /// Number of distinct contributing sources.
    SourceCount,
    /// Sorted contributing sources.
    SourceList,
    /// Running total of a metric.
    Total(Metric),
    /// A derived value by name.
    Derived(&'static str),
}

impl Column {
    fn cell(&self, key: &str, record: &AggregateRecord) -> Cell {
        match self {
            Column::Key => Cell::Text(key.to_string()),
            Column::SourceCount => Cell::Count(record.source_count() as u64),
            Column::SourceList => Cell::List(record.sources.iter().cloned().collect()),
            Column::Total(metric) => Cell::Count(record.total(*metric)),
            Column::Derived(name) => Cell::Decimal(record.derived(name).unwrap_or(0.0)),
        }
    }
}

/// Header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Report name, used in Markdown titles and JSON output.
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// One row per aggregated key, sorted by key.
    pub fn from_accumulator(name: &str, columns: &[(&str, Column)], accumulator: &Accumulator) -> Self {
        let mut entries: Vec<(&String, &AggregateRecord)> = accumulator.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let rows = entries
            .into_iter()
            .map(|(key, record)| {
                columns
                    .iter()
                    .map(|(_, column)| column.cell(key, record))
                    .collect()
            })
            .collect();

        Self {
            name: name.to_string(),
            header: columns.iter().map(|(title, _)| title.to_string()).collect(),
            rows,
        }
    }

    /// One row per reportable key; ignored keys follow with a status column
    /// when `include_ignored` is set.
    pub fn from_reconciliation(name: &str, result: &ReconciliationResult, include_ignored: bool) -> Self {
        let mut header = vec!["Missing Locales".to_string()];

        let rows = if include_ignored {
            header.push("Status".to_string());
            let mut keyed: Vec<(&String, &str)> = result
                .reportable
                .iter()
                .map(|k| (k, "missing"))
                .chain(result.ignored.iter().map(|k| (k, "ignored")))
                .collect();
            keyed.sort();
            keyed
                .into_iter()
                .map(|(k, status)| vec![Cell::Text(k.clone()), Cell::Text(status.to_string())])
                .collect()
        } else {
            let mut keys: Vec<&String> = result.reportable.iter().collect();
            keys.sort();
            keys.into_iter()
                .map(|k| vec![Cell::Text(k.clone())])
                .collect()
        };

        Self {
            name: name.to_string(),
            header,
            rows,
        }
    }
}

/// Formatting parameters shared by every renderer.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Column delimiter for delimited output.
    pub delimiter: char,
    /// Separator between elements of list cells.
    pub list_separator: char,
    /// Decimal places for derived values.
    pub precision: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            list_separator: ' ',
            precision: 2,
        }
    }
}

impl From<&crate::config::ReportConfig> for RenderOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            delimiter: config.delimiter,
            list_separator: config.list_separator,
            precision: config.precision,
        }
    }
}

/// Render in the requested format.
pub fn render(table: &Table, format: OutputFormat, options: &RenderOptions) -> Result<String> {
    match format {
        OutputFormat::Csv => Ok(generate_delimited_report(table, options)),
        OutputFormat::Markdown => Ok(generate_markdown_report(table, options)),
        OutputFormat::Json => generate_json_report(table, Utc::now()),
    }
}

fn cell_text(cell: &Cell, options: &RenderOptions) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Count(n) => n.to_string(),
        Cell::Decimal(v) => format!("{:.*}", options.precision as usize, v),
        Cell::List(items) => items.join(&options.list_separator.to_string()),
    }
}

/// Quote a field when it would be ambiguous to re-split.
fn quote_field(field: &str, options: &RenderOptions, quote_list_separator: bool) -> String {
    let needs_quotes = field.contains(options.delimiter)
        || (quote_list_separator && field.contains(options.list_separator))
        || field.contains('"')
        || field.contains('\n')
        || field.contains('\r');

    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Generate delimited text (CSV by default).
///
/// Data cells containing the delimiter, the list separator, a quote or a
/// line break are double-quoted with embedded quotes doubled. Header
/// titles are only quoted for the delimiter, quotes and line breaks.
pub fn generate_delimited_report(table: &Table, options: &RenderOptions) -> String {
    let delimiter = options.delimiter.to_string();
    let mut output = String::new();

    let header: Vec<String> = table
        .header
        .iter()
        .map(|title| quote_field(title, options, false))
        .collect();
    output.push_str(&header.join(&delimiter));
    output.push('\n');

    for row in &table.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|cell| quote_field(&cell_text(cell, options), options, true))
            .collect();
        output.push_str(&fields.join(&delimiter));
        output.push('\n');
    }

    output
}

/// Generate a Markdown table.
pub fn generate_markdown_report(table: &Table, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", table.name));

    if table.rows.is_empty() {
        output.push_str("No rows to report.\n");
        return output;
    }

    output.push_str(&format!("| {} |\n", table.header.join(" | ")));
    let align: Vec<&str> = table
        .header
        .iter()
        .enumerate()
        .map(|(i, _)| if i == 0 { ":---" } else { ":---:" })
        .collect();
    output.push_str(&format!("|{}|\n", align.join("|")));

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| cell_text(cell, options).replace('|', "\\|"))
            .collect();
        output.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    output.push_str(&format!("\n*{} rows*\n", table.rows.len()));
    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report: &'a str,
    generated_at: DateTime<Utc>,
    row_count: usize,
    columns: &'a [String],
    rows: Vec<Vec<Value>>,
}

fn cell_json(cell: &Cell) -> Value {
    match cell {
        Cell::Text(s) => Value::from(s.as_str()),
        Cell::Count(n) => Value::from(*n),
        Cell::Decimal(v) => Value::from(*v),
        Cell::List(items) => Value::from(items.clone()),
    }
}

/// Generate a JSON report stamped with `generated_at`.
pub fn generate_json_report(table: &Table, generated_at: DateTime<Utc>) -> Result<String> {
    let report = JsonReport {
        report: &table.name,
        generated_at,
        row_count: table.rows.len(),
        columns: &table.header,
        rows: table
            .rows
            .iter()
            .map(|row| row.iter().map(cell_json).collect())
            .collect(),
    };

    serde_json::to_string_pretty(&report).map_err(Into::into)
}
