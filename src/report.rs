use analytics::CategorySummary;
use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use configuration::OutputSettings;
use core_types::ImpactRecord;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

pub const TABLE_HEADING: &str = "=== Event impact table (lower reaction_minutes = faster pricing) ===";
pub const EMPTY_MESSAGE: &str = "No impacts computed.";

const DISPLAY_COLUMNS: [&str; 7] = [
    "event",
    "category",
    "asset",
    "post_return",
    "vol_change",
    "max_drawdown_post",
    "reaction_minutes",
];

// Decimal places per metric.
const RETURN_DP: u32 = 4;
const VOL_DP: u32 = 6;
const REACTION_DP: u32 = 2;

/// One line of the impact table, rounded for display and CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub event: String,
    pub category: String,
    pub asset: String,
    pub post_return: Option<f64>,
    pub vol_change: Option<f64>,
    pub max_drawdown_post: Option<f64>,
    pub reaction_minutes: Option<f64>,
}

impl From<&ImpactRecord> for DisplayRow {
    fn from(record: &ImpactRecord) -> Self {
        Self {
            event: record.event.clone(),
            category: record.category.clone(),
            asset: record.asset.clone(),
            post_return: record.post_return.map(|v| round_to(v, RETURN_DP)),
            vol_change: record.vol_change.map(|v| round_to(v, VOL_DP)),
            max_drawdown_post: record.max_drawdown_post.map(|v| round_to(v, RETURN_DP)),
            reaction_minutes: record.reaction_minutes.map(|v| round_to(v, REACTION_DP)),
        }
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

pub fn display_rows(records: &[ImpactRecord]) -> Vec<DisplayRow> {
    records.iter().map(DisplayRow::from).collect()
}

// ==============================================================================
// Terminal output
// ==============================================================================

fn number_cell(value: Option<f64>, decimals: u32) -> Cell {
    let text = value.map(|v| format!("{:.*}", decimals as usize, v)).unwrap_or_default();
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Builds the ranked impact table.
pub fn impact_table(rows: &[DisplayRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(DISPLAY_COLUMNS);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.event),
            Cell::new(&row.category),
            Cell::new(&row.asset),
            number_cell(row.post_return, RETURN_DP),
            number_cell(row.vol_change, VOL_DP),
            number_cell(row.max_drawdown_post, RETURN_DP),
            number_cell(row.reaction_minutes, REACTION_DP),
        ]);
    }
    table
}

/// Builds the per-category summary table.
pub fn summary_table(summaries: &[CategorySummary]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "category",
            "asset",
            "events",
            "mean_post_return",
            "mean_abs_post_return",
            "mean_vol_change",
            "median_reaction_minutes",
        ]);

    for s in summaries {
        table.add_row(vec![
            Cell::new(&s.category),
            Cell::new(&s.asset),
            Cell::new(s.events).set_alignment(CellAlignment::Right),
            number_cell(s.mean_post_return.map(|v| round_to(v, RETURN_DP)), RETURN_DP),
            number_cell(s.mean_abs_post_return.map(|v| round_to(v, RETURN_DP)), RETURN_DP),
            number_cell(s.mean_vol_change.map(|v| round_to(v, VOL_DP)), VOL_DP),
            number_cell(s.median_reaction_minutes.map(|v| round_to(v, REACTION_DP)), REACTION_DP),
        ]);
    }
    table
}

// ==============================================================================
// File output
// ==============================================================================

fn create_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// Writes the displayed columns as CSV. Undefined metrics are empty fields.
pub fn write_csv(path: &Path, rows: &[DisplayRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(create_file(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the full, unrounded records as a JSON array.
pub fn write_json(path: &Path, records: &[ImpactRecord]) -> anyhow::Result<()> {
    let writer = BufWriter::new(create_file(path)?);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// Prints the ranked table (and summary, if enabled) and writes any configured exports.
pub fn emit(records: &[ImpactRecord], output: &OutputSettings) -> anyhow::Result<()> {
    if records.is_empty() {
        println!("{}", EMPTY_MESSAGE);
        return Ok(());
    }

    let rows = display_rows(records);
    println!("\n{}", TABLE_HEADING);
    println!("{}", impact_table(&rows));

    if output.summary {
        let summaries = analytics::summarize_by_category(records);
        println!("\n=== Summary by category ===");
        println!("{}", summary_table(&summaries));
    }

    if let Some(path) = &output.csv {
        write_csv(path, &rows)?;
        tracing::info!(path = %path.display(), "Wrote CSV.");
    }
    if let Some(path) = &output.json {
        write_json(path, records)?;
        tracing::info!(path = %path.display(), "Wrote JSON.");
    }

    Ok(())
}
