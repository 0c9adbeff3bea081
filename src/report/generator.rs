//! Spreadsheet report generation.
//!
//! This module renders the prep and slice tables into a two-sheet workbook:
//! a styled header row, styled data cells, a fixed column width, and a
//! highlight on any non-zero issue fraction.

use super::save_atomically;
use crate::config::{ReportConfig, StyleConfig};
use crate::error::ReportResult;
use crate::models::{PrepSummary, SliceSummary, PREP_COLUMNS, SLICE_COLUMNS};
use rust_xlsxwriter::{
    ConditionalFormatCell, ConditionalFormatCellRule, Format, FormatAlign, Workbook, Worksheet,
};
use std::path::Path;
use tracing::{debug, info};

pub const PREP_SHEET: &str = "prep_summary";
pub const SLICE_SHEET: &str = "slice_summary";

/// Zero-based sheet columns holding the three issue fractions (G:I).
const ISSUE_FIRST_COL: u16 = 6;
const ISSUE_LAST_COL: u16 = 8;

/// Last zero-based column that takes the report width on both sheets (A:N).
const LAST_STYLED_COL: u16 = PREP_COLUMNS.len() as u16 - 1;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<Option<f64>> for Cell {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Cell::Blank, Cell::Number)
    }
}

/// A row type that can be laid out on a sheet.
pub trait SheetRow {
    /// Header labels, in column order.
    const COLUMNS: &'static [&'static str];

    /// Cell values, in the same order as [`SheetRow::COLUMNS`].
    fn cells(&self) -> Vec<Cell>;
}

impl SheetRow for PrepSummary {
    const COLUMNS: &'static [&'static str] = &PREP_COLUMNS;

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.day.as_str().into(),
            self.prep_name.as_str().into(),
            self.first_time.as_str().into(),
            self.last_time.as_str().into(),
            self.mean_health.into(),
            self.slice_success_rate.into(),
            self.wov_fraction.into(),
            self.uneven_fraction.into(),
            self.damaged_fraction.into(),
            self.attempt_count.into(),
            self.user.as_str().into(),
            self.rig.as_str().into(),
            self.acsf_date.as_str().into(),
            self.slice_name.as_str().into(),
        ]
    }
}

impl SheetRow for SliceSummary {
    const COLUMNS: &'static [&'static str] = &SLICE_COLUMNS;

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.day.as_str().into(),
            self.slice_name.as_str().into(),
            self.time.as_str().into(),
            self.mean_health.into(),
            self.slice_success_rate.into(),
            self.slice_quality.as_str().into(),
            self.attempt_count.into(),
            self.user.as_str().into(),
            self.rig.as_str().into(),
            self.acsf_date.as_str().into(),
        ]
    }
}

/// Render the workbook and save it to `path`.
pub fn write_workbook(
    path: &Path,
    preps: &[PrepSummary],
    slices: &[SliceSummary],
    config: &ReportConfig,
) -> ReportResult<()> {
    let bytes = render_workbook(preps, slices, config)?;
    save_atomically(path, &bytes)?;
    info!(
        "Wrote {} prep rows and {} slice rows to {}",
        preps.len(),
        slices.len(),
        path.display()
    );
    Ok(())
}

/// Render the workbook into an in-memory xlsx file.
pub fn render_workbook(
    preps: &[PrepSummary],
    slices: &[SliceSummary],
    config: &ReportConfig,
) -> ReportResult<Vec<u8>> {
    let normal = build_format(&config.normal);
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(PREP_SHEET)?;
    let prep_header = build_format(&config.prep_header);
    write_table(sheet, preps, &prep_header, &normal, config.column_width)?;

    if !preps.is_empty() {
        let highlight = ConditionalFormatCell::new()
            .set_rule(ConditionalFormatCellRule::GreaterThan(0.0))
            .set_format(build_format(&config.issue));
        sheet.add_conditional_format(
            1,
            ISSUE_FIRST_COL,
            preps.len() as u32,
            ISSUE_LAST_COL,
            &highlight,
        )?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(SLICE_SHEET)?;
    let slice_header = build_format(&config.slice_header);
    write_table(sheet, slices, &slice_header, &normal, config.column_width)?;

    debug!("Rendering workbook");
    Ok(workbook.save_to_buffer()?)
}

fn write_table<R: SheetRow>(
    sheet: &mut Worksheet,
    rows: &[R],
    header: &Format,
    normal: &Format,
    column_width: f64,
) -> ReportResult<()> {
    sheet.set_column_range_width(0, LAST_STYLED_COL, column_width)?;
    for (col, label) in R::COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *label, header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, cell) in row.cells().into_iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => sheet.write_string_with_format(r, col, text, normal)?,
                Cell::Number(n) => sheet.write_number_with_format(r, col, n, normal)?,
                Cell::Blank => sheet.write_blank(r, col, normal)?,
            };
        }
    }

    Ok(())
}

/// Build a cell format from a style entry.
pub fn build_format(style: &StyleConfig) -> Format {
    let mut format = Format::new()
        .set_font_name(style.font_name.as_str())
        .set_font_size(style.font_size)
        .set_align(parse_align(&style.align))
        .set_num_format(style.num_format.as_str());

    if style.bold {
        format = format.set_bold();
    }
    if let Some(ref color) = style.bg_color {
        format = format.set_background_color(hex_color(color).as_str());
    }

    format
}

fn parse_align(align: &str) -> FormatAlign {
    match align.trim().to_ascii_lowercase().as_str() {
        "center" | "centre" => FormatAlign::Center,
        "right" => FormatAlign::Right,
        _ => FormatAlign::Left,
    }
}

/// Accept colors with or without the leading `#`.
fn hex_color(color: &str) -> String {
    let color = color.trim();
    if color.starts_with('#') {
        color.to_string()
    } else {
        format!("#{}", color)
    }
}
