//! report.rs – console previews, per-sheet status and usage notes.
//!
//! Line layout is kept stable; people grep these logs.

use std::{io, io::Write, path::Path};

use chrono::NaiveDate;

use crate::{
    config::{Config, SHEETS_PER_FILE},
    grid::SheetRead,
    layout::SheetLayout,
    mapper::AppendOutcome,
};

/// `<label>: '<sheet>' used range = R rows x C cols` plus a tab-separated
/// preview of at most `max_rows` x `max_cols` cells, each as its number
/// format shows it.
pub fn print_preview<W, S>(
    out: &mut W,
    label: &str,
    sheet: &S,
    max_rows: u32,
    max_cols: u32,
) -> io::Result<()>
where
    W: Write,
    S: SheetRead + ?Sized,
{
    let Some(used) = sheet.used_range() else {
        return writeln!(out, "{label}: '{}' is empty.", sheet.name());
    };

    writeln!(
        out,
        "{label}: '{}' used range = {} rows x {} cols",
        sheet.name(),
        used.rows(),
        used.cols()
    )?;

    let last_row = used.last_row.min(used.first_row + max_rows - 1);
    let last_col = used.last_col.min(used.first_col + max_cols - 1);
    for r in used.first_row..=last_row {
        let line = (used.first_col..=last_col)
            .map(|c| sheet.display_text(r, c))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// `  <dest>: inserted (from row N[, col C skipped + scooted left])` or
/// `  <dest>: skipped (row N empty)`.
pub fn print_status<W: Write>(
    out: &mut W,
    dest_name: &str,
    layout: &SheetLayout,
    outcome: &AppendOutcome,
) -> io::Result<()> {
    let note = if layout.skip_column_c {
        ", col C skipped + scooted left"
    } else {
        ""
    };
    match outcome {
        AppendOutcome::Inserted { .. } => writeln!(
            out,
            "  {dest_name}: inserted (from row {}{note})",
            layout.source_row
        ),
        AppendOutcome::Skipped(_) => writeln!(
            out,
            "  {dest_name}: skipped (row {} empty)",
            layout.source_row
        ),
    }
}

pub fn print_summary<W: Write>(out: &mut W, saved: &Path, inserted: usize) -> io::Result<()> {
    writeln!(out, "Saved updated connected workbook: {}", saved.display())?;
    writeln!(out, "Rows inserted: {inserted}/{SHEETS_PER_FILE}")
}

/// Guidance printed after every usage error.
pub fn print_usage_notes<W: Write>(out: &mut W, cfg: &Config, today: NaiveDate) -> io::Result<()> {
    writeln!(out, "Usage:")?;
    writeln!(out, "  autoinsert")?;
    writeln!(out, "  autoinsert <fileA> <fileB>")?;
    writeln!(
        out,
        "  autoinsert <fileA> <sheetA1..sheetA5> <fileB> <sheetB1..sheetB5>"
    )?;
    writeln!(out, "Notes:")?;
    writeln!(
        out,
        "  - <sheetX> can be a sheet name (e.g. Sheet1) or a 1-based index (e.g. 2)."
    )?;
    writeln!(
        out,
        "  - If you omit sheet selectors, these are used: {}",
        cfg.default_selectors.join(", ")
    )?;
    writeln!(out, "  - With no args, defaults to (today):")?;
    writeln!(out, "      A: {}", cfg.default_source_path(today).display())?;
    writeln!(out, "      B: {}", cfg.master_path.display())
}
