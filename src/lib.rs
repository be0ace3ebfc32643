//! autoinsert: copies the totals row of five EDI summary sheets from a
//! daily workbook into the matching sheets of a consolidated workbook.
//!
//! The xlsx parts are read and patched directly (zip + quick-xml); values
//! are copied, formatting of the destination is left alone.

pub mod cell;
pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub mod layout;
pub mod mapper;
pub mod numfmt;
pub mod persist;
pub mod report;
pub mod selector;
mod sheet_xml;
mod styles;
pub mod workbook;

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

pub use crate::{
    cell::CellValue,
    cli::{Cli, RunInputs, resolve},
    config::Config,
    error::{UsageError, usage_error},
    grid::{Grid, SheetRead, SheetWrite, UsedRange},
    layout::{SheetLayout, layout_for},
    mapper::{AppendOutcome, RowMapping, SkipReason, append_row_values},
    selector::SheetSelector,
    workbook::{Workbook, Worksheet},
};

/// What one run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    /// (destination sheet, layout used, outcome) in processing order.
    pub sheets: Vec<(String, SheetLayout, AppendOutcome)>,
}

impl RunReport {
    pub fn inserted(&self) -> usize {
        self.sheets.iter().map(|(_, _, o)| o.count()).sum()
    }
}

/// Loads both workbooks, previews the bound sheets, appends one row per
/// sheet pair and saves the destination under a fresh name. The source is
/// never written; the destination file itself is never overwritten.
pub fn run<W: Write>(
    inputs: &RunInputs,
    cfg: &Config,
    now: NaiveDateTime,
    out: &mut W,
) -> Result<RunReport> {
    inputs.check_files()?;

    let source = Workbook::open(&inputs.source)
        .with_context(|| format!("cannot load {}", inputs.source.display()))?;
    let mut dest = Workbook::open(&inputs.dest)
        .with_context(|| format!("cannot load {}", inputs.dest.display()))?;

    let src_idx = source.bind(&inputs.source_selectors)?;
    let dst_idx = dest.bind(&inputs.dest_selectors)?;

    // ── previews (before any mutation) ───────────────────────────────
    for &i in &src_idx {
        let sheet = source.sheet(i).context("bound sheet missing")?;
        let label = format!("File A - {}", sheet.name());
        report::print_preview(out, &label, sheet, cfg.preview_rows, cfg.preview_cols)?;
        writeln!(out)?;
    }
    for (n, &i) in dst_idx.iter().enumerate() {
        let sheet = dest.sheet(i).context("bound sheet missing")?;
        let label = format!("File B - {}", sheet.name());
        report::print_preview(out, &label, sheet, cfg.preview_rows, cfg.preview_cols)?;
        if n + 1 < dst_idx.len() {
            writeln!(out)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Appending 1 new row into each connected sheet...")?;

    // ── row mapping ──────────────────────────────────────────────────
    let mut sheets = Vec::with_capacity(src_idx.len());
    for (&si, &di) in src_idx.iter().zip(&dst_idx) {
        let src_sheet = source.sheet(si).context("bound sheet missing")?;
        let layout = layout_for(src_sheet.name());
        let dst_sheet = dest.sheet_mut(di).context("bound sheet missing")?;

        let outcome = append_row_values(src_sheet, dst_sheet, &layout);
        report::print_status(out, dst_sheet.name(), &layout, &outcome)?;
        sheets.push((dst_sheet.name().to_owned(), layout, outcome));
    }

    // ── save ─────────────────────────────────────────────────────────
    let output = persist::updated_copy_path(
        &inputs.dest,
        &cfg.updated_suffix,
        &cfg.timestamp_format,
        now,
    );
    persist::save_workbook(&mut dest, &output)?;

    let run = RunReport { output, sheets };
    report::print_summary(out, &run.output, run.inserted())?;
    Ok(run)
}
