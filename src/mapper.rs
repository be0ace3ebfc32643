//! mapper.rs – builds one destination row out of one source row and appends it.

use crate::{
    cell::CellValue,
    grid::{SheetRead, SheetWrite},
    layout::{SKIPPED_COLUMN, SheetLayout},
};

/// Why an append inserted nothing. Neither case is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Source sheet has no used range at all.
    EmptySheet,
    /// Every mapped cell of the source row is empty.
    EmptyRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted { row: u32 },
    Skipped(SkipReason),
}

impl AppendOutcome {
    /// 1 for an inserted row, 0 otherwise.
    pub fn count(&self) -> usize {
        match self {
            AppendOutcome::Inserted { .. } => 1,
            AppendOutcome::Skipped(_) => 0,
        }
    }
}

/// Destination cells computed from one source row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMapping {
    /// (destination column, value) in source column order.
    pub cells: Vec<(u32, CellValue)>,
    /// Column C was dropped and later columns shifted left.
    pub scooted: bool,
    /// Last used column of the source sheet.
    pub last_col: u32,
}

impl RowMapping {
    /// `None` when the source sheet has no used range.
    pub fn build<S: SheetRead + ?Sized>(source: &S, layout: &SheetLayout) -> Option<Self> {
        let used = source.used_range()?;
        let scooted = layout.skip_column_c && used.last_col >= SKIPPED_COLUMN;

        let cells = (used.first_col..=used.last_col)
            .filter(|&c| !(scooted && c == SKIPPED_COLUMN))
            .map(|c| {
                let dest_col = if scooted && c > SKIPPED_COLUMN { c - 1 } else { c };
                (dest_col, source.value(layout.source_row, c).clone())
            })
            .collect();

        Some(Self {
            cells,
            scooted,
            last_col: used.last_col,
        })
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_empty())
    }

    /// Writes the mapped cells into `row` of `dest`.
    pub fn apply<D: SheetWrite + ?Sized>(&self, dest: &mut D, row: u32) {
        for (col, value) in &self.cells {
            dest.set_value(row, *col, value.clone());
        }

        if self.scooted {
            // nothing shifted into C (source ended at C)
            if !self.cells.iter().any(|(c, _)| *c == SKIPPED_COLUMN) {
                dest.clear_contents(row, SKIPPED_COLUMN);
            }
            // the old last position moved one left
            dest.clear_contents(row, self.last_col);
        }
    }
}

/// First free row below the destination's used range.
pub fn next_free_row<D: SheetRead + ?Sized>(dest: &D) -> u32 {
    dest.used_range().map_or(0, |r| r.last_row) + 1
}

/// Copies `layout.source_row` of `source` onto the first free row of `dest`.
pub fn append_row_values<S, D>(source: &S, dest: &mut D, layout: &SheetLayout) -> AppendOutcome
where
    S: SheetRead + ?Sized,
    D: SheetWrite + ?Sized,
{
    let Some(mapping) = RowMapping::build(source, layout) else {
        log::debug!("'{}' has no used range", source.name());
        return AppendOutcome::Skipped(SkipReason::EmptySheet);
    };
    if mapping.is_blank() {
        log::debug!("'{}' row {} is empty", source.name(), layout.source_row);
        return AppendOutcome::Skipped(SkipReason::EmptyRow);
    }

    let row = next_free_row(dest);
    mapping.apply(dest, row);
    log::debug!(
        "'{}' row {} -> '{}' row {row}",
        source.name(),
        layout.source_row,
        dest.name()
    );
    AppendOutcome::Inserted { row }
}
