//! grid.rs – sparse in-memory sheet model and the read/write seams the
//! row mapper works against.

use std::collections::BTreeMap;

use crate::{
    cell::{CellValue, coord},
    numfmt,
};

static EMPTY: CellValue = CellValue::Empty;

/// Smallest rectangle holding every non-empty cell. All bounds are 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl UsedRange {
    pub fn rows(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    pub fn cols(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    /// A1 reference, e.g. `A1:E20` (or `B2` for a single cell).
    pub fn a1(&self) -> String {
        let start = coord(self.first_row, self.first_col);
        if self.first_row == self.last_row && self.first_col == self.last_col {
            start
        } else {
            format!("{start}:{}", coord(self.last_row, self.last_col))
        }
    }
}

/// Read access to one sheet.
pub trait SheetRead {
    fn name(&self) -> &str;

    /// Value at (row, col); `CellValue::Empty` for absent cells.
    fn value(&self, row: u32, col: u32) -> &CellValue;

    /// `None` when the sheet holds no non-empty cell.
    fn used_range(&self) -> Option<UsedRange>;

    /// Number format code of a cell; `None` means General.
    fn number_format(&self, _row: u32, _col: u32) -> Option<&str> {
        None
    }

    /// Cell text as the sheet shows it.
    fn display_text(&self, row: u32, col: u32) -> String {
        let value = self.value(row, col);
        match self.number_format(row, col) {
            Some(code) => numfmt::format_value(value, code),
            None => value.to_string(),
        }
    }
}

/// Write access to one sheet. Only values are touched; formatting stays where it is.
pub trait SheetWrite: SheetRead {
    fn set_value(&mut self, row: u32, col: u32, value: CellValue);

    fn clear_contents(&mut self, row: u32, col: u32);
}

/// Named sparse grid keyed by (row, col).
#[derive(Debug, Clone, Default)]
pub struct Grid {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
    /// Number format codes; they stay when values change, like cell styles.
    formats: BTreeMap<(u32, u32), String>,
}

impl Grid {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            formats: BTreeMap::new(),
        }
    }

    pub fn set_number_format(&mut self, row: u32, col: u32, code: impl Into<String>) {
        self.formats.insert((row, col), code.into());
    }

    /// Lays `values` out left to right starting at (row, first_col).
    pub fn with_row<I, V>(mut self, row: u32, first_col: u32, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        for (offset, v) in values.into_iter().enumerate() {
            self.set_value(row, first_col + offset as u32, v.into());
        }
        self
    }
}

impl SheetRead for Grid {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self, row: u32, col: u32) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    fn used_range(&self) -> Option<UsedRange> {
        let mut it = self
            .cells
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(&(r, c), _)| (r, c));
        let (r0, c0) = it.next()?;
        let mut range = UsedRange {
            first_row: r0,
            first_col: c0,
            last_row: r0,
            last_col: c0,
        };
        for (r, c) in it {
            range.first_row = range.first_row.min(r);
            range.first_col = range.first_col.min(c);
            range.last_row = range.last_row.max(r);
            range.last_col = range.last_col.max(c);
        }
        Some(range)
    }

    fn number_format(&self, row: u32, col: u32) -> Option<&str> {
        self.formats.get(&(row, col)).map(String::as_str)
    }
}

impl SheetWrite for Grid {
    fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    fn clear_contents(&mut self, row: u32, col: u32) {
        self.cells.remove(&(row, col));
    }
}
