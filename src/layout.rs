//! layout.rs – where each report sheet keeps the row to copy.
//!
//! The EDI summary sheets follow a fixed template: the DELFOR and ORDERS
//! summaries carry their totals on row 17 with an extra column C that the
//! consolidated workbook does not have; the others carry totals on row 7.

/// Column dropped (and closed up) when a layout asks for it.
pub const SKIPPED_COLUMN: u32 = 3;

/// Per-sheet copy settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    /// 1-based source row to copy.
    pub source_row: u32,
    /// Drop column C and shift everything after it one column left.
    pub skip_column_c: bool,
}

struct LayoutRule {
    /// Matched as case-insensitive substrings of the source sheet name.
    markers: &'static [&'static str],
    layout: SheetLayout,
}

const LAYOUT_RULES: &[LayoutRule] = &[LayoutRule {
    markers: &["DELFOR", "ORDERS"],
    layout: SheetLayout {
        source_row: 17,
        skip_column_c: true,
    },
}];

const FALLBACK_LAYOUT: SheetLayout = SheetLayout {
    source_row: 7,
    skip_column_c: false,
};

/// First rule whose marker appears in `sheet_name`, else the fallback.
pub fn layout_for(sheet_name: &str) -> SheetLayout {
    let upper = sheet_name.to_uppercase();
    LAYOUT_RULES
        .iter()
        .find(|rule| rule.markers.iter().any(|m| upper.contains(m)))
        .map_or(FALLBACK_LAYOUT, |rule| rule.layout)
}
