//! cell.rs – cell values and A1 coordinates

use std::{fmt, sync::OnceLock};

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;

/// A literal cell value. Formatting and formulas are not carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date (days since 1899-12-30, fraction = time of day).
    DateTime(f64),
    /// Error literal such as `#N/A`.
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(serial) => match serial_to_datetime(*serial) {
                Some(dt) if dt.num_seconds_from_midnight() == 0 => {
                    write!(f, "{}", dt.format("%-m/%-d/%Y"))
                }
                Some(dt) => write!(f, "{}", dt.format("%-m/%-d/%Y %H:%M:%S")),
                None => f.write_str(&format_number(*serial)),
            },
            CellValue::Error(code) => f.write_str(code),
        }
    }
}

/// Number text as stored in `<v>` and shown in previews.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Excel serial -> calendar time. The 1900 leap-year quirk is ignored,
/// so serials below 61 are a day off, same as every OLE date converter.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(Duration::milliseconds(millis))
        .map(|dt| dt.with_nanosecond(0).unwrap_or(dt))
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_owned())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::from(s.as_str())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/* ========================== A1 COORDINATES ================================ */

/// 1-based column number -> letters (1 -> "A", 28 -> "AB").
pub fn col_letter(mut n: u32) -> String {
    let mut s = String::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        s.insert(0, (b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    s
}

/// Column letters -> 1-based column number ("A" -> 1). Case-insensitive.
pub fn col_index(letters: &str) -> u32 {
    letters
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .fold(0, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as u32)
}

/// `"B17"` -> `(row 17, col 2)`.
pub fn parse_coord(coord: &str) -> Result<(u32, u32)> {
    static RE_CELL: OnceLock<Regex> = OnceLock::new();
    let re = RE_CELL.get_or_init(|| {
        Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").expect("static cell regex")
    });
    let Some(caps) = re.captures(coord) else {
        bail!("invalid cell coordinate: {coord}");
    };
    let col = col_index(&caps[1]);
    let row: u32 = caps[2]
        .parse()
        .with_context(|| format!("invalid row in cell coordinate {coord}"))?;
    if row == 0 {
        bail!("invalid cell coordinate: {coord}");
    }
    Ok((row, col))
}

/// `(row 17, col 2)` -> `"B17"`.
pub fn coord(row: u32, col: u32) -> String {
    format!("{}{}", col_letter(col), row)
}
