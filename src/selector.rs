//! selector.rs – sheet selectors and binding them to sheet positions.

use std::{convert::Infallible, fmt, str::FromStr};

use crate::{config::SHEETS_PER_FILE, error::UsageError};

/// A user-supplied sheet reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// Blank selector: the first sheet in tab order.
    First,
    /// 1-based ordinal as typed; range is checked on binding.
    Index(i64),
    /// Case-insensitive exact name.
    Name(String),
}

impl FromStr for SheetSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(if trimmed.is_empty() {
            SheetSelector::First
        } else if let Ok(i) = trimmed.parse::<i64>() {
            SheetSelector::Index(i)
        } else {
            SheetSelector::Name(s.to_owned())
        })
    }
}

impl From<&str> for SheetSelector {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(sel) => sel,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::First => f.write_str("<first sheet>"),
            SheetSelector::Index(i) => write!(f, "{i}"),
            SheetSelector::Name(n) => f.write_str(n),
        }
    }
}

impl SheetSelector {
    /// Resolves against the workbook's sheet names (tab order) to a 0-based position.
    pub fn resolve(&self, names: &[String]) -> Result<usize, UsageError> {
        match self {
            SheetSelector::First if !names.is_empty() => Ok(0),
            SheetSelector::First => Err(UsageError::IndexOutOfRange {
                index: 1,
                count: 0,
            }),
            SheetSelector::Index(i) => {
                if *i < 1 || *i > names.len() as i64 {
                    Err(UsageError::IndexOutOfRange {
                        index: *i,
                        count: names.len(),
                    })
                } else {
                    Ok((*i - 1) as usize)
                }
            }
            SheetSelector::Name(wanted) => names
                .iter()
                .position(|n| n.to_lowercase() == wanted.to_lowercase())
                .ok_or_else(|| UsageError::SheetNotFound(wanted.clone())),
        }
    }
}

/// Binds exactly five selectors. The count is checked before any lookup.
pub fn bind_sheets(
    names: &[String],
    selectors: &[SheetSelector],
) -> Result<[usize; SHEETS_PER_FILE], UsageError> {
    if selectors.len() != SHEETS_PER_FILE {
        return Err(UsageError::SelectorCount {
            expected: SHEETS_PER_FILE,
            got: selectors.len(),
        });
    }
    let mut bound = [0usize; SHEETS_PER_FILE];
    for (slot, sel) in bound.iter_mut().zip(selectors) {
        *slot = sel.resolve(names)?;
        log::debug!("selector {sel} -> sheet '{}'", names[*slot]);
    }
    Ok(bound)
}
