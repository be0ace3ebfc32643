//! cli.rs – positional arguments -> two workbook paths and their selectors.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::{
    config::{Config, SHEETS_PER_FILE},
    error::UsageError,
    selector::SheetSelector,
};

/// Append one row per EDI summary sheet from a daily workbook (A) into the
/// consolidated workbook (B), saving B as `<name>_updated.xlsx`.
#[derive(Parser, Debug)]
#[command(name = "autoinsert")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Nothing, `<fileA> <fileB>`, or
    /// `<fileA> <5 sheets of A> <fileB> <5 sheets of B>` (name or 1-based index)
    #[arg(value_name = "ARGS", num_args = 0.., allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Resolved inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInputs {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub source_selectors: Vec<SheetSelector>,
    pub dest_selectors: Vec<SheetSelector>,
}

impl RunInputs {
    /// Both workbooks must exist before anything is opened.
    pub fn check_files(&self) -> Result<(), UsageError> {
        for path in [&self.source, &self.dest] {
            if !path.is_file() {
                return Err(UsageError::FileNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

/// 0 args -> configured paths, 2 args -> two paths, 12 args -> two paths
/// with five selectors each. Anything else is a usage error.
pub fn resolve(args: &[String], cfg: &Config, today: NaiveDate) -> Result<RunInputs, UsageError> {
    let defaults = || -> Vec<SheetSelector> {
        cfg.default_selectors
            .iter()
            .map(|s| SheetSelector::from(s.as_str()))
            .collect()
    };
    let selectors = |raw: &[String]| -> Vec<SheetSelector> {
        raw.iter().map(|s| SheetSelector::from(s.as_str())).collect()
    };

    const WITH_SELECTORS: usize = 2 + 2 * SHEETS_PER_FILE;
    match args.len() {
        0 => Ok(RunInputs {
            source: cfg.default_source_path(today),
            dest: cfg.master_path.clone(),
            source_selectors: defaults(),
            dest_selectors: defaults(),
        }),
        2 => Ok(RunInputs {
            source: PathBuf::from(&args[0]),
            dest: PathBuf::from(&args[1]),
            source_selectors: defaults(),
            dest_selectors: defaults(),
        }),
        WITH_SELECTORS => {
            let (a, b) = args.split_at(1 + SHEETS_PER_FILE);
            Ok(RunInputs {
                source: PathBuf::from(&a[0]),
                dest: PathBuf::from(&b[0]),
                source_selectors: selectors(&a[1..]),
                dest_selectors: selectors(&b[1..]),
            })
        }
        n => Err(UsageError::ArgCount(n)),
    }
}
