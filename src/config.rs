//! config.rs – paths, suffixes and defaults handed to the resolver.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chrono::{
    NaiveDate,
    format::{Item, StrftimeItems},
};
use serde::Deserialize;

/// Number of report sheets copied per run.
pub const SHEETS_PER_FILE: usize = 5;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "AUTOINSERT_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Folder holding the daily source workbooks.
    pub daily_dir: PathBuf,
    /// Appended to the formatted date to build the daily file name.
    pub daily_suffix: String,
    /// `chrono` format for the date part of the daily file name.
    pub daily_date_format: String,
    /// Consolidated workbook that receives the rows.
    pub master_path: PathBuf,
    pub default_selectors: Vec<String>,
    pub updated_suffix: String,
    /// `chrono` format used when `<name>_updated<ext>` is taken.
    pub timestamp_format: String,
    pub preview_rows: u32,
    pub preview_cols: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daily_dir: PathBuf::from(r"c:\Users\INC_ITServicePWRApps\Documents\EDI"),
            daily_suffix: " Stats - converted.xlsx".to_owned(),
            daily_date_format: "%Y_%m_%d".to_owned(),
            master_path: PathBuf::from(
                r"c:\Users\INC_ITServicePWRApps\Documents\EDI\EDI_Daily_Stats_MASTER_TEST.xlsx",
            ),
            default_selectors: [
                "DELFOR Summary",
                "ORDERS Summary",
                "DESADV Summary",
                "INVOIC Summary",
                "ORDRSP Summary",
            ]
            .map(str::to_owned)
            .to_vec(),
            updated_suffix: "_updated".to_owned(),
            timestamp_format: "%Y%m%d_%H%M%S".to_owned(),
            preview_rows: 10,
            preview_cols: 10,
        }
    }
}

impl Config {
    /// Built-in defaults, or the JSON file named by `AUTOINSERT_CONFIG`.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_selectors.len() != SHEETS_PER_FILE {
            bail!(
                "Default sheet selector list must contain exactly {SHEETS_PER_FILE} items, got {}.",
                self.default_selectors.len()
            );
        }
        if self.preview_rows == 0 || self.preview_cols == 0 {
            bail!("Preview size must be at least 1x1.");
        }
        for fmt in [&self.daily_date_format, &self.timestamp_format] {
            if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                bail!("Invalid date format in config: {fmt:?}");
            }
        }
        Ok(())
    }

    /// `<daily_dir>/<today formatted><daily_suffix>`
    pub fn default_source_path(&self, today: NaiveDate) -> PathBuf {
        let file_name = format!(
            "{}{}",
            today.format(&self.daily_date_format),
            self.daily_suffix
        );
        self.daily_dir.join(file_name)
    }
}
