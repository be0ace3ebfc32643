//! persist.rs – where the updated workbook goes and how it gets there.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tempfile::NamedTempFile;

use crate::workbook::Workbook;

/// `<dir>/<stem><suffix><ext>`; when that exists `<stem><suffix>_<stamp><ext>`;
/// when that exists too, `_2`, `_3`, ... is added after the stamp.
pub fn updated_copy_path(
    input: &Path,
    suffix: &str,
    stamp_format: &str,
    now: NaiveDateTime,
) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let candidate = dir.join(format!("{stem}{suffix}{ext}"));
    if !candidate.exists() {
        return candidate;
    }

    let stamp = now.format(stamp_format).to_string();
    let stamped = dir.join(format!("{stem}{suffix}_{stamp}{ext}"));
    if !stamped.exists() {
        return stamped;
    }

    (2u32..)
        .map(|n| dir.join(format!("{stem}{suffix}_{stamp}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(stamped)
}

/// Writes `workbook` to `dst` through a temp file in the same folder.
/// Nothing is left behind on failure and an existing `dst` is never replaced.
pub fn save_workbook(workbook: &mut Workbook, dst: &Path) -> Result<()> {
    let dir = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create a temp file in {}", dir.display()))?;
    workbook
        .write_to(&mut tmp)
        .with_context(|| format!("cannot write {}", dst.display()))?;
    tmp.persist_noclobber(dst)
        .map_err(|e| e.error)
        .with_context(|| format!("cannot save {}", dst.display()))?;
    Ok(())
}
