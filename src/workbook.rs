use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::{Cursor, Read, Seek, Write},
    path::Path,
};

use ::zip as zip_crate;
use anyhow::{Context, Result};
use quick_xml::{Reader, events::Event};

use crate::{
    cell::CellValue,
    config::SHEETS_PER_FILE,
    error::UsageError,
    grid::{Grid, SheetRead, SheetWrite, UsedRange},
    selector::{SheetSelector, bind_sheets},
    sheet_xml::{patch_cells, read_cells, read_shared_strings},
    styles::Styles,
};

/// One worksheet: its values in memory plus the raw part they came from.
///
/// Writes land in the grid right away and are queued as edits; the part
/// itself is only rewritten by [`Workbook::write_to`].
#[derive(Debug, Clone)]
pub struct Worksheet {
    grid: Grid,
    part: String,
    xml: Vec<u8>,
    edits: BTreeMap<(u32, u32), CellValue>,
}

impl Worksheet {
    /// Zip entry name, e.g. `xl/worksheets/sheet2.xml`.
    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }
}

impl SheetRead for Worksheet {
    fn name(&self) -> &str {
        self.grid.name()
    }

    fn value(&self, row: u32, col: u32) -> &CellValue {
        self.grid.value(row, col)
    }

    fn used_range(&self) -> Option<UsedRange> {
        self.grid.used_range()
    }

    fn number_format(&self, row: u32, col: u32) -> Option<&str> {
        self.grid.number_format(row, col)
    }
}

impl SheetWrite for Worksheet {
    fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.grid.set_value(row, col, value.clone());
        self.edits.insert((row, col), value);
    }

    fn clear_contents(&mut self, row: u32, col: u32) {
        self.grid.clear_contents(row, col);
        self.edits.insert((row, col), CellValue::Empty);
    }
}

/// An opened `.xlsx`. The whole archive is read into memory on open, so the
/// file handle is closed before `open` returns.
#[derive(Debug)]
pub struct Workbook {
    archive: Vec<u8>,
    sheets: Vec<Worksheet>,
    styles: Option<Styles>,
}

impl Workbook {
    /// Reads the workbook, its sheet list and every worksheet's values.
    pub fn open<P: AsRef<Path>>(src: P) -> Result<Self> {
        let src_path = src.as_ref();
        let archive = fs::read(src_path)
            .with_context(|| format!("cannot read {}", src_path.display()))?;
        let mut zip = zip_crate::ZipArchive::new(Cursor::new(archive.as_slice()))
            .with_context(|| format!("{} is not an xlsx archive", src_path.display()))?;

        // ── workbook.xml + rels ──────────────────────────────────────
        let workbook_xml = read_part(&mut zip, "xl/workbook.xml")?
            .context("xl/workbook.xml not found")?;
        let rels_xml = read_part(&mut zip, "xl/_rels/workbook.xml.rels")?
            .context("xl/_rels/workbook.xml.rels not found")?;
        let entries = sheet_entries(&workbook_xml)?;
        let targets = relationship_targets(&rels_xml)?;

        // ── sharedStrings.xml / styles.xml (both optional) ───────────
        let shared = match read_part(&mut zip, "xl/sharedStrings.xml")? {
            Some(xml) => read_shared_strings(&xml)?,
            None => Vec::new(),
        };
        let styles = read_part(&mut zip, "xl/styles.xml")?
            .map(Styles::parse)
            .transpose()?;
        if styles.is_none() {
            log::warn!("{}: no styles.xml, dates read as numbers", src_path.display());
        }

        // ── worksheets ───────────────────────────────────────────────
        let mut sheets = Vec::with_capacity(entries.len());
        for (name, rid) in entries {
            let target = targets
                .get(&rid)
                .with_context(|| format!("Relationship for `{name}` not found in workbook.xml.rels"))?;
            let part = part_path(target);
            let xml = read_part(&mut zip, &part)?
                .with_context(|| format!("{part} not found in zip"))?;
            let grid = read_cells(&xml, &name, &shared, styles.as_ref())
                .with_context(|| format!("cannot read sheet '{name}'"))?;
            log::debug!("sheet '{name}' -> {part}");
            sheets.push(Worksheet {
                grid,
                part,
                xml,
                edits: BTreeMap::new(),
            });
        }
        drop(zip);

        Ok(Self {
            archive,
            sheets,
            styles,
        })
    }

    /// Sheet names in tab order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_owned()).collect()
    }

    /// 0-based position.
    pub fn sheet(&self, idx: usize) -> Option<&Worksheet> {
        self.sheets.get(idx)
    }

    pub fn sheet_mut(&mut self, idx: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(idx)
    }

    /// Binds five selectors to 0-based sheet positions.
    pub fn bind(&self, selectors: &[SheetSelector]) -> Result<[usize; SHEETS_PER_FILE], UsageError> {
        bind_sheets(&self.sheet_names(), selectors)
    }

    /// Writes the workbook as a new archive: edited worksheet parts (and
    /// `styles.xml` when a date format had to be added) are regenerated,
    /// every other entry is copied raw.
    pub fn write_to<W: Write + Seek>(&mut self, out: W) -> Result<()> {
        let needs_date = self.sheets.iter().any(|s| {
            s.edits
                .values()
                .any(|v| matches!(v, CellValue::DateTime(_)))
        });
        if needs_date && self.styles.is_none() {
            log::warn!("no styles.xml, dates written as plain numbers");
        }

        let mut patched: HashMap<&str, Vec<u8>> = HashMap::new();
        for sheet in self.sheets.iter().filter(|s| s.is_dirty()) {
            let dimension = sheet.used_range().map(|r| r.a1());
            let date_style = |base: Option<u32>| match self.styles.as_mut() {
                Some(styles) => styles.date_xf_for(base).map(Some),
                None => Ok(None),
            };
            let xml = patch_cells(&sheet.xml, &sheet.edits, date_style, dimension.as_deref())
                .with_context(|| format!("cannot update sheet '{}'", sheet.name()))?;
            patched.insert(sheet.part.as_str(), xml);
        }
        let styles_xml = self
            .styles
            .as_ref()
            .filter(|s| s.is_dirty())
            .map(Styles::xml);

        let mut zin = zip_crate::ZipArchive::new(Cursor::new(self.archive.as_slice()))?;
        let mut zout = zip_crate::ZipWriter::new(out);
        let opt: zip_crate::write::FileOptions<'_, ()> = zip_crate::write::FileOptions::default()
            .compression_method(zip_crate::CompressionMethod::Deflated);

        for i in 0..zin.len() {
            let file = zin.by_index_raw(i)?;
            let name = file.name().to_owned();

            let replacement = match (patched.get(name.as_str()), styles_xml) {
                (Some(xml), _) => Some(xml.as_slice()),
                (None, Some(xml)) if name == "xl/styles.xml" => Some(xml),
                _ => None,
            };
            match replacement {
                Some(content) => {
                    drop(file);
                    zout.start_file(name.as_str(), opt)?;
                    zout.write_all(content)?;
                }
                None => zout.raw_copy_file(file)?,
            }
        }

        zout.finish()?;
        Ok(())
    }
}

fn read_part<R: Read + Seek>(
    zip: &mut zip_crate::ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    let mut part = match zip.by_name(name) {
        Ok(part) => part,
        Err(zip_crate::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("cannot read {name}")),
    };
    let mut buf = Vec::with_capacity(part.size() as usize);
    part.read_to_end(&mut buf)
        .with_context(|| format!("cannot read {name}"))?;
    Ok(Some(buf))
}

/// `(name, r:id)` of every `<sheet>` in `workbook.xml`, in tab order.
fn sheet_entries(workbook_xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut rdr = Reader::from_reader(workbook_xml);
    rdr.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match rdr.read_event().context("malformed workbook.xml")? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rid = None;
                for a in e.attributes().with_checks(false).flatten() {
                    match a.key.local_name().as_ref() {
                        b"name" => {
                            name = Some(a.decode_and_unescape_value(rdr.decoder())?.into_owned())
                        }
                        // r:id – the only `id` on <sheet>
                        b"id" => rid = Some(String::from_utf8_lossy(&a.value).into_owned()),
                        _ => {}
                    }
                }
                if let (Some(n), Some(r)) = (name, rid) {
                    sheets.push((n, r));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// `Id -> Target` from `workbook.xml.rels`.
fn relationship_targets(rels_xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut rdr = Reader::from_reader(rels_xml);
    rdr.config_mut().trim_text(true);

    let mut targets = HashMap::new();
    loop {
        match rdr.read_event().context("malformed workbook.xml.rels")? {
            Event::Empty(ref e) | Event::Start(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for a in e.attributes().with_checks(false).flatten() {
                    match a.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&a.value).into_owned()),
                        b"Target" => {
                            target = Some(a.decode_and_unescape_value(rdr.decoder())?.into_owned())
                        }
                        _ => {}
                    }
                }
                if let (Some(i), Some(t)) = (id, target) {
                    targets.insert(i, t);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Relationship target -> zip entry name.
fn part_path(target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        abs.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{target}")
    }
}
