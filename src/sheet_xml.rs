//! sheet_xml.rs – reading cell values out of a worksheet part and merging
//! edited cells back into it.

use std::{collections::BTreeMap, io::Write};

use anyhow::{Context, Result, bail};
use quick_xml::{
    Reader, Writer,
    escape::unescape,
    events::{BytesStart, BytesText, Event},
};

use crate::{
    cell::{CellValue, coord, parse_coord},
    grid::{Grid, SheetWrite},
    styles::Styles,
};

/* ========================== READING ======================================= */

/// Raw `<c>` as found in the part, decoded on `</c>`.
struct RawCell {
    row: u32,
    col: u32,
    kind: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    inline: String,
}

impl RawCell {
    fn decode(self, shared: &[String], styles: Option<&Styles>) -> CellValue {
        let Self {
            row,
            col,
            kind,
            style,
            value,
            inline,
        } = self;
        match kind.as_deref() {
            Some("s") => {
                let idx = value.as_deref().and_then(|v| v.trim().parse::<usize>().ok());
                match idx.and_then(|i| shared.get(i)) {
                    Some(s) => CellValue::from(s.as_str()),
                    None => {
                        log::warn!("{}: bad shared string index {:?}", coord(row, col), value);
                        CellValue::Empty
                    }
                }
            }
            Some("inlineStr") => CellValue::from(inline),
            Some("str") | Some("d") => value.map(CellValue::from).unwrap_or_default(),
            Some("b") => match value.as_deref().map(str::trim) {
                Some("1") | Some("true") => CellValue::Bool(true),
                Some(_) => CellValue::Bool(false),
                None => CellValue::Empty,
            },
            Some("e") => value.map(CellValue::Error).unwrap_or_default(),
            None | Some("n") => {
                let Some(n) = value.as_deref().and_then(|v| v.trim().parse::<f64>().ok()) else {
                    return CellValue::Empty;
                };
                let is_date = match (style, styles) {
                    (Some(s), Some(st)) => st.is_date_style(s),
                    _ => false,
                };
                if is_date {
                    CellValue::DateTime(n)
                } else {
                    CellValue::Number(n)
                }
            }
            Some(other) => {
                log::warn!("{}: unknown cell type {other:?}", coord(row, col));
                value.map(CellValue::from).unwrap_or_default()
            }
        }
    }
}

/// Text between `start` and its end tag, unescaped. `xml` is the buffer `rdr` reads from.
fn read_text(rdr: &mut Reader<&[u8]>, xml: &[u8], start: &BytesStart<'_>) -> Result<String> {
    let span = rdr.read_to_end(start.name())?;
    let raw = xml
        .get(span.start as usize..span.end as usize)
        .context("text outside of the part")?;
    Ok(unescape(std::str::from_utf8(raw)?)?.into_owned())
}

/// Value of the attribute whose local name is `key`.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes().with_checks(false).flatten().find_map(|a| {
        (a.key.local_name().as_ref() == key)
            .then(|| String::from_utf8_lossy(&a.value).into_owned())
    })
}

/// Column of a `<c>`: from `r="B7"`, or the next column when `r` is omitted.
fn cell_col(e: &BytesStart<'_>, prev_col: u32) -> u32 {
    attr(e, b"r")
        .and_then(|r| parse_coord(&r).ok())
        .map_or(prev_col + 1, |(_, c)| c)
}

/// Row of a `<row>`: from `r="7"`, or the next row when `r` is omitted.
fn row_num(e: &BytesStart<'_>, prev_row: u32) -> u32 {
    attr(e, b"r")
        .and_then(|r| r.trim().parse().ok())
        .unwrap_or(prev_row + 1)
}

/// Loads every cell value of a worksheet part into a `Grid`.
pub fn read_cells(
    xml: &[u8],
    name: &str,
    shared: &[String],
    styles: Option<&Styles>,
) -> Result<Grid> {
    let mut rdr = Reader::from_reader(xml);
    let mut grid = Grid::new(name);
    let mut row = 0u32;
    let mut col = 0u32;
    let mut cur: Option<RawCell> = None;

    loop {
        match rdr.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                row = row_num(&e, row);
                col = 0;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                col = cell_col(&e, col);
                cur = Some(RawCell {
                    row,
                    col,
                    kind: attr(&e, b"t"),
                    style: attr(&e, b"s").and_then(|s| s.parse().ok()),
                    value: None,
                    inline: String::new(),
                });
            }
            // styled but valueless
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                col = cell_col(&e, col);
            }
            Event::Start(e) if e.local_name().as_ref() == b"v" => {
                let text = read_text(&mut rdr, xml, &e)?;
                if let Some(c) = cur.as_mut() {
                    c.value = Some(text);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let text = read_text(&mut rdr, xml, &e)?;
                if let Some(c) = cur.as_mut() {
                    c.inline.push_str(&text);
                }
            }
            Event::Start(e) if matches!(e.local_name().as_ref(), b"rPh" | b"f") => {
                rdr.read_to_end(e.name())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => {
                if let Some(raw) = cur.take() {
                    let (r, c, style) = (raw.row, raw.col, raw.style);
                    let value = raw.decode(shared, styles);
                    if matches!(value, CellValue::Number(_) | CellValue::DateTime(_)) {
                        if let Some(code) = style.zip(styles).and_then(|(s, st)| st.number_format(s)) {
                            grid.set_number_format(r, c, code);
                        }
                    }
                    grid.set_value(r, c, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(grid)
}

/// `xl/sharedStrings.xml` -> table indexed by `<c t="s">` values.
pub fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut rdr = Reader::from_reader(xml);
    let mut table = Vec::new();
    let mut cur: Option<String> = None;

    loop {
        match rdr.read_event().context("malformed sharedStrings.xml")? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => cur = Some(String::new()),
            Event::Empty(e) if e.local_name().as_ref() == b"si" => table.push(String::new()),
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                table.push(cur.take().unwrap_or_default());
            }
            // phonetic hints are not part of the value
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => {
                rdr.read_to_end(e.name())?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let text = read_text(&mut rdr, xml, &e)?;
                if let Some(s) = cur.as_mut() {
                    s.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(table)
}

/* ========================== PATCHING ====================================== */

/// Style of a written cell: dates get `date_style(existing)`, anything else
/// keeps `existing`.
fn style_for<F>(value: &CellValue, existing: Option<String>, date_style: &mut F) -> Result<Option<String>>
where
    F: FnMut(Option<u32>) -> Result<Option<u32>>,
{
    if !matches!(value, CellValue::DateTime(_)) {
        return Ok(existing);
    }
    let base = existing.as_deref().and_then(|s| s.trim().parse().ok());
    Ok(date_style(base)?.map(|xf| xf.to_string()).or(existing))
}

/// `<row>` start tag without `spans`, which goes stale once cells are added.
fn without_spans(e: &BytesStart<'_>) -> BytesStart<'static> {
    let mut row = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    row.extend_attributes(
        e.attributes()
            .with_checks(false)
            .flatten()
            .filter(|a| a.key.as_ref() != b"spans"),
    );
    row
}

/// Writes one `<c>`. `CellValue::Empty` keeps only the style (or nothing at all).
fn write_cell<W: Write>(
    w: &mut Writer<W>,
    row: u32,
    col: u32,
    value: &CellValue,
    style: Option<&str>,
) -> std::io::Result<()> {
    let r = coord(row, col);
    let mut c_elem = w.create_element("c").with_attribute(("r", r.as_str()));
    if let Some(s) = style {
        c_elem = c_elem.with_attribute(("s", s));
    }

    match value {
        CellValue::Empty => {
            if style.is_some() {
                c_elem.write_empty()?;
            }
        }
        CellValue::Text(text) => {
            let padded = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
            c_elem
                .with_attribute(("t", "inlineStr"))
                .write_inner_content(|w2| {
                    w2.create_element("is").write_inner_content(|w3| {
                        let mut t_elem = w3.create_element("t");
                        if padded {
                            t_elem = t_elem.with_attribute(("xml:space", "preserve"));
                        }
                        t_elem.write_text_content(BytesText::new(text))?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
        }
        CellValue::Number(n) | CellValue::DateTime(n) => {
            c_elem.write_inner_content(|w2| {
                w2.create_element("v")
                    .write_text_content(BytesText::new(&n.to_string()))?;
                Ok(())
            })?;
        }
        CellValue::Bool(b) => {
            c_elem
                .with_attribute(("t", "b"))
                .write_inner_content(|w2| {
                    w2.create_element("v")
                        .write_text_content(BytesText::new(if *b { "1" } else { "0" }))?;
                    Ok(())
                })?;
        }
        CellValue::Error(code) => {
            c_elem
                .with_attribute(("t", "e"))
                .write_inner_content(|w2| {
                    w2.create_element("v")
                        .write_text_content(BytesText::new(code))?;
                    Ok(())
                })?;
        }
    }
    Ok(())
}

/// Writes a complete `<row>` that did not exist in the part.
fn write_new_row<W, F>(
    w: &mut Writer<W>,
    row: u32,
    cells: &BTreeMap<u32, CellValue>,
    date_style: &mut F,
) -> Result<()>
where
    W: Write,
    F: FnMut(Option<u32>) -> Result<Option<u32>>,
{
    // clears on a row that never existed leave nothing behind
    if cells.values().all(CellValue::is_empty) {
        return Ok(());
    }
    let mut styled = Vec::with_capacity(cells.len());
    for (col, value) in cells {
        styled.push((*col, value, style_for(value, None, date_style)?));
    }
    w.create_element("row")
        .with_attribute(("r", row.to_string().as_str()))
        .write_inner_content(|w2| {
            for (col, value, style) in &styled {
                write_cell(w2, row, *col, value, style.as_deref())?;
            }
            Ok(())
        })?;
    Ok(())
}

/// Merges `edits` (keyed by (row, col); `Empty` = clear contents) into a
/// worksheet part. Rows and cells stay in ascending order, untouched XML is
/// copied through as is, and an existing cell keeps its style. A date gets
/// the cell format `date_style` returns for the cell's current one (`None`
/// leaves the style alone). When `dimension` is given the `<dimension ref>`
/// is rewritten to it.
pub fn patch_cells<F>(
    xml: &[u8],
    edits: &BTreeMap<(u32, u32), CellValue>,
    mut date_style: F,
    dimension: Option<&str>,
) -> Result<Vec<u8>>
where
    F: FnMut(Option<u32>) -> Result<Option<u32>>,
{
    let mut pending: BTreeMap<u32, BTreeMap<u32, CellValue>> = BTreeMap::new();
    for (&(r, c), v) in edits {
        pending.entry(r).or_default().insert(c, v.clone());
    }

    let mut rdr = Reader::from_reader(xml);
    let mut w = Writer::new(Vec::with_capacity(xml.len() + 512));

    let mut row = 0u32;
    let mut col = 0u32;
    // edits still to place in the currently open <row>
    let mut row_edits: Option<BTreeMap<u32, CellValue>> = None;
    // > 0 while dropping the children of a replaced <c>
    let mut skip_depth = 0usize;
    let mut saw_sheet_data = false;

    loop {
        let ev = rdr.read_event()?;
        if skip_depth > 0 {
            match ev {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => bail!("unexpected end of worksheet inside <c>"),
                _ => {}
            }
            continue;
        }

        match ev {
            Event::Empty(ref e) if e.local_name().as_ref() == b"dimension" && dimension.is_some() => {
                let mut dim = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                dim.push_attribute(("ref", dimension.unwrap_or_default()));
                w.write_event(Event::Empty(dim))?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                saw_sheet_data = true;
                w.write_event(ev.borrow())?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                saw_sheet_data = true;
                w.write_event(Event::Start(e.borrow()))?;
                for (r, cells) in std::mem::take(&mut pending) {
                    write_new_row(&mut w, r, &cells, &mut date_style)?;
                }
                w.write_event(Event::End(e.to_end()))?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                for (r, cells) in std::mem::take(&mut pending) {
                    write_new_row(&mut w, r, &cells, &mut date_style)?;
                }
                w.write_event(ev.borrow())?;
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                row = row_num(e, row);
                col = 0;

                // new rows that sort before this one
                let later = pending.split_off(&row);
                for (r, cells) in std::mem::replace(&mut pending, later) {
                    write_new_row(&mut w, r, &cells, &mut date_style)?;
                }

                let edits = pending.remove(&row);
                match (&ev, edits) {
                    (Event::Empty(_), Some(cells)) => {
                        let open = without_spans(e);
                        w.write_event(Event::Start(open.borrow()))?;
                        for (c, v) in &cells {
                            let style = style_for(v, None, &mut date_style)?;
                            write_cell(&mut w, row, *c, v, style.as_deref())?;
                        }
                        w.write_event(Event::End(open.to_end()))?;
                    }
                    (Event::Start(_), Some(cells)) => {
                        w.write_event(Event::Start(without_spans(e)))?;
                        row_edits = Some(cells);
                    }
                    _ => w.write_event(ev.borrow())?,
                }
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                col = cell_col(e, col);
                let Some(edits) = row_edits.as_mut() else {
                    w.write_event(ev.borrow())?;
                    continue;
                };

                // new cells that sort before this one
                let later = edits.split_off(&col);
                for (c, v) in std::mem::replace(edits, later) {
                    let style = style_for(&v, None, &mut date_style)?;
                    write_cell(&mut w, row, c, &v, style.as_deref())?;
                }

                match edits.remove(&col) {
                    Some(v) => {
                        let style = style_for(&v, attr(e, b"s"), &mut date_style)?;
                        write_cell(&mut w, row, col, &v, style.as_deref())?;
                        if matches!(ev, Event::Start(_)) {
                            skip_depth = 1;
                        }
                    }
                    None => w.write_event(ev.borrow())?,
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"row" => {
                if let Some(cells) = row_edits.take() {
                    for (c, v) in &cells {
                        let style = style_for(v, None, &mut date_style)?;
                        write_cell(&mut w, row, *c, v, style.as_deref())?;
                    }
                }
                w.write_event(ev.borrow())?;
            }
            Event::Eof => break,
            other => w.write_event(other)?,
        }
    }

    if !saw_sheet_data {
        bail!("<sheetData> not found in worksheet");
    }
    Ok(w.into_inner())
}
