//! styles.rs – the part of `xl/styles.xml` this tool needs: the number
//! format behind each cell format, and date variants of existing formats
//! for written dates.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use memchr::memmem;
use quick_xml::{
    Reader, Writer,
    events::{BytesStart, Event},
};

use crate::numfmt::{builtin_format_code, is_date_format};

/// Built-in `m/d/yyyy` number format.
const BUILTIN_SHORT_DATE: u32 = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct XfEntry {
    num_fmt: u32,
    font: u32,
    fill: u32,
    border: u32,
}

#[derive(Debug, Clone)]
pub struct Styles {
    xml: Vec<u8>,
    /// `cellXfs` in index order.
    xfs: Vec<XfEntry>,
    /// Raw `<xf>` element of each `cellXfs` entry.
    xf_xml: Vec<Vec<u8>>,
    /// Custom `numFmt` codes by id.
    num_fmts: HashMap<u32, String>,
    dirty: bool,
}

impl Styles {
    pub fn parse(xml: Vec<u8>) -> Result<Self> {
        let mut num_fmts = HashMap::new();
        let mut xfs = Vec::new();
        let mut xf_xml = Vec::new();
        {
            let mut rdr = Reader::from_reader(xml.as_slice());
            rdr.config_mut().trim_text(true);
            let mut in_xfs = false;

            loop {
                let before = rdr.buffer_position() as usize;
                let ev = rdr.read_event().context("malformed styles.xml")?;
                match ev {
                    Event::Start(ref e) if e.local_name().as_ref() == b"cellXfs" => in_xfs = true,
                    Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => in_xfs = false,
                    Event::Start(ref e) | Event::Empty(ref e)
                        if e.local_name().as_ref() == b"numFmt" =>
                    {
                        let mut id = None::<u32>;
                        let mut code = None::<String>;
                        for a in e.attributes().with_checks(false).flatten() {
                            match a.key.local_name().as_ref() {
                                b"numFmtId" => id = String::from_utf8_lossy(&a.value).parse().ok(),
                                b"formatCode" => {
                                    code = Some(a.decode_and_unescape_value(rdr.decoder())?.into_owned());
                                }
                                _ => {}
                            }
                        }
                        if let (Some(i), Some(c)) = (id, code) {
                            num_fmts.insert(i, c);
                        }
                    }
                    Event::Start(ref e) | Event::Empty(ref e)
                        if in_xfs && e.local_name().as_ref() == b"xf" =>
                    {
                        let mut xf = XfEntry::default();
                        for a in e.attributes().with_checks(false).flatten() {
                            let v = String::from_utf8_lossy(&a.value).parse().unwrap_or(0);
                            match a.key.local_name().as_ref() {
                                b"numFmtId" => xf.num_fmt = v,
                                b"fontId" => xf.font = v,
                                b"fillId" => xf.fill = v,
                                b"borderId" => xf.border = v,
                                _ => {}
                            }
                        }
                        xfs.push(xf);

                        if matches!(ev, Event::Start(_)) {
                            rdr.read_to_end(e.name())?;
                        }
                        let after = rdr.buffer_position() as usize;
                        xf_xml.push(xml[before..after].trim_ascii_start().to_vec());
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
        }

        Ok(Self {
            xml,
            xfs,
            xf_xml,
            num_fmts,
            dirty: false,
        })
    }

    /// True when cell format `xf` displays numbers as dates or times.
    pub fn is_date_style(&self, xf: u32) -> bool {
        let Some(entry) = self.xfs.get(xf as usize) else {
            return false;
        };
        match self.num_fmts.get(&entry.num_fmt) {
            Some(code) => is_date_format(code),
            None => is_builtin_date(entry.num_fmt),
        }
    }

    /// Number format code of cell format `xf`; `None` for General.
    pub fn number_format(&self, xf: u32) -> Option<&str> {
        let entry = self.xfs.get(xf as usize)?;
        match self.num_fmts.get(&entry.num_fmt) {
            Some(code) => Some(code.as_str()),
            None => builtin_format_code(entry.num_fmt),
        }
    }

    /// Cell format for a date written over a cell formatted with `base`
    /// (`None` = no `s`, i.e. format 0). A date format is kept as is;
    /// otherwise a copy of `base` with the short-date number format is
    /// reused or appended, so font, fill, border and alignment survive.
    pub fn date_xf_for(&mut self, base: Option<u32>) -> Result<u32> {
        let base = base.unwrap_or(0);
        if self.is_date_style(base) {
            return Ok(base);
        }
        let wanted = XfEntry {
            num_fmt: BUILTIN_SHORT_DATE,
            ..self.xfs.get(base as usize).copied().unwrap_or_default()
        };
        if let Some(i) = self.xfs.iter().position(|xf| *xf == wanted) {
            return Ok(i as u32);
        }

        let tag = match self.xf_xml.get(base as usize) {
            Some(raw) => with_num_fmt(raw, BUILTIN_SHORT_DATE)?,
            None => format!(
                r#"<xf numFmtId="{BUILTIN_SHORT_DATE}" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#
            )
            .into_bytes(),
        };
        let end = memmem::rfind(&self.xml, b"</cellXfs>")
            .context("</cellXfs> not found in styles.xml")?;
        self.xml.splice(end..end, tag.iter().copied());
        bump_count(&mut self.xml, b"<cellXfs", b"count=\"")?;

        self.xfs.push(wanted);
        self.xf_xml.push(tag);
        self.dirty = true;
        log::debug!("added date cell format {} based on {base}", self.xfs.len() - 1);
        Ok((self.xfs.len() - 1) as u32)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn xml(&self) -> &[u8] {
        &self.xml
    }
}

fn is_builtin_date(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Copy of an `<xf>` element with its number format replaced.
fn with_num_fmt(raw: &[u8], num_fmt: u32) -> Result<Vec<u8>> {
    let mut rdr = Reader::from_reader(raw);
    let (start, empty) = loop {
        match rdr.read_event()? {
            Event::Start(e) => break (e, false),
            Event::Empty(e) => break (e, true),
            Event::Eof => bail!("empty <xf> element"),
            _ => {}
        }
    };
    let children = &raw[rdr.buffer_position() as usize..];

    let mut xf = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    xf.extend_attributes(
        start
            .attributes()
            .with_checks(false)
            .flatten()
            .filter(|a| !matches!(a.key.as_ref(), b"numFmtId" | b"applyNumberFormat")),
    );
    let id = num_fmt.to_string();
    xf.push_attribute(("numFmtId", id.as_str()));
    xf.push_attribute(("applyNumberFormat", "1"));

    let mut w = Writer::new(Vec::with_capacity(raw.len() + 32));
    if empty {
        w.write_event(Event::Empty(xf))?;
    } else {
        w.write_event(Event::Start(xf))?;
        w.get_mut().extend_from_slice(children);
    }
    Ok(w.into_inner())
}

fn bump_count(xml: &mut Vec<u8>, tag: &[u8], attr: &[u8]) -> Result<()> {
    let pos = memmem::find(xml, tag).context("count tag not found")?;
    let tag_end = memchr::memchr(b'>', &xml[pos..]).map_or(xml.len(), |p| p + pos);
    let Some(a) = memmem::find(&xml[pos..tag_end], attr).map(|p| p + pos) else {
        // no count attribute – nothing to keep in sync
        return Ok(());
    };
    let start = a + attr.len();
    let Some(end) = memchr::memchr(b'"', &xml[start..]).map(|p| p + start) else {
        bail!("unterminated count attribute");
    };
    let num: u32 = std::str::from_utf8(&xml[start..end])?.parse()?;
    xml.splice(start..end, (num + 1).to_string().bytes());
    Ok(())
}
