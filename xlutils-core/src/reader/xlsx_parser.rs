//! XLSX reader extracting values, content classes and visibility metadata

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufReader;
use zip::ZipArchive;

use super::parser_utils::{
    is_date_format, is_truthy, parse_cell_ref, parse_iso_datetime, read_text_node,
    serial_to_datetime,
};
use super::{
    Cell, CellAddress, CellValue, ContentClass, MergedRange, ReadError, Sheet, SheetState,
    WorkbookReader,
};

/// Last column of a worksheet (XFD)
pub const MAX_COLUMNS: u32 = 16_384;

/// A `<sheet>` entry of xl/workbook.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub state: SheetState,
    pub rel_id: String,
}

/// Workbook-level metadata from xl/workbook.xml
#[derive(Debug, Clone, Default)]
pub struct WorkbookInfo {
    pub sheets: Vec<SheetEntry>,
    pub date1904: bool,
}

pub struct XlsxReader<'a, R: std::io::Read + std::io::Seek> {
    archive: &'a mut ZipArchive<R>,
    info: WorkbookInfo,
    shared_strings: Vec<String>,
    styles: Vec<String>,
}

impl<'a, R: std::io::Read + std::io::Seek> XlsxReader<'a, R> {
    pub fn new(archive: &'a mut ZipArchive<R>) -> Result<Self> {
        let info = read_workbook_info(archive)?;
        let shared_strings = extract_shared_strings(archive)?;
        let styles = parse_styles(archive).unwrap_or_default();
        Ok(Self {
            archive,
            info,
            shared_strings,
            styles,
        })
    }
}

impl<'a, R: std::io::Read + std::io::Seek> WorkbookReader for XlsxReader<'a, R> {
    fn read_sheets(&mut self) -> Result<Vec<Sheet>> {
        let rels = read_workbook_relationships(self.archive)?;
        let entries = self.info.sheets.clone();
        let mut sheets = Vec::with_capacity(entries.len());

        for entry in entries {
            let target = rels.get(&entry.rel_id).ok_or_else(|| {
                anyhow::anyhow!(
                    "Relationship '{}' not found for sheet '{}'",
                    entry.rel_id,
                    entry.name
                )
            })?;
            let path = resolve_part_path(target);

            let mut sheet = Sheet::new(entry.name.clone());
            sheet.state = entry.state;
            self.parse_sheet_xml(&path, &mut sheet)
                .with_context(|| format!("Failed to parse sheet '{}'", entry.name))?;

            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

impl<'a, R: std::io::Read + std::io::Seek> XlsxReader<'a, R> {
    fn parse_sheet_xml(&mut self, path: &str, sheet: &mut Sheet) -> Result<()> {
        let sheet_xml = self
            .archive
            .by_name(path)
            .map_err(|_| ReadError::MissingPart(path.to_string()))?;
        let mut reader = Reader::from_reader(BufReader::new(sheet_xml));
        // Inline strings keep their surrounding whitespace
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut current_row = 0u32;
        let mut current_col = 0u32;

        loop {
            let event = reader.read_event_into(&mut buf)?;
            let is_start = matches!(event, Event::Start(_));
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"col" => {
                        let mut min = 0u32;
                        let mut max = 0u32;
                        let mut hidden = false;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"min" => min = attr.unescape_value()?.parse::<u32>()?,
                                b"max" => max = attr.unescape_value()?.parse::<u32>()?,
                                b"hidden" => hidden = is_truthy(attr.value.as_ref()),
                                _ => {}
                            }
                        }
                        if hidden && min > 0 && min <= MAX_COLUMNS {
                            sheet
                                .hidden_columns
                                .extend(min..=max.clamp(min, MAX_COLUMNS));
                        }
                    }
                    b"row" => {
                        let mut row = current_row + 1;
                        let mut hidden = false;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => row = attr.unescape_value()?.parse::<u32>()?,
                                b"hidden" => hidden = is_truthy(attr.value.as_ref()),
                                _ => {}
                            }
                        }
                        current_row = row;
                        current_col = 0;
                        if hidden {
                            sheet.hidden_rows.insert(row);
                        }
                    }
                    b"c" => {
                        let mut r_attr = String::new();
                        let mut s_attr = None;
                        let mut t_attr = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => r_attr = attr.unescape_value()?.to_string(),
                                b"s" => s_attr = attr.unescape_value()?.parse::<usize>().ok(),
                                b"t" => t_attr = attr.unescape_value()?.to_string(),
                                _ => {}
                            }
                        }

                        let (row, col) = match parse_cell_ref(&r_attr) {
                            Some(pos) => pos,
                            None => (current_row.max(1), current_col + 1),
                        };
                        current_col = col;
                        let address = CellAddress::new(row, col)?;

                        let cell = if is_start {
                            let num_fmt = s_attr.and_then(|idx| self.styles.get(idx));
                            let contents = parse_cell_contents(&mut reader)?;
                            build_cell(
                                contents,
                                &t_attr,
                                &self.shared_strings,
                                num_fmt.map(String::as_str),
                                self.info.date1904,
                            )
                        } else {
                            Cell::default()
                        };
                        sheet.set_cell(address, cell);
                    }
                    b"mergeCell" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"ref" {
                                let ref_str = attr.unescape_value()?;
                                sheet.merged_ranges.push(MergedRange::parse(&ref_str)?);
                            }
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"worksheet" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// Raw contents of a `<c>` element
#[derive(Debug, Default)]
struct CellContents {
    value: Option<String>,
    inline_text: Option<String>,
    has_formula: bool,
}

fn parse_cell_contents<R: std::io::BufRead>(reader: &mut Reader<R>) -> Result<CellContents> {
    let mut contents = CellContents::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"v" => {
                        let text = if is_start {
                            read_text_node(reader)?
                        } else {
                            String::new()
                        };
                        contents.value = Some(text);
                    }
                    b"f" => {
                        // Shared-formula dependents carry an empty <f t="shared" si=".."/>
                        contents.has_formula = true;
                        if is_start {
                            read_text_node(reader)?;
                        }
                    }
                    b"is" if is_start => {
                        // Inline string can have multiple <t> tags
                        let mut is_text = String::new();
                        let mut is_buf = Vec::new();
                        loop {
                            match reader.read_event_into(&mut is_buf)? {
                                Event::Start(ref ee) if ee.local_name().as_ref() == b"t" => {
                                    is_text.push_str(&read_text_node(reader)?);
                                }
                                Event::End(ref ee) if ee.local_name().as_ref() == b"is" => break,
                                Event::Eof => break,
                                _ => {}
                            }
                            is_buf.clear();
                        }
                        contents.inline_text = Some(is_text);
                    }
                    _ => {}
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(contents)
}

/// Derive the raw value and content class of a cell from its XML contents
fn build_cell(
    contents: CellContents,
    t_attr: &str,
    shared_strings: &[String],
    num_fmt: Option<&str>,
    date1904: bool,
) -> Cell {
    let value = match t_attr {
        "s" => contents
            .value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|idx| shared_strings.get(idx).cloned())
            .map(CellValue::Text)
            .unwrap_or(CellValue::Empty),
        "inlineStr" => contents
            .inline_text
            .map(CellValue::Text)
            .unwrap_or(CellValue::Empty),
        "b" => contents
            .value
            .map(|v| CellValue::Boolean(v.trim() == "1"))
            .unwrap_or(CellValue::Empty),
        "e" => contents
            .value
            .map(CellValue::Error)
            .unwrap_or(CellValue::Empty),
        "str" => contents
            .value
            .map(CellValue::Text)
            .unwrap_or(CellValue::Empty),
        "d" => match contents.value {
            Some(v) => parse_iso_datetime(&v)
                .map(CellValue::DateTime)
                .unwrap_or(CellValue::Text(v)),
            None => CellValue::Empty,
        },
        _ => match contents.value {
            Some(v) if v.is_empty() => CellValue::Empty,
            Some(v) => parse_numeric(v, num_fmt, date1904),
            None => contents
                .inline_text
                .map(CellValue::Text)
                .unwrap_or(CellValue::Empty),
        },
    };

    let class = if contents.has_formula {
        ContentClass::Formula
    } else {
        match t_attr {
            "e" => ContentClass::Error,
            "str" => ContentClass::FormulaDisplayText,
            _ if value.is_empty() => ContentClass::Empty,
            _ => ContentClass::Literal,
        }
    };

    Cell { value, class }
}

fn parse_numeric(text: String, num_fmt: Option<&str>, date1904: bool) -> CellValue {
    // In XLSX, text format is indicated by num_fmt == "@"
    if num_fmt == Some("@") {
        return CellValue::Text(text);
    }
    match text.trim().parse::<f64>() {
        Ok(n) => {
            if num_fmt.is_some_and(is_date_format) {
                if let Some(dt) = serial_to_datetime(n, date1904) {
                    return CellValue::DateTime(dt);
                }
            }
            CellValue::Number(n)
        }
        Err(_) => CellValue::Text(text),
    }
}

/// Read sheet entries (declared order) and the date system from xl/workbook.xml
pub fn read_workbook_info(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<WorkbookInfo> {
    let workbook_xml = archive
        .by_name("xl/workbook.xml")
        .map_err(|_| ReadError::MissingPart("xl/workbook.xml".to_string()))?;
    let mut reader = Reader::from_reader(BufReader::new(workbook_xml));
    reader.config_mut().trim_text(true);

    let mut info = WorkbookInfo::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"date1904" {
                            info.date1904 = is_truthy(attr.value.as_ref());
                        }
                    }
                }
                b"sheet" => {
                    let mut name = String::new();
                    let mut state = SheetState::Normal;
                    let mut rel_id = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => name = attr.unescape_value()?.to_string(),
                            b"state" => state = SheetState::from_attr(&attr.unescape_value()?),
                            _ if attr.key.local_name().as_ref() == b"id" => {
                                rel_id = attr.unescape_value()?.to_string()
                            }
                            _ => {}
                        }
                    }
                    if !name.is_empty() {
                        info.sheets.push(SheetEntry {
                            name,
                            state,
                            rel_id,
                        });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}

/// Map relationship ids of xl/_rels/workbook.xml.rels to their targets
pub fn read_workbook_relationships(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<HashMap<String, String>> {
    let rels_xml = archive
        .by_name("xl/_rels/workbook.xml.rels")
        .map_err(|_| ReadError::MissingPart("xl/_rels/workbook.xml.rels".to_string()))?;
    let mut reader = Reader::from_reader(BufReader::new(rels_xml));
    reader.config_mut().trim_text(true);

    let mut rels = HashMap::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value()?.to_string(),
                        b"Target" => target = attr.unescape_value()?.to_string(),
                        _ => {}
                    }
                }
                if !id.is_empty() {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Targets are relative to `xl/` unless they are absolute package paths
fn resolve_part_path(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if target.starts_with("xl/") {
        target.to_string()
    } else {
        format!("xl/{}", target)
    }
}

pub fn extract_shared_strings(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let ss_xml = match archive.by_name("xl/sharedStrings.xml") {
        Ok(file) => file,
        Err(_) => return Ok(strings),
    };

    let mut reader = Reader::from_reader(BufReader::new(ss_xml));
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut current_string = String::new();
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => current_string.push_str(&read_text_node(&mut reader)?),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"rPh" => in_phonetic = false,
                b"si" => strings.push(std::mem::take(&mut current_string)),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Number format codes of `cellXfs`, indexed by style index
pub fn parse_styles(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<Vec<String>> {
    let mut num_fmts: HashMap<u32, String> = builtin_number_formats()
        .iter()
        .map(|(id, code)| (*id, code.to_string()))
        .collect();

    let styles_xml = match archive.by_name("xl/styles.xml") {
        Ok(file) => file,
        Err(_) => return Ok(Vec::new()),
    };

    let mut reader = Reader::from_reader(BufReader::new(styles_xml));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut xfs = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let mut id = None;
                    let mut code = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => id = attr.unescape_value()?.parse::<u32>().ok(),
                            b"formatCode" => {
                                code = attr.unescape_value()?.replace('\\', "");
                            }
                            _ => {}
                        }
                    }
                    if let Some(id) = id {
                        if !code.is_empty() {
                            num_fmts.insert(id, code);
                        }
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let mut num_fmt_id = 0u32;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"numFmtId" {
                            num_fmt_id = attr.unescape_value()?.parse::<u32>().unwrap_or(0);
                        }
                    }
                    let format_code = num_fmts
                        .get(&num_fmt_id)
                        .cloned()
                        .unwrap_or_else(|| "General".to_string());
                    xfs.push(format_code);
                }
                _ => {}
            },
            Event::End(e) => {
                if e.local_name().as_ref() == b"cellXfs" {
                    in_cell_xfs = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xfs)
}

/// Built-in number formats (simplified subset)
fn builtin_number_formats() -> &'static [(u32, &'static str)] {
    &[
        (0, "General"),
        (1, "0"),
        (2, "0.00"),
        (3, "#,##0"),
        (4, "#,##0.00"),
        (9, "0%"),
        (10, "0.00%"),
        (11, "0.00E+00"),
        (12, "# ?/?"),
        (13, "# ??/??"),
        (14, "mm-dd-yy"),
        (15, "d-mmm-yy"),
        (16, "d-mmm"),
        (17, "mmm-yy"),
        (18, "h:mm AM/PM"),
        (19, "h:mm:ss AM/PM"),
        (20, "h:mm"),
        (21, "h:mm:ss"),
        (22, "m/d/yy h:mm"),
        (37, "#,##0 ;(#,##0)"),
        (38, "#,##0 ;[Red](#,##0)"),
        (39, "#,##0.00;(#,##0.00)"),
        (40, "#,##0.00;[Red](#,##0.00)"),
        (45, "mm:ss"),
        (46, "[h]:mm:ss"),
        (47, "mmss.0"),
        (48, "##0.0E+0"),
        (49, "@"),
    ]
}
