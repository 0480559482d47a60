//! Sheet layout of OpenDocument spreadsheets
//!
//! calamine reads ODS values but not their layout. Sheet visibility, hidden
//! rows and columns, and merged cells are taken from `content.xml` here.

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{BufRead, BufReader};
use zip::ZipArchive;

use super::xlsx_parser::MAX_COLUMNS;
use super::{CellAddress, MergedRange, Sheet, SheetState};

/// Last row of a worksheet
const MAX_ROWS: u32 = 1_048_576;

/// Layout of one `<table:table>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    pub state: SheetState,
    pub hidden_rows: BTreeSet<u32>,
    pub hidden_columns: BTreeSet<u32>,
    pub merged_ranges: Vec<MergedRange>,
}

impl SheetLayout {
    /// Copy the layout onto a sheet read from the same table
    pub fn apply(self, sheet: &mut Sheet) {
        if self.state.is_hidden() {
            sheet.state = self.state;
        }
        sheet.hidden_rows = self.hidden_rows;
        sheet.hidden_columns = self.hidden_columns;
        sheet.merged_ranges = self.merged_ranges;
    }
}

/// Read the layout of every table in the archive's `content.xml`, keyed by table name
pub fn read_ods_layouts(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<HashMap<String, SheetLayout>> {
    let content_xml = match archive.by_name("content.xml") {
        Ok(file) => file,
        Err(_) => return Ok(HashMap::new()),
    };
    parse_content_layouts(BufReader::new(content_xml))
}

/// Parse table layouts from a `content.xml` stream
pub fn parse_content_layouts<R: BufRead>(source: R) -> Result<HashMap<String, SheetLayout>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut layouts = HashMap::new();
    let mut hidden_styles = HashSet::new();
    let mut table_style: Option<String> = None;

    let mut current: Option<(String, SheetLayout)> = None;
    let mut next_row = 1u32;
    let mut next_col = 1u32;
    let mut row_anchor = 1u32;
    let mut cell_col = 1u32;

    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?;
        let self_closing = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"style:style" => {
                    table_style = None;
                    if attr_value(&e, b"style:family")?.as_deref() == Some("table") {
                        table_style = attr_value(&e, b"style:name")?;
                    }
                }
                b"style:table-properties" => {
                    if attr_value(&e, b"table:display")?.as_deref() == Some("false") {
                        if let Some(name) = &table_style {
                            hidden_styles.insert(name.clone());
                        }
                    }
                }
                b"table:table" => {
                    let name = attr_value(&e, b"table:name")?.unwrap_or_default();
                    let display_off = attr_value(&e, b"table:display")?.as_deref() == Some("false");
                    let styled_off = attr_value(&e, b"table:style-name")?
                        .is_some_and(|style| hidden_styles.contains(&style));
                    let layout = SheetLayout {
                        state: if display_off || styled_off {
                            SheetState::Hidden
                        } else {
                            SheetState::Normal
                        },
                        ..Default::default()
                    };
                    if self_closing {
                        layouts.insert(name, layout);
                    } else {
                        current = Some((name, layout));
                        next_row = 1;
                        next_col = 1;
                    }
                }
                b"table:table-column" => {
                    if let Some((_, layout)) = current.as_mut() {
                        let repeated = repeat_count(&e, b"table:number-columns-repeated")?;
                        let last = next_col.saturating_add(repeated - 1);
                        if is_collapsed(&e)? && next_col <= MAX_COLUMNS {
                            layout
                                .hidden_columns
                                .extend(next_col..=last.min(MAX_COLUMNS));
                        }
                        next_col = last.saturating_add(1);
                    }
                }
                b"table:table-row" => {
                    if let Some((_, layout)) = current.as_mut() {
                        let repeated = repeat_count(&e, b"table:number-rows-repeated")?;
                        let last = next_row.saturating_add(repeated - 1);
                        if is_collapsed(&e)? && next_row <= MAX_ROWS {
                            layout.hidden_rows.extend(next_row..=last.min(MAX_ROWS));
                        }
                        row_anchor = next_row;
                        cell_col = 1;
                        next_row = last.saturating_add(1);
                    }
                }
                b"table:table-cell" | b"table:covered-table-cell" => {
                    if let Some((_, layout)) = current.as_mut() {
                        let rows = repeat_count(&e, b"table:number-rows-spanned")?;
                        let cols = repeat_count(&e, b"table:number-columns-spanned")?;
                        if (rows > 1 || cols > 1) && row_anchor <= MAX_ROWS && cell_col <= MAX_COLUMNS
                        {
                            let first = CellAddress::new(row_anchor, cell_col)?;
                            let last = CellAddress::new(
                                row_anchor.saturating_add(rows - 1).min(MAX_ROWS),
                                cell_col.saturating_add(cols - 1).min(MAX_COLUMNS),
                            )?;
                            layout.merged_ranges.push(MergedRange::new(first, last));
                        }
                        let repeated = repeat_count(&e, b"table:number-columns-repeated")?;
                        cell_col = cell_col.saturating_add(repeated);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"table:table" => {
                if let Some((name, layout)) = current.take() {
                    layouts.insert(name, layout);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(layouts)
}

fn attr_value(element: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Numeric repeat or span attribute, at least 1
fn repeat_count(element: &BytesStart, key: &[u8]) -> Result<u32> {
    Ok(attr_value(element, key)?
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1))
}

/// Rows and columns are hidden by `collapse` or by an active filter
fn is_collapsed(element: &BytesStart) -> Result<bool> {
    Ok(matches!(
        attr_value(element, b"table:visibility")?.as_deref(),
        Some("collapse") | Some("filter")
    ))
}
