//! Minimal XLSX package writer

use anyhow::{Context, Result};
use quick_xml::escape::escape;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::reader::{CellAddress, CellValue};

/// One worksheet to be written, cells kept in row-major order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub cells: BTreeMap<CellAddress, CellValue>,
    /// Formula text (no leading `=`); the entry in `cells` is its cached result
    pub formulas: BTreeMap<CellAddress, String>,
}

impl SheetData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a row of text cells below the last populated row
    pub fn push_text_row<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row = self.max_row() + 1;
        for (i, value) in values.into_iter().enumerate() {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            self.cells
                .insert(CellAddress::at(row, i as u32 + 1), CellValue::Text(value));
        }
        // Keep the row even when every value was empty
        self.cells
            .entry(CellAddress::at(row, 1))
            .or_insert(CellValue::Empty);
    }

    pub fn max_row(&self) -> u32 {
        self.cells.keys().map(|a| a.row()).max().unwrap_or(0)
    }
}

/// Write sheets into a new XLSX file at `path`, replacing any existing file
pub fn write_xlsx(path: &Path, sheets: &[SheetData]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    write_package(BufWriter::new(file), sheets)
        .with_context(|| format!("Failed to write workbook: {}", path.display()))
}

/// Write sheets as an XLSX package into any seekable writer
pub fn write_package<W: Write + Seek>(writer: W, sheets: &[SheetData]) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types_xml(sheets.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(sheets).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels_xml(sheets.len()).as_bytes())?;

    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(worksheet_xml(sheet).as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn content_types_xml(sheet_count: usize) -> String {
    let mut content = format!(
        r#"{}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        XML_DECLARATION
    );
    for i in 1..=sheet_count {
        content.push_str(&format!(
            r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i
        ));
    }
    content.push_str("\n</Types>");
    content
}

fn workbook_xml(sheets: &[SheetData]) -> String {
    let mut content = format!(
        r#"{}
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        XML_DECLARATION
    );
    for (i, sheet) in sheets.iter().enumerate() {
        content.push_str(&format!(
            r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(sheet.name.as_str()),
            i + 1,
            i + 1
        ));
    }
    content.push_str("\n    </sheets>\n</workbook>");
    content
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut content = format!(
        r#"{}
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        XML_DECLARATION
    );
    for i in 1..=sheet_count {
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i, i
        ));
    }
    content.push_str("\n</Relationships>");
    content
}

fn worksheet_xml(sheet: &SheetData) -> String {
    let mut content = format!(
        r#"{}
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <sheetData>"#,
        XML_DECLARATION
    );

    let addresses: BTreeSet<CellAddress> = sheet
        .cells
        .keys()
        .chain(sheet.formulas.keys())
        .copied()
        .collect();

    let mut current_row: Option<u32> = None;
    for address in addresses {
        if current_row != Some(address.row()) {
            if current_row.is_some() {
                content.push_str("\n        </row>");
            }
            content.push_str(&format!("\n        <row r=\"{}\">", address.row()));
            current_row = Some(address.row());
        }
        let value = sheet.cells.get(&address).unwrap_or(&CellValue::Empty);
        let cell = match sheet.formulas.get(&address) {
            Some(formula) => Some(formula_xml(address, formula, value)),
            None => cell_xml(address, value),
        };
        if let Some(cell) = cell {
            content.push_str("\n            ");
            content.push_str(&cell);
        }
    }
    if current_row.is_some() {
        content.push_str("\n        </row>");
    }

    content.push_str("\n    </sheetData>\n</worksheet>");
    content
}

fn cell_xml(address: CellAddress, value: &CellValue) -> Option<String> {
    let cell_ref = address.to_a1();
    let xml = match value {
        CellValue::Empty => return None,
        CellValue::Number(n) if n.is_finite() => {
            format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, n)
        }
        CellValue::Number(n) => inline_string(&cell_ref, &n.to_string()),
        CellValue::Text(s) => inline_string(&cell_ref, s),
        CellValue::Boolean(b) => {
            format!("<c r=\"{}\" t=\"b\"><v>{}</v></c>", cell_ref, u8::from(*b))
        }
        CellValue::DateTime(dt) => {
            inline_string(&cell_ref, &dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        }
        CellValue::Error(code) => {
            format!("<c r=\"{}\" t=\"e\"><v>{}</v></c>", cell_ref, escape(code.as_str()))
        }
    };
    Some(xml)
}

/// Formula cell carrying its cached result
fn formula_xml(address: CellAddress, formula: &str, cached: &CellValue) -> String {
    let cell_ref = address.to_a1();
    let f = format!("<f>{}</f>", escape(formula));
    match cached {
        CellValue::Empty => format!("<c r=\"{}\">{}</c>", cell_ref, f),
        CellValue::Number(n) if n.is_finite() => {
            format!("<c r=\"{}\">{}<v>{}</v></c>", cell_ref, f, n)
        }
        CellValue::Boolean(b) => {
            format!("<c r=\"{}\" t=\"b\">{}<v>{}</v></c>", cell_ref, f, u8::from(*b))
        }
        CellValue::Error(code) => format!(
            "<c r=\"{}\" t=\"e\">{}<v>{}</v></c>",
            cell_ref,
            f,
            escape(code.as_str())
        ),
        other => {
            let text = match other {
                CellValue::Text(s) => s.clone(),
                CellValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
                CellValue::Number(n) => n.to_string(),
                _ => String::new(),
            };
            format!(
                "<c r=\"{}\" t=\"str\">{}<v>{}</v></c>",
                cell_ref,
                f,
                escape(text.as_str())
            )
        }
    }
}

fn inline_string(cell_ref: &str, text: &str) -> String {
    // Leading/trailing spaces are dropped by readers unless preserved
    let space = if text.trim() != text {
        " xml:space=\"preserve\""
    } else {
        ""
    };
    format!(
        "<c r=\"{}\" t=\"inlineStr\"><is><t{}>{}</t></is></c>",
        cell_ref,
        space,
        escape(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_text_row() {
        let mut sheet = SheetData::new("Differences");
        sheet.push_text_row(["Sheet", "Cell"]);
        sheet.push_text_row(["Data", ""]);
        sheet.push_text_row(["", ""]);

        assert_eq!(sheet.max_row(), 3);
        assert_eq!(
            sheet.cells.get(&CellAddress::at(2, 1)),
            Some(&CellValue::Text("Data".to_string()))
        );
        assert_eq!(sheet.cells.get(&CellAddress::at(2, 2)), None);
    }

    #[test]
    fn test_cell_xml_escapes_text() {
        let xml = cell_xml(CellAddress::at(1, 2), &CellValue::Text("a<b & c".to_string()));
        assert_eq!(
            xml.as_deref(),
            Some("<c r=\"B1\" t=\"inlineStr\"><is><t>a&lt;b &amp; c</t></is></c>")
        );
    }

    #[test]
    fn test_cell_xml_values() {
        let a1 = CellAddress::at(1, 1);
        assert_eq!(
            cell_xml(a1, &CellValue::Number(2.5)).as_deref(),
            Some("<c r=\"A1\"><v>2.5</v></c>")
        );
        assert_eq!(
            cell_xml(a1, &CellValue::Boolean(true)).as_deref(),
            Some("<c r=\"A1\" t=\"b\"><v>1</v></c>")
        );
        assert_eq!(cell_xml(a1, &CellValue::Empty), None);
        assert!(
            cell_xml(a1, &CellValue::Text(" padded".to_string()))
                .unwrap()
                .contains("xml:space=\"preserve\"")
        );
    }

    #[test]
    fn test_worksheet_rows_are_grouped() {
        let mut sheet = SheetData::new("S");
        sheet.cells.insert(CellAddress::at(2, 1), CellValue::Number(1.0));
        sheet.cells.insert(CellAddress::at(1, 2), CellValue::Number(2.0));
        sheet.cells.insert(CellAddress::at(1, 1), CellValue::Number(3.0));

        let xml = worksheet_xml(&sheet);
        let a1 = xml.find("r=\"A1\"").unwrap();
        let b1 = xml.find("r=\"B1\"").unwrap();
        let a2 = xml.find("r=\"A2\"").unwrap();
        assert!(a1 < b1 && b1 < a2);
        assert_eq!(xml.matches("<row ").count(), 2);
    }

    #[test]
    fn test_formula_cells() {
        let mut sheet = SheetData::new("S");
        sheet.cells.insert(CellAddress::at(1, 1), CellValue::Number(2.0));
        sheet.cells.insert(CellAddress::at(1, 2), CellValue::Number(4.0));
        sheet.formulas.insert(CellAddress::at(1, 2), "A1*2".to_string());
        sheet.formulas.insert(CellAddress::at(2, 1), "IF(A1>1,\"big\",\"\")".to_string());

        let xml = worksheet_xml(&sheet);
        assert!(xml.contains("<c r=\"B1\"><f>A1*2</f><v>4</v></c>"));
        assert!(xml.contains("<c r=\"A2\"><f>IF(A1&gt;1,&quot;big&quot;,&quot;&quot;)</f></c>"));

        assert_eq!(
            formula_xml(
                CellAddress::at(3, 3),
                "UPPER(\"a\")",
                &CellValue::Text("A".to_string())
            ),
            "<c r=\"C3\" t=\"str\"><f>UPPER(&quot;a&quot;)</f><v>A</v></c>"
        );
    }

    #[test]
    fn test_workbook_xml_escapes_sheet_names() {
        let xml = workbook_xml(&[SheetData::new("P&L")]);
        assert!(xml.contains("name=\"P&amp;L\""));
    }
}
