//! Builders for small XLSX packages used by the integration tests

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub struct MockSheet {
    name: String,
    state: Option<String>,
    body: String,
}

/// A workbook whose worksheet XML is given verbatim
#[derive(Default)]
pub struct MockWorkbook {
    sheets: Vec<MockSheet>,
    shared_strings: Vec<String>,
    styles: Option<String>,
    date1904: bool,
}

impl MockWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a visible sheet; `body` is the content of `<worksheet>`
    pub fn sheet(mut self, name: &str, body: impl Into<String>) -> Self {
        self.sheets.push(MockSheet {
            name: name.to_string(),
            state: None,
            body: body.into(),
        });
        self
    }

    /// Add a sheet with an explicit `state` attribute ("hidden", "veryHidden")
    pub fn sheet_with_state(mut self, name: &str, state: &str, body: impl Into<String>) -> Self {
        self.sheets.push(MockSheet {
            name: name.to_string(),
            state: Some(state.to_string()),
            body: body.into(),
        });
        self
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Raw xl/styles.xml
    pub fn styles(mut self, xml: &str) -> Self {
        self.styles = Some(xml.to_string());
        self
    }

    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)?;
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        zip.start_file("[Content_Types].xml", options)?;
        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
        );
        for i in 1..=self.sheets.len() {
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
        }
        content_types.push_str("</Types>");
        zip.write_all(content_types.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        let mut workbook_xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
"#,
        );
        if self.date1904 {
            workbook_xml.push_str(r#"<workbookPr date1904="1"/>"#);
        }
        workbook_xml.push_str("<sheets>");
        for (i, sheet) in self.sheets.iter().enumerate() {
            let state = sheet
                .state
                .as_ref()
                .map(|s| format!(r#" state="{}""#, s))
                .unwrap_or_default();
            workbook_xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
                sheet.name,
                i + 1,
                state,
                i + 1
            ));
        }
        workbook_xml.push_str("</sheets></workbook>");
        zip.write_all(workbook_xml.as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        let mut rels_xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
        );
        for i in 1..=self.sheets.len() {
            rels_xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            ));
        }
        rels_xml.push_str("</Relationships>");
        zip.write_all(rels_xml.as_bytes())?;

        if !self.shared_strings.is_empty() {
            zip.start_file("xl/sharedStrings.xml", options)?;
            let mut sst = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
                self.shared_strings.len()
            );
            for s in &self.shared_strings {
                sst.push_str(&format!("<si><t>{}</t></si>", s));
            }
            sst.push_str("</sst>");
            zip.write_all(sst.as_bytes())?;
        }

        if let Some(styles) = &self.styles {
            zip.start_file("xl/styles.xml", options)?;
            zip.write_all(styles.as_bytes())?;
        }

        for (i, sheet) in self.sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{}</worksheet>"#,
                sheet.body
            );
            zip.write_all(xml.as_bytes())?;
        }

        zip.finish()?;
        Ok(())
    }
}

/// `<sheetData>` holding literal cells: numbers as `<v>`, anything else as inline text.
/// Cells must be given row by row.
pub fn sheet_data(cells: &[(&str, &str)]) -> String {
    let mut xml = String::from("<sheetData>");
    let mut current_row: Option<&str> = None;
    for (cell_ref, value) in cells {
        let row = cell_ref.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            xml.push_str(&format!(r#"<row r="{}">"#, row));
            current_row = Some(row);
        }
        if value.parse::<f64>().is_ok() {
            xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, value));
        } else {
            xml.push_str(&format!(
                r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                cell_ref, value
            ));
        }
    }
    if current_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    xml
}

/// A workbook with a single visible sheet of literal cells
pub fn single_sheet_workbook(path: &Path, name: &str, cells: &[(&str, &str)]) -> anyhow::Result<()> {
    MockWorkbook::new().sheet(name, sheet_data(cells)).write(path)
}

/// A `<table:table>` holding the given rows; hidden tables use the `ta-hidden` style
pub fn ods_table(name: &str, hidden: bool, rows: &str) -> String {
    let style = if hidden { "ta-hidden" } else { "ta-shown" };
    format!(
        r#"<table:table table:name="{}" table:style-name="{}"><table:table-column table:number-columns-repeated="4"/>{}</table:table>"#,
        name, style, rows
    )
}

/// A one-cell text row
pub fn ods_text_row(text: &str) -> String {
    format!(
        r#"<table:table-row><table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell></table:table-row>"#,
        text
    )
}

/// Write an OpenDocument spreadsheet whose body holds `tables` verbatim
pub fn write_ods(path: &Path, tables: &[String]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("mimetype", options)?;
    zip.write_all(b"application/vnd.oasis.opendocument.spreadsheet")?;

    zip.start_file("META-INF/manifest.xml", options)?;
    zip.write_all(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#
            .as_bytes(),
    )?;

    zip.start_file("content.xml", options)?;
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" office:version="1.2">
<office:automatic-styles>
<style:style style:name="ta-shown" style:family="table"><style:table-properties table:display="true"/></style:style>
<style:style style:name="ta-hidden" style:family="table"><style:table-properties table:display="false"/></style:style>
</office:automatic-styles>
<office:body><office:spreadsheet>{}</office:spreadsheet></office:body>
</office:document-content>"#,
        tables.concat()
    );
    zip.write_all(content.as_bytes())?;

    zip.finish()?;
    Ok(())
}
