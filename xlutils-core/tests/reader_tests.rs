mod common;

use common::{MockWorkbook, ods_table, ods_text_row, sheet_data, write_ods};
use xlutils_core::reader::{CellAddress, CellValue, ContentClass, SheetState, read_workbook};

fn addr(a1: &str) -> CellAddress {
    CellAddress::parse(a1).unwrap()
}

const DATE_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/></numFmts>
<cellXfs count="3">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="49" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
</cellXfs>
</styleSheet>"#;

#[test]
fn test_sheet_order_and_states() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("states.xlsx");
    MockWorkbook::new()
        .sheet("Visible", "<sheetData/>")
        .sheet_with_state("Hidden", "hidden", "<sheetData/>")
        .sheet_with_state("Secret", "veryHidden", "<sheetData/>")
        .write(&path)?;

    let workbook = read_workbook(&path)?;
    assert_eq!(workbook.sheet_names(), vec!["Visible", "Hidden", "Secret"]);
    assert_eq!(workbook.sheets[0].state, SheetState::Normal);
    assert_eq!(workbook.sheets[1].state, SheetState::Hidden);
    assert_eq!(workbook.sheets[2].state, SheetState::VeryHidden);
    assert_eq!(workbook.stem(), "states");
    assert_eq!(workbook.sheets[0].bounds(), (0, 0));
    Ok(())
}

#[test]
fn test_values_and_bounds() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("values.xlsx");
    MockWorkbook::new()
        .shared_strings(&["alpha", "beta"])
        .sheet(
            "Data",
            r#"<sheetData>
<row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1"><v>2.5</v></c><c r="C1" t="b"><v>0</v></c></row>
<row r="3"><c r="A3" t="inlineStr"><is><t xml:space="preserve"> padded </t></is></c><c r="E3" s="0"/></row>
</sheetData>"#,
        )
        .write(&path)?;

    let workbook = read_workbook(&path)?;
    let sheet = workbook.get_sheet("Data").unwrap();

    assert_eq!(sheet.bounds(), (3, 5));
    assert_eq!(sheet.cell(addr("A1")).value, CellValue::Text("beta".to_string()));
    assert_eq!(sheet.cell(addr("B1")).value, CellValue::Number(2.5));
    assert_eq!(sheet.cell(addr("C1")).value, CellValue::Boolean(false));
    assert_eq!(
        sheet.cell(addr("A3")).value,
        CellValue::Text(" padded ".to_string())
    );
    assert_eq!(sheet.cell(addr("E3")).class, ContentClass::Empty);
    assert_eq!(sheet.cell(addr("D2")).class, ContentClass::Empty);
    Ok(())
}

#[test]
fn test_content_classes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("classes.xlsx");
    MockWorkbook::new()
        .sheet(
            "Calc",
            r#"<sheetData><row r="1">
<c r="A1"><f>1+1</f><v>2</v></c>
<c r="B1"><f t="shared" si="0"/><v>3</v></c>
<c r="C1" t="e"><v>#N/A</v></c>
<c r="D1" t="str"><v>text</v></c>
<c r="E1"><v>7</v></c>
</row></sheetData>"#,
        )
        .write(&path)?;

    let workbook = read_workbook(&path)?;
    let sheet = &workbook.sheets[0];

    assert_eq!(sheet.cell(addr("A1")).class, ContentClass::Formula);
    assert_eq!(sheet.cell(addr("A1")).value, CellValue::Number(2.0));
    assert_eq!(sheet.cell(addr("B1")).class, ContentClass::Formula);
    assert_eq!(sheet.cell(addr("C1")).class, ContentClass::Error);
    assert_eq!(sheet.cell(addr("C1")).value, CellValue::Error("#N/A".to_string()));
    assert_eq!(sheet.cell(addr("D1")).class, ContentClass::FormulaDisplayText);
    assert_eq!(sheet.cell(addr("E1")).class, ContentClass::Literal);
    Ok(())
}

#[test]
fn test_hidden_rows_columns_and_merges() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("layout.xlsx");
    MockWorkbook::new()
        .sheet(
            "Layout",
            format!(
                r#"<cols><col min="2" max="3" width="0" hidden="1"/><col min="5" max="5" width="9"/></cols>{}<mergeCells count="2"><mergeCell ref="A1:A3"/><mergeCell ref="D4:E5"/></mergeCells>"#,
                r#"<sheetData><row r="1"><c r="A1"><v>1</v></c></row><row r="2" hidden="1"><c r="A2"><v>2</v></c></row></sheetData>"#
            ),
        )
        .write(&path)?;

    let workbook = read_workbook(&path)?;
    let sheet = &workbook.sheets[0];

    assert!(sheet.is_column_hidden(2));
    assert!(sheet.is_column_hidden(3));
    assert!(!sheet.is_column_hidden(5));
    assert!(sheet.is_row_hidden(2));
    assert!(!sheet.is_row_hidden(1));
    let merges: Vec<String> = sheet.merged_ranges.iter().map(|m| m.to_string()).collect();
    assert_eq!(merges, vec!["A1:A3", "D4:E5"]);
    Ok(())
}

#[test]
fn test_date_and_text_formats() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dates.xlsx");
    MockWorkbook::new()
        .styles(DATE_STYLES)
        .sheet(
            "Dates",
            r#"<sheetData><row r="1">
<c r="A1" s="1"><v>45139</v></c>
<c r="B1" s="2"><v>00123</v></c>
<c r="C1" t="d"><v>2024-02-29T10:15:00</v></c>
</row></sheetData>"#,
        )
        .write(&path)?;

    let workbook = read_workbook(&path)?;
    let sheet = &workbook.sheets[0];

    match &sheet.cell(addr("A1")).value {
        CellValue::DateTime(dt) => assert_eq!(dt.to_string(), "2023-08-01 00:00:00"),
        other => panic!("expected a date-time, got {:?}", other),
    }
    assert_eq!(
        sheet.cell(addr("B1")).value,
        CellValue::Text("00123".to_string())
    );
    match &sheet.cell(addr("C1")).value {
        CellValue::DateTime(dt) => assert_eq!(dt.to_string(), "2024-02-29 10:15:00"),
        other => panic!("expected a date-time, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_1904_date_system() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mac.xlsx");
    MockWorkbook::new()
        .date1904()
        .styles(DATE_STYLES)
        .sheet(
            "Dates",
            r#"<sheetData><row r="1"><c r="A1" s="1"><v>0</v></c></row></sheetData>"#,
        )
        .write(&path)?;

    let workbook = read_workbook(&path)?;
    match &workbook.sheets[0].cell(addr("A1")).value {
        CellValue::DateTime(dt) => assert_eq!(dt.to_string(), "1904-01-01 00:00:00"),
        other => panic!("expected a date-time, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_corrupt_file_is_a_load_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"not a zip archive")?;

    let err = read_workbook(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to open zip archive"));
    Ok(())
}

#[test]
fn test_sheet_data_helper_layout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("helper.xlsx");
    MockWorkbook::new()
        .sheet("S", sheet_data(&[("A1", "5"), ("B1", "x"), ("B2", "7")]))
        .write(&path)?;

    let sheet = &read_workbook(&path)?.sheets[0];
    assert_eq!(sheet.bounds(), (2, 2));
    assert_eq!(sheet.cell(addr("B1")).value, CellValue::Text("x".to_string()));
    assert_eq!(sheet.cell(addr("B2")).value, CellValue::Number(7.0));
    Ok(())
}

#[test]
fn test_hidden_column_span_is_clamped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("wide.xlsx");
    MockWorkbook::new()
        .sheet(
            "Wide",
            r#"<cols><col min="3" max="4000000000" hidden="1"/></cols><sheetData/>"#,
        )
        .write(&path)?;

    let sheet = &read_workbook(&path)?.sheets[0];
    assert!(sheet.is_column_hidden(16_384));
    assert!(!sheet.is_column_hidden(16_385));
    assert_eq!(sheet.hidden_columns.len(), 16_382);
    Ok(())
}

#[test]
fn test_ods_sheet_states() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("book.ods");
    write_ods(
        &path,
        &[
            ods_table("Shown", false, &ods_text_row("a")),
            ods_table("Secret", true, &ods_text_row("b")),
        ],
    )?;

    let workbook = read_workbook(&path)?;
    assert_eq!(workbook.sheet_names(), vec!["Shown", "Secret"]);
    assert_eq!(workbook.sheets[0].state, SheetState::Normal);
    assert_eq!(workbook.sheets[1].state, SheetState::Hidden);
    assert_eq!(
        workbook.sheets[1].cell(addr("A1")).value,
        CellValue::Text("b".to_string())
    );
    Ok(())
}

#[test]
fn test_ods_hidden_rows_columns_and_merges() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("layout.ods");
    let table = r#"<table:table table:name="Layout">
<table:table-column/>
<table:table-column table:visibility="collapse"/>
<table:table-row><table:table-cell table:number-rows-spanned="2" office:value-type="string"><text:p>X</text:p></table:table-cell></table:table-row>
<table:table-row table:visibility="collapse"><table:covered-table-cell/></table:table-row>
</table:table>"#;
    write_ods(&path, &[table.to_string()])?;

    let sheet = &read_workbook(&path)?.sheets[0];
    assert!(sheet.is_column_hidden(2));
    assert!(!sheet.is_column_hidden(1));
    assert!(sheet.is_row_hidden(2));
    let merges: Vec<String> = sheet.merged_ranges.iter().map(|m| m.to_string()).collect();
    assert_eq!(merges, vec!["A1:A2"]);
    Ok(())
}
