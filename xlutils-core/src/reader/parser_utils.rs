//! Common parsing utilities for the XLSX reader

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Parse a cell reference like "A1" into (row, col) as 1-based indices.
/// `$` markers are ignored; anything else besides letters then digits is rejected.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col = 0u32;
    let mut row = 0u32;
    let mut seen_digit = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() {
            if seen_digit {
                return None;
            }
            col = col
                .checked_mul(26)?
                .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
        } else if let Some(digit) = ch.to_digit(10) {
            seen_digit = true;
            row = row.checked_mul(10)?.checked_add(digit)?;
        } else {
            return None;
        }
    }

    if !seen_digit || col == 0 {
        return None;
    }

    Some((row, col))
}

/// Convert a 1-based column number to letters (1 -> A, 27 -> AA)
pub fn column_letters(mut col: u32) -> String {
    let mut result = String::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    result
}

/// Read text content from an XML node
pub fn read_text_node<R: std::io::BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(e.unescape()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// Whether an XML boolean attribute value is set
pub fn is_truthy(value: &[u8]) -> bool {
    value == b"1" || value.eq_ignore_ascii_case(b"true")
}

/// Detect date/time number formats (e.g. "m/d/yyyy", "hh:mm")
///
/// Quoted literals, escaped characters and bracketed sections such as colors or
/// locales are skipped before looking for date tokens.
pub fn is_date_format(format: &str) -> bool {
    let lower = format.to_lowercase();
    if lower == "general" || lower == "@" {
        return false;
    }

    let mut stripped = String::with_capacity(lower.len());
    let mut chars = lower.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '[' => {
                let mut section = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    section.push(c);
                }
                // Elapsed time markers like [h] or [mm] are date tokens
                if section.chars().all(|c| matches!(c, 'h' | 'm' | 's')) && !section.is_empty() {
                    stripped.push('h');
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            _ => stripped.push(ch),
        }
    }

    // Only the positive section decides
    let positive = stripped.split(';').next().unwrap_or_default();
    let has_date_token = positive
        .chars()
        .any(|c| matches!(c, 'd' | 'y' | 'h' | 's' | 'm'));
    let has_digit_placeholder = positive.contains('#') || positive.contains('0');
    (has_date_token && !has_digit_placeholder) || positive.contains("yy") || positive.contains("dd")
}

/// Convert a spreadsheet serial number into a date-time.
/// Serial 60 is the phantom 1900-02-29 of the 1900 system and resolves to 1900-02-28.
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let delta = TimeDelta::try_milliseconds(millis)?;
    epoch.and_hms_opt(0, 0, 0)?.checked_add_signed(delta)
}

/// Parse ISO 8601 date or date-time text as stored in `t="d"` cells
pub fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
