//! SpreadsheetML fragments and text helpers
//!
//! The workbook is produced as raw XML parts zipped together, using inline
//! strings so no shared-string table has to be held in memory.

use super::columns::{CellFormat, CellValue, CURRENCY_FORMAT};
use std::fmt::Write as _;

/// Style index for currency cells in `styles.xml`
const STYLE_CURRENCY: u32 = 1;
/// Style index for header cells in `styles.xml`
const STYLE_HEADER: u32 = 2;

const TRUNCATION_MARKER: &str = "...";

/// Converts a 1-based column number to its letter name (`1 -> A`, `27 -> AA`)
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Whether a character may appear in an XML 1.0 document
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Drops characters XML cannot carry and caps the length
///
/// Text longer than `max_chars` characters keeps its first `max_chars - 3`
/// characters followed by `...`, so the result is exactly `max_chars` long.
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let cleaned: String = text.chars().filter(|c| is_xml_char(*c)).collect();
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut truncated: String = cleaned.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Escapes the five XML special characters
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_text_cell(out: &mut String, reference: &str, text: &str, style: Option<u32>) {
    let _ = write!(out, "<c r=\"{reference}\" t=\"inlineStr\"");
    if let Some(s) = style {
        let _ = write!(out, " s=\"{s}\"");
    }
    if text.is_empty() {
        out.push_str("><is><t></t></is></c>");
    } else {
        let _ = write!(
            out,
            "><is><t xml:space=\"preserve\">{}</t></is></c>",
            escape(text)
        );
    }
}

/// Renders the header row
pub fn header_row(row: usize, headers: &[&str]) -> String {
    let mut out = format!("<row r=\"{row}\">");
    for (i, header) in headers.iter().enumerate() {
        let reference = format!("{}{row}", column_letter(i + 1));
        push_text_cell(&mut out, &reference, header, Some(STYLE_HEADER));
    }
    out.push_str("</row>");
    out
}

/// Renders one data row from `(format, value)` pairs
pub fn data_row(row: usize, cells: &[(CellFormat, CellValue)], max_cell_length: usize) -> String {
    let mut out = format!("<row r=\"{row}\">");
    for (i, (format, value)) in cells.iter().enumerate() {
        let reference = format!("{}{row}", column_letter(i + 1));
        match value {
            CellValue::Integer(n) => {
                let _ = write!(out, "<c r=\"{reference}\"><v>{n}</v></c>");
            }
            CellValue::Decimal(d) => {
                if *format == CellFormat::Currency {
                    let _ = write!(
                        out,
                        "<c r=\"{reference}\" s=\"{STYLE_CURRENCY}\"><v>{d}</v></c>"
                    );
                } else {
                    let _ = write!(out, "<c r=\"{reference}\"><v>{d}</v></c>");
                }
            }
            CellValue::Text(text) => {
                push_text_cell(&mut out, &reference, &clean_text(text, max_cell_length), None);
            }
            CellValue::Empty => push_text_cell(&mut out, &reference, "", None),
        }
    }
    out.push_str("</row>");
    out
}

pub const WORKSHEET_START: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
    "<sheetViews><sheetView workbookViewId=\"0\">",
    "<pane ySplit=\"1\" topLeftCell=\"A2\" activePane=\"bottomLeft\" state=\"frozen\"/>",
    "</sheetView></sheetViews>",
    "<sheetData>"
);

pub const WORKSHEET_END: &str = "</sheetData></worksheet>";

pub const ROOT_RELS: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" ",
    "Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" ",
    "Target=\"xl/workbook.xml\"/>",
    "</Relationships>"
);

/// `[Content_Types].xml` for `sheet_count` worksheets
pub fn content_types(sheet_count: usize) -> String {
    let mut out = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
        "<Default Extension=\"rels\" ",
        "ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
        "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        "<Override PartName=\"/xl/workbook.xml\" ",
        "ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
        "<Override PartName=\"/xl/styles.xml\" ",
        "ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>"
    ));
    for i in 1..=sheet_count {
        let _ = write!(
            out,
            "<Override PartName=\"/xl/worksheets/sheet{i}.xml\" \
             ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        );
    }
    out.push_str("</Types>");
    out
}

/// `xl/workbook.xml` listing the sheets in order
pub fn workbook(sheet_names: &[String]) -> String {
    let mut out = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
        "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
        "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
        "<sheets>"
    ));
    for (i, name) in sheet_names.iter().enumerate() {
        let id = i + 1;
        let _ = write!(
            out,
            "<sheet name=\"{}\" sheetId=\"{id}\" r:id=\"rId{id}\"/>",
            escape(name)
        );
    }
    out.push_str("</sheets></workbook>");
    out
}

/// `xl/_rels/workbook.xml.rels`; styles take the id after the last sheet
pub fn workbook_rels(sheet_count: usize) -> String {
    let mut out = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
    ));
    for i in 1..=sheet_count {
        let _ = write!(
            out,
            "<Relationship Id=\"rId{i}\" \
             Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
             Target=\"worksheets/sheet{i}.xml\"/>"
        );
    }
    let _ = write!(
        out,
        "<Relationship Id=\"rId{}\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" \
         Target=\"styles.xml\"/>",
        sheet_count + 1
    );
    out.push_str("</Relationships>");
    out
}

/// `xl/styles.xml` with default, currency and bold header formats
pub fn styles() -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
            "<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
            "<numFmts count=\"1\"><numFmt numFmtId=\"164\" formatCode=\"{fmt}\"/></numFmts>",
            "<fonts count=\"2\">",
            "<font><sz val=\"11\"/><name val=\"Calibri\"/></font>",
            "<font><b/><sz val=\"11\"/><name val=\"Calibri\"/></font>",
            "</fonts>",
            "<fills count=\"2\">",
            "<fill><patternFill patternType=\"none\"/></fill>",
            "<fill><patternFill patternType=\"gray125\"/></fill>",
            "</fills>",
            "<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>",
            "<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
            "<cellXfs count=\"3\">",
            "<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>",
            "<xf numFmtId=\"164\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyNumberFormat=\"1\"/>",
            "<xf numFmtId=\"0\" fontId=\"1\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyFont=\"1\"/>",
            "</cellXfs>",
            "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
            "</styleSheet>"
        ),
        fmt = CURRENCY_FORMAT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(10), "J");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_clean_text_truncates_to_exact_length() {
        let long = "x".repeat(50);
        let cut = clean_text(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert_eq!(cut, "xxxxxxx...");
        assert_eq!(clean_text("short", 10), "short");
        assert_eq!(clean_text(&"y".repeat(10), 10), "y".repeat(10));
    }

    #[test]
    fn test_clean_text_counts_characters_not_bytes() {
        let text = "é".repeat(12);
        let cut = clean_text(&text, 8);
        assert_eq!(cut.chars().count(), 8);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_clean_text_strips_control_characters() {
        assert_eq!(clean_text("a\u{1}b\u{8}c\td", 100), "abc\td");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_data_row_cell_types() {
        let row = data_row(
            2,
            &[
                (CellFormat::Number, CellValue::Integer(7)),
                (CellFormat::Currency, CellValue::Decimal(Decimal::new(1050, 2))),
                (CellFormat::Text, CellValue::Text("R&D".to_string())),
                (CellFormat::Text, CellValue::Empty),
            ],
            100,
        );
        assert!(row.starts_with("<row r=\"2\">"));
        assert!(row.contains("<c r=\"A2\"><v>7</v></c>"));
        assert!(row.contains("<c r=\"B2\" s=\"1\"><v>10.50</v></c>"));
        assert!(row.contains("R&amp;D"));
        assert!(row.contains("<c r=\"D2\" t=\"inlineStr\"><is><t></t></is></c>"));
    }

    #[test]
    fn test_workbook_lists_sheets() {
        let xml = workbook(&["Orders".to_string(), "Orders_2".to_string()]);
        assert!(xml.contains("name=\"Orders\" sheetId=\"1\""));
        assert!(xml.contains("name=\"Orders_2\" sheetId=\"2\" r:id=\"rId2\""));
        assert!(workbook_rels(2).contains("Id=\"rId3\""));
        assert!(content_types(2).contains("/xl/worksheets/sheet2.xml"));
    }
}
