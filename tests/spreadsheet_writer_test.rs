//! Package-level checks of written workbooks

use chrono::NaiveDate;
use quarry::adapters::source::demo_order;
use quarry::core::sheet::{ColumnSet, SheetSettings, SpreadsheetWriter};
use quarry::domain::Order;
use rust_decimal::Decimal;
use std::io::{Cursor, Read};

fn settings(max_rows: usize) -> SheetSettings {
    SheetSettings {
        max_rows_per_sheet: max_rows,
        window_rows: 8,
        max_cell_length: 20,
        base_sheet_name: "Orders".to_string(),
    }
}

fn part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

#[test]
fn test_package_contains_required_parts() {
    let mut writer = SpreadsheetWriter::new(settings(5), ColumnSet::all());
    let orders: Vec<Order> = (1..=12).map(demo_order).collect();
    writer.write_rows(&orders).unwrap();

    let mut bytes = Vec::new();
    let summary = writer.finalize(&mut bytes).unwrap();
    assert_eq!(summary.sheet_names, vec!["Orders", "Orders_2", "Orders_3"]);
    assert_eq!(summary.rows_written, 12);
    assert_eq!(summary.bytes_written, bytes.len() as u64);

    let names: Vec<String> = zip::ZipArchive::new(Cursor::new(bytes.as_slice()))
        .unwrap()
        .file_names()
        .map(str::to_string)
        .collect();
    for required in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/worksheets/sheet1.xml",
        "xl/worksheets/sheet2.xml",
        "xl/worksheets/sheet3.xml",
    ] {
        assert!(names.iter().any(|n| n == required), "missing {required}");
    }

    let workbook = part(&bytes, "xl/workbook.xml");
    assert!(workbook.find("name=\"Orders\"") < workbook.find("name=\"Orders_2\""));

    // Each sheet repeats the header and freezes it
    for sheet in 1..=3 {
        let xml = part(&bytes, &format!("xl/worksheets/sheet{sheet}.xml"));
        assert!(xml.contains("state=\"frozen\""));
        assert!(xml.contains(">Order Number<"));
    }
    let last = part(&bytes, "xl/worksheets/sheet3.xml");
    assert_eq!(last.matches("<row ").count(), 3);
}

#[test]
fn test_cell_rendering() {
    let created = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(8, 5, 7)
        .unwrap();
    let order = Order::new(
        42,
        "ORD-<42>&",
        "PAID",
        Decimal::new(123_456, 2),
        "EUR",
        created,
    )
    .with_notes("a".repeat(50));

    let keys = vec![
        "notes".to_string(),
        "total_amount".to_string(),
        "created_at".to_string(),
        "order_number".to_string(),
    ];
    let columns = ColumnSet::project(Some(keys.as_slice())).unwrap();
    let mut writer = SpreadsheetWriter::new(settings(100), columns);
    writer.write_row(&order).unwrap();

    let mut bytes = Vec::new();
    writer.finalize(&mut bytes).unwrap();
    let xml = part(&bytes, "xl/worksheets/sheet1.xml");

    // Declared column order wins over request order
    let header_pos = |h: &str| xml.find(&format!(">{h}<")).unwrap();
    assert!(header_pos("Order Number") < header_pos("Total Amount"));
    assert!(header_pos("Total Amount") < header_pos("Created At"));
    assert!(header_pos("Created At") < header_pos("Notes"));

    assert!(xml.contains("ORD-&lt;42&gt;&amp;"));
    assert!(xml.contains("s=\"1\"><v>1234.56</v>"));
    assert!(xml.contains("2024-03-09 08:05:07"));
    assert!(xml.contains(&format!(">{}...<", "a".repeat(17))));
    assert!(!xml.contains(&"a".repeat(21)));
}
