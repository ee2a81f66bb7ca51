//! Minimal Office Open XML workbook with a single sheet

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::report::{Cell, ReportTable};
use crate::domain::DomainError;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Reporte" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

pub fn render(table: &ReportTable) -> Result<Vec<u8>, DomainError> {
    let sheet = worksheet(table);
    let mut buffer = Cursor::new(Vec::new());

    {
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts: [(&str, &[u8]); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("xl/workbook.xml", WORKBOOK.as_bytes()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
        ];

        for (name, data) in parts {
            zip.start_file(name, options).map_err(|e| {
                DomainError::internal(format!("Failed to add '{}' to workbook: {}", name, e))
            })?;
            zip.write_all(data).map_err(|e| {
                DomainError::internal(format!("Failed to write '{}': {}", name, e))
            })?;
        }

        zip.finish()
            .map_err(|e| DomainError::internal(format!("Failed to finalize workbook: {}", e)))?;
    }

    Ok(buffer.into_inner())
}

/// Title in row 1, headers in row 3, data below, summary after a blank row
fn worksheet(table: &ReportTable) -> String {
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(table.rows.len() + table.summary.len() + 4);
    rows.push(vec![Cell::text(&table.title)]);
    rows.push(Vec::new());
    rows.push(table.headers.iter().map(Cell::text).collect());
    rows.extend(table.rows.iter().cloned());

    if !table.summary.is_empty() {
        rows.push(Vec::new());
        rows.extend(
            table
                .summary
                .iter()
                .map(|(label, value)| vec![Cell::text(label), Cell::text(value)]),
        );
    }

    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    for (index, row) in rows.iter().enumerate() {
        let number = index + 1;
        if row.is_empty() {
            continue;
        }

        xml.push_str(&format!(r#"<row r="{}">"#, number));
        for (column, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_name(column), number);
            match cell {
                Cell::Text(text) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    reference,
                    escape(text)
                )),
                Cell::Number(n) if n.is_finite() => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n))
                }
                _ => {}
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA)
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn test_package_contains_sheet_with_cells() {
        let mut table = ReportTable::new("Gastos & compras", &["Categoria", "Monto"]);
        table.push_row(vec!["feed".into(), 12.5.into()]);
        table.push_summary("Total", "12.50");

        let bytes = render(&table).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        for name in ["[Content_Types].xml", "_rels/.rels", "xl/workbook.xml"] {
            assert!(archive.by_name(name).is_ok(), "{name} missing");
        }

        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();

        assert!(sheet.contains("Gastos &amp; compras"));
        assert!(sheet.contains(r#"<c r="B4"><v>12.5</v></c>"#));
        assert!(sheet.contains(r#"<row r="6">"#));
        assert!(!sheet.contains(r#"<row r="2">"#));
    }
}
