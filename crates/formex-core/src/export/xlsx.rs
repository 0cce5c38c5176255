//! Minimal OOXML workbook writer.
//!
//! One worksheet, every cell an inline string. Empty values produce no cell.

use std::io::{Cursor, Write};

use chrono::Utc;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;
use crate::models::record::ResultSet;

use super::{xml_safe, ExportSink, Spreadsheet, XLSX_MIME};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Excel refuses sheet names longer than this.
const MAX_SHEET_NAME: usize = 31;

/// Writes the result set as a single-sheet `.xlsx` workbook.
#[derive(Debug, Clone)]
pub struct XlsxSink {
    file_name: String,
    sheet_name: String,
}

impl XlsxSink {
    pub fn new(file_name: impl Into<String>, sheet_name: &str) -> Self {
        Self {
            file_name: file_name.into(),
            sheet_name: sanitize_sheet_name(sheet_name),
        }
    }
}

impl ExportSink for XlsxSink {
    fn export(&self, results: &ResultSet) -> Result<Spreadsheet, ExportError> {
        let parts: [(&str, Vec<u8>); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
            ("_rels/.rels", ROOT_RELS.as_bytes().to_vec()),
            ("docProps/core.xml", core_properties().into_bytes()),
            ("xl/workbook.xml", workbook_xml(&self.sheet_name)?),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes().to_vec()),
            ("xl/worksheets/sheet1.xml", worksheet_xml(results)?),
        ];

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &parts {
            zip.start_file(*name, options)?;
            zip.write_all(bytes)?;
        }
        let bytes = zip.finish()?.into_inner();

        Ok(Spreadsheet {
            bytes,
            mime: XLSX_MIME,
            file_name: self.file_name.clone(),
        })
    }
}

/// Spreadsheet column letters for a zero-based index: 0 -> A, 26 -> AA.
pub(crate) fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();

    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

fn declaration(writer: &mut Writer<Vec<u8>>) -> Result<(), ExportError> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(())
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut w = Writer::new(Vec::new());
    declaration(&mut w)?;

    w.write_event(Event::Start(
        BytesStart::new("workbook").with_attributes([("xmlns", MAIN_NS), ("xmlns:r", REL_NS)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("sheets")))?;
    w.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
        ("name", sheet_name),
        ("sheetId", "1"),
        ("r:id", "rId1"),
    ])))?;
    w.write_event(Event::End(BytesEnd::new("sheets")))?;
    w.write_event(Event::End(BytesEnd::new("workbook")))?;

    Ok(w.into_inner())
}

fn worksheet_xml(results: &ResultSet) -> Result<Vec<u8>, ExportError> {
    let mut w = Writer::new(Vec::new());
    declaration(&mut w)?;

    w.write_event(Event::Start(
        BytesStart::new("worksheet").with_attributes([("xmlns", MAIN_NS)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let rows = std::iter::once(results.header())
        .chain(results.records.iter().map(|record| results.row(record)));

    for (index, cells) in rows.enumerate() {
        let row_number = (index + 1).to_string();
        w.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", row_number.as_str())]),
        ))?;

        for (column, value) in cells.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let reference = format!("{}{}", column_name(column), row_number);
            inline_string_cell(&mut w, &reference, value)?;
        }

        w.write_event(Event::End(BytesEnd::new("row")))?;
    }

    w.write_event(Event::End(BytesEnd::new("sheetData")))?;
    w.write_event(Event::End(BytesEnd::new("worksheet")))?;

    Ok(w.into_inner())
}

fn inline_string_cell(
    w: &mut Writer<Vec<u8>>,
    reference: &str,
    value: &str,
) -> Result<(), ExportError> {
    let value = xml_safe(value);

    w.write_event(Event::Start(
        BytesStart::new("c").with_attributes([("r", reference), ("t", "inlineStr")]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("is")))?;
    w.write_event(Event::Start(
        BytesStart::new("t").with_attributes([("xml:space", "preserve")]),
    ))?;
    w.write_event(Event::Text(BytesText::new(&value)))?;
    w.write_event(Event::End(BytesEnd::new("t")))?;
    w.write_event(Event::End(BytesEnd::new("is")))?;
    w.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn core_properties() -> String {
    let created = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:creator>formex</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified></cp:coreProperties>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{FieldValue, Record};
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    fn sample() -> ResultSet {
        ResultSet::new(
            vec!["이름".to_string(), "결합".to_string()],
            vec![
                Record::extracted(
                    "a.jpg",
                    vec![
                        FieldValue::new("이름", Some("홍길동".to_string())),
                        FieldValue::new("결합", None),
                    ],
                ),
                Record::failed("b.jpg", "HTTP 500 & <retry>"),
            ],
        )
    }

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
    fn test_package_parts() {
        let sheet = XlsxSink::new("ocr_extracted.xlsx", "Sheet1").export(&sample()).unwrap();
        assert_eq!(sheet.mime, XLSX_MIME);
        assert_eq!(&sheet.bytes[..2], b"PK");

        let archive = zip::ZipArchive::new(Cursor::new(sheet.bytes.as_slice())).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "xl/_rels/workbook.xml.rels",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
            ]
        );
        assert!(read_part(&sheet.bytes, "docProps/core.xml").contains("dcterms:created"));
    }

    #[test]
    fn test_worksheet_cells() {
        let sheet = XlsxSink::new("out.xlsx", "Sheet1").export(&sample()).unwrap();
        let xml = read_part(&sheet.bytes, "xl/worksheets/sheet1.xml");

        assert!(xml.contains(r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">filename</t></is></c>"#));
        assert!(xml.contains(r#"<c r="D1" t="inlineStr"><is><t xml:space="preserve">error</t></is></c>"#));
        assert!(xml.contains(r#"<c r="B2" t="inlineStr"><is><t xml:space="preserve">홍길동</t></is></c>"#));
        // Absent 결합 value: no C2 cell.
        assert!(!xml.contains(r#"r="C2""#));
        assert!(xml.contains("HTTP 500 &amp; &lt;retry&gt;"));
        assert_eq!(xml.matches("<row ").count(), 3);
    }

    #[test]
    fn test_sheet_name_is_sanitized() {
        assert_eq!(sanitize_sheet_name("2024/05 접수"), "2024_05 접수");
        assert_eq!(sanitize_sheet_name(""), "Sheet1");
        assert_eq!(sanitize_sheet_name(&"가".repeat(40)).chars().count(), MAX_SHEET_NAME);

        let sheet = XlsxSink::new("out.xlsx", "고객 & 접수").export(&ResultSet::default()).unwrap();
        let workbook = read_part(&sheet.bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="고객 &amp; 접수""#));
    }
}
