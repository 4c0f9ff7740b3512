//! Office Open XML (`.xlsx`) package writer.
//!
//! Every part is generated with `quick_xml` and stored in a `zip` archive
//! held in memory. Entries carry a fixed timestamp and the parts contain
//! no creation dates, so identical sheets always produce identical bytes.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::RenderError;
use super::layout::{CellValue, Sheet};
use super::style::{Border, FontStyle, StyleTable};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const CORE_PROPERTIES_REL: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const EXTENDED_PROPERTIES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const STYLES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CORE_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const APP_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.extended-properties+xml";

const APPLICATION_NAME: &str = "dbsheet";

/// Serializes `sheets` into a complete `.xlsx` package.
///
/// # Errors
/// Returns [`RenderError::EmptyWorkbook`] when there is nothing to write,
/// or an XML/ZIP error if serialization fails.
pub fn write_package(sheets: &[Sheet]) -> Result<Vec<u8>, RenderError> {
    if sheets.is_empty() {
        return Err(RenderError::EmptyWorkbook);
    }

    let mut styles = StyleTable::new();
    let mut worksheets = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        worksheets.push(worksheet_xml(sheet, &mut styles)?);
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(&content_types_xml(sheets.len())?)?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(&root_rels_xml()?)?;

    zip.start_file("docProps/app.xml", options)?;
    zip.write_all(&app_xml(sheets)?)?;

    zip.start_file("docProps/core.xml", options)?;
    zip.write_all(&core_xml()?)?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(&workbook_xml(sheets)?)?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(&workbook_rels_xml(sheets.len())?)?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(&styles_xml(&styles)?)?;

    for (index, worksheet) in worksheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        zip.write_all(worksheet)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Characters XML 1.0 cannot carry, even as character references.
fn is_restricted_char(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

/// Whether `rest` starts with an `_xHHHH_` escape sequence.
fn starts_with_escape(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 7
        && bytes[0] == b'_'
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

/// Encodes cell text the way spreadsheet applications decode it:
/// restricted characters become `_xHHHH_`, and an underscore that would
/// otherwise start such a sequence becomes `_x005F_`.
fn encode_cell_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_restricted_char) && !text.contains("_x") {
        return Cow::Borrowed(text);
    }

    let mut encoded = String::with_capacity(text.len() + 8);
    for (index, c) in text.char_indices() {
        if is_restricted_char(c) {
            let _ = write!(encoded, "_x{:04X}_", u32::from(c));
        } else if c == '_' && starts_with_escape(&text[index..]) {
            encoded.push_str("_x005F_");
        } else {
            encoded.push(c);
        }
    }
    Cow::Owned(encoded)
}

/// Thin wrapper over the `quick_xml` writer for one package part.
struct PartWriter {
    writer: Writer<Vec<u8>>,
}

impl PartWriter {
    fn new() -> Result<Self, RenderError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), RenderError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), RenderError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), RenderError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<(), RenderError> {
        self.start(name, attributes)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn content_types_xml(sheet_count: usize) -> Result<Vec<u8>, RenderError> {
    let mut w = PartWriter::new()?;
    w.start("Types", &[("xmlns", CONTENT_TYPES_NS)])?;
    w.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    w.empty(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    w.empty(
        "Override",
        &[("PartName", "/xl/workbook.xml"), ("ContentType", WORKBOOK_CONTENT_TYPE)],
    )?;
    for index in 1..=sheet_count {
        let part_name = format!("/xl/worksheets/sheet{}.xml", index);
        w.empty(
            "Override",
            &[("PartName", part_name.as_str()), ("ContentType", WORKSHEET_CONTENT_TYPE)],
        )?;
    }
    w.empty(
        "Override",
        &[("PartName", "/xl/styles.xml"), ("ContentType", STYLES_CONTENT_TYPE)],
    )?;
    w.empty(
        "Override",
        &[("PartName", "/docProps/core.xml"), ("ContentType", CORE_CONTENT_TYPE)],
    )?;
    w.empty(
        "Override",
        &[("PartName", "/docProps/app.xml"), ("ContentType", APP_CONTENT_TYPE)],
    )?;
    w.end("Types")?;
    Ok(w.finish())
}

fn root_rels_xml() -> Result<Vec<u8>, RenderError> {
    let mut w = PartWriter::new()?;
    w.start("Relationships", &[("xmlns", PACKAGE_REL_NS)])?;
    w.empty(
        "Relationship",
        &[("Id", "rId1"), ("Type", OFFICE_DOCUMENT_REL), ("Target", "xl/workbook.xml")],
    )?;
    w.empty(
        "Relationship",
        &[("Id", "rId2"), ("Type", CORE_PROPERTIES_REL), ("Target", "docProps/core.xml")],
    )?;
    w.empty(
        "Relationship",
        &[("Id", "rId3"), ("Type", EXTENDED_PROPERTIES_REL), ("Target", "docProps/app.xml")],
    )?;
    w.end("Relationships")?;
    Ok(w.finish())
}

fn app_xml(sheets: &[Sheet]) -> Result<Vec<u8>, RenderError> {
    let sheet_count = sheets.len().to_string();

    let mut w = PartWriter::new()?;
    w.start(
        "Properties",
        &[
            (
                "xmlns",
                "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
            ),
            (
                "xmlns:vt",
                "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes",
            ),
        ],
    )?;
    w.text_element("Application", &[], APPLICATION_NAME)?;

    w.start("HeadingPairs", &[])?;
    w.start("vt:vector", &[("size", "2"), ("baseType", "variant")])?;
    w.start("vt:variant", &[])?;
    w.text_element("vt:lpstr", &[], "Worksheets")?;
    w.end("vt:variant")?;
    w.start("vt:variant", &[])?;
    w.text_element("vt:i4", &[], &sheet_count)?;
    w.end("vt:variant")?;
    w.end("vt:vector")?;
    w.end("HeadingPairs")?;

    w.start("TitlesOfParts", &[])?;
    w.start("vt:vector", &[("size", sheet_count.as_str()), ("baseType", "lpstr")])?;
    for sheet in sheets {
        w.text_element("vt:lpstr", &[], &sheet.name)?;
    }
    w.end("vt:vector")?;
    w.end("TitlesOfParts")?;

    w.end("Properties")?;
    Ok(w.finish())
}

fn core_xml() -> Result<Vec<u8>, RenderError> {
    let mut w = PartWriter::new()?;
    w.start(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    w.text_element("dc:title", &[], "Database table documentation")?;
    w.text_element("dc:creator", &[], APPLICATION_NAME)?;
    w.end("cp:coreProperties")?;
    Ok(w.finish())
}

fn workbook_xml(sheets: &[Sheet]) -> Result<Vec<u8>, RenderError> {
    let mut w = PartWriter::new()?;
    w.start("workbook", &[("xmlns", MAIN_NS), ("xmlns:r", REL_NS)])?;
    w.start("sheets", &[])?;
    for (index, sheet) in sheets.iter().enumerate() {
        let sheet_id = (index + 1).to_string();
        let rel_id = format!("rId{}", index + 1);
        w.empty(
            "sheet",
            &[
                ("name", sheet.name.as_str()),
                ("sheetId", sheet_id.as_str()),
                ("r:id", rel_id.as_str()),
            ],
        )?;
    }
    w.end("sheets")?;
    w.end("workbook")?;
    Ok(w.finish())
}

fn workbook_rels_xml(sheet_count: usize) -> Result<Vec<u8>, RenderError> {
    let mut w = PartWriter::new()?;
    w.start("Relationships", &[("xmlns", PACKAGE_REL_NS)])?;
    for index in 1..=sheet_count {
        let rel_id = format!("rId{}", index);
        let target = format!("worksheets/sheet{}.xml", index);
        w.empty(
            "Relationship",
            &[
                ("Id", rel_id.as_str()),
                ("Type", WORKSHEET_REL),
                ("Target", target.as_str()),
            ],
        )?;
    }
    let styles_id = format!("rId{}", sheet_count + 1);
    w.empty(
        "Relationship",
        &[("Id", styles_id.as_str()), ("Type", STYLES_REL), ("Target", "styles.xml")],
    )?;
    w.end("Relationships")?;
    Ok(w.finish())
}

fn styles_xml(styles: &StyleTable) -> Result<Vec<u8>, RenderError> {
    let mut w = PartWriter::new()?;
    w.start("styleSheet", &[("xmlns", MAIN_NS)])?;

    let font_count = styles.fonts().len().to_string();
    w.start("fonts", &[("count", font_count.as_str())])?;
    for font in styles.fonts() {
        w.start("font", &[])?;
        match font {
            FontStyle::Regular => {}
            FontStyle::Bold => w.empty("b", &[])?,
            FontStyle::Italic => w.empty("i", &[])?,
        }
        w.empty("sz", &[("val", "11")])?;
        w.empty("name", &[("val", "Calibri")])?;
        w.empty("family", &[("val", "2")])?;
        w.end("font")?;
    }
    w.end("fonts")?;

    // The first two fills are reserved by the format
    w.start("fills", &[("count", "2")])?;
    for pattern in ["none", "gray125"] {
        w.start("fill", &[])?;
        w.empty("patternFill", &[("patternType", pattern)])?;
        w.end("fill")?;
    }
    w.end("fills")?;

    let border_count = styles.borders().len().to_string();
    w.start("borders", &[("count", border_count.as_str())])?;
    for border in styles.borders() {
        w.start("border", &[])?;
        for side in ["left", "right", "top", "bottom"] {
            match border {
                Border::None => w.empty(side, &[])?,
                Border::Thin => {
                    w.start(side, &[("style", "thin")])?;
                    w.empty("color", &[("auto", "1")])?;
                    w.end(side)?;
                }
            }
        }
        w.empty("diagonal", &[])?;
        w.end("border")?;
    }
    w.end("borders")?;

    w.start("cellStyleXfs", &[("count", "1")])?;
    w.empty(
        "xf",
        &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")],
    )?;
    w.end("cellStyleXfs")?;

    let format_count = styles.formats().len().to_string();
    w.start("cellXfs", &[("count", format_count.as_str())])?;
    for format in styles.formats() {
        let font_id = format.font_id.to_string();
        let border_id = format.border_id.to_string();
        let mut attributes = vec![
            ("numFmtId", "0"),
            ("fontId", font_id.as_str()),
            ("fillId", "0"),
            ("borderId", border_id.as_str()),
            ("xfId", "0"),
        ];
        if format.font_id != 0 {
            attributes.push(("applyFont", "1"));
        }
        if format.border_id != 0 {
            attributes.push(("applyBorder", "1"));
        }

        if format.alignment.is_default() {
            w.empty("xf", &attributes)?;
            continue;
        }

        attributes.push(("applyAlignment", "1"));
        w.start("xf", &attributes)?;
        let mut alignment = Vec::new();
        if let Some(horizontal) = format.alignment.horizontal {
            alignment.push(("horizontal", horizontal.as_str()));
        }
        if let Some(vertical) = format.alignment.vertical {
            alignment.push(("vertical", vertical.as_str()));
        }
        if format.alignment.wrap_text {
            alignment.push(("wrapText", "1"));
        }
        w.empty("alignment", &alignment)?;
        w.end("xf")?;
    }
    w.end("cellXfs")?;

    w.start("cellStyles", &[("count", "1")])?;
    w.empty(
        "cellStyle",
        &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")],
    )?;
    w.end("cellStyles")?;

    w.end("styleSheet")?;
    Ok(w.finish())
}

fn worksheet_xml(sheet: &Sheet, styles: &mut StyleTable) -> Result<Vec<u8>, RenderError> {
    let mut w = PartWriter::new()?;
    w.start("worksheet", &[("xmlns", MAIN_NS), ("xmlns:r", REL_NS)])?;

    if let Some(dimension) = sheet.dimension() {
        let dimension = dimension.to_string();
        w.empty("dimension", &[("ref", dimension.as_str())])?;
    }

    if !sheet.column_widths.is_empty() {
        w.start("cols", &[])?;
        for (index, width) in sheet.column_widths.iter().enumerate() {
            let position = (index + 1).to_string();
            let width = width.to_string();
            w.empty(
                "col",
                &[
                    ("min", position.as_str()),
                    ("max", position.as_str()),
                    ("width", width.as_str()),
                    ("customWidth", "1"),
                ],
            )?;
        }
        w.end("cols")?;
    }

    w.start("sheetData", &[])?;
    let mut current_row = None;
    for (at, cell) in &sheet.cells {
        if current_row != Some(at.row) {
            if current_row.is_some() {
                w.end("row")?;
            }
            let row_number = (at.row + 1).to_string();
            w.start("row", &[("r", row_number.as_str())])?;
            current_row = Some(at.row);
        }

        let reference = at.to_string();
        let style_id = styles.intern(cell.style).to_string();
        let mut attributes = vec![("r", reference.as_str())];
        if style_id != "0" {
            attributes.push(("s", style_id.as_str()));
        }

        match &cell.value {
            CellValue::Empty => w.empty("c", &attributes)?,
            CellValue::Text(text) => {
                let text = encode_cell_text(text);
                attributes.push(("t", "inlineStr"));
                w.start("c", &attributes)?;
                w.start("is", &[])?;
                if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                    w.text_element("t", &[("xml:space", "preserve")], &text)?;
                } else {
                    w.text_element("t", &[], &text)?;
                }
                w.end("is")?;
                w.end("c")?;
            }
            CellValue::Integer(value) => {
                w.start("c", &attributes)?;
                w.text_element("v", &[], &value.to_string())?;
                w.end("c")?;
            }
            CellValue::Boolean(value) => {
                attributes.push(("t", "b"));
                w.start("c", &attributes)?;
                w.text_element("v", &[], if *value { "1" } else { "0" })?;
                w.end("c")?;
            }
        }
    }
    if current_row.is_some() {
        w.end("row")?;
    }
    w.end("sheetData")?;

    if !sheet.merged_ranges.is_empty() {
        let count = sheet.merged_ranges.len().to_string();
        w.start("mergeCells", &[("count", count.as_str())])?;
        for range in &sheet.merged_ranges {
            let reference = range.to_string();
            w.empty("mergeCell", &[("ref", reference.as_str())])?;
        }
        w.end("mergeCells")?;
    }

    w.end("worksheet")?;
    Ok(w.finish())
}
