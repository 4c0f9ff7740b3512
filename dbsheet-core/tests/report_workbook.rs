//! Workbook output tests: render collected tables and read the package back.

use dbsheet_core::{
    ColumnDescriptor, ForeignKeyReference, TableDocumentation,
    error::DbSheetError,
    report::{RenderError, render_workbook, write_workbook},
};
use std::io::{Cursor, Read};
use tempfile::TempDir;
use zip::ZipArchive;

fn column(position: u32, name: &str, type_name: &str) -> ColumnDescriptor {
    ColumnDescriptor {
        position,
        name: name.to_string(),
        comment: String::new(),
        is_nullable: true,
        type_name: type_name.to_string(),
        max_length: None,
        is_primary_key: false,
        foreign_keys: Vec::new(),
    }
}

fn users() -> TableDocumentation {
    let mut id = column(1, "id", "INTEGER");
    id.is_nullable = false;
    id.is_primary_key = true;

    let mut email = column(2, "email", "VARCHAR");
    email.is_nullable = false;
    email.max_length = Some(255);
    email.comment = "Login address".to_string();

    let mut company_id = column(3, "company_id", "INTEGER");
    company_id.foreign_keys.push(ForeignKeyReference {
        referenced_schema: "public".to_string(),
        referenced_table: "companies".to_string(),
        referenced_column: "id".to_string(),
        constraint_name: "users_company_id_fkey".to_string(),
    });

    TableDocumentation {
        schema: "public".to_string(),
        name: "users".to_string(),
        columns: vec![id, email, company_id],
    }
}

fn companies() -> TableDocumentation {
    let mut id = column(1, "id", "INTEGER");
    id.is_primary_key = true;
    TableDocumentation {
        schema: "public".to_string(),
        name: "companies".to_string(),
        columns: vec![id, column(2, "name", "TEXT")],
    }
}

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn test_workbook_has_one_sheet_per_table() {
    let bytes = render_workbook(&[users(), companies()]).unwrap();

    let workbook = read_part(&bytes, "xl/workbook.xml");
    assert!(workbook.contains(r#"<sheet name="users" sheetId="1" r:id="rId1"/>"#));
    assert!(workbook.contains(r#"<sheet name="companies" sheetId="2" r:id="rId2"/>"#));

    let app = read_part(&bytes, "docProps/app.xml");
    assert!(app.contains("<vt:lpstr>users</vt:lpstr>"));
}

#[test]
fn test_users_sheet_content() {
    let bytes = render_workbook(&[users()]).unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");

    for expected in [
        "<t>Table Name</t>",
        "<t>Description</t>",
        "<t>PK / FK</t>",
        "<t>Login address</t>",
        "<t>VARCHAR</t>",
        "<v>255</v>",
        "<t>PK</t>",
        "<t>FK</t>",
        r#"<row r="6">"#,
    ] {
        assert!(sheet.contains(expected), "missing {}", expected);
    }
    assert!(!sheet.contains(r#"<row r="7">"#));
}

#[test]
fn test_rendering_is_byte_identical() {
    let first = render_workbook(&[users(), companies()]).unwrap();
    let second = render_workbook(&[users(), companies()]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_truncated_sheet_collision_is_render_error() {
    let mut first = companies();
    first.name = "a".repeat(31) + "_first";
    let mut second = companies();
    second.name = "a".repeat(31) + "_second";

    let error = render_workbook(&[first, second]).unwrap_err();
    match error {
        DbSheetError::Render {
            source: RenderError::DuplicateSheetName { first, second, .. },
            ..
        } => {
            assert!(first.ends_with("_first"));
            assert!(second.ends_with("_second"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_write_workbook_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db_table_docs.xlsx");

    let count = write_workbook(&path, &[users(), companies()]).await.unwrap();
    assert_eq!(count, 2);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes, render_workbook(&[users(), companies()]).unwrap());
}
