//! Sheet layout: the data table plus the documentation title block.
//!
//! A sheet is built in two steps. [`data_table`] turns a table's column
//! descriptors into a plain grid (header row plus one row per column),
//! then [`apply_document_layout`] shifts that grid down two rows, adds the
//! title block, styles every region and sizes the columns. The whole sheet
//! lives in memory; nothing is written until the workbook is complete.

use std::collections::BTreeMap;
use std::fmt;

use super::RenderError;
use super::style::{Border, CellStyle, FontStyle, HorizontalAlignment, VerticalAlignment};
use crate::models::TableDocumentation;

/// Header row of every documentation sheet.
pub const HEADER: [&str; 7] = ["No", "Column", "Desc", "Null?", "Data Type", "Length", "PK / FK"];

/// Excel's limit on sheet name length, in characters.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

/// Characters Excel does not accept in sheet names.
pub const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

pub const MIN_COLUMN_WIDTH: u32 = 10;
pub const MAX_COLUMN_WIDTH: u32 = 60;

/// Rows inserted above the data table for the title block.
const TITLE_ROWS: u32 = 2;

/// Value of one cell. `Empty` is a true blank, not an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl CellValue {
    /// Length in characters of the value as a spreadsheet displays it.
    pub fn display_len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Text(text) => text.chars().count(),
            Self::Integer(value) => value.to_string().len(),
            Self::Boolean(true) => "TRUE".len(),
            Self::Boolean(false) => "FALSE".len(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A styled cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

/// Zero-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    /// A1-style reference, e.g. `B1` or `AA10`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

/// Rectangular cell range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first: CellRef,
    pub last: CellRef,
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

/// One fully laid-out sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// Cells keyed by (row, column), so iteration runs row-major.
    pub cells: BTreeMap<CellRef, Cell>,
    pub merged_ranges: Vec<CellRange>,
    /// Width per column index, starting at column A.
    pub column_widths: Vec<u32>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&CellRef::new(row, col))
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cell(row, col).map_or(&EMPTY, |cell| &cell.value)
    }

    fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.cells.entry(CellRef::new(row, col)).or_default().value = value;
    }

    fn update_style(&mut self, row: u32, col: u32, update: impl FnOnce(CellStyle) -> CellStyle) {
        let cell = self.cells.entry(CellRef::new(row, col)).or_default();
        cell.style = update(cell.style);
    }

    /// Bottom-right corner of the used area, or `None` for a blank sheet.
    pub fn dimension(&self) -> Option<CellRange> {
        let last_row = self.cells.keys().map(|r| r.row).max()?;
        let last_col = self.cells.keys().map(|r| r.col).max()?;
        Some(CellRange {
            first: CellRef::new(0, 0),
            last: CellRef::new(last_row, last_col),
        })
    }

    /// Number of columns in use.
    pub fn column_count(&self) -> u32 {
        self.cells.keys().map(|r| r.col + 1).max().unwrap_or(0)
    }

    /// Moves every cell down by `rows`.
    fn shift_down(&mut self, rows: u32) {
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .map(|(at, cell)| (CellRef::new(at.row + rows, at.col), cell))
            .collect();
    }
}

/// Builds the unstyled data table: header row, then one row per column.
pub fn data_table(table: &TableDocumentation) -> Vec<Vec<CellValue>> {
    let mut rows = Vec::with_capacity(table.columns.len() + 1);
    rows.push(HEADER.iter().map(|&h| CellValue::from(h)).collect());

    for column in &table.columns {
        rows.push(vec![
            CellValue::Integer(i64::from(column.position)),
            CellValue::Text(column.name.clone()),
            CellValue::Text(column.comment.clone()),
            CellValue::Boolean(column.is_nullable),
            CellValue::Text(column.type_name.clone()),
            column
                .max_length
                .map_or(CellValue::Empty, |length| CellValue::Integer(i64::from(length))),
            CellValue::Text(column.key_flag()),
        ]);
    }

    rows
}

/// Lays out one documentation sheet.
///
/// Row indexes below are zero-based: the title block takes rows 0 and 1,
/// the header lands on row 2 and column rows start at row 3.
pub fn apply_document_layout(
    sheet_name: &str,
    table_name: &str,
    rows: Vec<Vec<CellValue>>,
) -> Sheet {
    let mut sheet = Sheet::new(sheet_name);

    for (row, values) in (0u32..).zip(rows) {
        for (col, value) in (0u32..).zip(values) {
            sheet.set_value(row, col, value);
        }
    }

    // Shift first so every index below refers to the final layout
    sheet.shift_down(TITLE_ROWS);

    let last_col = HEADER.len() as u32 - 1;

    sheet.set_value(0, 0, "Table Name".into());
    sheet.update_style(0, 0, |s| {
        s.with_font(FontStyle::Bold)
            .with_horizontal(HorizontalAlignment::Left)
            .with_vertical(VerticalAlignment::Center)
    });
    sheet.set_value(0, 1, table_name.into());
    sheet.update_style(0, 1, |s| {
        s.with_horizontal(HorizontalAlignment::Left)
            .with_vertical(VerticalAlignment::Center)
    });
    sheet.merged_ranges.push(CellRange {
        first: CellRef::new(0, 1),
        last: CellRef::new(0, last_col),
    });

    sheet.set_value(1, 0, "Description".into());
    sheet.update_style(1, 0, |s| {
        s.with_font(FontStyle::Italic)
            .with_horizontal(HorizontalAlignment::Left)
            .with_vertical(VerticalAlignment::Center)
    });
    sheet.update_style(1, 1, |s| {
        s.with_horizontal(HorizontalAlignment::Left)
            .with_vertical(VerticalAlignment::Top)
            .with_wrap_text()
    });
    sheet.merged_ranges.push(CellRange {
        first: CellRef::new(1, 1),
        last: CellRef::new(1, last_col),
    });

    let header_row = TITLE_ROWS;
    let last_row = sheet
        .cells
        .keys()
        .map(|r| r.row)
        .max()
        .unwrap_or(header_row);
    let used_cols = sheet.column_count();

    for col in 0..used_cols {
        sheet.update_style(header_row, col, |s| {
            s.with_font(FontStyle::Bold)
                .with_horizontal(HorizontalAlignment::Center)
                .with_vertical(VerticalAlignment::Center)
                .with_border(Border::Thin)
        });
    }

    for row in header_row + 1..=last_row {
        for col in 0..used_cols {
            sheet.update_style(row, col, |s| {
                s.with_vertical(VerticalAlignment::Center)
                    .with_border(Border::Thin)
            });
        }
    }

    sheet.column_widths = (0..sheet.column_count())
        .map(|col| {
            let longest = sheet
                .cells
                .iter()
                .filter(|(at, _)| at.col == col)
                .map(|(_, cell)| cell.value.display_len())
                .max()
                .unwrap_or(0);
            column_width(longest)
        })
        .collect();

    // Covered cells of the merged ranges get the border too
    for row in 0..TITLE_ROWS {
        for col in 0..=last_col {
            sheet.update_style(row, col, |s| s.with_border(Border::Thin));
        }
    }

    sheet
}

/// Builds the complete sheet for one table.
///
/// # Errors
/// Returns [`RenderError::InvalidSheetName`] if the table name contains a
/// character sheet names cannot hold.
pub fn build_sheet(table: &TableDocumentation) -> Result<Sheet, RenderError> {
    let name = sheet_name(&table.name)?;
    Ok(apply_document_layout(&name, &table.name, data_table(table)))
}

/// Derives the sheet name for a table: the first 31 characters of its
/// name.
///
/// # Errors
/// Returns [`RenderError::InvalidSheetName`] for empty names and names
/// containing `[ ] : * ? / \` or control characters.
pub fn sheet_name(table_name: &str) -> Result<String, RenderError> {
    if table_name.is_empty() {
        return Err(RenderError::InvalidSheetName {
            table: table_name.to_string(),
            reason: "sheet names cannot be empty".to_string(),
        });
    }

    if let Some(c) = table_name
        .chars()
        .find(|c| FORBIDDEN_SHEET_NAME_CHARS.contains(c))
    {
        return Err(RenderError::InvalidSheetName {
            table: table_name.to_string(),
            reason: format!("'{}' is not allowed in sheet names", c),
        });
    }

    if table_name.chars().any(char::is_control) {
        return Err(RenderError::InvalidSheetName {
            table: table_name.escape_debug().to_string(),
            reason: "control characters are not allowed in sheet names".to_string(),
        });
    }

    Ok(table_name.chars().take(MAX_SHEET_NAME_CHARS).collect())
}

/// Column width for a column whose longest rendered value has `longest`
/// characters.
pub fn column_width(longest: usize) -> u32 {
    let padded = u32::try_from(longest).unwrap_or(u32::MAX).saturating_add(2);
    padded.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

/// Spreadsheet column letters for a zero-based index: 0 is `A`, 26 is
/// `AA`.
pub fn column_letters(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
