//! Cell styles and their interning into the workbook style table.

use std::collections::HashMap;

/// Font weight/posture used by the documentation sheets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    Left,
    Center,
}

impl HorizontalAlignment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    Top,
    Center,
}

impl VerticalAlignment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
        }
    }
}

/// Cell alignment. `None` leaves the spreadsheet default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Alignment {
    pub horizontal: Option<HorizontalAlignment>,
    pub vertical: Option<VerticalAlignment>,
    pub wrap_text: bool,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Border applied on all four sides of a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Border {
    #[default]
    None,
    Thin,
}

/// Complete visual style of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellStyle {
    pub font: FontStyle,
    pub alignment: Alignment,
    pub border: Border,
}

impl CellStyle {
    pub fn with_font(mut self, font: FontStyle) -> Self {
        self.font = font;
        self
    }

    pub fn with_horizontal(mut self, horizontal: HorizontalAlignment) -> Self {
        self.alignment.horizontal = Some(horizontal);
        self
    }

    pub fn with_vertical(mut self, vertical: VerticalAlignment) -> Self {
        self.alignment.vertical = Some(vertical);
        self
    }

    pub fn with_wrap_text(mut self) -> Self {
        self.alignment.wrap_text = true;
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }
}

/// Resolved `cellXfs` entry: font and border indexes plus alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFormat {
    pub font_id: usize,
    pub border_id: usize,
    pub alignment: Alignment,
}

/// Workbook-wide style table.
///
/// Fonts, borders and cell formats are each deduplicated, so identical
/// styles share one index no matter how many cells use them. Index 0 of
/// every list is the unstyled default.
#[derive(Debug, Clone)]
pub struct StyleTable {
    fonts: Vec<FontStyle>,
    borders: Vec<Border>,
    formats: Vec<CellFormat>,
    format_ids: HashMap<CellStyle, usize>,
}

impl Default for StyleTable {
    fn default() -> Self {
        let default_style = CellStyle::default();
        Self {
            fonts: vec![default_style.font],
            borders: vec![default_style.border],
            formats: vec![CellFormat {
                font_id: 0,
                border_id: 0,
                alignment: default_style.alignment,
            }],
            format_ids: HashMap::from([(default_style, 0)]),
        }
    }
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `cellXfs` index for `style`, adding it on first use.
    pub fn intern(&mut self, style: CellStyle) -> usize {
        if let Some(&id) = self.format_ids.get(&style) {
            return id;
        }

        let format = CellFormat {
            font_id: intern_value(&mut self.fonts, style.font),
            border_id: intern_value(&mut self.borders, style.border),
            alignment: style.alignment,
        };
        let id = self.formats.len();
        self.formats.push(format);
        self.format_ids.insert(style, id);
        id
    }

    pub fn fonts(&self) -> &[FontStyle] {
        &self.fonts
    }

    pub fn borders(&self) -> &[Border] {
        &self.borders
    }

    pub fn formats(&self) -> &[CellFormat] {
        &self.formats
    }
}

fn intern_value<T: PartialEq + Copy>(values: &mut Vec<T>, value: T) -> usize {
    match values.iter().position(|v| *v == value) {
        Some(index) => index,
        None => {
            values.push(value);
            values.len() - 1
        }
    }
}
