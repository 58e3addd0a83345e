//! Cell value object and formatting flags

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::address::CellAddress;

/// Shared handle to a cell owned by a [`Grid`](crate::Grid)
///
/// Regions, blocks and row groups all hold clones of the same handle, so a
/// cell keeps its identity from the grid through to the final chunk list.
pub type SharedCell = Arc<Cell>;

/// Formatting flags that matter for layout analysis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellFormat {
    /// Bold
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    /// Italic
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    /// Any underline style
    #[serde(skip_serializing_if = "is_false")]
    pub underline: bool,
    /// Strikethrough
    #[serde(skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    /// Subscript
    #[serde(skip_serializing_if = "is_false")]
    pub subscript: bool,
    /// Superscript
    #[serde(skip_serializing_if = "is_false")]
    pub superscript: bool,
    /// Font size in points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Font family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    /// Font color (`#RRGGBB` or `theme:N`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    /// Background fill color (`#RRGGBB` or `theme:N`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl CellFormat {
    /// Create default (unformatted) flags
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bold
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Set italic
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// Set underline
    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    /// Set font size
    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Set font name
    pub fn with_font_name<S: Into<String>>(mut self, name: S) -> Self {
        self.font_name = Some(name.into());
        self
    }

    /// Set font color
    pub fn with_font_color<S: Into<String>>(mut self, color: S) -> Self {
        self.font_color = Some(color.into());
        self
    }

    /// Set background fill color
    pub fn with_background<S: Into<String>>(mut self, color: S) -> Self {
        self.background_color = Some(color.into());
        self
    }
}

/// A single cell of the used range
///
/// `value` is the best-effort display value supplied by the reader: the
/// computed result for formulas when available, else the cached result,
/// else the raw formula text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell coordinate
    pub address: CellAddress,
    /// Display value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Raw formula text, if the cell holds a formula
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Formatting flags
    #[serde(flatten)]
    pub format: CellFormat,
    /// Top-left cell of the merge range covering this cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_with: Option<CellAddress>,
    /// Allowed values from a list validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Vec<String>>,
}

impl Cell {
    /// Create a cell holding a value
    pub fn new<S: Into<String>>(address: CellAddress, value: S) -> Self {
        let value = value.into();
        Self {
            address,
            value: if value.is_empty() { None } else { Some(value) },
            formula: None,
            format: CellFormat::default(),
            merged_with: None,
            validation: None,
        }
    }

    /// Create an empty cell
    pub fn empty(address: CellAddress) -> Self {
        Self {
            address,
            value: None,
            formula: None,
            format: CellFormat::default(),
            merged_with: None,
            validation: None,
        }
    }

    /// Set the formula text
    pub fn with_formula<S: Into<String>>(mut self, formula: S) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Set the formatting flags
    pub fn with_format(mut self, format: CellFormat) -> Self {
        self.format = format;
        self
    }

    /// Shorthand for a bold cell
    pub fn bold(mut self) -> Self {
        self.format.bold = true;
        self
    }

    /// Set the merge anchor
    pub fn with_merge(mut self, anchor: CellAddress) -> Self {
        self.merged_with = Some(anchor);
        self
    }

    /// Set list validation choices
    pub fn with_validation(mut self, choices: Vec<String>) -> Self {
        self.validation = Some(choices);
        self
    }

    /// Row number (1-based)
    pub fn row(&self) -> u32 {
        self.address.row
    }

    /// Column number (1-based)
    pub fn col(&self) -> u32 {
        self.address.col
    }

    /// Whether the cell carries a non-empty value
    pub fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// The display value, or an empty string
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// Whether the cell holds a formula
    pub fn has_formula(&self) -> bool {
        self.formula.as_deref().is_some_and(|f| !f.is_empty())
    }

    /// Whether the cell is bold
    pub fn is_bold(&self) -> bool {
        self.format.bold
    }

    /// Whether the cell has a background fill
    pub fn has_fill(&self) -> bool {
        self.format.background_color.is_some()
    }

    /// Whether the cell is part of a merge range (anchor included)
    pub fn is_merged(&self) -> bool {
        self.merged_with.is_some()
    }

    /// Whitespace-separated word count of the display value
    pub fn word_count(&self) -> usize {
        self.text().split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_string_is_no_value() {
        let cell = Cell::new(CellAddress::new(1, 1), "");
        assert!(!cell.has_value());
        assert_eq!(cell.value, None);
        assert_eq!(cell.text(), "");
    }

    #[test]
    fn test_builders() {
        let anchor = CellAddress::new(1, 1);
        let cell = Cell::new(CellAddress::new(1, 2), "Revenue")
            .bold()
            .with_merge(anchor)
            .with_format(CellFormat::new().with_bold(true).with_background("#FFFF00"));

        assert!(cell.is_bold());
        assert!(cell.has_fill());
        assert!(cell.is_merged());
        assert_eq!(cell.word_count(), 1);
    }

    #[test]
    fn test_deserialize_flattened_format() {
        let json = r##"{"address":"B3","value":"Total","bold":true,"font_size":14.0,"background_color":"#DDDDDD"}"##;
        let cell: Cell = serde_json::from_str(json).unwrap();

        assert_eq!(cell.address, CellAddress::new(3, 2));
        assert_eq!(cell.text(), "Total");
        assert!(cell.format.bold);
        assert_eq!(cell.format.font_size, Some(14.0));
        assert!(cell.has_fill());
        assert!(!cell.has_formula());
    }
}
