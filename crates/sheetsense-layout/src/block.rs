//! Classified blocks and chunks

use std::fmt;

use serde::{Deserialize, Serialize};

use sheetsense_core::{CellRange, ChartData, SharedCell};

use crate::row_group::RowGroupForest;

/// Tag of a [`Block`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    Table,
    KeyValue,
    Text,
    Chart,
    Image,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockKind::Heading => "heading",
            BlockKind::Table => "table",
            BlockKind::KeyValue => "key_value",
            BlockKind::Text => "text",
            BlockKind::Chart => "chart",
            BlockKind::Image => "image",
        })
    }
}

/// A classified region of a sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "block_type", rename_all = "snake_case")]
pub enum Block {
    Heading(HeadingBlock),
    Table(TableBlock),
    KeyValue(KeyValueBlock),
    Text(TextBlock),
    Chart(ChartBlock),
    Image(ImageBlock),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Heading(_) => BlockKind::Heading,
            Block::Table(_) => BlockKind::Table,
            Block::KeyValue(_) => BlockKind::KeyValue,
            Block::Text(_) => BlockKind::Text,
            Block::Chart(_) => BlockKind::Chart,
            Block::Image(_) => BlockKind::Image,
        }
    }

    /// Bounding rectangle
    pub fn bounds(&self) -> CellRange {
        match self {
            Block::Heading(b) => b.bounds,
            Block::Table(b) => b.bounds,
            Block::KeyValue(b) => b.bounds,
            Block::Text(b) => b.bounds,
            Block::Chart(b) => b.bounds,
            Block::Image(b) => b.bounds,
        }
    }

    /// Every cell the block was built from
    pub fn cells(&self) -> &[SharedCell] {
        match self {
            Block::Heading(b) => &b.cells,
            Block::Table(b) => &b.cells,
            Block::KeyValue(b) => &b.cells,
            Block::Text(b) => &b.cells,
            Block::Chart(b) => &b.cells,
            Block::Image(b) => &b.cells,
        }
    }

    /// Top-left corner, used for reading order
    pub fn reading_position(&self) -> (u32, u32) {
        let bounds = self.bounds();
        (bounds.min_row(), bounds.min_col())
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Block::Heading(_))
    }

    pub fn as_heading(&self) -> Option<&HeadingBlock> {
        match self {
            Block::Heading(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableBlock> {
        match self {
            Block::Table(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_key_value(&self) -> Option<&KeyValueBlock> {
        match self {
            Block::KeyValue(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Block::Text(b) => Some(b),
            _ => None,
        }
    }
}

/// A title or section heading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadingBlock {
    pub bounds: CellRange,
    /// Distinct values, space-joined in reading order
    pub text: String,
    pub cells: Vec<SharedCell>,
}

/// Free text such as notes or disclaimers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub bounds: CellRange,
    /// Values joined by newlines in reading order
    pub text: String,
    pub cells: Vec<SharedCell>,
}

/// A key cell and its value cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValuePair {
    pub key: SharedCell,
    pub value: SharedCell,
}

impl KeyValuePair {
    pub fn key_text(&self) -> &str {
        self.key.text()
    }

    pub fn value_text(&self) -> &str {
        self.value.text()
    }
}

/// A form-like list of labels and values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValueBlock {
    pub bounds: CellRange,
    pub pairs: Vec<KeyValuePair>,
    pub cells: Vec<SharedCell>,
}

/// A chart anchored on the sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBlock {
    pub bounds: CellRange,
    pub chart: ChartData,
    /// Cells under the anchor, if any
    pub cells: Vec<SharedCell>,
}

/// A picture anchored on the sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageBlock {
    pub bounds: CellRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cells under the anchor, if any
    pub cells: Vec<SharedCell>,
}

/// Whether a table header is one row of labels or a parent/child hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderShape {
    #[default]
    Single,
    MultiLevel,
}

/// A parent header spanning several child columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnGroup {
    /// Merge range of the parent header
    pub parent: CellRange,
    pub label: String,
    /// Child column numbers
    pub children: Vec<u32>,
}

/// Columns each table section is limited to
///
/// An empty list leaves that section spanning every column of the table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SectionColumns {
    pub header: Vec<u32>,
    pub body: Vec<u32>,
    pub footer: Vec<u32>,
}

impl SectionColumns {
    /// Whether every section spans every column
    pub fn is_unrestricted(&self) -> bool {
        self.header.is_empty() && self.body.is_empty() && self.footer.is_empty()
    }

    pub fn header_allows(&self, col: u32) -> bool {
        allows(&self.header, col)
    }

    pub fn body_allows(&self, col: u32) -> bool {
        allows(&self.body, col)
    }

    pub fn footer_allows(&self, col: u32) -> bool {
        allows(&self.footer, col)
    }
}

fn allows(columns: &[u32], col: u32) -> bool {
    columns.is_empty() || columns.contains(&col)
}

/// A table with its header, body and footer partitions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBlock {
    pub bounds: CellRange,
    title: Option<String>,
    pub header_rows: Vec<u32>,
    pub footer_rows: Vec<u32>,
    pub header_shape: HeaderShape,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub column_groups: Vec<ColumnGroup>,
    #[serde(skip_serializing_if = "SectionColumns::is_unrestricted")]
    pub section_columns: SectionColumns,
    pub heading_cells: Vec<SharedCell>,
    pub data_cells: Vec<SharedCell>,
    pub footer_cells: Vec<SharedCell>,
    pub row_groups: RowGroupForest,
    pub cells: Vec<SharedCell>,
}

impl TableBlock {
    /// Create an untitled table with no structure beyond its bounds
    pub fn new(bounds: CellRange) -> Self {
        Self {
            bounds,
            title: None,
            header_rows: Vec::new(),
            footer_rows: Vec::new(),
            header_shape: HeaderShape::Single,
            column_groups: Vec::new(),
            section_columns: SectionColumns::default(),
            heading_cells: Vec::new(),
            data_cells: Vec::new(),
            footer_cells: Vec::new(),
            row_groups: RowGroupForest::new(),
            cells: Vec::new(),
        }
    }

    /// Title taken from the heading above the table, if any
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the title unless one is already present
    ///
    /// Returns whether the title was set.
    pub fn set_title_once<S: Into<String>>(&mut self, title: S) -> bool {
        if self.title.is_some() {
            return false;
        }
        self.title = Some(title.into());
        true
    }

    /// Body row numbers: every row that is neither header nor footer
    pub fn body_rows(&self) -> impl Iterator<Item = u32> + '_ {
        (self.bounds.min_row()..=self.bounds.max_row())
            .filter(|r| !self.header_rows.contains(r) && !self.footer_rows.contains(r))
    }
}

/// One heading with its content, or a standalone block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    blocks: Vec<Block>,
}

impl Chunk {
    pub(crate) fn single(block: Block) -> Self {
        Self {
            blocks: vec![block],
        }
    }

    pub(crate) fn pair(heading: Block, content: Block) -> Self {
        Self {
            blocks: vec![heading, content],
        }
    }

    /// Blocks in reading order (one or two)
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The heading, when the chunk pairs one with its content
    pub fn heading(&self) -> Option<&HeadingBlock> {
        match self.blocks.as_slice() {
            [heading, _] => heading.as_heading(),
            _ => None,
        }
    }

    /// The content block (the only block of a standalone chunk)
    pub fn content(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsense_core::{Cell, CellAddress};
    use std::sync::Arc;

    #[test]
    fn test_title_set_once() {
        let mut table = TableBlock::new(CellRange::parse("A3:B6").unwrap());
        assert_eq!(table.title(), None);
        assert!(table.set_title_once("Sales"));
        assert!(!table.set_title_once("Other"));
        assert_eq!(table.title(), Some("Sales"));
    }

    #[test]
    fn test_body_rows() {
        let mut table = TableBlock::new(CellRange::parse("A3:B8").unwrap());
        table.header_rows = vec![3];
        table.footer_rows = vec![8];
        assert_eq!(table.body_rows().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_serialize_tagged() {
        let cell = Arc::new(Cell::new(CellAddress::new(1, 1), "TITLE").bold());
        let block = Block::Heading(HeadingBlock {
            bounds: CellRange::parse("A1:D1").unwrap(),
            text: "TITLE".to_string(),
            cells: vec![cell],
        });
        let json = serde_json::to_value(&block).unwrap();

        assert_eq!(json["block_type"], "heading");
        assert_eq!(json["bounds"], "A1:D1");
        assert_eq!(json["text"], "TITLE");
        assert_eq!(json["cells"][0]["address"], "A1");
        assert_eq!(block.kind().to_string(), "heading");
        assert_eq!(block.reading_position(), (1, 1));
    }

    #[test]
    fn test_chunk_accessors() {
        let heading = Block::Heading(HeadingBlock {
            bounds: CellRange::parse("A1").unwrap(),
            text: "Q3".to_string(),
            cells: Vec::new(),
        });
        let table = Block::Table(TableBlock::new(CellRange::parse("A3:B6").unwrap()));

        let chunk = Chunk::pair(heading, table.clone());
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.heading().map(|h| h.text.as_str()), Some("Q3"));
        assert_eq!(chunk.content(), Some(&table));

        let single = Chunk::single(table);
        assert!(single.heading().is_none());
    }
}
