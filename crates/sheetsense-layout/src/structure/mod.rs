//! Table structure
//!
//! Structure is built in two passes. The first infers a [`TableStructure`]
//! (header and footer rows, header shape, row group and merged-group
//! declarations) either heuristically or, for large tables, by asking the
//! oracle. The second, [`assemble`], is deterministic: it partitions the
//! table's cells by row and materialises the declarations as a
//! [`RowGroupForest`].

pub mod heuristic;
pub mod oracle;

use ahash::AHashSet;
use sheetsense_core::Region;
use sheetsense_oracle::Oracle;

use crate::block::{ColumnGroup, HeaderShape, SectionColumns, TableBlock};
use crate::options::{AnalyzerOptions, ParentSelection};
use crate::row_group::{RowGroup, RowGroupForest, RowSpan};

/// Where a [`TableStructure`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructureSource {
    #[default]
    Heuristic,
    Oracle,
}

/// A label row and the rows it governs
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDecl {
    pub label_row: u32,
    pub label: String,
    /// First governed row
    pub start_row: u32,
    /// Last governed row; below `start_row` when the group governs nothing
    pub end_row: u32,
    /// Nested declarations
    pub children: Vec<GroupDecl>,
}

impl GroupDecl {
    pub fn new<S: Into<String>>(label_row: u32, label: S, start_row: u32, end_row: u32) -> Self {
        Self {
            label_row,
            label: label.into(),
            start_row,
            end_row,
            children: Vec::new(),
        }
    }

    /// Rows covered, label row included
    pub fn extent(&self) -> RowSpan {
        RowSpan::new(
            self.label_row.min(self.start_row),
            self.end_row.max(self.label_row),
        )
    }
}

/// A vertical merge that groups body rows
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGroupDecl {
    pub column: u32,
    pub start_row: u32,
    pub end_row: u32,
    pub label: String,
}

impl MergedGroupDecl {
    pub fn rows(&self) -> RowSpan {
        RowSpan::new(self.start_row, self.end_row)
    }
}

/// Output of the first pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableStructure {
    pub header_rows: Vec<u32>,
    pub header_shape: HeaderShape,
    pub column_groups: Vec<ColumnGroup>,
    pub footer_rows: Vec<u32>,
    /// Column holding row group labels
    pub label_column: Option<u32>,
    pub row_groups: Vec<GroupDecl>,
    /// Columns whose vertical merges group body rows
    pub merged_group_columns: Vec<u32>,
    pub merged_groups: Vec<MergedGroupDecl>,
    /// Column limits per section, from an oracle table schema
    pub section_columns: SectionColumns,
    pub source: StructureSource,
}

impl TableStructure {
    /// A structure with only header rows
    pub fn with_header(header_rows: Vec<u32>) -> Self {
        Self {
            header_rows,
            ..Self::default()
        }
    }

    /// Set the footer rows
    pub fn with_footer(mut self, footer_rows: Vec<u32>) -> Self {
        self.footer_rows = footer_rows;
        self
    }
}

/// Run both passes over a detected table
///
/// `region` must cover `detected.bounds`. The oracle is consulted only for
/// tables above the configured size and falls back to the heuristic when
/// it fails or answers something unusable.
pub fn build_table(
    region: &Region<'_>,
    detected: &TableBlock,
    oracle: Option<&dyn Oracle>,
    options: &AnalyzerOptions,
) -> TableBlock {
    let opts = &options.structure;
    let large = region.non_empty_cells().len() > opts.oracle_cell_threshold;

    let mut structure = match oracle {
        Some(oracle) if large && opts.use_oracle => {
            match oracle::infer(region, detected, oracle, opts) {
                Some(structure) => structure,
                None => {
                    tracing::debug!(table = %region.range(), "falling back to heuristic structure");
                    heuristic::infer(region, detected, opts)
                }
            }
        }
        _ => heuristic::infer(region, detected, opts),
    };
    if structure.section_columns.is_unrestricted() {
        structure.section_columns = detected.section_columns.clone();
    }

    let mut table = assemble(region, &structure, options);
    if let Some(title) = detected.title() {
        table.set_title_once(title);
    }
    table
}

/// Second pass: partition cells and materialise row groups
pub fn assemble(region: &Region<'_>, structure: &TableStructure, options: &AnalyzerOptions) -> TableBlock {
    let header: AHashSet<u32> = structure.header_rows.iter().copied().collect();
    let footer: AHashSet<u32> = structure.footer_rows.iter().copied().collect();

    let mut table = TableBlock::new(region.range());
    table.header_rows = sorted(&structure.header_rows);
    table.footer_rows = sorted(&structure.footer_rows);
    table.header_shape = structure.header_shape;
    table.column_groups = structure.column_groups.clone();
    table.section_columns = structure.section_columns.clone();
    let columns = &structure.section_columns;

    for cell in region.cells() {
        let (row, col) = (cell.row(), cell.col());
        if header.contains(&row) {
            if !columns.header_allows(col) {
                continue;
            }
            table.heading_cells.push(cell.clone());
        } else if footer.contains(&row) {
            if !columns.footer_allows(col) {
                continue;
            }
            table.footer_cells.push(cell.clone());
        } else {
            if !columns.body_allows(col) {
                continue;
            }
            table.data_cells.push(cell.clone());
        }
        table.cells.push(cell.clone());
    }

    let mut forest = RowGroupForest::new();
    for decl in &structure.row_groups {
        insert_declared(&mut forest, None, decl, region, structure.label_column);
    }
    for decl in &structure.merged_groups {
        insert_merged(&mut forest, decl, region, options.structure.parent_selection);
    }
    assign_data_rows(&mut forest, region, &header, &footer, columns);
    table.row_groups = forest;
    table
}

fn sorted(rows: &[u32]) -> Vec<u32> {
    let mut rows = rows.to_vec();
    rows.sort_unstable();
    rows.dedup();
    rows
}

fn insert_declared(
    forest: &mut RowGroupForest,
    parent: Option<usize>,
    decl: &GroupDecl,
    region: &Region<'_>,
    label_column: Option<u32>,
) {
    let label_cell = label_column
        .and_then(|col| region.filled_at(decl.label_row, col))
        .or_else(|| region.row_values(decl.label_row).into_iter().next())
        .cloned();
    let group = RowGroup::new(decl.label.clone(), decl.extent())
        .with_label_row(decl.label_row)
        .with_label_cell(label_cell);

    let inserted = match parent {
        Some(parent) => forest.add_child(parent, group),
        None => forest.add_root(group),
    };
    match inserted {
        Some(index) => {
            for child in &decl.children {
                insert_declared(forest, Some(index), child, region, label_column);
            }
        }
        None => tracing::debug!(
            label = %decl.label,
            label_row = decl.label_row,
            "discarding row group that does not nest"
        ),
    }
}

fn insert_merged(
    forest: &mut RowGroupForest,
    decl: &MergedGroupDecl,
    region: &Region<'_>,
    selection: ParentSelection,
) {
    let rows = decl.rows();
    let parent = match selection {
        ParentSelection::FirstMatch => forest
            .roots()
            .iter()
            .copied()
            .find(|r| forest.get(*r).is_some_and(|g| g.rows.contains(rows.start))),
        ParentSelection::TightestFit => forest.tightest_enclosing(&rows),
    };
    let Some(parent) = parent else {
        tracing::debug!(label = %decl.label, column = decl.column, "merged group has no parent row group");
        return;
    };

    let group = RowGroup::new(decl.label.clone(), rows)
        .with_label_cell(region.cell_at(decl.start_row, decl.column).cloned());
    if forest.add_child(parent, group).is_none() {
        tracing::debug!(
            label = %decl.label,
            column = decl.column,
            "discarding merged group that does not nest in its parent"
        );
    }
}

/// Give every body row to the innermost group covering it
fn assign_data_rows(
    forest: &mut RowGroupForest,
    region: &Region<'_>,
    header: &AHashSet<u32>,
    footer: &AHashSet<u32>,
    columns: &SectionColumns,
) {
    let label_rows: AHashSet<u32> = forest.groups().iter().filter_map(|g| g.label_row).collect();
    for row in region.min_row()..=region.max_row() {
        if header.contains(&row) || footer.contains(&row) || label_rows.contains(&row) {
            continue;
        }
        let Some(index) = forest.innermost_containing(row) else {
            continue;
        };
        let cells: Vec<_> = region
            .row_values(row)
            .into_iter()
            .filter(|c| columns.body_allows(c.col()))
            .cloned()
            .collect();
        if let Some(group) = forest.get_mut(index) {
            group.data_rows.extend(cells);
        }
    }
}
