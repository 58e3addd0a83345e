//! Table detection
//!
//! The table detector is the chain's fallback: anything with a few rows of
//! values spread over several columns is a table. Its job here is only to
//! find the header rows; the structure builder refines footers and row
//! groups afterwards.

use ahash::AHashSet;
use serde::Deserialize;
use sheetsense_core::{CellAddress, CellRange, Region};
use sheetsense_oracle::{Oracle, OracleTask};

use super::content::{row_is_emphasised, CellKind};
use super::{ask_about_region, Detection, Detector};
use crate::block::{Block, BlockKind, SectionColumns};
use crate::options::{AnalyzerOptions, TableOptions};
use crate::structure::{assemble, TableStructure};

/// Detects tabular regions
#[derive(Debug, Clone, Copy, Default)]
pub struct TableDetector;

#[derive(Debug, Deserialize)]
struct TableReply {
    #[serde(default)]
    is_table: bool,
    #[serde(default)]
    tables: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    top_left: String,
    bottom_right: String,
    #[serde(default)]
    header_rows: Vec<u32>,
    #[serde(default)]
    header_columns: Vec<String>,
    #[serde(default)]
    footer_rows: Vec<u32>,
    #[serde(default)]
    footer_columns: Vec<String>,
    #[serde(default)]
    body_rows: Vec<u32>,
    #[serde(default)]
    body_columns: Vec<String>,
}

impl Detector for TableDetector {
    fn kind(&self) -> BlockKind {
        BlockKind::Table
    }

    fn detect(&self, region: &Region<'_>, options: &AnalyzerOptions) -> Detection {
        let opts = &options.table;
        if region.num_rows() < opts.min_rows || region.num_cols() < opts.min_cols {
            return Detection::NoMatch;
        }
        if region.non_empty_cells().len() < opts.min_cells {
            return Detection::NoMatch;
        }
        let columns = region.occupied_columns();
        if columns.len() < 2 {
            return Detection::NoMatch;
        }

        let mut header_rows = Vec::new();
        let mut body_rows = Vec::new();
        for row in region.occupied_rows() {
            if body_rows.is_empty() && row_is_emphasised(region, row) {
                header_rows.push(row);
            } else {
                body_rows.push(row);
            }
        }
        if body_rows.is_empty() {
            return Detection::NoMatch;
        }

        if header_rows.is_empty() && first_row_looks_like_header(region, &columns, opts) {
            header_rows.push(body_rows.remove(0));
            if body_rows.is_empty() {
                return Detection::NoMatch;
            }
        }

        let structure = TableStructure::with_header(header_rows);
        Detection::Match(Block::Table(assemble(region, &structure, options)))
    }

    fn detect_with_oracle(
        &self,
        region: &Region<'_>,
        oracle: &dyn Oracle,
        options: &AnalyzerOptions,
    ) -> Detection {
        let reply: TableReply = match ask_about_region(region, oracle, OracleTask::DetectTable) {
            Ok(reply) => reply,
            Err(recovered) => return recovered,
        };
        if !reply.is_table {
            return Detection::NoMatch;
        }

        for value in reply.tables {
            let schema: TableSchema = match serde_json::from_value(value) {
                Ok(schema) => schema,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unparseable table schema");
                    continue;
                }
            };
            match validate_schema(&schema, region.range()) {
                Some(bounds) => {
                    let Some(table_region) = region.sub_region(bounds) else {
                        continue;
                    };
                    let mut structure = TableStructure::with_header(schema.header_rows.clone())
                        .with_footer(schema.footer_rows.clone());
                    structure.section_columns = SectionColumns {
                        header: column_numbers(&schema.header_columns),
                        body: column_numbers(&schema.body_columns),
                        footer: column_numbers(&schema.footer_columns),
                    };
                    return Detection::Match(Block::Table(assemble(&table_region, &structure, options)));
                }
                None => {
                    tracing::debug!(
                        region = %region.range(),
                        top_left = %schema.top_left,
                        bottom_right = %schema.bottom_right,
                        "discarding out-of-bounds table schema"
                    );
                }
            }
        }
        Detection::Recovered("no table schema in the reply fit the region".to_string())
    }
}

/// Content test for a header when no row is emphasised
///
/// The first row is a header when a text cell sits above a mostly numeric
/// column, or when too few columns have a first-row cell of the same coarse
/// type as the majority of the body below it.
fn first_row_looks_like_header(region: &Region<'_>, columns: &[u32], opts: &TableOptions) -> bool {
    let first = region.min_row();
    if first >= region.max_row() {
        return true;
    }

    let mut matches = 0usize;
    for col in columns {
        let head = CellKind::of(region.cell_at(first, *col).map(|c| c.as_ref()));
        let body: Vec<CellKind> = (first + 1..=region.max_row())
            .filter_map(|r| region.filled_at(r, *col))
            .map(|c| CellKind::of(Some(c)))
            .collect();
        if body.is_empty() {
            continue;
        }

        let numeric = body.iter().filter(|k| **k == CellKind::Numeric).count();
        if head == CellKind::Text && numeric as f64 / body.len() as f64 >= opts.numeric_body_ratio {
            return true;
        }
        if majority(&body) == Some(head) {
            matches += 1;
        }
    }

    (matches as f64) < columns.len() as f64 * opts.majority_match_ratio
}

/// Most frequent kind; ties go to the kind seen first
fn majority(kinds: &[CellKind]) -> Option<CellKind> {
    let mut counts: Vec<(CellKind, usize)> = Vec::new();
    for kind in kinds {
        match counts.iter_mut().find(|(k, _)| k == kind) {
            Some((_, n)) => *n += 1,
            None => counts.push((*kind, 1)),
        }
    }
    let best = counts.iter().map(|(_, n)| *n).max()?;
    counts.into_iter().find(|(_, n)| *n == best).map(|(k, _)| k)
}

fn column_numbers(letters: &[String]) -> Vec<u32> {
    let mut cols: Vec<u32> = letters
        .iter()
        .filter_map(|l| CellAddress::letters_to_column(l.trim()).ok())
        .collect();
    cols.sort_unstable();
    cols.dedup();
    cols
}

/// Check a proposed table against the region; returns its bounds when valid
fn validate_schema(schema: &TableSchema, region: CellRange) -> Option<CellRange> {
    let top_left = CellAddress::parse(&schema.top_left).ok()?;
    let bottom_right = CellAddress::parse(&schema.bottom_right).ok()?;
    if top_left.row > bottom_right.row || top_left.col > bottom_right.col {
        return None;
    }
    let bounds = CellRange::new(top_left, bottom_right);
    if !region.encloses(&bounds) {
        return None;
    }

    let mut seen = AHashSet::new();
    let rows = schema
        .header_rows
        .iter()
        .chain(&schema.body_rows)
        .chain(&schema.footer_rows);
    for row in rows {
        if *row < bounds.min_row() || *row > bounds.max_row() || !seen.insert(*row) {
            return None;
        }
    }

    let columns = schema
        .header_columns
        .iter()
        .chain(&schema.body_columns)
        .chain(&schema.footer_columns);
    for letters in columns {
        let col = CellAddress::letters_to_column(letters.trim()).ok()?;
        if col < bounds.min_col() || col > bounds.max_col() {
            return None;
        }
    }
    Some(bounds)
}
