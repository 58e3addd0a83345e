//! Oracle structure inference for large tables
//!
//! Large tables are summarised rather than rendered in full: every header
//! row, an even sample of body rows, the all-bold rows, the last few rows
//! and the merge list. The reply is validated against the table before any
//! of it is used.

use std::fmt::Write as _;

use serde::Deserialize;
use sheetsense_core::{CellAddress, CellRange, Region};
use sheetsense_oracle::excerpt::compact_cell;
use sheetsense_oracle::{ask, describe_cell, Oracle, OracleReply, OracleRequest, OracleTask, SampleLimits};

use super::{GroupDecl, MergedGroupDecl, StructureSource, TableStructure};
use crate::block::{ColumnGroup, HeaderShape, SectionColumns, TableBlock};
use crate::row_group::RowSpan;
use crate::options::StructureOptions;

#[derive(Debug, Deserialize)]
struct StructureReply {
    #[serde(default)]
    header_rows: Vec<u32>,
    #[serde(default)]
    header_structure: Option<String>,
    #[serde(default)]
    column_groups: Vec<ColumnGroupReply>,
    #[serde(default)]
    footer_rows: Vec<u32>,
    #[serde(default)]
    row_group_label_column: Option<String>,
    #[serde(default)]
    row_groups: Vec<RowGroupReply>,
    #[serde(default)]
    merged_group_columns: Vec<String>,
    #[serde(default)]
    merged_groups: Vec<MergedGroupReply>,
}

#[derive(Debug, Deserialize)]
struct ColumnGroupReply {
    parent_range: String,
    #[serde(default)]
    parent_label: String,
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RowGroupReply {
    label_row: u32,
    #[serde(default)]
    label: String,
    start_row: u32,
    end_row: u32,
    #[serde(default)]
    children: Vec<RowGroupReply>,
}

#[derive(Debug, Deserialize)]
struct MergedGroupReply {
    column: String,
    start_row: u32,
    end_row: u32,
    #[serde(default)]
    label: String,
}

/// Ask the oracle for a table's structure
///
/// Returns `None` when the call fails, the reply is malformed, or its
/// header and footer rows do not fit the table.
pub fn infer(
    region: &Region<'_>,
    detected: &TableBlock,
    oracle: &dyn Oracle,
    options: &StructureOptions,
) -> Option<TableStructure> {
    let request = OracleRequest::new(OracleTask::TableStructure, summarize(region, detected, options));
    let reply: StructureReply = match ask(oracle, &request) {
        OracleReply::Answer(reply) => reply,
        OracleReply::Malformed(reason) => {
            tracing::debug!(table = %region.range(), %reason, "unusable table structure reply");
            return None;
        }
        OracleReply::Failed(_) => return None,
    };
    validate(reply, region.range())
}

/// Text summary of a table for the structure request
fn summarize(region: &Region<'_>, detected: &TableBlock, options: &StructureOptions) -> String {
    let limits = SampleLimits::default();
    let range = region.range();
    let rows = region.occupied_rows();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Table {} ({} rows x {} columns, {} non-empty cells)",
        range,
        range.row_count(),
        range.col_count(),
        region.non_empty_cells().len()
    );

    let header_rows: Vec<u32> = if detected.header_rows.is_empty() {
        rows.iter().copied().take(limits.header_rows).collect()
    } else {
        detected.header_rows.clone()
    };
    out.push_str("\n--- HEADER ROWS ---\n");
    for row in &header_rows {
        for cell in region.row_values(*row) {
            let _ = writeln!(out, "{}", describe_cell(cell));
        }
    }

    let body: Vec<u32> = rows.iter().copied().filter(|r| !header_rows.contains(r)).collect();

    let bold: Vec<u32> = body
        .iter()
        .copied()
        .filter(|r| region.row_values(*r).iter().all(|c| c.is_bold()))
        .collect();
    if !bold.is_empty() {
        out.push_str("\n--- BOLD ROWS ---\n");
        for row in &bold {
            write_row(&mut out, region, *row, limits.max_value_len);
        }
    }

    let sample = evenly_spaced(&body, options.sample_body_rows);
    let _ = writeln!(out, "\n--- SAMPLED BODY ROWS ({} of {}) ---", sample.len(), body.len());
    for row in &sample {
        write_row(&mut out, region, *row, limits.max_value_len);
    }

    out.push_str("\n--- LAST ROWS ---\n");
    let tail = body.len().saturating_sub(options.last_rows);
    for row in &body[tail..] {
        write_row(&mut out, region, *row, limits.max_value_len);
    }

    let merges = region.merges();
    if !merges.is_empty() {
        out.push_str("\n--- MERGED RANGES ---\n");
        for merge in merges {
            let _ = writeln!(out, "{}", merge);
        }
    }

    if out.len() > limits.max_chars {
        let mut end = limits.max_chars;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
        out.push_str("\n... (truncated)");
    }
    out
}

fn write_row(out: &mut String, region: &Region<'_>, row: u32, max_value_len: usize) {
    let cells: Vec<String> = region
        .row_values(row)
        .into_iter()
        .map(|c| compact_cell(c, max_value_len))
        .collect();
    let _ = writeln!(out, "row {}: {}", row, cells.join("  "));
}

/// Up to `n` items spread evenly, first and last included
fn evenly_spaced(rows: &[u32], n: usize) -> Vec<u32> {
    if rows.len() <= n {
        return rows.to_vec();
    }
    match n {
        0 => Vec::new(),
        1 => vec![rows[0]],
        _ => (0..n).map(|i| rows[i * (rows.len() - 1) / (n - 1)]).collect(),
    }
}

fn column_in(letters: &str, range: CellRange) -> Option<u32> {
    let col = CellAddress::letters_to_column(letters.trim()).ok()?;
    (range.min_col()..=range.max_col()).contains(&col).then_some(col)
}

fn validate(reply: StructureReply, range: CellRange) -> Option<TableStructure> {
    let in_table = |row: &u32| (range.min_row()..=range.max_row()).contains(row);
    if !reply.header_rows.iter().all(in_table) || !reply.footer_rows.iter().all(in_table) {
        tracing::debug!(table = %range, "structure reply places header or footer outside the table");
        return None;
    }
    if reply.header_rows.iter().any(|r| reply.footer_rows.contains(r)) {
        tracing::debug!(table = %range, "structure reply overlaps header and footer");
        return None;
    }

    let reserved: Vec<u32> = reply.header_rows.iter().chain(&reply.footer_rows).copied().collect();

    let column_groups: Vec<ColumnGroup> = reply
        .column_groups
        .into_iter()
        .filter_map(|g| {
            let parent = CellRange::parse(&g.parent_range).ok().filter(|p| range.encloses(p))?;
            let children = g
                .children
                .iter()
                .map(|c| column_in(c, parent))
                .collect::<Option<Vec<u32>>>()?;
            Some(ColumnGroup {
                parent,
                label: g.parent_label,
                children,
            })
        })
        .collect();

    let header_shape = match reply.header_structure.as_deref() {
        Some("multi_level") | Some("multi-level") => HeaderShape::MultiLevel,
        _ if !column_groups.is_empty() => HeaderShape::MultiLevel,
        _ => HeaderShape::Single,
    };

    let table_rows = RowSpan::new(range.min_row(), range.max_row());
    let row_groups = reply
        .row_groups
        .into_iter()
        .filter_map(|g| row_group(g, table_rows, &reserved))
        .collect();

    let merged_groups = reply
        .merged_groups
        .into_iter()
        .filter_map(|m| {
            let column = column_in(&m.column, range)?;
            let fits = m.start_row <= m.end_row
                && in_table(&m.start_row)
                && in_table(&m.end_row)
                && !(m.start_row..=m.end_row).any(|r| reserved.contains(&r));
            if !fits {
                tracing::debug!(label = %m.label, "dropping merged group outside the table body");
                return None;
            }
            Some(MergedGroupDecl {
                column,
                start_row: m.start_row,
                end_row: m.end_row,
                label: m.label,
            })
        })
        .collect();

    Some(TableStructure {
        header_rows: reply.header_rows,
        header_shape,
        column_groups,
        footer_rows: reply.footer_rows,
        label_column: reply
            .row_group_label_column
            .as_deref()
            .and_then(|c| column_in(c, range)),
        row_groups,
        merged_group_columns: reply
            .merged_group_columns
            .iter()
            .filter_map(|c| column_in(c, range))
            .collect(),
        merged_groups,
        section_columns: SectionColumns::default(),
        source: StructureSource::Oracle,
    })
}

/// Validate a declared row group and its children
///
/// The group's extent (label row included) must lie inside `within` and
/// must not touch a header or footer row. Children are checked against
/// their parent's extent.
fn row_group(reply: RowGroupReply, within: RowSpan, reserved: &[u32]) -> Option<GroupDecl> {
    let fits = reply.start_row <= reply.end_row
        && within.contains(reply.label_row)
        && within.contains(reply.start_row)
        && within.contains(reply.end_row);
    let decl = GroupDecl::new(reply.label_row, reply.label, reply.start_row, reply.end_row);
    let extent = decl.extent();
    if !fits || extent.rows().any(|r| reserved.contains(&r)) {
        tracing::debug!(
            label = %decl.label,
            label_row = decl.label_row,
            start_row = decl.start_row,
            end_row = decl.end_row,
            "dropping invalid row group"
        );
        return None;
    }
    let children = reply
        .children
        .into_iter()
        .filter_map(|c| row_group(c, extent, reserved))
        .collect();
    Some(GroupDecl { children, ..decl })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::test_support::grid_at;
    use crate::options::AnalyzerOptions;
    use crate::structure::{assemble, build_table};
    use pretty_assertions::assert_eq;
    use sheetsense_core::Grid;
    use sheetsense_oracle::{OracleError, OracleResult};
    use std::cell::RefCell;

    fn sheet() -> Grid {
        grid_at(
            1,
            1,
            &[
                &["Item", "Q1", "Q2"],
                &["North", "", ""],
                &["Bolts", "1", "2"],
                &["Nuts", "3", "4"],
                &["South", "", ""],
                &["Bolts", "5", "6"],
                &["Total", "9", "12"],
            ],
            |c| match c.row() {
                1 | 2 | 5 => c.bold(),
                _ => c,
            },
        )
    }

    fn detected(region: &Region<'_>) -> TableBlock {
        assemble(region, &TableStructure::with_header(vec![1]), &AnalyzerOptions::default())
    }

    #[test]
    fn test_reply_becomes_structure() {
        let grid = sheet();
        let region = grid.region(grid.bounds().unwrap());
        let oracle = |_: &OracleRequest| -> OracleResult<String> {
            Ok(r#"{"header_rows": [1], "header_structure": "single", "footer_rows": [7],
                   "row_group_label_column": "A",
                   "row_groups": [
                       {"label_row": 2, "label": "North", "start_row": 3, "end_row": 4},
                       {"label_row": 5, "label": "South", "start_row": 6, "end_row": 6},
                       {"label_row": 7, "label": "Bad", "start_row": 8, "end_row": 9}
                   ],
                   "merged_groups": [{"column": "Z", "start_row": 3, "end_row": 4, "label": "x"}]}"#
                .into())
        };

        let structure = infer(&region, &detected(&region), &oracle, &StructureOptions::default()).unwrap();
        assert_eq!(structure.source, StructureSource::Oracle);
        assert_eq!(structure.footer_rows, vec![7]);
        assert_eq!(structure.label_column, Some(1));
        assert_eq!(
            structure.row_groups,
            vec![GroupDecl::new(2, "North", 3, 4), GroupDecl::new(5, "South", 6, 6)]
        );
        assert!(structure.merged_groups.is_empty());
    }

    #[test]
    fn test_row_groups_must_stay_inside_table_body() {
        let grid = sheet();
        let region = grid.region(grid.bounds().unwrap());
        let oracle = |_: &OracleRequest| -> OracleResult<String> {
            Ok(r#"{"header_rows": [1], "footer_rows": [7],
                   "row_groups": [
                       {"label_row": 40, "label": "Far", "start_row": 5, "end_row": 6},
                       {"label_row": 2, "label": "OverHeader", "start_row": 1, "end_row": 4},
                       {"label_row": 5, "label": "IntoFooter", "start_row": 6, "end_row": 7},
                       {"label_row": 2, "label": "North", "start_row": 3, "end_row": 4, "children": [
                           {"label_row": 3, "label": "Bolts", "start_row": 4, "end_row": 4},
                           {"label_row": 3, "label": "Spill", "start_row": 4, "end_row": 6}
                       ]},
                       {"label_row": 5, "label": "South", "start_row": 6, "end_row": 6}
                   ]}"#
                .into())
        };

        let structure = infer(&region, &detected(&region), &oracle, &StructureOptions::default()).unwrap();
        let north = GroupDecl {
            children: vec![GroupDecl::new(3, "Bolts", 4, 4)],
            ..GroupDecl::new(2, "North", 3, 4)
        };
        assert_eq!(structure.row_groups, vec![north, GroupDecl::new(5, "South", 6, 6)]);
    }

    #[test]
    fn test_built_row_groups_never_leave_the_table() {
        let grid = sheet();
        let region = grid.region(grid.bounds().unwrap());
        let oracle = |_: &OracleRequest| -> OracleResult<String> {
            Ok(r#"{"header_rows": [1], "footer_rows": [7], "row_groups": [
                       {"label_row": 40, "label": "Far", "start_row": 5, "end_row": 6},
                       {"label_row": 2, "label": "OverHeader", "start_row": 1, "end_row": 4}
                   ]}"#
                .into())
        };
        let mut options = AnalyzerOptions::default();
        options.structure.oracle_cell_threshold = 4;

        let table = build_table(&region, &detected(&region), Some(&oracle), &options);
        assert_eq!(table.footer_rows, vec![7]);
        for group in table.row_groups.groups() {
            assert!(group.rows.start >= table.bounds.min_row() && group.rows.end <= table.bounds.max_row());
            assert!(!table.header_rows.iter().any(|r| group.rows.contains(*r)));
        }
        assert!(table.row_groups.is_empty());
    }

    #[test]
    fn test_overlapping_header_and_footer_rejected() {
        let grid = sheet();
        let region = grid.region(grid.bounds().unwrap());
        let overlap =
            |_: &OracleRequest| -> OracleResult<String> { Ok(r#"{"header_rows": [1], "footer_rows": [1]}"#.into()) };
        let outside =
            |_: &OracleRequest| -> OracleResult<String> { Ok(r#"{"header_rows": [0], "footer_rows": [7]}"#.into()) };

        let detected = detected(&region);
        let options = StructureOptions::default();
        assert!(infer(&region, &detected, &overlap, &options).is_none());
        assert!(infer(&region, &detected, &outside, &options).is_none());
    }

    #[test]
    fn test_summary_samples_rows() {
        let grid = sheet();
        let region = grid.region(grid.bounds().unwrap());
        let seen = RefCell::new(String::new());
        let oracle = |request: &OracleRequest| -> OracleResult<String> {
            assert_eq!(request.task, OracleTask::TableStructure);
            *seen.borrow_mut() = request.excerpt.clone();
            Ok("not json".into())
        };

        assert!(infer(&region, &detected(&region), &oracle, &StructureOptions::default()).is_none());
        let excerpt = seen.borrow();
        assert!(excerpt.starts_with("Table A1:C7 (7 rows x 3 columns"));
        assert!(excerpt.contains("--- HEADER ROWS ---\n[A1] | val=\"Item\""));
        assert!(excerpt.contains("--- BOLD ROWS ---\nrow 2: [A2]"));
        assert!(excerpt.contains("--- LAST ROWS ---"));
    }

    #[test]
    fn test_evenly_spaced() {
        assert_eq!(evenly_spaced(&[1, 2, 3], 5), vec![1, 2, 3]);
        assert_eq!(evenly_spaced(&[1, 2, 3, 4, 5, 6, 7], 3), vec![1, 4, 7]);
        assert_eq!(evenly_spaced(&[1, 2], 0), Vec::<u32>::new());
    }

    #[test]
    fn test_large_tables_fall_back_when_oracle_fails() {
        let grid = sheet();
        let region = grid.region(grid.bounds().unwrap());
        let calls = RefCell::new(0);
        let oracle = |_: &OracleRequest| -> OracleResult<String> {
            *calls.borrow_mut() += 1;
            Err(OracleError::Unavailable("offline".into()))
        };
        let mut options = AnalyzerOptions::default();
        options.structure.oracle_cell_threshold = 4;

        let table = build_table(&region, &detected(&region), Some(&oracle), &options);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(table.footer_rows, vec![7]);
        assert_eq!(table.row_groups.len(), 2);

        // small tables never reach the oracle
        options.structure.oracle_cell_threshold = 200;
        build_table(&region, &detected(&region), Some(&oracle), &options);
        assert_eq!(*calls.borrow(), 1);
    }
}
