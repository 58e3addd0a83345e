//! Heuristic structure inference
//!
//! Header rows come from table detection. On top of that this pass finds
//! total lines at the bottom, parent headers merged across child columns,
//! bold group-label rows and vertical merges that group body rows.

use sheetsense_core::Region;

use super::{GroupDecl, MergedGroupDecl, StructureSource, TableStructure};
use crate::block::{ColumnGroup, HeaderShape, TableBlock};
use crate::detect::content::{is_total_label, median};
use crate::options::StructureOptions;

/// Infer the structure of a detected table
pub fn infer(region: &Region<'_>, detected: &TableBlock, options: &StructureOptions) -> TableStructure {
    let header_rows = trim_header(region, &detected.header_rows);
    let footer_rows = if detected.footer_rows.is_empty() {
        total_rows(region, &header_rows)
    } else {
        detected.footer_rows.clone()
    };

    let body: Vec<u32> = region
        .occupied_rows()
        .into_iter()
        .filter(|r| !header_rows.contains(r) && !footer_rows.contains(r))
        .collect();

    let column_groups = column_groups(region, &header_rows);
    let label_column = body
        .iter()
        .flat_map(|r| region.row_values(*r).into_iter().map(|c| c.col()).min())
        .min();
    let row_groups = label_column
        .map(|col| label_groups(region, &body, col, options))
        .unwrap_or_default();
    let merged_groups = merged_groups(region, &header_rows, &footer_rows);

    let mut merged_group_columns: Vec<u32> = merged_groups.iter().map(|m| m.column).collect();
    merged_group_columns.sort_unstable();
    merged_group_columns.dedup();

    TableStructure {
        header_shape: if column_groups.is_empty() {
            HeaderShape::Single
        } else {
            HeaderShape::MultiLevel
        },
        header_rows,
        column_groups,
        footer_rows,
        label_column: label_column.filter(|_| !row_groups.is_empty()),
        row_groups,
        merged_group_columns,
        merged_groups,
        section_columns: detected.section_columns.clone(),
        source: StructureSource::Heuristic,
    }
}

/// Drop trailing header rows that are really the first group label
///
/// A bold row holding a single value in the leftmost column, right under a
/// fuller header row, starts the body rather than extending the header.
fn trim_header(region: &Region<'_>, header_rows: &[u32]) -> Vec<u32> {
    let mut header = header_rows.to_vec();
    let first_col = region.occupied_columns().first().copied();
    while let [.., previous, last] = header.as_slice() {
        let values = region.row_values(*last);
        let lone_label = values.len() == 1
            && Some(values[0].col()) == first_col
            && region.row_values(*previous).len() > 1;
        if !lone_label {
            break;
        }
        header.pop();
    }
    header
}

/// Trailing rows that start with a total label, keeping at least one data row
fn total_rows(region: &Region<'_>, header_rows: &[u32]) -> Vec<u32> {
    let rows: Vec<u32> = region
        .occupied_rows()
        .into_iter()
        .filter(|r| !header_rows.contains(r))
        .collect();

    let mut footer = Vec::new();
    for (remaining, row) in rows.iter().enumerate().rev() {
        if remaining == 0 {
            break;
        }
        let first = region.row_values(*row).into_iter().next();
        if !first.is_some_and(|c| is_total_label(c.text())) {
            break;
        }
        footer.push(*row);
    }
    footer.reverse();
    footer
}

/// Horizontal merges in every header row but the last
fn column_groups(region: &Region<'_>, header_rows: &[u32]) -> Vec<ColumnGroup> {
    let Some(last) = header_rows.iter().max() else {
        return Vec::new();
    };
    if header_rows.len() < 2 {
        return Vec::new();
    }

    region
        .merges()
        .into_iter()
        .filter(|m| {
            m.min_row() == m.max_row()
                && m.col_count() > 1
                && m.min_row() != *last
                && header_rows.contains(&m.min_row())
        })
        .filter_map(|m| {
            let anchor = region.filled_at(m.min_row(), m.min_col())?;
            Some(ColumnGroup {
                parent: m,
                label: anchor.text().to_string(),
                children: (m.min_col()..=m.max_col()).collect(),
            })
        })
        .collect()
}

/// Bold, sparsely filled rows in the label column become group labels
///
/// A row qualifies when every value in it is bold, the label column holds
/// one of them, and it has no more values than the larger of
/// `group_label_max_cells` and `group_label_fill_ratio` of the median row
/// fill. Each label governs the rows up to the next label or the end of
/// the body.
fn label_groups(region: &Region<'_>, body: &[u32], label_col: u32, options: &StructureOptions) -> Vec<GroupDecl> {
    let mut fills: Vec<usize> = body.iter().map(|r| region.row_values(*r).len()).collect();
    let typical = median(&mut fills);
    let threshold = options
        .group_label_max_cells
        .max((typical as f64 * options.group_label_fill_ratio).floor() as usize);

    let labels: Vec<u32> = body
        .iter()
        .copied()
        .filter(|r| {
            let values = region.row_values(*r);
            values.len() <= threshold
                && values.iter().all(|c| c.is_bold())
                && region.filled_at(*r, label_col).is_some()
        })
        .collect();

    if labels.len() < options.min_group_labels || labels.len() >= body.len() {
        return Vec::new();
    }
    let Some(body_end) = body.last().copied() else {
        return Vec::new();
    };

    labels
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let end = labels.get(i + 1).map(|next| next - 1).unwrap_or(body_end);
            let label = region
                .filled_at(*row, label_col)
                .map(|c| c.text().trim().to_string())
                .unwrap_or_default();
            GroupDecl::new(*row, label, row + 1, end)
        })
        .collect()
}

/// Vertical merges inside the body with a labelled anchor
fn merged_groups(region: &Region<'_>, header_rows: &[u32], footer_rows: &[u32]) -> Vec<MergedGroupDecl> {
    region
        .merges()
        .into_iter()
        .filter(|m| m.row_count() > 1 && region.range().encloses(m))
        .filter(|m| {
            (m.min_row()..=m.max_row()).all(|r| !header_rows.contains(&r) && !footer_rows.contains(&r))
        })
        .filter_map(|m| {
            let anchor = region.filled_at(m.min_row(), m.min_col())?;
            Some(MergedGroupDecl {
                column: m.min_col(),
                start_row: m.min_row(),
                end_row: m.max_row(),
                label: anchor.text().trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::test_support::grid_at;
    use crate::options::AnalyzerOptions;
    use crate::structure::assemble;
    use pretty_assertions::assert_eq;
    use sheetsense_core::{Cell, CellAddress, CellRange, Grid};

    fn detected(region: &Region<'_>, header_rows: Vec<u32>) -> TableBlock {
        assemble(region, &TableStructure::with_header(header_rows), &AnalyzerOptions::default())
    }

    fn grouped_sheet() -> Grid {
        grid_at(
            1,
            1,
            &[
                &["Item", "Q1", "Q2", "Q3"],
                &["North", "", "", ""],
                &["Bolts", "1", "2", "3"],
                &["Nuts", "3", "4", "5"],
                &["South", "", "", ""],
                &["Bolts", "5", "6", "7"],
                &["Nuts", "7", "8", "9"],
                &["Grand total", "16", "20", "24"],
            ],
            |c| match c.row() {
                1 | 2 | 5 => c.bold(),
                _ => c,
            },
        )
    }

    #[test]
    fn test_groups_and_total_footer() {
        let grid = grouped_sheet();
        let region = grid.region(grid.bounds().unwrap());
        let structure = infer(&region, &detected(&region, vec![1]), &StructureOptions::default());

        assert_eq!(structure.footer_rows, vec![8]);
        assert_eq!(structure.label_column, Some(1));
        assert_eq!(
            structure.row_groups,
            vec![GroupDecl::new(2, "North", 3, 4), GroupDecl::new(5, "South", 6, 7)]
        );
        assert_eq!(structure.header_shape, HeaderShape::Single);
    }

    #[test]
    fn test_group_label_under_header_is_not_header() {
        let grid = grouped_sheet();
        let region = grid.region(grid.bounds().unwrap());
        let structure = infer(&region, &detected(&region, vec![1, 2]), &StructureOptions::default());

        assert_eq!(structure.header_rows, vec![1]);
        assert_eq!(structure.row_groups.len(), 2);
        assert_eq!(trim_header(&region, &[1]), vec![1]);
    }

    #[test]
    fn test_single_label_is_not_a_grouping() {
        let grid = grid_at(
            1,
            1,
            &[&["Item", "Q1"], &["North", ""], &["Bolts", "1"], &["Nuts", "3"]],
            |c| if c.row() <= 2 { c.bold() } else { c },
        );
        let region = grid.region(grid.bounds().unwrap());
        let structure = infer(&region, &detected(&region, vec![1]), &StructureOptions::default());
        assert!(structure.row_groups.is_empty());
        assert_eq!(structure.label_column, None);
    }

    #[test]
    fn test_total_never_takes_the_last_data_row() {
        let grid = grid_at(1, 1, &[&["Item", "Qty"], &["Total", "3"]], |c| {
            if c.row() == 1 { c.bold() } else { c }
        });
        let region = grid.region(grid.bounds().unwrap());
        assert!(total_rows(&region, &[1]).is_empty());
    }

    #[test]
    fn test_multi_level_header_from_merges() {
        let a1 = CellAddress::new(1, 2);
        let grid = Grid::from_cells(vec![
            Cell::new(CellAddress::new(1, 1), "Region").bold(),
            Cell::new(a1, "Revenue").bold().with_merge(a1),
            Cell::empty(CellAddress::new(1, 3)).bold().with_merge(a1),
            Cell::new(CellAddress::new(2, 2), "2023").bold(),
            Cell::new(CellAddress::new(2, 3), "2024").bold(),
            Cell::new(CellAddress::new(3, 1), "North"),
            Cell::new(CellAddress::new(3, 2), "10"),
            Cell::new(CellAddress::new(3, 3), "12"),
        ])
        .unwrap();
        let region = grid.region(grid.bounds().unwrap());
        let structure = infer(&region, &detected(&region, vec![1, 2]), &StructureOptions::default());

        assert_eq!(structure.header_shape, HeaderShape::MultiLevel);
        assert_eq!(
            structure.column_groups,
            vec![ColumnGroup {
                parent: CellRange::parse("B1:C1").unwrap(),
                label: "Revenue".to_string(),
                children: vec![2, 3],
            }]
        );
    }

    #[test]
    fn test_vertical_merges_declare_groups() {
        let anchor = CellAddress::new(2, 1);
        let grid = Grid::from_cells(vec![
            Cell::new(CellAddress::new(1, 1), "Team").bold(),
            Cell::new(CellAddress::new(1, 2), "Name").bold(),
            Cell::new(anchor, "Ops").with_merge(anchor),
            Cell::empty(CellAddress::new(3, 1)).with_merge(anchor),
            Cell::new(CellAddress::new(2, 2), "Ann"),
            Cell::new(CellAddress::new(3, 2), "Bob"),
            Cell::new(CellAddress::new(4, 1), "Dev"),
            Cell::new(CellAddress::new(4, 2), "Cy"),
        ])
        .unwrap();
        let region = grid.region(grid.bounds().unwrap());
        let structure = infer(&region, &detected(&region, vec![1]), &StructureOptions::default());

        assert_eq!(
            structure.merged_groups,
            vec![MergedGroupDecl {
                column: 1,
                start_row: 2,
                end_row: 3,
                label: "Ops".to_string()
            }]
        );
        assert_eq!(structure.merged_group_columns, vec![1]);
    }
}
