//! Immutable cell grid and rectangular views over it

use ahash::{AHashMap, AHashSet};

use crate::address::{CellAddress, CellRange};
use crate::cell::{Cell, SharedCell};
use crate::error::{Error, Result};

/// Immutable snapshot of a sheet's used range
///
/// Cells are stored sparsely and looked up in O(1) by `(row, col)`. Cells
/// that were never supplied are simply absent; absent and empty cells are
/// treated alike by every analysis step.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Sparse cell lookup keyed by (row, col)
    cells: AHashMap<(u32, u32), SharedCell>,
    /// All cells in row-major order
    ordered: Vec<SharedCell>,
    /// Declared bounding rectangle
    bounds: Option<CellRange>,
    /// Merge ranges, derived from the cells' merge anchors
    merges: Vec<CellRange>,
}

impl Grid {
    /// Create an empty grid
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a grid whose bounds are the bounding rectangle of `cells`
    pub fn from_cells<I: IntoIterator<Item = Cell>>(cells: I) -> Result<Self> {
        let cells: Vec<Cell> = cells.into_iter().collect();
        let bounds = bounding_range(cells.iter().map(|c| c.address));
        Self::build(bounds, cells)
    }

    /// Build a grid with explicit bounds
    ///
    /// Every cell must lie inside `bounds`.
    pub fn with_bounds<I: IntoIterator<Item = Cell>>(bounds: CellRange, cells: I) -> Result<Self> {
        Self::build(Some(bounds), cells.into_iter().collect())
    }

    fn build(bounds: Option<CellRange>, cells: Vec<Cell>) -> Result<Self> {
        let mut map: AHashMap<(u32, u32), SharedCell> = AHashMap::with_capacity(cells.len());

        for mut cell in cells {
            if cell.address.row == 0 || cell.address.col == 0 {
                return Err(Error::InvalidAddress(format!(
                    "row {} col {} is not 1-based",
                    cell.address.row, cell.address.col
                )));
            }
            if let Some(b) = bounds {
                if !b.contains(&cell.address) {
                    return Err(Error::CellOutsideBounds {
                        cell: cell.address.to_string(),
                        bounds: b.to_string(),
                    });
                }
            }
            if cell.value.as_deref() == Some("") {
                cell.value = None;
            }
            let key = (cell.address.row, cell.address.col);
            if map.contains_key(&key) {
                return Err(Error::DuplicateCell(cell.address.to_string()));
            }
            map.insert(key, SharedCell::new(cell));
        }

        let mut ordered: Vec<SharedCell> = map.values().cloned().collect();
        ordered.sort_by_key(|c| c.address);

        let merges = collect_merges(&ordered);

        Ok(Self {
            cells: map,
            ordered,
            bounds,
            merges,
        })
    }

    /// The bounding rectangle, or `None` for an empty grid
    pub fn bounds(&self) -> Option<CellRange> {
        self.bounds
    }

    /// Minimal rectangle containing every non-empty cell
    pub fn used_range(&self) -> Option<CellRange> {
        bounding_range(
            self.ordered
                .iter()
                .filter(|c| c.has_value())
                .map(|c| c.address),
        )
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether no cells are stored
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Look up a cell by 1-based row and column
    pub fn get(&self, row: u32, col: u32) -> Option<&SharedCell> {
        self.cells.get(&(row, col))
    }

    /// Look up a cell by address
    pub fn cell(&self, addr: CellAddress) -> Option<&SharedCell> {
        self.get(addr.row, addr.col)
    }

    /// Whether the cell at (row, col) holds a non-empty value
    pub fn has_value(&self, row: u32, col: u32) -> bool {
        self.get(row, col).is_some_and(|c| c.has_value())
    }

    /// All stored cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = &SharedCell> + '_ {
        self.ordered.iter()
    }

    /// Non-empty cells in row-major order
    pub fn non_empty_cells(&self) -> impl Iterator<Item = &SharedCell> + '_ {
        self.ordered.iter().filter(|c| c.has_value())
    }

    /// Merge ranges, sorted by anchor
    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    /// The merge range that covers `addr`, if any
    pub fn merge_containing(&self, addr: CellAddress) -> Option<CellRange> {
        let anchor = self.cell(addr)?.merged_with?;
        self.merges.iter().copied().find(|m| m.start == anchor)
    }

    /// A rectangular view over part of the grid
    pub fn region(&self, range: CellRange) -> Region<'_> {
        Region { grid: self, range }
    }
}

fn bounding_range<I: Iterator<Item = CellAddress>>(addrs: I) -> Option<CellRange> {
    let mut acc: Option<(u32, u32, u32, u32)> = None;
    for a in addrs {
        acc = Some(match acc {
            None => (a.row, a.col, a.row, a.col),
            Some((r0, c0, r1, c1)) => (r0.min(a.row), c0.min(a.col), r1.max(a.row), c1.max(a.col)),
        });
    }
    acc.map(|(r0, c0, r1, c1)| CellRange::from_bounds(r0, c0, r1, c1))
}

fn collect_merges(ordered: &[SharedCell]) -> Vec<CellRange> {
    let mut extents: AHashMap<CellAddress, CellRange> = AHashMap::new();
    for cell in ordered {
        if let Some(anchor) = cell.merged_with {
            extents
                .entry(anchor)
                .and_modify(|r| {
                    *r = CellRange::from_bounds(
                        r.min_row().min(cell.row()),
                        r.min_col().min(cell.col()),
                        r.max_row().max(cell.row()),
                        r.max_col().max(cell.col()),
                    )
                })
                .or_insert_with(|| CellRange::new(anchor, cell.address));
        }
    }
    let mut merges: Vec<CellRange> = extents
        .into_values()
        .filter(|r| r.cell_count() > 1)
        .collect();
    merges.sort_by_key(|r| r.start);
    merges
}

/// A rectangular view over a [`Grid`]
///
/// Views never copy cells: every accessor hands out the grid's own
/// [`SharedCell`] handles.
#[derive(Debug, Clone, Copy)]
pub struct Region<'g> {
    grid: &'g Grid,
    range: CellRange,
}

impl<'g> Region<'g> {
    /// The underlying grid
    pub fn grid(&self) -> &'g Grid {
        self.grid
    }

    /// The rectangle this view covers
    pub fn range(&self) -> CellRange {
        self.range
    }

    /// Top row
    pub fn min_row(&self) -> u32 {
        self.range.min_row()
    }

    /// Bottom row
    pub fn max_row(&self) -> u32 {
        self.range.max_row()
    }

    /// Leftmost column
    pub fn min_col(&self) -> u32 {
        self.range.min_col()
    }

    /// Rightmost column
    pub fn max_col(&self) -> u32 {
        self.range.max_col()
    }

    /// Number of rows
    pub fn num_rows(&self) -> u32 {
        self.range.row_count()
    }

    /// Number of columns
    pub fn num_cols(&self) -> u32 {
        self.range.col_count()
    }

    /// Cell at (row, col) if it lies in this view and exists
    pub fn cell_at(&self, row: u32, col: u32) -> Option<&'g SharedCell> {
        if !self.range.contains(&CellAddress::new(row, col)) {
            return None;
        }
        self.grid.get(row, col)
    }

    /// Cell at (row, col) only if it holds a value
    pub fn filled_at(&self, row: u32, col: u32) -> Option<&'g SharedCell> {
        self.cell_at(row, col).filter(|c| c.has_value())
    }

    /// All stored cells in row-major order
    pub fn cells(&self) -> Vec<&'g SharedCell> {
        let grid = self.grid;
        self.range
            .cells()
            .filter_map(|a| grid.get(a.row, a.col))
            .collect()
    }

    /// Non-empty cells in row-major order
    pub fn non_empty_cells(&self) -> Vec<&'g SharedCell> {
        let grid = self.grid;
        self.range
            .cells()
            .filter_map(|a| grid.get(a.row, a.col))
            .filter(|c| c.has_value())
            .collect()
    }

    /// Stored cells of one row
    pub fn row_cells(&self, row: u32) -> Vec<&'g SharedCell> {
        (self.min_col()..=self.max_col())
            .filter_map(|c| self.cell_at(row, c))
            .collect()
    }

    /// Non-empty cells of one row
    pub fn row_values(&self, row: u32) -> Vec<&'g SharedCell> {
        (self.min_col()..=self.max_col())
            .filter_map(|c| self.filled_at(row, c))
            .collect()
    }

    /// Non-empty cells of one column
    pub fn col_values(&self, col: u32) -> Vec<&'g SharedCell> {
        (self.min_row()..=self.max_row())
            .filter_map(|r| self.filled_at(r, col))
            .collect()
    }

    /// Whether any cell in the row holds a value
    pub fn row_has_data(&self, row: u32) -> bool {
        (self.min_col()..=self.max_col()).any(|c| self.filled_at(row, c).is_some())
    }

    /// Whether any cell in the column holds a value
    pub fn col_has_data(&self, col: u32) -> bool {
        (self.min_row()..=self.max_row()).any(|r| self.filled_at(r, col).is_some())
    }

    /// Columns holding at least one value, ascending
    pub fn occupied_columns(&self) -> Vec<u32> {
        let mut cols: AHashSet<u32> = AHashSet::new();
        for cell in self.non_empty_cells() {
            cols.insert(cell.col());
        }
        let mut cols: Vec<u32> = cols.into_iter().collect();
        cols.sort_unstable();
        cols
    }

    /// Rows holding at least one value, ascending
    pub fn occupied_rows(&self) -> Vec<u32> {
        (self.min_row()..=self.max_row())
            .filter(|r| self.row_has_data(*r))
            .collect()
    }

    /// Merge ranges that overlap this view
    pub fn merges(&self) -> Vec<CellRange> {
        self.grid
            .merges()
            .iter()
            .copied()
            .filter(|m| m.overlaps(&self.range))
            .collect()
    }

    /// A narrower view, clipped to this one
    pub fn sub_region(&self, range: CellRange) -> Option<Region<'g>> {
        self.range.intersect(&range).map(|r| Region {
            grid: self.grid,
            range: r,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn sample_grid() -> Grid {
        Grid::from_cells(vec![
            Cell::new(addr("A1"), "Title").bold().with_merge(addr("A1")),
            Cell::empty(addr("B1")).with_merge(addr("A1")),
            Cell::new(addr("A3"), "Name"),
            Cell::new(addr("B3"), "Score"),
            Cell::new(addr("A4"), "Ann"),
            Cell::new(addr("B4"), "7"),
            Cell::new(addr("D6"), ""),
        ])
        .unwrap()
    }

    #[test]
    fn test_bounds_and_used_range() {
        let grid = sample_grid();
        assert_eq!(grid.bounds(), Some(CellRange::parse("A1:D6").unwrap()));
        assert_eq!(grid.used_range(), Some(CellRange::parse("A1:B4").unwrap()));
        assert_eq!(grid.len(), 7);
    }

    #[test]
    fn test_lookup_shares_identity() {
        let grid = sample_grid();
        let region = grid.region(CellRange::parse("A3:B4").unwrap());
        let from_grid = grid.get(4, 2).unwrap();
        let from_region = region.cell_at(4, 2).unwrap();
        assert!(SharedCell::ptr_eq(from_grid, from_region));
    }

    #[test]
    fn test_merges_are_derived_from_anchors() {
        let grid = sample_grid();
        assert_eq!(grid.merges(), &[CellRange::parse("A1:B1").unwrap()]);
        assert_eq!(
            grid.merge_containing(addr("B1")),
            Some(CellRange::parse("A1:B1").unwrap())
        );
        assert_eq!(grid.merge_containing(addr("A3")), None);
    }

    #[test]
    fn test_rejects_duplicates_and_out_of_bounds() {
        let dup = Grid::from_cells(vec![
            Cell::new(addr("A1"), "x"),
            Cell::new(addr("A1"), "y"),
        ]);
        assert!(matches!(dup, Err(Error::DuplicateCell(_))));

        let outside = Grid::with_bounds(
            CellRange::parse("A1:B2").unwrap(),
            vec![Cell::new(addr("C3"), "x")],
        );
        assert!(matches!(outside, Err(Error::CellOutsideBounds { .. })));
    }

    #[test]
    fn test_region_accessors() {
        let grid = sample_grid();
        let region = grid.region(CellRange::parse("A1:D6").unwrap());

        assert_eq!(region.num_rows(), 6);
        assert_eq!(region.num_cols(), 4);
        assert_eq!(region.occupied_columns(), vec![1, 2]);
        assert_eq!(region.occupied_rows(), vec![1, 3, 4]);
        assert_eq!(region.non_empty_cells().len(), 5);
        assert_eq!(region.row_values(1).len(), 1);
        assert_eq!(region.row_cells(1).len(), 2);
        assert!(!region.col_has_data(4));
        assert!(region.cell_at(7, 1).is_none());
    }

    #[test]
    fn test_sub_region_is_clipped() {
        let grid = sample_grid();
        let region = grid.region(CellRange::parse("A1:B4").unwrap());
        let sub = region.sub_region(CellRange::parse("B3:F9").unwrap()).unwrap();
        assert_eq!(sub.range(), CellRange::parse("B3:B4").unwrap());
        assert!(region
            .sub_region(CellRange::parse("F9:G10").unwrap())
            .is_none());
    }
}
