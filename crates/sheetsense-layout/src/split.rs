//! Whitespace region splitting
//!
//! Rows and columns that are empty across the whole bounds act as
//! separators. The remaining rows collapse into bands of consecutive rows,
//! the remaining columns into bands of consecutive columns, and every
//! row band × column band rectangle that holds data becomes a region.

use std::collections::BTreeSet;

use ahash::AHashSet;
use sheetsense_core::{CellRange, Grid};

/// Split `bounds` into whitespace-delimited regions
///
/// Regions come back in reading order (row band, then column band). Each
/// holds at least one non-empty cell and every non-empty cell inside
/// `bounds` lies in exactly one region.
pub fn split_regions(grid: &Grid, bounds: CellRange) -> Vec<CellRange> {
    let cells: Vec<(u32, u32)> = grid
        .non_empty_cells()
        .filter(|c| bounds.contains(&c.address))
        .map(|c| (c.row(), c.col()))
        .collect();
    if cells.is_empty() {
        return Vec::new();
    }

    let row_bands = bands(cells.iter().map(|(r, _)| *r).collect());
    let col_bands = bands(cells.iter().map(|(_, c)| *c).collect());

    let occupied: AHashSet<(usize, usize)> = cells
        .iter()
        .map(|(r, c)| (band_index(&row_bands, *r), band_index(&col_bands, *c)))
        .collect();

    let mut regions = Vec::new();
    for (ri, (r0, r1)) in row_bands.iter().enumerate() {
        for (ci, (c0, c1)) in col_bands.iter().enumerate() {
            if occupied.contains(&(ri, ci)) {
                regions.push(CellRange::from_bounds(*r0, *c0, *r1, *c1));
            }
        }
    }

    tracing::debug!(
        bounds = %bounds,
        row_bands = row_bands.len(),
        col_bands = col_bands.len(),
        regions = regions.len(),
        "split sheet into regions"
    );
    regions
}

/// Collapse occupied indices into maximal runs of consecutive values
fn bands(occupied: BTreeSet<u32>) -> Vec<(u32, u32)> {
    let mut bands: Vec<(u32, u32)> = Vec::new();
    for index in occupied {
        match bands.last_mut() {
            Some((_, end)) if *end + 1 == index => *end = index,
            _ => bands.push((index, index)),
        }
    }
    bands
}

fn band_index(bands: &[(u32, u32)], index: u32) -> usize {
    bands.partition_point(|(_, end)| *end < index)
}
