//! Reader-facing sheet snapshot
//!
//! A [`SheetSnapshot`] is what a spreadsheet reader hands over: the used
//! range's cells, the raw merge ranges and any drawing anchors. Turning it
//! into a [`Grid`] resolves the merges so that every covered cell carries a
//! reference to its merge anchor.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::address::{CellAddress, CellRange};
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::grid::Grid;

/// One sheet as produced by a spreadsheet reader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSnapshot {
    /// Sheet name
    pub name: Option<String>,
    /// Used range, if the reader reports one
    pub used_range: Option<CellRange>,
    /// Cells of the used range
    pub cells: Vec<Cell>,
    /// Merge ranges
    pub merges: Vec<CellRange>,
    /// Charts and images anchored on the sheet
    pub drawings: Vec<Drawing>,
}

impl SheetSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the grid, resolving merge ranges onto their cells
    ///
    /// Every cell inside a merge range, the anchor included, gets
    /// `merged_with` set to the range's top-left address. Covered positions
    /// the reader did not supply are materialised as empty cells.
    pub fn to_grid(&self) -> Result<Grid> {
        let mut merges = self.merges.clone();
        merges.sort_by_key(|m| m.start);
        for (i, a) in merges.iter().enumerate() {
            if let Some(b) = merges[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(Error::OverlappingMerge(a.to_string(), b.to_string()));
            }
        }

        let mut cells: AHashMap<CellAddress, Cell> = AHashMap::with_capacity(self.cells.len());
        for cell in &self.cells {
            if cells.insert(cell.address, cell.clone()).is_some() {
                return Err(Error::DuplicateCell(cell.address.to_string()));
            }
        }

        for merge in &merges {
            for addr in merge.cells() {
                cells
                    .entry(addr)
                    .or_insert_with(|| Cell::empty(addr))
                    .merged_with = Some(merge.start);
            }
        }

        let cells = cells.into_values();
        match self.used_range {
            Some(bounds) => {
                let merged_bounds = merges.iter().fold(bounds, |acc, m| {
                    CellRange::from_bounds(
                        acc.min_row().min(m.min_row()),
                        acc.min_col().min(m.min_col()),
                        acc.max_row().max(m.max_row()),
                        acc.max_col().max(m.max_col()),
                    )
                });
                Grid::with_bounds(merged_bounds, cells)
            }
            None => Grid::from_cells(cells),
        }
    }
}

/// Kind of drawing anchored on a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingKind {
    /// A chart
    Chart,
    /// A picture
    Image,
}

/// A chart or image anchored over a cell range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    /// Drawing kind
    pub kind: DrawingKind,
    /// Cells covered by the drawing's anchor
    pub anchor: CellRange,
    /// Chart contents, for charts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
    /// Alternative text or description, for images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Drawing {
    /// Create a chart drawing
    pub fn chart(anchor: CellRange, chart: ChartData) -> Self {
        Self {
            kind: DrawingKind::Chart,
            anchor,
            chart: Some(chart),
            description: None,
        }
    }

    /// Create an image drawing
    pub fn image(anchor: CellRange, description: Option<String>) -> Self {
        Self {
            kind: DrawingKind::Image,
            anchor,
            chart: None,
            description,
        }
    }
}

/// Chart contents resolved by the reader
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartData {
    /// Chart type name (e.g. "bar", "line", "pie")
    pub chart_type: String,
    /// Chart title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Category axis title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    /// Value axis title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    /// Category labels
    pub categories: Vec<String>,
    /// Data series
    pub series: Vec<ChartSeries>,
}

/// One data series of a chart
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSeries {
    /// Series name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source range of the values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_range: Option<CellRange>,
    /// Resolved values
    pub values: Vec<String>,
}
