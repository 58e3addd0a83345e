//! # sheetsense-core
//!
//! Cell grid model for the sheetsense layout analyzer.
//!
//! This crate provides the fundamental types used throughout sheetsense:
//! - [`CellAddress`] and [`CellRange`] - 1-based A1 addressing
//! - [`Cell`] and [`CellFormat`] - immutable cell value objects
//! - [`Grid`] and [`Region`] - O(1) cell lookup and rectangular views
//! - [`SheetSnapshot`] - what a spreadsheet reader hands over
//!
//! ## Example
//!
//! ```rust
//! use sheetsense_core::{Cell, CellAddress, CellRange, Grid};
//!
//! let grid = Grid::from_cells(vec![
//!     Cell::new(CellAddress::new(1, 1), "Name").bold(),
//!     Cell::new(CellAddress::new(1, 2), "Score").bold(),
//!     Cell::new(CellAddress::new(2, 1), "Ann"),
//!     Cell::new(CellAddress::new(2, 2), "7"),
//! ])
//! .unwrap();
//!
//! let region = grid.region(CellRange::parse("A1:B2").unwrap());
//! assert_eq!(region.non_empty_cells().len(), 4);
//! ```

pub mod address;
pub mod cell;
pub mod error;
pub mod grid;
pub mod snapshot;

// Re-exports for convenience
pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use cell::{Cell, CellFormat, SharedCell};
pub use error::{Error, Result};
pub use grid::{Grid, Region};
pub use snapshot::{ChartData, ChartSeries, Drawing, DrawingKind, SheetSnapshot};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;
