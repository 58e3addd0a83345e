//! Error types for sheetsense-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a grid
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u32),

    /// The same coordinate was supplied twice
    #[error("Duplicate cell at {0}")]
    DuplicateCell(String),

    /// A cell lies outside the declared used range
    #[error("Cell {cell} lies outside the used range {bounds}")]
    CellOutsideBounds { cell: String, bounds: String },

    /// Two merge ranges claim the same cell
    #[error("Merge ranges {0} and {1} overlap")]
    OverlappingMerge(String, String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
