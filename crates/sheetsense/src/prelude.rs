//! Prelude module - common imports for sheetsense users
//!
//! ```rust
//! use sheetsense::prelude::*;
//! ```

pub use crate::{
    // Options
    AnalyzerOptions,
    // Block types
    Block,
    BlockKind,
    // Grid types
    Cell,
    CellAddress,
    CellFormat,
    CellRange,
    Chunk,
    CommandOracle,
    DetectionMode,
    Drawing,

    // Error types
    Error,
    Grid,
    HeadingBlock,
    KeyValueBlock,
    // Oracle types
    Oracle,
    OracleError,
    OracleRequest,
    OracleResult,
    ParentSelection,
    Result,
    RowGroup,
    RowGroupForest,

    // Main types
    SheetAnalyzer,
    SheetSnapshot,
    // Extension traits
    SnapshotExt,
    TableBlock,
    TextBlock,
};
