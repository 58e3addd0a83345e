//! # sheetsense
//!
//! Layout analysis for spreadsheet sheets.
//!
//! Sheetsense takes the cells of a sheet's used range (values, formatting,
//! merges and formula presence) and recovers what a reader sees: headings,
//! tables, key/value forms, notes, charts and images, grouped into chunks of
//! a heading and the block it introduces. Tables additionally get header and
//! footer rows, multi-level header groups and a forest of nested row groups.
//!
//! ## Features
//!
//! - Whitespace region splitting with optional oracle refinement
//! - Heuristic detectors, optionally backed or replaced by a semantic oracle
//! - Two-pass table structure with row group nesting
//! - JSON snapshots in, JSON chunks out
//!
//! ## Example
//!
//! ```rust
//! use sheetsense::prelude::*;
//!
//! let snapshot = SheetSnapshot::from_json(r#"{
//!     "cells": [
//!         {"address": "A1", "value": "Team scores", "bold": true},
//!         {"address": "A3", "value": "Name", "bold": true},
//!         {"address": "B3", "value": "Score", "bold": true},
//!         {"address": "A4", "value": "Ann"}, {"address": "B4", "value": "7"},
//!         {"address": "A5", "value": "Bob"}, {"address": "B5", "value": "9"}
//!     ]
//! }"#).unwrap();
//!
//! let chunks = SheetAnalyzer::new(AnalyzerOptions::default())
//!     .analyze_snapshot(&snapshot)
//!     .unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].heading().map(|h| h.text.as_str()), Some("Team scores"));
//! ```

pub mod prelude;

// Re-export core types
pub use sheetsense_core::{
    Cell,
    CellAddress,
    CellFormat,
    CellRange,
    ChartData,
    ChartSeries,
    Drawing,
    DrawingKind,
    // Error types
    Error,
    Grid,
    Region,
    Result,
    SharedCell,
    SheetSnapshot,
    MAX_COLS,
    MAX_ROWS,
};

// Re-export oracle types
pub use sheetsense_oracle::{
    CommandOracle, Oracle, OracleError, OracleReply, OracleRequest, OracleResult, OracleTask,
};

// Re-export layout types
pub use sheetsense_layout::{
    build_table, classify, group_blocks, refine_region, split_regions, AnalyzerOptions, Block, BlockKind,
    ChartBlock, Chunk, ColumnGroup, Detection, DetectionMode, GroupingOptions, HeaderShape, HeadingBlock,
    ImageBlock, KeyValueBlock, KeyValuePair, ParentSelection, RefineOutcome, RowGroup, RowGroupForest, RowSpan,
    SectionColumns, SheetAnalyzer, StructureOptions, TableBlock, TextBlock,
};

use std::path::Path;

/// Extension trait for SheetSnapshot to add JSON file I/O
pub trait SnapshotExt: Sized {
    /// Parse a snapshot from JSON text
    fn from_json(json: &str) -> Result<Self>;

    /// Read a snapshot from a JSON file
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;

    /// Write the snapshot to a JSON file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl SnapshotExt for SheetSnapshot {
    fn from_json(json: &str) -> Result<SheetSnapshot> {
        serde_json::from_str(json).map_err(|e| Error::other(format!("Invalid sheet snapshot: {e}")))
    }

    fn open<P: AsRef<Path>>(path: P) -> Result<SheetSnapshot> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::other(format!("Cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|e| Error::other(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| Error::other(format!("Cannot write {}: {e}", path.display())))
    }
}

/// Serialize chunks as a JSON array
pub fn chunks_to_json(chunks: &[Chunk], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(chunks)
    } else {
        serde_json::to_string(chunks)
    };
    json.map_err(|e| Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snapshot_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.json");

        let snapshot = SheetSnapshot::from_json(
            r#"{"name": "Data", "cells": [{"address": "B2", "value": "x", "bold": true}], "merges": ["B2:C2"]}"#,
        )
        .unwrap();
        snapshot.save(&path).unwrap();

        let reopened = SheetSnapshot::open(&path).unwrap();
        assert_eq!(reopened.name.as_deref(), Some("Data"));
        assert_eq!(reopened.cells, snapshot.cells);
        assert_eq!(reopened.merges, vec![CellRange::parse("B2:C2").unwrap()]);
    }

    #[test]
    fn test_bad_snapshot_reports_error() {
        assert!(SheetSnapshot::from_json("{\"cells\": [{\"address\": \"1A\"}]}").is_err());
        assert!(SheetSnapshot::open("/nonexistent/sheet.json").is_err());
    }

    #[test]
    fn test_chunks_to_json() {
        let grid = Grid::from_cells(vec![
            Cell::new(CellAddress::new(1, 1), "Overview").bold(),
        ])
        .unwrap();
        let chunks = SheetAnalyzer::new(AnalyzerOptions::default()).analyze(&grid, &[]);

        let json: serde_json::Value = serde_json::from_str(&chunks_to_json(&chunks, false).unwrap()).unwrap();
        assert_eq!(json[0]["blocks"][0]["block_type"], "heading");
        assert_eq!(json[0]["blocks"][0]["text"], "Overview");
    }
}
