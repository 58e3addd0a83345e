//! # sheetsense-layout
//!
//! Recovers the layout of a spreadsheet sheet from its cells.
//!
//! The pipeline, driven by [`SheetAnalyzer`]:
//! - [`split`] - whitespace-delimited candidate regions
//! - [`refine`] - optional oracle-backed splitting of touching blocks
//! - [`detect`] - heading, key/value, text and table detectors, first match wins
//! - [`structure`] - header, footer and row-group structure for tables
//! - [`group`] - headings paired with the content below them into [`Chunk`]s
//!
//! Everything runs heuristically by default. An [`Oracle`](sheetsense_oracle::Oracle)
//! can be supplied for oracle or fallback detection, refinement and
//! structure inference of large tables; its failures never abort a sheet.

pub mod analyzer;
pub mod block;
pub mod detect;
pub mod group;
pub mod options;
pub mod refine;
pub mod row_group;
pub mod split;
pub mod structure;

pub use analyzer::SheetAnalyzer;
pub use block::{
    Block, BlockKind, ChartBlock, Chunk, ColumnGroup, HeaderShape, HeadingBlock, ImageBlock, KeyValueBlock,
    KeyValuePair, SectionColumns, TableBlock, TextBlock,
};
pub use detect::{classify, Detection, Detector};
pub use group::group_blocks;
pub use options::{
    AnalyzerOptions, DetectionMode, GroupingOptions, HeadingOptions, KeyValueOptions, ParentSelection,
    ParseModeError, RefineOptions, StructureOptions, TableOptions, TextOptions,
};
pub use refine::{refine_region, RefineOutcome};
pub use row_group::{RowGroup, RowGroupForest, RowSpan};
pub use split::split_regions;
pub use structure::{build_table, StructureSource, TableStructure};
