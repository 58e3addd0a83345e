//! Analyzer configuration
//!
//! Every tuned threshold of the layout heuristics lives here. All structs
//! deserialize with defaults for missing fields, so a partial JSON options
//! file only needs to name what it changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which classification strategy each detector runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Heuristics only
    #[default]
    Heuristic,
    /// Oracle only
    Oracle,
    /// Heuristic first, oracle when the heuristic does not match
    HeuristicThenOracle,
}

impl DetectionMode {
    /// Whether this mode ever consults the oracle
    pub fn uses_oracle(&self) -> bool {
        !matches!(self, DetectionMode::Heuristic)
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectionMode::Heuristic => "heuristic",
            DetectionMode::Oracle => "oracle",
            DetectionMode::HeuristicThenOracle => "heuristic_then_oracle",
        })
    }
}

/// Error returned when parsing an unknown [`DetectionMode`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown detection mode '{0}' (expected heuristic, oracle or heuristic_then_oracle)")]
pub struct ParseModeError(pub String);

impl FromStr for DetectionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "heuristic" => Ok(DetectionMode::Heuristic),
            "oracle" => Ok(DetectionMode::Oracle),
            "heuristic_then_oracle" => Ok(DetectionMode::HeuristicThenOracle),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// How a merged-group column picks its parent row group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentSelection {
    /// First top-level group, in declaration order, whose rows contain the child's first row
    #[default]
    FirstMatch,
    /// Smallest declared group whose rows strictly contain the child's rows
    TightestFit,
}

/// Top-level options for [`SheetAnalyzer`](crate::SheetAnalyzer)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Detection strategy
    pub mode: DetectionMode,
    /// Region refinement
    pub refine: RefineOptions,
    /// Heading heuristic
    pub heading: HeadingOptions,
    /// Key/value heuristic
    pub key_value: KeyValueOptions,
    /// Free-text heuristic
    pub text: TextOptions,
    /// Table heuristic
    pub table: TableOptions,
    /// Table structure inference
    pub structure: StructureOptions,
    /// Heading/content grouping
    pub grouping: GroupingOptions,
}

impl AnalyzerOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the detection mode
    pub fn with_mode(mut self, mode: DetectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable oracle-backed region refinement
    pub fn with_refinement(mut self, enabled: bool) -> Self {
        self.refine.enabled = enabled;
        self
    }

    /// Set the merged-group parent selection rule
    pub fn with_parent_selection(mut self, selection: ParentSelection) -> Self {
        self.structure.parent_selection = selection;
        self
    }
}

/// Region refinement options
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineOptions {
    /// Ask the oracle whether regions should be split further
    pub enabled: bool,
}

/// Heading heuristic thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingOptions {
    pub max_rows: u32,
    pub max_distinct_values: usize,
    /// Font size (points) at or above which text counts as large
    pub large_font_size: f64,
}

impl Default for HeadingOptions {
    fn default() -> Self {
        Self {
            max_rows: 3,
            max_distinct_values: 3,
            large_font_size: 12.0,
        }
    }
}

/// Key/value heuristic thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValueOptions {
    pub min_cols: u32,
    pub max_cols: u32,
    pub min_rows: u32,
    /// A column is populated when filled in more than this share of rows
    pub populated_ratio: f64,
    /// Columns between key and value filled above this share disqualify
    pub spacer_ratio: f64,
    /// Valid pairs must cover at least this share of rows
    pub min_pair_coverage: f64,
    /// Longest key text accepted
    pub max_key_len: usize,
    /// Share of numeric body cells under a text header that marks a table
    pub numeric_header_ratio: f64,
    /// Share of body values prefixed by the header that marks a table
    pub prefix_header_ratio: f64,
    /// Key length coefficient of variation below which keys look uniform
    pub uniform_key_cv: f64,
    pub uniform_key_min: usize,
    pub month_key_min: usize,
}

impl Default for KeyValueOptions {
    fn default() -> Self {
        Self {
            min_cols: 2,
            max_cols: 4,
            min_rows: 2,
            populated_ratio: 0.5,
            spacer_ratio: 0.3,
            min_pair_coverage: 0.5,
            max_key_len: 60,
            numeric_header_ratio: 0.6,
            prefix_header_ratio: 0.5,
            uniform_key_cv: 0.4,
            uniform_key_min: 4,
            month_key_min: 3,
        }
    }
}

/// Free-text heuristic thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub max_columns: usize,
    pub min_avg_words: f64,
    /// All-bold regions up to this many rows are not text
    pub bold_max_rows: u32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            max_columns: 2,
            min_avg_words: 4.0,
            bold_max_rows: 2,
        }
    }
}

/// Table heuristic thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub min_rows: u32,
    pub min_cols: u32,
    pub min_cells: usize,
    /// Share of numeric body cells under a text first-row cell that marks a header
    pub numeric_body_ratio: f64,
    /// Share of columns whose first row must match the body's majority type
    /// for the table to be headerless
    pub majority_match_ratio: f64,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            min_rows: 3,
            min_cols: 2,
            min_cells: 4,
            numeric_body_ratio: 0.6,
            majority_match_ratio: 0.8,
        }
    }
}

/// Table structure inference options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureOptions {
    /// Tables with more non-empty cells than this go to the oracle
    pub oracle_cell_threshold: usize,
    pub use_oracle: bool,
    /// Body rows included in the oracle summary
    pub sample_body_rows: usize,
    /// Trailing rows included in the oracle summary
    pub last_rows: usize,
    /// A group label row has at most this many filled cells...
    pub group_label_max_cells: usize,
    /// ...or at most this share of the median row fill, whichever is larger
    pub group_label_fill_ratio: f64,
    pub min_group_labels: usize,
    pub parent_selection: ParentSelection,
}

impl Default for StructureOptions {
    fn default() -> Self {
        Self {
            oracle_cell_threshold: 200,
            use_oracle: true,
            sample_body_rows: 5,
            last_rows: 3,
            group_label_max_cells: 3,
            group_label_fill_ratio: 0.15,
            min_group_labels: 2,
            parent_selection: ParentSelection::FirstMatch,
        }
    }
}

/// Heading/content grouping thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingOptions {
    /// Most blank rows allowed between a heading and its content
    ///
    /// Counts the empty rows in between, not the difference of row numbers:
    /// with 3, a heading on row 5 still owns a table starting on row 9.
    pub max_row_gap: u32,
    /// Smallest share of the heading's columns the content must overlap
    pub min_col_overlap: f64,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            max_row_gap: 3,
            min_col_overlap: 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("heuristic".parse(), Ok(DetectionMode::Heuristic));
        assert_eq!("Oracle".parse(), Ok(DetectionMode::Oracle));
        assert_eq!(
            "heuristic-then-oracle".parse(),
            Ok(DetectionMode::HeuristicThenOracle)
        );
        assert!("ai".parse::<DetectionMode>().is_err());
        assert_eq!(DetectionMode::HeuristicThenOracle.to_string(), "heuristic_then_oracle");
    }

    #[test]
    fn test_partial_options_file() {
        let options: AnalyzerOptions = serde_json::from_str(
            r#"{"mode": "heuristic_then_oracle", "grouping": {"max_row_gap": 5},
                "structure": {"parent_selection": "tightest_fit"}}"#,
        )
        .unwrap();

        assert_eq!(options.mode, DetectionMode::HeuristicThenOracle);
        assert_eq!(options.grouping.max_row_gap, 5);
        assert_eq!(options.grouping.min_col_overlap, 0.4);
        assert_eq!(options.structure.parent_selection, ParentSelection::TightestFit);
        assert_eq!(options.structure.oracle_cell_threshold, 200);
        assert_eq!(options.heading, HeadingOptions::default());
    }
}
