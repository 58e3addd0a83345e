//! Block classification
//!
//! Each block type has a [`Detector`] offering a heuristic test and an
//! oracle-backed test. [`classify`] runs them in a fixed order (heading,
//! key/value, text, table) under a [`DetectionMode`]; the first match wins.

pub mod content;
pub mod heading;
pub mod key_value;
pub mod table;
pub mod text;

use serde::de::DeserializeOwned;
use sheetsense_core::Region;
use sheetsense_oracle::{ask, render_cells, Oracle, OracleReply, OracleRequest, OracleTask, SampleLimits};

use crate::block::{Block, BlockKind};
use crate::options::{AnalyzerOptions, DetectionMode};

pub use heading::HeadingDetector;
pub use key_value::KeyValueDetector;
pub use table::TableDetector;
pub use text::TextDetector;

/// Result of one detector on one region
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// The region is this block
    Match(Block),
    /// The region is not this kind of block
    NoMatch,
    /// The oracle failed or answered nonsense; treated as no match
    Recovered(String),
}

impl Detection {
    pub fn is_match(&self) -> bool {
        matches!(self, Detection::Match(_))
    }

    /// The matched block, if any
    pub fn into_block(self) -> Option<Block> {
        match self {
            Detection::Match(block) => Some(block),
            _ => None,
        }
    }
}

impl From<Option<Block>> for Detection {
    fn from(block: Option<Block>) -> Self {
        match block {
            Some(block) => Detection::Match(block),
            None => Detection::NoMatch,
        }
    }
}

/// A classifier for one block type
pub trait Detector {
    /// Block type this detector produces
    fn kind(&self) -> BlockKind;

    /// Heuristic test over cell values and formatting
    fn detect(&self, region: &Region<'_>, options: &AnalyzerOptions) -> Detection;

    /// Ask the oracle
    fn detect_with_oracle(
        &self,
        region: &Region<'_>,
        oracle: &dyn Oracle,
        options: &AnalyzerOptions,
    ) -> Detection;
}

/// Detectors in evaluation order
pub fn detectors() -> [&'static dyn Detector; 4] {
    [&HeadingDetector, &KeyValueDetector, &TextDetector, &TableDetector]
}

/// Classify a region, returning the first matching block
///
/// Oracle failures inside a detector never stop the chain: the next
/// detector runs as if the failing one had not matched.
pub fn classify(
    region: &Region<'_>,
    mode: DetectionMode,
    oracle: Option<&dyn Oracle>,
    options: &AnalyzerOptions,
) -> Option<Block> {
    for detector in detectors() {
        let detection = match (mode, oracle) {
            (DetectionMode::Heuristic, _) => detector.detect(region, options),
            (DetectionMode::Oracle, Some(oracle)) => {
                detector.detect_with_oracle(region, oracle, options)
            }
            (DetectionMode::Oracle, None) => Detection::NoMatch,
            (DetectionMode::HeuristicThenOracle, oracle) => {
                match (detector.detect(region, options), oracle) {
                    (Detection::Match(block), _) => Detection::Match(block),
                    (_, Some(oracle)) => detector.detect_with_oracle(region, oracle, options),
                    (other, None) => other,
                }
            }
        };

        match detection {
            Detection::Match(block) => {
                tracing::debug!(region = %region.range(), kind = %detector.kind(), "region classified");
                return Some(block);
            }
            Detection::Recovered(reason) => {
                tracing::debug!(
                    region = %region.range(),
                    kind = %detector.kind(),
                    reason = %reason,
                    "oracle detection recovered as no match"
                );
            }
            Detection::NoMatch => {}
        }
    }
    tracing::debug!(region = %region.range(), "region left unclassified");
    None
}

/// Send the region's non-empty cells to the oracle and parse the reply
///
/// Failed calls and unparseable replies come back as `Err(Detection::Recovered)`.
pub(crate) fn ask_about_region<T: DeserializeOwned>(
    region: &Region<'_>,
    oracle: &dyn Oracle,
    task: OracleTask,
) -> Result<T, Detection> {
    let cells = region.non_empty_cells();
    let excerpt = render_cells(cells.iter().map(|c| c.as_ref()), &SampleLimits::default());
    let request = OracleRequest::new(task, excerpt);
    match ask::<T>(oracle, &request) {
        OracleReply::Answer(reply) => Ok(reply),
        OracleReply::Malformed(_) => Err(Detection::Recovered(format!("{task}: malformed reply"))),
        OracleReply::Failed(err) => Err(Detection::Recovered(format!("{task}: {err}"))),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::grid_from_rows;
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsense_oracle::{OracleError, OracleResult};
    use std::cell::RefCell;

    #[test]
    fn test_heuristic_chain_falls_through_to_table() {
        let grid = grid_from_rows(&[
            &["January", "10"],
            &["February", "12"],
            &["March", "9"],
            &["April", "14"],
        ]);
        let region = grid.region(grid.bounds().unwrap());
        let block = classify(&region, DetectionMode::Heuristic, None, &AnalyzerOptions::default());
        assert_eq!(block.map(|b| b.kind()), Some(BlockKind::Table));
    }

    #[test]
    fn test_oracle_mode_without_oracle_matches_nothing() {
        let grid = grid_from_rows(&[&["Name", "Score"], &["Ann", "7"], &["Bob", "9"]]);
        let region = grid.region(grid.bounds().unwrap());
        assert_eq!(
            classify(&region, DetectionMode::Oracle, None, &AnalyzerOptions::default()),
            None
        );
    }

    #[test]
    fn test_oracle_failure_continues_chain() {
        let grid = grid_from_rows(&[&["Some longer note that reads like prose"]]);
        let region = grid.region(grid.bounds().unwrap());
        let asked = RefCell::new(Vec::new());
        let oracle = |req: &OracleRequest| -> OracleResult<String> {
            asked.borrow_mut().push(req.task);
            match req.task {
                OracleTask::DetectHeading => Err(OracleError::Unavailable("down".into())),
                OracleTask::DetectKeyValue => Ok("I don't know".into()),
                OracleTask::DetectText => Ok(r#"{"is_text": true, "text": "note"}"#.into()),
                _ => Ok(r#"{"is_table": false}"#.into()),
            }
        };

        let block = classify(&region, DetectionMode::Oracle, Some(&oracle), &AnalyzerOptions::default());
        assert_eq!(block.map(|b| b.kind()), Some(BlockKind::Text));
        assert_eq!(
            asked.into_inner(),
            vec![OracleTask::DetectHeading, OracleTask::DetectKeyValue, OracleTask::DetectText]
        );
    }

    #[test]
    fn test_heuristic_then_oracle_prefers_heuristic() {
        let grid = grid_from_rows(&[&["Name", "Score"], &["Ann", "7"], &["Bob", "9"]]);
        let region = grid.region(grid.bounds().unwrap());
        let calls = RefCell::new(0);
        let oracle = |_: &OracleRequest| -> OracleResult<String> {
            *calls.borrow_mut() += 1;
            Ok("{}".into())
        };

        let block = classify(
            &region,
            DetectionMode::HeuristicThenOracle,
            Some(&oracle),
            &AnalyzerOptions::default(),
        );
        assert_eq!(block.map(|b| b.kind()), Some(BlockKind::Table));
        // heading, key/value and text fall back to the oracle; the table heuristic matches
        assert_eq!(*calls.borrow(), 3);
    }
}
