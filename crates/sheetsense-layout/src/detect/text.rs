//! Free-text detection

use serde::Deserialize;
use sheetsense_core::Region;
use sheetsense_oracle::{Oracle, OracleTask};

use super::{ask_about_region, Detection, Detector};
use crate::block::{Block, BlockKind, TextBlock};
use crate::options::AnalyzerOptions;

/// Detects notes, disclaimers and other prose
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDetector;

#[derive(Debug, Deserialize)]
struct TextReply {
    #[serde(default)]
    is_text: bool,
    #[serde(default)]
    text: Option<String>,
}

impl Detector for TextDetector {
    fn kind(&self) -> BlockKind {
        BlockKind::Text
    }

    fn detect(&self, region: &Region<'_>, options: &AnalyzerOptions) -> Detection {
        let opts = &options.text;
        let cells = region.non_empty_cells();
        if cells.is_empty() {
            return Detection::NoMatch;
        }

        if region.occupied_columns().len() > opts.max_columns && !cells.iter().any(|c| c.is_merged()) {
            return Detection::NoMatch;
        }

        let words: usize = cells.iter().map(|c| c.word_count()).sum();
        if (words as f64 / cells.len() as f64) < opts.min_avg_words {
            return Detection::NoMatch;
        }

        if region.num_rows() <= opts.bold_max_rows && cells.iter().all(|c| c.is_bold()) {
            return Detection::NoMatch;
        }

        Detection::Match(Block::Text(TextBlock {
            bounds: region.range(),
            text: join_lines(&cells),
            cells: cells.into_iter().cloned().collect(),
        }))
    }

    fn detect_with_oracle(
        &self,
        region: &Region<'_>,
        oracle: &dyn Oracle,
        _options: &AnalyzerOptions,
    ) -> Detection {
        let reply: TextReply = match ask_about_region(region, oracle, OracleTask::DetectText) {
            Ok(reply) => reply,
            Err(recovered) => return recovered,
        };
        if !reply.is_text {
            return Detection::NoMatch;
        }

        let cells = region.non_empty_cells();
        let text = reply
            .text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| join_lines(&cells));
        Detection::Match(Block::Text(TextBlock {
            bounds: region.range(),
            text,
            cells: cells.into_iter().cloned().collect(),
        }))
    }
}

fn join_lines(cells: &[&sheetsense_core::SharedCell]) -> String {
    cells.iter().map(|c| c.text()).collect::<Vec<_>>().join("\n")
}
