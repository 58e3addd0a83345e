//! Heading detection

use serde::Deserialize;
use sheetsense_core::Region;
use sheetsense_oracle::{Oracle, OracleTask};

use super::{ask_about_region, Detection, Detector};
use crate::block::{Block, BlockKind, HeadingBlock};
use crate::options::AnalyzerOptions;

/// Detects short, emphasised title rows
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingDetector;

#[derive(Debug, Deserialize)]
struct HeadingReply {
    #[serde(default)]
    is_heading: bool,
    #[serde(default)]
    text: Option<String>,
}

impl Detector for HeadingDetector {
    fn kind(&self) -> BlockKind {
        BlockKind::Heading
    }

    fn detect(&self, region: &Region<'_>, options: &AnalyzerOptions) -> Detection {
        let opts = &options.heading;
        if region.num_rows() > opts.max_rows {
            return Detection::NoMatch;
        }

        let cells = region.non_empty_cells();
        if cells.is_empty() || cells.iter().any(|c| c.has_formula()) {
            return Detection::NoMatch;
        }

        let distinct = distinct_values(cells.iter().map(|c| c.text()));
        if distinct.len() > opts.max_distinct_values {
            return Detection::NoMatch;
        }

        let emphasised = cells.iter().any(|c| {
            c.is_bold()
                || c.format.font_size.is_some_and(|s| s >= opts.large_font_size)
                || c.is_merged()
        });
        if !emphasised {
            return Detection::NoMatch;
        }

        Detection::Match(Block::Heading(HeadingBlock {
            bounds: region.range(),
            text: distinct.join(" "),
            cells: region.non_empty_cells().into_iter().cloned().collect(),
        }))
    }

    fn detect_with_oracle(
        &self,
        region: &Region<'_>,
        oracle: &dyn Oracle,
        _options: &AnalyzerOptions,
    ) -> Detection {
        let reply: HeadingReply = match ask_about_region(region, oracle, OracleTask::DetectHeading) {
            Ok(reply) => reply,
            Err(recovered) => return recovered,
        };
        if !reply.is_heading {
            return Detection::NoMatch;
        }

        let cells = region.non_empty_cells();
        let text = match reply.text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None => distinct_values(cells.iter().map(|c| c.text())).join(" "),
        };
        Detection::Match(Block::Heading(HeadingBlock {
            bounds: region.range(),
            text,
            cells: region.non_empty_cells().into_iter().cloned().collect(),
        }))
    }
}

/// Distinct trimmed values in first-seen order
fn distinct_values<'a, I: Iterator<Item = &'a str>>(values: I) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}
