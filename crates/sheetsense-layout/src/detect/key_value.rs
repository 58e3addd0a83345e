//! Key/value form detection
//!
//! A form has a column of short labels and a column of values, possibly
//! separated by a sparse spacer column. What separates it from a two-column
//! table is the first row (a form has no header) and the keys (a form's
//! labels are heterogeneous field names, a table's first column is a run of
//! similar instances such as months or years).

use ahash::AHashSet;
use lazy_regex::regex;
use serde::Deserialize;
use sheetsense_core::{CellAddress, Region};
use sheetsense_oracle::{Oracle, OracleTask};

use super::content::{looks_numeric, numeric_ratio};
use super::{ask_about_region, Detection, Detector};
use crate::block::{Block, BlockKind, KeyValueBlock, KeyValuePair};
use crate::options::{AnalyzerOptions, KeyValueOptions};

const MONTHS: [&str; 23] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep",
    "oct", "nov", "dec",
];

/// Detects label/value forms
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueDetector;

#[derive(Debug, Deserialize)]
struct KeyValueReply {
    #[serde(default)]
    is_key_value: bool,
    #[serde(default)]
    pairs: Vec<PairReply>,
}

#[derive(Debug, Deserialize)]
struct PairReply {
    key_coordinate: String,
    value_coordinate: String,
}

impl Detector for KeyValueDetector {
    fn kind(&self) -> BlockKind {
        BlockKind::KeyValue
    }

    fn detect(&self, region: &Region<'_>, options: &AnalyzerOptions) -> Detection {
        let opts = &options.key_value;
        let (rows, cols) = (region.num_rows(), region.num_cols());
        if cols < opts.min_cols || cols > opts.max_cols || rows < opts.min_rows {
            return Detection::NoMatch;
        }
        if has_header_row(region, opts) {
            return Detection::NoMatch;
        }

        let filled = |col: u32| region.col_values(col).len() as f64;
        let non_empty: Vec<u32> = region.occupied_columns();
        let populated: Vec<u32> = non_empty
            .iter()
            .copied()
            .filter(|c| filled(*c) > rows as f64 * opts.populated_ratio)
            .collect();
        if populated.len() != 2 {
            return Detection::NoMatch;
        }

        let (key_col, value_col) = (populated[0], populated[1]);
        if non_empty.first() != Some(&key_col) || non_empty.last() != Some(&value_col) {
            return Detection::NoMatch;
        }
        if non_empty
            .iter()
            .filter(|c| **c > key_col && **c < value_col)
            .any(|c| filled(*c) > rows as f64 * opts.spacer_ratio)
        {
            return Detection::NoMatch;
        }

        let mut pairs = Vec::new();
        for row in region.min_row()..=region.max_row() {
            let (Some(key), Some(value)) = (region.filled_at(row, key_col), region.filled_at(row, value_col)) else {
                continue;
            };
            if key.has_formula() || key.text().chars().count() > opts.max_key_len {
                continue;
            }
            pairs.push(KeyValuePair {
                key: key.clone(),
                value: value.clone(),
            });
        }

        if pairs.len() < 2 || (pairs.len() as f64) < rows as f64 * opts.min_pair_coverage {
            return Detection::NoMatch;
        }

        let keys: Vec<&str> = pairs.iter().map(|p| p.key_text()).collect();
        if keys_are_homogeneous(&keys, opts) {
            return Detection::NoMatch;
        }

        Detection::Match(Block::KeyValue(KeyValueBlock {
            bounds: region.range(),
            pairs,
            cells: region.non_empty_cells().into_iter().cloned().collect(),
        }))
    }

    fn detect_with_oracle(
        &self,
        region: &Region<'_>,
        oracle: &dyn Oracle,
        _options: &AnalyzerOptions,
    ) -> Detection {
        let reply: KeyValueReply = match ask_about_region(region, oracle, OracleTask::DetectKeyValue) {
            Ok(reply) => reply,
            Err(recovered) => return recovered,
        };
        if !reply.is_key_value {
            return Detection::NoMatch;
        }

        let lookup = |coordinate: &str| {
            CellAddress::parse(coordinate)
                .ok()
                .and_then(|a| region.cell_at(a.row, a.col))
        };
        let pairs: Vec<KeyValuePair> = reply
            .pairs
            .iter()
            .filter_map(|p| {
                Some(KeyValuePair {
                    key: lookup(&p.key_coordinate)?.clone(),
                    value: lookup(&p.value_coordinate)?.clone(),
                })
            })
            .collect();

        if pairs.is_empty() {
            return Detection::Recovered("key/value reply named no cells inside the region".to_string());
        }
        Detection::Match(Block::KeyValue(KeyValueBlock {
            bounds: region.range(),
            pairs,
            cells: region.non_empty_cells().into_iter().cloned().collect(),
        }))
    }
}

/// Whether the first row reads as a table header
fn has_header_row(region: &Region<'_>, opts: &KeyValueOptions) -> bool {
    let first = region.min_row();
    let header = region.row_values(first);
    if header.is_empty() {
        return false;
    }
    if header.iter().all(|c| c.is_bold()) || header.iter().all(|c| c.has_fill()) {
        return true;
    }
    if region.num_rows() < 3 || header.iter().any(|c| looks_numeric(c.text())) {
        return false;
    }

    let body = |col: u32| {
        region
            .col_values(col)
            .into_iter()
            .filter(|c| c.row() != first)
            .map(|c| c.text().trim())
            .collect::<Vec<&str>>()
    };

    // a text label above mostly numbers
    if header.iter().any(|h| {
        let values = body(h.col());
        !values.is_empty() && numeric_ratio(values) >= opts.numeric_header_ratio
    }) {
        return true;
    }

    // a category label above instances of it ("Product" over "Product A")
    header.iter().any(|h| {
        let label = h.text().trim().to_lowercase();
        let values = body(h.col());
        let prefixed = values
            .iter()
            .map(|v| v.to_lowercase())
            .filter(|v| v.starts_with(&label) && *v != label)
            .count();
        values.len() >= 2 && prefixed as f64 >= values.len() as f64 * opts.prefix_header_ratio
    })
}

/// Whether keys look like instances of one category rather than field names
fn keys_are_homogeneous(keys: &[&str], opts: &KeyValueOptions) -> bool {
    if keys.len() < 3 {
        return false;
    }
    if keys.iter().all(|k| looks_numeric(k)) {
        return true;
    }

    let lengths: Vec<f64> = keys.iter().map(|k| k.chars().count() as f64).collect();
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    let cv = if mean > 0.0 {
        let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
        variance.sqrt() / mean
    } else {
        0.0
    };
    let word_counts: AHashSet<usize> = keys.iter().map(|k| k.split_whitespace().count()).collect();
    if word_counts.len() == 1 && cv < opts.uniform_key_cv && keys.len() >= opts.uniform_key_min {
        return true;
    }

    let lowered: AHashSet<String> = keys.iter().map(|k| k.trim().to_lowercase()).collect();
    if lowered.len() >= opts.month_key_min && lowered.iter().all(|k| MONTHS.contains(&k.as_str())) {
        return true;
    }

    keys.iter().all(|k| regex!(r"(?i)^q\d$").is_match(k.trim()))
}
